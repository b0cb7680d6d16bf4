//! Graph store: canonical node/edge collections plus selection state.
//!
//! # Responsibility
//! - Own nodes, edges, the selection set and the active node.
//! - Gate every mutation on the session lock.
//! - Produce synced snapshots for persistence and export.
//!
//! # Invariants
//! - Selection is always a subset of current node ids.
//! - The active node, when set, is a member of the selection.
//! - Edges created through `connect` never dangle.

pub mod store;
