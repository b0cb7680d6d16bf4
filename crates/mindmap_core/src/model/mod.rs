//! Mind-map domain model.
//!
//! # Responsibility
//! - Define the canonical node/edge shapes owned by the graph store.
//! - Define the synced (snapshot) and persisted document shapes.
//!
//! # Invariants
//! - Node ids are unique within one graph.
//! - Edge endpoints reference existing node ids.
//! - `selected`/`draggable` are derived flags, never owned by `Node`.

pub mod document;
pub mod node;
