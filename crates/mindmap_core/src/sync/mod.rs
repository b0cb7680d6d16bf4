//! Persistence coordination between the graph store, the remote document
//! store and the local cache.
//!
//! # Responsibility
//! - Provide one reusable retry policy for fallible store calls.
//! - Gate persistence on a resolved identity token.
//! - Run save/load/list with busy-state guarding and cache fallback.
//!
//! # Invariants
//! - At most one persistence operation is in flight.
//! - Cache mirror writes happen only after confirmed remote success.
//! - A failed operation leaves graph, palettes and binding unchanged.

pub mod coordinator;
pub mod identity;
pub mod retry;
