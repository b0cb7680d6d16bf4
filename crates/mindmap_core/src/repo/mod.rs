//! Persistence collaborator contracts and implementations.
//!
//! # Responsibility
//! - Define the remote document store and local cache contracts.
//! - Provide SQLite-backed and in-memory implementations.
//!
//! # Invariants
//! - Store APIs distinguish semantic absence (`None`/`NotFound`) from
//!   transport failures.
//! - Cache writes are last-write-wins per key; no cross-key transaction.

pub mod document_store;
pub mod local_cache;
