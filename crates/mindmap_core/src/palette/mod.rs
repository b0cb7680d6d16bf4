//! Named color palettes shared across documents.
//!
//! # Responsibility
//! - Own palette definitions and the active palette name.
//! - Validate user-supplied palette colors.
//!
//! # Invariants
//! - Every palette ends with the reset sentinel.
//! - The active palette name is always a key of the palette set.

pub mod color;
pub mod manager;
