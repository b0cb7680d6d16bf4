//! Use-case façade over graph, palette, persistence and export.
//!
//! # Responsibility
//! - Wire session state into every component explicitly.
//! - Map component errors into user-facing notices.
//! - Persist process-wide preferences (theme, palettes) to the local cache.

pub mod controller;
