//! Export/import boundary.
//!
//! # Responsibility
//! - Resolve an export format once and dispatch to one encoder.
//! - Encode text formats (JSON, CSV, narrative text) in-process.
//! - Plan the capture region/scale for rendered formats and hand off to
//!   the rendering collaborator.
//! - Parse and validate structured-text imports.
//!
//! # Invariants
//! - The boundary never touches pixels; it only computes the logical
//!   viewport rectangle and scale.
//! - Failed imports never reach the graph store.

pub mod encoders;
pub mod format;
pub mod import;
pub mod viewport;

use crate::config::ExportConfig;
use crate::model::document::PaletteSet;
use crate::model::node::{Edge, SyncedNode};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use encoders::{export_snapshot, Encoder, ExportArtifact, RenderCollaborator};
pub use format::ExportFormat;
pub use import::{import_snapshot, ImportError};

pub type ExportResult<T> = Result<T, ExportError>;

/// Export-side error.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportError {
    /// Rendered format requested without a rendering collaborator.
    RendererUnavailable(ExportFormat),
    /// Rendered formats need at least one node to frame.
    EmptyGraph,
    Serialize(String),
    Render(String),
}

impl Display for ExportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RendererUnavailable(format) => {
                write!(f, "no renderer available for {} export", format.extension())
            }
            Self::EmptyGraph => write!(f, "nothing to export: the map has no nodes"),
            Self::Serialize(message) => write!(f, "failed to encode map: {message}"),
            Self::Render(message) => write!(f, "renderer failed: {message}"),
        }
    }
}

impl Error for ExportError {}

/// Structured map payload: the export shape and the import shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapSnapshot {
    pub nodes: Vec<SyncedNode>,
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub palettes: PaletteSet,
    #[serde(default)]
    pub name: String,
}

/// Builds `<name or default stem>.<extension>`.
pub fn export_file_name(name: &str, format: ExportFormat, config: &ExportConfig) -> String {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '-' } else { c })
        .collect();
    let stem = if stem.is_empty() {
        config.default_file_stem.as_str()
    } else {
        stem.as_str()
    };
    format!("{stem}.{}", format.extension())
}
