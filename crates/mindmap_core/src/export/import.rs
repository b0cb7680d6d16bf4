//! Structured-text import.
//!
//! # Invariants
//! - Parsing and validation finish before any state is touched.
//! - Node ids are unique and every edge endpoint exists.

use crate::export::MapSnapshot;
use log::{info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Malformed import payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    NotUtf8,
    Malformed(String),
    DuplicateNode(String),
    DanglingEdge { edge: String, node: String },
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotUtf8 => write!(f, "invalid map file: not UTF-8 text"),
            Self::Malformed(message) => write!(f, "invalid map file: {message}"),
            Self::DuplicateNode(id) => write!(f, "invalid map file: duplicate node id `{id}`"),
            Self::DanglingEdge { edge, node } => write!(
                f,
                "invalid map file: edge `{edge}` references missing node `{node}`"
            ),
        }
    }
}

impl Error for ImportError {}

/// Parses and validates an exported map file.
pub fn import_snapshot(bytes: &[u8]) -> Result<MapSnapshot, ImportError> {
    let result = parse_snapshot(bytes);
    match &result {
        Ok(snapshot) => info!(
            "event=map_import module=export status=ok node_count={} edge_count={}",
            snapshot.nodes.len(),
            snapshot.edges.len()
        ),
        Err(err) => warn!(
            "event=map_import module=export status=error error={}",
            err
        ),
    }
    result
}

fn parse_snapshot(bytes: &[u8]) -> Result<MapSnapshot, ImportError> {
    let text = std::str::from_utf8(bytes).map_err(|_| ImportError::NotUtf8)?;
    let snapshot: MapSnapshot =
        serde_json::from_str(text).map_err(|err| ImportError::Malformed(err.to_string()))?;

    let mut ids = HashSet::with_capacity(snapshot.nodes.len());
    for node in &snapshot.nodes {
        if !ids.insert(node.id.as_str()) {
            return Err(ImportError::DuplicateNode(node.id.clone()));
        }
    }
    for edge in &snapshot.edges {
        for endpoint in [&edge.source, &edge.target] {
            if !ids.contains(endpoint.as_str()) {
                return Err(ImportError::DanglingEdge {
                    edge: edge.id.clone(),
                    node: endpoint.clone(),
                });
            }
        }
    }
    Ok(snapshot)
}
