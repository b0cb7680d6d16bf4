//! Persisted mind-map document shapes.
//!
//! # Responsibility
//! - Define the unit written to and read from the remote document store.
//! - Define the summary rows used by the selectable map list.
//!
//! # Invariants
//! - `DocumentId` is opaque and assigned by the remote store on create.
//! - Timestamps are Unix epoch milliseconds.
//! - `nodes` carry the `selected` flag flattened in; selection is
//!   reconstructed from it on load.

use crate::model::node::{Edge, SyncedNode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Opaque store-assigned document identifier.
pub type DocumentId = String;

/// Named palette definitions: name -> ordered colors.
pub type PaletteSet = BTreeMap<String, Vec<String>>;

/// Persisted unit combining graph, palette snapshot and metadata.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MindMapDocument {
    pub name: String,
    pub nodes: Vec<SyncedNode>,
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub palettes: PaletteSet,
    /// Set by the store on create; `None` in update payloads.
    #[serde(default)]
    pub created_at: Option<i64>,
    pub updated_at: i64,
}

/// List row describing one stored document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub id: DocumentId,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Graph blob mirrored into the local cache after a confirmed save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedGraph {
    pub nodes: Vec<SyncedNode>,
    pub edges: Vec<Edge>,
}

/// Returns current wall-clock time in epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
