//! Node and edge records.
//!
//! # Responsibility
//! - Define in-memory graph records and their serialized wire shape.
//! - Provide the synced view type that merges transient flags into nodes.
//!
//! # Invariants
//! - `Edge::id` is derived from `(source, target)` via [`edge_id_for`].
//! - `SyncedNode` is a projection; it never feeds back into the store
//!   except through a wholesale replace.

use serde::{Deserialize, Serialize};

/// Caller-visible node identifier.
pub type NodeId = String;

/// Edge identifier, derived from its endpoints.
pub type EdgeId = String;

/// Theme-relative color sentinel; renders as the theme's button color.
pub const THEME_DEFAULT_COLOR: &str = "var(--button-bg)";

/// Render type tag attached to every node in the wire shape.
pub const NODE_KIND_CUSTOM: &str = "custom";

/// Canvas coordinates in logical units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Label and color payload of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeData {
    pub label: String,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_color() -> String {
    THEME_DEFAULT_COLOR.to_string()
}

fn default_kind() -> String {
    NODE_KIND_CUSTOM.to_string()
}

fn default_true() -> bool {
    true
}

/// One idea box in the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub position: Position,
    pub data: NodeData,
}

impl Node {
    /// Creates a node with the theme default color.
    pub fn new(id: impl Into<NodeId>, position: Position, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            position,
            data: NodeData {
                label: label.into(),
                color: default_color(),
            },
        }
    }
}

/// Directed connection between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    /// Cosmetic flow animation flag.
    #[serde(default)]
    pub animated: bool,
}

impl Edge {
    /// Creates an animated edge with its derived id.
    pub fn connect(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        let source = source.into();
        let target = target.into();
        Self {
            id: edge_id_for(&source, &target),
            source,
            target,
            animated: true,
        }
    }
}

/// Derives the deterministic edge id for one endpoint pair.
pub fn edge_id_for(source: &str, target: &str) -> EdgeId {
    format!("e{source}-{target}")
}

/// Node view with derived `selected`/`draggable` flags merged in.
///
/// This is both the snapshot shape handed to renderers/exporters and the
/// persisted node shape inside documents and import files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncedNode {
    pub id: NodeId,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    pub position: Position,
    pub data: NodeData,
    #[serde(default)]
    pub selected: bool,
    #[serde(default = "default_true")]
    pub draggable: bool,
}

impl SyncedNode {
    /// Builds the synced view of `node`.
    pub fn from_node(node: &Node, selected: bool, draggable: bool) -> Self {
        Self {
            id: node.id.clone(),
            kind: default_kind(),
            position: node.position,
            data: node.data.clone(),
            selected,
            draggable,
        }
    }

    /// Drops transient flags and returns the stored node.
    pub fn to_node(&self) -> Node {
        Node {
            id: self.id.clone(),
            position: self.position,
            data: self.data.clone(),
        }
    }
}
