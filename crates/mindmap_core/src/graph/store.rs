//! In-memory graph store.
//!
//! # Responsibility
//! - Apply user-level graph mutations (add, connect, relabel, recolor,
//!   move, edge delete) under the session lock.
//! - Replace the whole graph from loaded/imported snapshots.
//!
//! # Invariants
//! - Locked calls leave state untouched and return `GraphError::Locked`.
//! - Batched position changes apply all-or-nothing with respect to the lock.
//! - Clearing selection clears the active node.

use crate::config::CanvasConfig;
use crate::model::node::{Edge, EdgeId, Node, NodeId, Position, SyncedNode};
use crate::session::{LockedError, Operation, SessionState};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

const TEMPLATE_ROOT_LABEL: &str = "Main Idea";
const TEMPLATE_CHILD_LABEL: &str = "Secondary Idea";

pub type GraphResult<T> = Result<T, GraphError>;

/// Graph mutation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    Locked(LockedError),
    UnknownNode(NodeId),
}

impl Display for GraphError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Locked(err) => write!(f, "{err}"),
            Self::UnknownNode(id) => write!(f, "node not found: {id}"),
        }
    }
}

impl Error for GraphError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Locked(err) => Some(err),
            Self::UnknownNode(_) => None,
        }
    }
}

impl From<LockedError> for GraphError {
    fn from(value: LockedError) -> Self {
        Self::Locked(value)
    }
}

/// One drag/move update reported by the rendering collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeChange {
    /// Absolute position after a drag.
    MoveTo { id: NodeId, position: Position },
    /// Relative displacement.
    MoveBy { id: NodeId, dx: f64, dy: f64 },
}

impl NodeChange {
    fn node_id(&self) -> &str {
        match self {
            Self::MoveTo { id, .. } | Self::MoveBy { id, .. } => id,
        }
    }
}

/// Read-only graph view with derived flags computed.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphSnapshot {
    pub nodes: Vec<SyncedNode>,
    pub edges: Vec<Edge>,
}

/// Canonical owner of node/edge/selection state.
pub struct GraphStore {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    selection: BTreeSet<NodeId>,
    /// Same ids as `selection`, in the order they were selected.
    selection_order: Vec<NodeId>,
    active: Option<NodeId>,
    canvas: CanvasConfig,
    rng: StdRng,
}

impl GraphStore {
    /// Creates a store holding the two-node starter template.
    pub fn new(canvas: CanvasConfig) -> Self {
        Self::with_rng(canvas, StdRng::from_entropy())
    }

    /// Creates a store with deterministic random placement.
    pub fn with_seed(canvas: CanvasConfig, seed: u64) -> Self {
        Self::with_rng(canvas, StdRng::seed_from_u64(seed))
    }

    fn with_rng(canvas: CanvasConfig, rng: StdRng) -> Self {
        let (nodes, edges) = template();
        Self {
            nodes,
            edges,
            selection: BTreeSet::new(),
            selection_order: Vec::new(),
            active: None,
            canvas,
            rng,
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    pub fn selection(&self) -> &BTreeSet<NodeId> {
        &self.selection
    }

    /// Recolor target, if any.
    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Node a new child should be placed under: the active node when
    /// selected, otherwise the earliest selected id still in the selection.
    pub fn selection_anchor(&self) -> Option<&str> {
        self.active
            .as_deref()
            .filter(|id| self.selection.contains(*id))
            .or_else(|| self.selection_order.first().map(String::as_str))
    }

    /// Adds one node and returns its id.
    ///
    /// # Contract
    /// - With an existing `anchor`, the node lands `child_offset_y` below it.
    /// - Otherwise it lands at a pseudo-random point inside the canvas region.
    /// - The id is `len + 1`; on collision the next unused integer is taken.
    pub fn add_node(
        &mut self,
        session: &SessionState,
        anchor: Option<&str>,
    ) -> GraphResult<NodeId> {
        session.ensure_unlocked(Operation::AddNode)?;

        let anchored = anchor.and_then(|id| self.node(id)).map(|node| node.position);
        let position = match anchored {
            Some(anchor_position) => Position::new(
                anchor_position.x,
                anchor_position.y + self.canvas.child_offset_y,
            ),
            None => Position::new(
                random_coordinate(&mut self.rng, self.canvas.width),
                random_coordinate(&mut self.rng, self.canvas.height),
            ),
        };

        let number = self.next_id_number();
        let id = number.to_string();
        self.nodes
            .push(Node::new(id.clone(), position, format!("Idea {number}")));
        debug!(
            "event=node_add module=graph status=ok anchored={} node_count={}",
            anchored.is_some(),
            self.nodes.len()
        );
        Ok(id)
    }

    /// Appends an edge between two existing nodes.
    ///
    /// Returns `None` when the pair is already connected.
    pub fn connect(
        &mut self,
        session: &SessionState,
        source: &str,
        target: &str,
    ) -> GraphResult<Option<EdgeId>> {
        session.ensure_unlocked(Operation::Connect)?;
        for endpoint in [source, target] {
            if !self.contains_node(endpoint) {
                return Err(GraphError::UnknownNode(endpoint.to_string()));
            }
        }

        if self
            .edges
            .iter()
            .any(|edge| edge.source == source && edge.target == target)
        {
            return Ok(None);
        }

        let edge = Edge::connect(source, target);
        let id = edge.id.clone();
        self.edges.push(edge);
        debug!(
            "event=edge_add module=graph status=ok edge_count={}",
            self.edges.len()
        );
        Ok(Some(id))
    }

    /// Replaces a node label. Empty labels are ignored.
    ///
    /// Returns whether the label changed.
    pub fn relabel(
        &mut self,
        session: &SessionState,
        id: &str,
        label: &str,
    ) -> GraphResult<bool> {
        session.ensure_unlocked(Operation::Relabel)?;
        if label.is_empty() {
            return Ok(false);
        }
        let node = self
            .nodes
            .iter_mut()
            .find(|node| node.id == id)
            .ok_or_else(|| GraphError::UnknownNode(id.to_string()))?;
        node.data.label = label.to_string();
        Ok(true)
    }

    /// Applies `color` to the active node.
    ///
    /// Returns the recolored id, or `None` when no node is active.
    pub fn recolor(&mut self, session: &SessionState, color: &str) -> GraphResult<Option<NodeId>> {
        session.ensure_unlocked(Operation::Recolor)?;
        let Some(active) = self.active.clone() else {
            return Ok(None);
        };
        match self.nodes.iter_mut().find(|node| node.id == active) {
            Some(node) => {
                node.data.color = color.to_string();
                Ok(Some(active))
            }
            None => Ok(None),
        }
    }

    /// Click selection.
    ///
    /// - additive: toggles `id` membership.
    /// - otherwise: selection becomes exactly `{id}` and `id` turns active.
    ///
    /// Unknown ids are ignored; returns whether state changed.
    pub fn set_selection(&mut self, id: &str, additive: bool) -> bool {
        if !self.contains_node(id) {
            return false;
        }
        if additive {
            if self.selection.remove(id) {
                self.selection_order.retain(|selected| selected != id);
                if self.active.as_deref() == Some(id) {
                    self.active = None;
                }
            } else {
                self.selection.insert(id.to_string());
                self.selection_order.push(id.to_string());
            }
        } else {
            self.selection.clear();
            self.selection.insert(id.to_string());
            self.selection_order = vec![id.to_string()];
            self.active = Some(id.to_string());
        }
        true
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.selection_order.clear();
        self.active = None;
    }

    /// Removes one edge after the caller confirmed the deletion.
    ///
    /// Returns whether an edge was removed.
    pub fn delete_edge(
        &mut self,
        session: &SessionState,
        edge_id: &str,
        confirmed: bool,
    ) -> GraphResult<bool> {
        session.ensure_unlocked(Operation::DeleteEdge)?;
        if !confirmed {
            return Ok(false);
        }
        let before = self.edges.len();
        self.edges.retain(|edge| edge.id != edge_id);
        Ok(self.edges.len() != before)
    }

    /// Applies one batch of drag/move updates.
    ///
    /// Changes for unknown ids are skipped. Returns the applied count.
    pub fn apply_position_deltas(
        &mut self,
        session: &SessionState,
        changes: &[NodeChange],
    ) -> GraphResult<usize> {
        session.ensure_unlocked(Operation::MoveNodes)?;
        let mut applied = 0;
        for change in changes {
            let Some(node) = self.nodes.iter_mut().find(|node| node.id == change.node_id())
            else {
                debug!("event=node_move module=graph status=skipped reason=unknown_node");
                continue;
            };
            match change {
                NodeChange::MoveTo { position, .. } => node.position = *position,
                NodeChange::MoveBy { dx, dy, .. } => {
                    node.position.x += dx;
                    node.position.y += dy;
                }
            }
            applied += 1;
        }
        Ok(applied)
    }

    /// Clear: restores the starter template and drops selection.
    pub fn reset(&mut self, session: &SessionState) -> GraphResult<()> {
        session.ensure_unlocked(Operation::ClearMap)?;
        self.restore_template();
        Ok(())
    }

    /// Restores the starter template without a lock check.
    ///
    /// Callers must gate on the lock with their own operation kind.
    pub(crate) fn restore_template(&mut self) {
        let (nodes, edges) = template();
        self.nodes = nodes;
        self.edges = edges;
        self.clear_selection();
        info!("event=graph_reset module=graph status=ok");
    }

    /// Wholesale replace from a persisted/imported snapshot.
    ///
    /// Selection is rebuilt from nodes flagged `selected`; active is cleared.
    pub(crate) fn replace_from_synced(&mut self, nodes: &[SyncedNode], edges: &[Edge]) {
        self.nodes = nodes.iter().map(SyncedNode::to_node).collect();
        self.edges = edges.to_vec();
        self.selection.clear();
        self.selection_order.clear();
        for node in nodes.iter().filter(|node| node.selected) {
            if self.selection.insert(node.id.clone()) {
                self.selection_order.push(node.id.clone());
            }
        }
        self.active = None;
        info!(
            "event=graph_replace module=graph status=ok node_count={} edge_count={} selected_count={}",
            self.nodes.len(),
            self.edges.len(),
            self.selection.len()
        );
    }

    /// Synced view: every node gets `selected` and `draggable = !locked`.
    pub fn snapshot(&self, session: &SessionState) -> GraphSnapshot {
        let draggable = !session.is_locked();
        GraphSnapshot {
            nodes: self
                .nodes
                .iter()
                .map(|node| SyncedNode::from_node(node, self.selection.contains(&node.id), draggable))
                .collect(),
            edges: self.edges.clone(),
        }
    }

    fn next_id_number(&self) -> usize {
        let mut candidate = self.nodes.len() + 1;
        while self.contains_node(&candidate.to_string()) {
            warn!(
                "event=node_id_collision module=graph status=retry candidate={}",
                candidate
            );
            candidate += 1;
        }
        candidate
    }
}

fn template() -> (Vec<Node>, Vec<Edge>) {
    let nodes = vec![
        Node::new("1", Position::new(250.0, 5.0), TEMPLATE_ROOT_LABEL),
        Node::new("2", Position::new(400.0, 100.0), TEMPLATE_CHILD_LABEL),
    ];
    let edges = vec![Edge::connect("1", "2")];
    (nodes, edges)
}

fn random_coordinate(rng: &mut StdRng, extent: f64) -> f64 {
    if extent > 0.0 {
        rng.gen_range(0.0..extent)
    } else {
        0.0
    }
}
