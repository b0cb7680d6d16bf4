//! Mind-map state controller.
//!
//! # Responsibility
//! - Expose one entry point per user action.
//! - Keep graph, selection, palettes, document binding and cache consistent
//!   across load/save/import/export.
//!
//! # Invariants
//! - Every failed action leaves state as it was before the call.
//! - Load and import replace the graph wholesale and merge palettes.
//! - Export is read-only and never gated by the lock.

use crate::config::CoreConfig;
use crate::export::{
    export_snapshot, import_snapshot, ExportArtifact, ExportError, ExportFormat, ImportError,
    MapSnapshot, RenderCollaborator,
};
use crate::graph::store::{GraphError, GraphSnapshot, GraphStore, NodeChange};
use crate::model::document::DocumentSummary;
use crate::model::node::{EdgeId, NodeId};
use crate::palette::manager::{PaletteError, PaletteManager};
use crate::repo::document_store::DocumentStore;
use crate::repo::local_cache::{keys, LocalCache};
use crate::session::{LockedError, Operation, SessionState, Theme};
use crate::sync::coordinator::{
    LoadOutcome, PersistenceCoordinator, SaveOutcome, SyncError, SyncStatus,
};
use crate::sync::identity::{IdentityGate, IdentityProvider};
use crate::sync::retry::RetryPolicy;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ControllerResult<T> = Result<T, ControllerError>;

/// User-facing error taxonomy. Every variant is reported as a notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerError {
    /// Edit lock engaged; never retried.
    Locked(LockedError),
    /// Missing or invalid input; no state change.
    Validation(String),
    /// Store unreachable after the retry budget.
    Transport(String),
    /// Remote lookup found no document; no retry, no fallback.
    NotFound(String),
    /// Stored document could not be decoded; no retry, no fallback.
    Corrupt(String),
    /// Malformed import payload; state untouched.
    Import(String),
    /// Identity resolution exhausted its own retries.
    IdentityUnavailable(String),
    /// A persistence operation is already in flight.
    Busy(SyncStatus),
    /// Rendering collaborator failure or missing renderer.
    Export(String),
}

impl ControllerError {
    /// Whether the same action may succeed if triggered again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::IdentityUnavailable(_))
    }
}

impl Display for ControllerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Locked(err) => write!(f, "{err}"),
            Self::Validation(message)
            | Self::Transport(message)
            | Self::Import(message)
            | Self::IdentityUnavailable(message)
            | Self::Corrupt(message)
            | Self::Export(message) => write!(f, "{message}"),
            Self::NotFound(id) => write!(f, "map not found: {id}"),
            Self::Busy(status) => {
                write!(f, "another operation is in progress ({})", status.as_str())
            }
        }
    }
}

impl Error for ControllerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Locked(err) => Some(err),
            _ => None,
        }
    }
}

impl From<LockedError> for ControllerError {
    fn from(value: LockedError) -> Self {
        Self::Locked(value)
    }
}

impl From<GraphError> for ControllerError {
    fn from(value: GraphError) -> Self {
        match value {
            GraphError::Locked(err) => Self::Locked(err),
            other => Self::Validation(other.to_string()),
        }
    }
}

impl From<PaletteError> for ControllerError {
    fn from(value: PaletteError) -> Self {
        match value {
            PaletteError::Locked(err) => Self::Locked(err),
            other => Self::Validation(other.to_string()),
        }
    }
}

impl From<SyncError> for ControllerError {
    fn from(value: SyncError) -> Self {
        match value {
            SyncError::Locked(err) => Self::Locked(err),
            SyncError::Validation(message) => Self::Validation(message),
            SyncError::Busy(status) => Self::Busy(status),
            SyncError::IdentityUnavailable(err) => Self::IdentityUnavailable(err.to_string()),
            SyncError::NotFound(id) => Self::NotFound(id),
            other @ SyncError::InvalidDocument { .. } => Self::Corrupt(other.to_string()),
            other @ (SyncError::Transport { .. } | SyncError::Unavailable { .. }) => {
                Self::Transport(other.to_string())
            }
        }
    }
}

impl From<ExportError> for ControllerError {
    fn from(value: ExportError) -> Self {
        Self::Export(value.to_string())
    }
}

impl From<ImportError> for ControllerError {
    fn from(value: ImportError) -> Self {
        Self::Import(value.to_string())
    }
}

/// Single logical component owning all mind-map state for one session.
pub struct MindMapController<S: DocumentStore, C: LocalCache> {
    config: CoreConfig,
    session: SessionState,
    graph: GraphStore,
    palettes: PaletteManager,
    persistence: PersistenceCoordinator<S, C>,
}

impl<S: DocumentStore, C: LocalCache> MindMapController<S, C> {
    /// Builds a controller, restoring theme and palettes from `cache`.
    pub fn new(
        config: CoreConfig,
        store: S,
        cache: C,
        identity: Box<dyn IdentityProvider>,
    ) -> Self {
        let persistence = PersistenceCoordinator::new(
            store,
            cache,
            IdentityGate::new(identity, RetryPolicy::from_config(&config.identity_retry)),
            RetryPolicy::from_config(&config.retry),
        );
        let graph = GraphStore::new(config.canvas);
        Self::from_parts(config, graph, persistence)
    }

    /// Builds a controller from preassembled parts.
    pub fn from_parts(
        config: CoreConfig,
        graph: GraphStore,
        persistence: PersistenceCoordinator<S, C>,
    ) -> Self {
        let cache = persistence.cache();
        let theme = match cache.get(keys::THEME) {
            Ok(value) => value.as_deref().and_then(Theme::parse).unwrap_or_default(),
            Err(err) => {
                warn!("event=session_restore module=controller status=error key=theme error={err}");
                Theme::default()
            }
        };
        let palettes = match cache.get(keys::PALETTES) {
            Ok(Some(blob)) => PaletteManager::from_blob(&blob),
            Ok(None) => PaletteManager::new(),
            Err(err) => {
                warn!("event=session_restore module=controller status=error key=palettes error={err}");
                PaletteManager::new()
            }
        };
        info!(
            "event=controller_init module=controller status=ok theme={} palette_count={}",
            theme.as_str(),
            palettes.palettes().len()
        );

        Self {
            config,
            session: SessionState::new(theme),
            graph,
            palettes,
            persistence,
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn graph(&self) -> &GraphStore {
        &self.graph
    }

    pub fn palettes(&self) -> &PaletteManager {
        &self.palettes
    }

    pub fn persistence(&self) -> &PersistenceCoordinator<S, C> {
        &self.persistence
    }

    pub fn document_name(&self) -> &str {
        self.persistence.document_name()
    }

    pub fn document_id(&self) -> Option<&str> {
        self.persistence.document_id()
    }

    pub fn documents(&self) -> &[DocumentSummary] {
        self.persistence.documents()
    }

    /// Synced view of the graph for the renderer.
    pub fn snapshot(&self) -> GraphSnapshot {
        self.graph.snapshot(&self.session)
    }

    /// Engages or releases the edit lock. Always allowed.
    pub fn set_locked(&mut self, locked: bool) {
        self.session.set_locked(locked);
        info!("event=lock_toggle module=controller status=ok locked={locked}");
    }

    pub fn toggle_theme(&mut self) -> ControllerResult<Theme> {
        let theme = self.session.toggle_theme()?;
        self.write_cache(keys::THEME, theme.as_str());
        Ok(theme)
    }

    /// Adds a node under the current selection anchor, or at random.
    pub fn add_node(&mut self) -> ControllerResult<NodeId> {
        let anchor = self.graph.selection_anchor().map(str::to_string);
        self.add_node_at(anchor.as_deref())
    }

    pub fn add_node_at(&mut self, anchor: Option<&str>) -> ControllerResult<NodeId> {
        Ok(self.graph.add_node(&self.session, anchor)?)
    }

    pub fn connect(&mut self, source: &str, target: &str) -> ControllerResult<Option<EdgeId>> {
        Ok(self.graph.connect(&self.session, source, target)?)
    }

    pub fn relabel(&mut self, id: &str, label: &str) -> ControllerResult<bool> {
        Ok(self.graph.relabel(&self.session, id, label)?)
    }

    pub fn recolor(&mut self, color: &str) -> ControllerResult<Option<NodeId>> {
        Ok(self.graph.recolor(&self.session, color)?)
    }

    pub fn select(&mut self, id: &str, additive: bool) -> bool {
        self.graph.set_selection(id, additive)
    }

    pub fn clear_selection(&mut self) {
        self.graph.clear_selection();
    }

    pub fn delete_edge(&mut self, edge_id: &str, confirmed: bool) -> ControllerResult<bool> {
        Ok(self.graph.delete_edge(&self.session, edge_id, confirmed)?)
    }

    pub fn apply_position_deltas(&mut self, changes: &[NodeChange]) -> ControllerResult<usize> {
        Ok(self.graph.apply_position_deltas(&self.session, changes)?)
    }

    /// Adds a palette, makes it active and persists the palette set.
    pub fn add_palette(&mut self, name: &str, colors: &[String]) -> ControllerResult<()> {
        self.palettes.add_palette(&self.session, name, colors)?;
        self.persist_palettes();
        Ok(())
    }

    pub fn set_active_palette(&mut self, name: &str) -> ControllerResult<()> {
        Ok(self.palettes.set_active_palette(&self.session, name)?)
    }

    pub fn set_document_name(&mut self, name: &str) -> ControllerResult<()> {
        Ok(self.persistence.set_document_name(&self.session, name)?)
    }

    /// Clear: starter template, selection dropped; binding kept.
    pub fn clear_map(&mut self) -> ControllerResult<()> {
        Ok(self.graph.reset(&self.session)?)
    }

    /// New map: starter template, unbound document, default palettes.
    pub fn new_map(&mut self) -> ControllerResult<()> {
        self.session.ensure_unlocked(Operation::NewMap)?;
        self.persistence.unbind_document()?;
        self.graph.restore_template();
        self.palettes.reset_to_defaults();
        self.persist_palettes();
        info!("event=map_new module=controller status=ok");
        Ok(())
    }

    pub fn save(&mut self) -> ControllerResult<SaveOutcome> {
        Ok(self
            .persistence
            .save(&self.session, &self.graph, &self.palettes)?)
    }

    pub fn load(&mut self, document_id: &str) -> ControllerResult<LoadOutcome> {
        Ok(self.persistence.load(
            &self.session,
            document_id,
            &mut self.graph,
            &mut self.palettes,
        )?)
    }

    pub fn list_documents(&mut self) -> ControllerResult<Vec<DocumentSummary>> {
        Ok(self.persistence.list_documents()?.to_vec())
    }

    /// Structured export payload of the current state.
    pub fn map_snapshot(&self) -> MapSnapshot {
        let snapshot = self.snapshot();
        MapSnapshot {
            nodes: snapshot.nodes,
            edges: snapshot.edges,
            palettes: self.palettes.palettes().clone(),
            name: self.document_name().to_string(),
        }
    }

    pub fn export(
        &self,
        format: ExportFormat,
        renderer: Option<&mut dyn RenderCollaborator>,
    ) -> ControllerResult<ExportArtifact> {
        Ok(export_snapshot(
            format,
            &self.map_snapshot(),
            &self.config.export,
            renderer,
        )?)
    }

    /// Imports an exported map file, replacing the graph wholesale.
    pub fn import(&mut self, bytes: &[u8]) -> ControllerResult<()> {
        self.session.ensure_unlocked(Operation::Import)?;
        let snapshot = import_snapshot(bytes)?;
        self.persistence
            .set_document_name(&self.session, &snapshot.name)?;
        self.graph
            .replace_from_synced(&snapshot.nodes, &snapshot.edges);
        self.palettes.merge(&snapshot.palettes);
        self.persist_palettes();
        Ok(())
    }

    fn persist_palettes(&self) {
        match self.palettes.to_blob() {
            Ok(blob) => self.write_cache(keys::PALETTES, &blob),
            Err(err) => warn!(
                "event=cache_write module=cache status=error key={} error={}",
                keys::PALETTES,
                err
            ),
        }
    }

    fn write_cache(&self, key: &str, value: &str) {
        if let Err(err) = self.persistence.cache().set(key, value) {
            warn!(
                "event=cache_write module=cache status=error key={} error={}",
                key, err
            );
        }
    }
}
