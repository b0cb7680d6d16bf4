//! Persistence coordinator.
//!
//! # Responsibility
//! - Save the synced graph to the remote store (create once, then update).
//! - Load a document by id, falling back to the local cache mirror when the
//!   store is unreachable.
//! - List identity-scoped document summaries.
//!
//! # Invariants
//! - `Idle -> Saving|Loading|Listing -> Idle`; re-entrant triggers fail
//!   with `SyncError::Busy`.
//! - The cache mirror is written only after the store confirmed success.
//! - Not-found and undecodable bodies are surfaced immediately: no retry,
//!   no fallback.
//! - Failed operations leave graph, palettes, bound id and cache untouched.

use crate::graph::store::GraphStore;
use crate::model::document::{
    now_epoch_ms, CachedGraph, DocumentId, DocumentSummary, MindMapDocument,
};
use crate::palette::manager::PaletteManager;
use crate::repo::document_store::{DocumentStore, StoreError};
use crate::repo::local_cache::{keys, CacheError, CacheResult, LocalCache};
use crate::session::{LockedError, Operation, SessionState};
use crate::sync::identity::{IdentityError, IdentityGate, IdentityToken};
use crate::sync::retry::{RetryError, RetryPolicy, Sleeper, ThreadSleeper};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type SyncResult<T> = Result<T, SyncError>;

/// Busy state of the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncStatus {
    #[default]
    Idle,
    Saving,
    Loading,
    Listing,
}

impl SyncStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Saving => "saving",
            Self::Loading => "loading",
            Self::Listing => "listing",
        }
    }
}

/// Persistence error.
#[derive(Debug)]
pub enum SyncError {
    Locked(LockedError),
    Validation(String),
    Busy(SyncStatus),
    IdentityUnavailable(IdentityError),
    /// Store failure after the retry budget (or a non-retryable failure).
    Transport {
        operation: &'static str,
        attempts: u32,
        source: StoreError,
    },
    NotFound(DocumentId),
    /// Store answered with a body that cannot be decoded; never retried.
    InvalidDocument {
        operation: &'static str,
        source: StoreError,
    },
    /// Store unreachable and no usable cache mirror.
    Unavailable {
        source: StoreError,
        cache_reason: String,
    },
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Locked(err) => write!(f, "{err}"),
            Self::Validation(message) => write!(f, "{message}"),
            Self::Busy(status) => write!(f, "another operation is in progress ({})", status.as_str()),
            Self::IdentityUnavailable(err) => write!(f, "{err}"),
            Self::Transport {
                operation,
                attempts,
                source,
            } => write!(f, "{operation} failed after {attempts} attempt(s): {source}"),
            Self::NotFound(id) => write!(f, "map not found: {id}"),
            Self::InvalidDocument { operation, source } => {
                write!(f, "{operation} failed: {source}")
            }
            Self::Unavailable {
                source,
                cache_reason,
            } => write!(f, "{source}; no local copy to fall back to ({cache_reason})"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Locked(err) => Some(err),
            Self::IdentityUnavailable(err) => Some(err),
            Self::Transport { source, .. }
            | Self::InvalidDocument { source, .. }
            | Self::Unavailable { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<LockedError> for SyncError {
    fn from(value: LockedError) -> Self {
        Self::Locked(value)
    }
}

impl From<IdentityError> for SyncError {
    fn from(value: IdentityError) -> Self {
        Self::IdentityUnavailable(value)
    }
}

/// Result of a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub document_id: DocumentId,
    /// `true` when the store created a new document.
    pub created: bool,
    /// `false` when the local mirror write failed after remote success.
    pub cache_mirrored: bool,
}

/// Where loaded state came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Remote,
    CacheFallback,
}

/// Result of a successful load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    pub source: LoadSource,
    pub document_id: Option<DocumentId>,
    pub name: String,
}

/// Mediates between the graph store, the remote store and the local cache.
pub struct PersistenceCoordinator<S: DocumentStore, C: LocalCache> {
    store: S,
    cache: C,
    identity: IdentityGate,
    policy: RetryPolicy,
    sleeper: Box<dyn Sleeper>,
    status: SyncStatus,
    document_id: Option<DocumentId>,
    document_name: String,
    documents: Vec<DocumentSummary>,
}

impl<S: DocumentStore, C: LocalCache> PersistenceCoordinator<S, C> {
    pub fn new(store: S, cache: C, identity: IdentityGate, policy: RetryPolicy) -> Self {
        Self {
            store,
            cache,
            identity,
            policy,
            sleeper: Box::new(ThreadSleeper),
            status: SyncStatus::Idle,
            document_id: None,
            document_name: String::new(),
            documents: Vec::new(),
        }
    }

    /// Replaces the backoff sleeper.
    pub fn with_sleeper(mut self, sleeper: Box<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn status(&self) -> SyncStatus {
        self.status
    }

    /// Document id bound by the first successful save or a load.
    pub fn document_id(&self) -> Option<&str> {
        self.document_id.as_deref()
    }

    pub fn document_name(&self) -> &str {
        &self.document_name
    }

    /// Summaries from the last `list_documents` call.
    pub fn documents(&self) -> &[DocumentSummary] {
        &self.documents
    }

    pub fn set_document_name(&mut self, session: &SessionState, name: &str) -> SyncResult<()> {
        session.ensure_unlocked(Operation::RenameDocument)?;
        self.document_name = name.to_string();
        Ok(())
    }

    /// Saves the synced snapshot, creating the remote document on first save.
    ///
    /// # Errors
    /// - `Locked` / `Validation` (empty name) before any I/O.
    /// - `Busy` when another operation is in flight.
    /// - `IdentityUnavailable` when identity resolution is exhausted.
    /// - `Transport` once the retry budget is spent; nothing is committed.
    pub fn save(
        &mut self,
        session: &SessionState,
        graph: &GraphStore,
        palettes: &PaletteManager,
    ) -> SyncResult<SaveOutcome> {
        session.ensure_unlocked(Operation::Save)?;
        if self.document_name.trim().is_empty() {
            return Err(SyncError::Validation(
                "please enter a name for the map".to_string(),
            ));
        }
        self.begin(SyncStatus::Saving)?;
        let result = self.save_inner(session, graph, palettes);
        self.status = SyncStatus::Idle;
        result
    }

    fn save_inner(
        &mut self,
        session: &SessionState,
        graph: &GraphStore,
        palettes: &PaletteManager,
    ) -> SyncResult<SaveOutcome> {
        let started_at = Instant::now();
        let namespace = self.resolve_identity()?;
        let snapshot = graph.snapshot(session);
        let now = now_epoch_ms();
        let document = MindMapDocument {
            name: self.document_name.clone(),
            nodes: snapshot.nodes,
            edges: snapshot.edges,
            palettes: palettes.palettes().clone(),
            created_at: self.document_id.is_none().then_some(now),
            updated_at: now,
        };

        let bound = self.document_id.clone();
        let store = &self.store;
        let attempt = self.policy.run(
            self.sleeper.as_ref(),
            "save",
            |_| match &bound {
                Some(id) => store.update(&namespace, id, &document).map(|()| id.clone()),
                None => store.create(&namespace, &document),
            },
            StoreError::is_transient,
        );

        let document_id = match attempt {
            Ok(id) => id,
            Err(err) => {
                error!(
                    "event=map_save module=sync status=error attempts={} duration_ms={} error={}",
                    err.attempts(),
                    started_at.elapsed().as_millis(),
                    err.error()
                );
                return Err(transport_error("save", err));
            }
        };

        let created = bound.is_none();
        if created {
            self.documents.push(DocumentSummary {
                id: document_id.clone(),
                name: document.name.clone(),
                created_at: now,
                updated_at: now,
            });
        }
        self.document_id = Some(document_id.clone());

        let cache_mirrored = match self.mirror_saved(&document, &document_id) {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    "event=cache_mirror module=cache status=error error={}",
                    err
                );
                false
            }
        };

        info!(
            "event=map_save module=sync status=ok created={} node_count={} edge_count={} duration_ms={}",
            created,
            document.nodes.len(),
            document.edges.len(),
            started_at.elapsed().as_millis()
        );
        Ok(SaveOutcome {
            document_id,
            created,
            cache_mirrored,
        })
    }

    /// Loads a document and wholesale-replaces graph state.
    ///
    /// # Contract
    /// - Remote hit: graph replaced, palettes merged, id/name bound.
    /// - Remote miss: `NotFound`, nothing changes.
    /// - Store failure after retries: restore from the cache mirror, or
    ///   `Unavailable` when no usable mirror exists.
    pub fn load(
        &mut self,
        session: &SessionState,
        document_id: &str,
        graph: &mut GraphStore,
        palettes: &mut PaletteManager,
    ) -> SyncResult<LoadOutcome> {
        session.ensure_unlocked(Operation::Load)?;
        self.begin(SyncStatus::Loading)?;
        let result = self.load_inner(document_id, graph, palettes);
        self.status = SyncStatus::Idle;
        result
    }

    fn load_inner(
        &mut self,
        document_id: &str,
        graph: &mut GraphStore,
        palettes: &mut PaletteManager,
    ) -> SyncResult<LoadOutcome> {
        let namespace = self.resolve_identity()?;
        let store = &self.store;
        let fetched = self.policy.run(
            self.sleeper.as_ref(),
            "load",
            |_| store.get(&namespace, document_id),
            StoreError::is_transient,
        );

        match fetched {
            Ok(Some(document)) => {
                graph.replace_from_synced(&document.nodes, &document.edges);
                palettes.merge(&document.palettes);
                self.document_id = Some(document_id.to_string());
                self.document_name = document.name.clone();
                if let Err(err) = self.mirror_loaded(palettes) {
                    warn!(
                        "event=cache_mirror module=cache status=error error={}",
                        err
                    );
                }
                info!(
                    "event=map_load module=sync status=ok source=remote node_count={} edge_count={}",
                    document.nodes.len(),
                    document.edges.len()
                );
                Ok(LoadOutcome {
                    source: LoadSource::Remote,
                    document_id: self.document_id.clone(),
                    name: self.document_name.clone(),
                })
            }
            Ok(None) => {
                info!("event=map_load module=sync status=error error_code=not_found");
                Err(SyncError::NotFound(document_id.to_string()))
            }
            Err(err) if err.error().is_transient() => {
                self.load_from_cache(err.into_inner(), graph)
            }
            Err(err) => {
                error!(
                    "event=map_load module=sync status=error error_code=remote_rejected error={}",
                    err.error()
                );
                Err(transport_error("load", err))
            }
        }
    }

    fn load_from_cache(
        &mut self,
        remote_error: StoreError,
        graph: &mut GraphStore,
    ) -> SyncResult<LoadOutcome> {
        let cached = match self.read_cache_mirror() {
            Ok(Some(cached)) => cached,
            Ok(None) => {
                error!("event=map_load module=sync status=error error_code=no_cache_mirror");
                return Err(SyncError::Unavailable {
                    source: remote_error,
                    cache_reason: "no saved map in local cache".to_string(),
                });
            }
            Err(reason) => {
                error!(
                    "event=map_load module=sync status=error error_code=cache_unreadable error={}",
                    reason
                );
                return Err(SyncError::Unavailable {
                    source: remote_error,
                    cache_reason: reason,
                });
            }
        };

        let (graph_blob, document_id, name) = cached;
        graph.replace_from_synced(&graph_blob.nodes, &graph_blob.edges);
        self.document_id = document_id;
        self.document_name = name;
        warn!(
            "event=map_load module=sync status=fallback source=cache node_count={} remote_error={}",
            graph_blob.nodes.len(),
            remote_error
        );
        Ok(LoadOutcome {
            source: LoadSource::CacheFallback,
            document_id: self.document_id.clone(),
            name: self.document_name.clone(),
        })
    }

    /// Reads and parses the full mirror before anything is applied.
    fn read_cache_mirror(
        &self,
    ) -> Result<Option<(CachedGraph, Option<DocumentId>, String)>, String> {
        let Some(blob) = self.cache.get(keys::GRAPH).map_err(|err| err.to_string())? else {
            return Ok(None);
        };
        let graph: CachedGraph =
            serde_json::from_str(&blob).map_err(|err| format!("corrupt cached map: {err}"))?;
        let document_id = self
            .cache
            .get(keys::DOCUMENT_ID)
            .map_err(|err| err.to_string())?
            .filter(|id| !id.is_empty());
        let name = self
            .cache
            .get(keys::DOCUMENT_NAME)
            .map_err(|err| err.to_string())?
            .unwrap_or_default();
        Ok(Some((graph, document_id, name)))
    }

    /// Fetches the identity-scoped document list. Never touches the graph.
    pub fn list_documents(&mut self) -> SyncResult<&[DocumentSummary]> {
        self.begin(SyncStatus::Listing)?;
        let result = self.list_inner();
        self.status = SyncStatus::Idle;
        self.documents = result?;
        Ok(&self.documents)
    }

    fn list_inner(&mut self) -> SyncResult<Vec<DocumentSummary>> {
        let namespace = self.resolve_identity()?;
        let store = &self.store;
        let listed = self
            .policy
            .run(
                self.sleeper.as_ref(),
                "list",
                |_| store.list(&namespace),
                StoreError::is_transient,
            )
            .map_err(|err| transport_error("list", err))?;
        info!(
            "event=map_list module=sync status=ok count={}",
            listed.len()
        );
        Ok(listed)
    }

    /// Drops the document binding and its cache mirror (new map).
    ///
    /// Callers gate on the lock before calling.
    pub(crate) fn unbind_document(&mut self) -> SyncResult<()> {
        if self.status != SyncStatus::Idle {
            return Err(SyncError::Busy(self.status));
        }
        self.document_id = None;
        self.document_name.clear();
        for key in [keys::GRAPH, keys::DOCUMENT_ID, keys::DOCUMENT_NAME] {
            if let Err(err) = self.cache.remove(key) {
                warn!(
                    "event=cache_remove module=cache status=error key={} error={}",
                    key, err
                );
            }
        }
        Ok(())
    }

    fn begin(&mut self, next: SyncStatus) -> SyncResult<()> {
        if self.status != SyncStatus::Idle {
            warn!(
                "event=sync_busy module=sync status=rejected current={} requested={}",
                self.status.as_str(),
                next.as_str()
            );
            return Err(SyncError::Busy(self.status));
        }
        self.status = next;
        Ok(())
    }

    fn resolve_identity(&mut self) -> SyncResult<IdentityToken> {
        Ok(self.identity.token(self.sleeper.as_ref())?)
    }

    fn mirror_saved(&self, document: &MindMapDocument, document_id: &str) -> CacheResult<()> {
        let blob = serde_json::to_string(&CachedGraph {
            nodes: document.nodes.clone(),
            edges: document.edges.clone(),
        })
        .map_err(|err| CacheError::Unavailable(err.to_string()))?;
        self.cache.set(keys::GRAPH, &blob)?;
        self.cache.set(keys::DOCUMENT_ID, document_id)?;
        self.cache.set(keys::DOCUMENT_NAME, &document.name)?;
        Ok(())
    }

    fn mirror_loaded(&self, palettes: &PaletteManager) -> CacheResult<()> {
        let blob = palettes
            .to_blob()
            .map_err(|err| CacheError::Unavailable(err.to_string()))?;
        self.cache.set(keys::PALETTES, &blob)?;
        if let Some(id) = &self.document_id {
            self.cache.set(keys::DOCUMENT_ID, id)?;
        }
        self.cache.set(keys::DOCUMENT_NAME, &self.document_name)?;
        Ok(())
    }
}

fn transport_error(operation: &'static str, err: RetryError<StoreError>) -> SyncError {
    let attempts = err.attempts();
    match err.into_inner() {
        StoreError::NotFound(id) => SyncError::NotFound(id),
        source @ StoreError::InvalidData(_) => SyncError::InvalidDocument { operation, source },
        source => SyncError::Transport {
            operation,
            attempts,
            source,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{PersistenceCoordinator, SyncError, SyncStatus};
    use crate::config::CanvasConfig;
    use crate::graph::store::GraphStore;
    use crate::palette::manager::PaletteManager;
    use crate::repo::document_store::InMemoryDocumentStore;
    use crate::repo::local_cache::MemoryLocalCache;
    use crate::session::SessionState;
    use crate::sync::identity::{AnonymousIdentity, IdentityGate};
    use crate::sync::retry::RetryPolicy;
    use std::time::Duration;

    fn coordinator() -> PersistenceCoordinator<InMemoryDocumentStore, MemoryLocalCache> {
        PersistenceCoordinator::new(
            InMemoryDocumentStore::new(),
            MemoryLocalCache::new(),
            IdentityGate::new(
                Box::new(AnonymousIdentity::default()),
                RetryPolicy::new(1, Duration::ZERO),
            ),
            RetryPolicy::new(3, Duration::ZERO),
        )
    }

    #[test]
    fn busy_coordinator_rejects_reentrant_triggers() {
        let session = SessionState::default();
        let mut graph = GraphStore::with_seed(CanvasConfig::default(), 1);
        let mut palettes = PaletteManager::new();
        let mut coordinator = coordinator();
        coordinator
            .set_document_name(&session, "busy")
            .expect("name");

        coordinator.status = SyncStatus::Saving;
        let err = coordinator
            .load(&session, "any", &mut graph, &mut palettes)
            .expect_err("load during save must be rejected");
        assert!(matches!(err, SyncError::Busy(SyncStatus::Saving)));

        let err = coordinator
            .save(&session, &graph, &palettes)
            .expect_err("second save must be rejected");
        assert!(matches!(err, SyncError::Busy(SyncStatus::Saving)));
        assert!(coordinator.store().is_empty());

        coordinator.status = SyncStatus::Idle;
        coordinator
            .save(&session, &graph, &palettes)
            .expect("idle save succeeds");
        assert_eq!(coordinator.status(), SyncStatus::Idle);
    }

    #[test]
    fn status_returns_to_idle_after_failure() {
        let session = SessionState::default();
        let mut graph = GraphStore::with_seed(CanvasConfig::default(), 1);
        let mut palettes = PaletteManager::new();
        let mut coordinator = coordinator();
        let err = coordinator
            .load(&session, "missing", &mut graph, &mut palettes)
            .expect_err("missing document");
        assert!(matches!(err, SyncError::NotFound(_)));
        assert_eq!(coordinator.status(), SyncStatus::Idle);
    }
}
