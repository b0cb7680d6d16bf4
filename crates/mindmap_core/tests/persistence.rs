mod common;

use common::{FlakyIdentity, FlakyStore, RecordingSleeper, ALWAYS};
use mindmap_core::model::document::MindMapDocument;
use mindmap_core::repo::local_cache::keys;
use mindmap_core::sync::coordinator::{PersistenceCoordinator, SyncError};
use mindmap_core::sync::identity::{IdentityGate, ANONYMOUS_NAMESPACE};
use mindmap_core::sync::retry::RetryPolicy;
use mindmap_core::{
    CanvasConfig, DocumentStore, GraphStore, LoadOutcome, LoadSource, LocalCache,
    MemoryLocalCache, PaletteManager, SaveOutcome, SessionState, SyncStatus,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

struct Harness {
    session: SessionState,
    graph: GraphStore,
    palettes: PaletteManager,
    sync: PersistenceCoordinator<FlakyStore, MemoryLocalCache>,
    waits: Rc<RefCell<Vec<Duration>>>,
    identity_calls: Rc<Cell<u32>>,
}

fn harness() -> Harness {
    harness_with_identity_failures(0)
}

fn harness_with_identity_failures(failures: u32) -> Harness {
    let sleeper = RecordingSleeper::default();
    let waits = sleeper.waits.clone();
    let identity_calls = Rc::new(Cell::new(0));
    let identity = IdentityGate::new(
        Box::new(FlakyIdentity {
            failures,
            calls: identity_calls.clone(),
        }),
        RetryPolicy::new(3, Duration::from_millis(500)),
    );
    let sync = PersistenceCoordinator::new(
        FlakyStore::default(),
        MemoryLocalCache::new(),
        identity,
        RetryPolicy::new(3, Duration::from_secs(1)),
    )
    .with_sleeper(Box::new(sleeper));

    Harness {
        session: SessionState::default(),
        graph: GraphStore::with_seed(CanvasConfig::default(), 11),
        palettes: PaletteManager::new(),
        sync,
        waits,
        identity_calls,
    }
}

impl Harness {
    fn named(mut self, name: &str) -> Self {
        self.sync.set_document_name(&self.session, name).unwrap();
        self
    }

    fn save(&mut self) -> Result<SaveOutcome, SyncError> {
        self.sync.save(&self.session, &self.graph, &self.palettes)
    }

    fn load(&mut self, id: &str) -> Result<LoadOutcome, SyncError> {
        self.sync
            .load(&self.session, id, &mut self.graph, &mut self.palettes)
    }

    fn waits(&self) -> Vec<Duration> {
        self.waits.borrow().clone()
    }
}

#[test]
fn first_save_creates_then_later_saves_update_the_bound_document() {
    let mut h = harness().named("Roadmap");

    let first = h.save().unwrap();
    assert!(first.created);
    assert!(first.cache_mirrored);
    assert_eq!(h.sync.document_id(), Some(first.document_id.as_str()));
    assert_eq!(h.sync.documents().len(), 1);

    h.graph.add_node(&h.session, None).unwrap();
    let second = h.save().unwrap();
    assert!(!second.created);
    assert_eq!(second.document_id, first.document_id);
    assert_eq!(h.sync.store().inner.len(), 1);
    assert_eq!(h.sync.documents().len(), 1);

    let cache = h.sync.cache();
    assert_eq!(
        cache.get(keys::DOCUMENT_ID).unwrap(),
        Some(first.document_id.clone())
    );
    assert_eq!(
        cache.get(keys::DOCUMENT_NAME).unwrap(),
        Some("Roadmap".to_string())
    );
    let mirrored: serde_json::Value =
        serde_json::from_str(&cache.get(keys::GRAPH).unwrap().unwrap()).unwrap();
    assert_eq!(mirrored["nodes"].as_array().unwrap().len(), 3);
    assert_eq!(h.sync.status(), SyncStatus::Idle);
}

#[test]
fn save_with_empty_name_is_rejected_before_any_io() {
    let mut h = harness();
    let before = h.graph.snapshot(&h.session);

    let err = h.save().unwrap_err();

    assert!(matches!(err, SyncError::Validation(_)));
    assert!(h.sync.store().inner.is_empty());
    assert_eq!(h.sync.store().write_calls.get(), 0);
    assert_eq!(h.identity_calls.get(), 0);
    assert_eq!(h.graph.snapshot(&h.session), before);
    assert_eq!(h.sync.document_id(), None);
}

#[test]
fn load_of_missing_document_is_not_found_without_retry_or_fallback() {
    let mut h = harness().named("Roadmap");
    h.save().unwrap();
    h.graph.add_node(&h.session, None).unwrap();
    let before = h.graph.snapshot(&h.session);
    let bound = h.sync.document_id().map(str::to_string);
    let reads_before = h.sync.store().read_calls.get();

    let err = h.load("missing-id").unwrap_err();

    assert!(matches!(err, SyncError::NotFound(ref id) if id == "missing-id"));
    assert_eq!(h.sync.store().read_calls.get(), reads_before + 1);
    assert!(h.waits().is_empty());
    assert_eq!(h.graph.snapshot(&h.session), before);
    assert_eq!(h.sync.document_id().map(str::to_string), bound);
}

#[test]
fn exhausted_update_retries_leave_cache_and_binding_untouched() {
    let mut h = harness().named("Roadmap");
    let saved = h.save().unwrap();
    let mirrored = h.sync.cache().get(keys::GRAPH).unwrap();

    h.graph.add_node(&h.session, None).unwrap();
    h.sync.store().fail_writes(ALWAYS);
    let writes_before = h.sync.store().write_calls.get();

    let err = h.save().unwrap_err();

    match err {
        SyncError::Transport {
            operation,
            attempts,
            ..
        } => {
            assert_eq!(operation, "save");
            assert_eq!(attempts, 3);
        }
        other => panic!("expected transport error, got {other:?}"),
    }
    assert_eq!(h.sync.store().write_calls.get(), writes_before + 3);
    assert_eq!(h.waits(), vec![Duration::from_secs(1), Duration::from_secs(2)]);
    assert_eq!(h.sync.cache().get(keys::GRAPH).unwrap(), mirrored);
    assert_eq!(h.sync.document_id(), Some(saved.document_id.as_str()));
    assert_eq!(h.sync.status(), SyncStatus::Idle);
}

#[test]
fn save_succeeds_when_a_retry_gets_through() {
    let mut h = harness().named("Roadmap");
    h.sync.store().fail_writes(2);

    let outcome = h.save().unwrap();

    assert!(outcome.created);
    assert_eq!(h.sync.store().write_calls.get(), 3);
    assert_eq!(h.waits(), vec![Duration::from_secs(1), Duration::from_secs(2)]);
    assert_eq!(h.sync.store().inner.len(), 1);
}

#[test]
fn failed_first_save_binds_nothing_and_writes_no_mirror() {
    let mut h = harness().named("Roadmap");
    h.sync.store().fail_writes(ALWAYS);

    assert!(h.save().is_err());
    assert_eq!(h.sync.document_id(), None);
    assert!(h.sync.documents().is_empty());
    assert_eq!(h.sync.cache().get(keys::GRAPH).unwrap(), None);
}

#[test]
fn save_then_load_reproduces_nodes_edges_and_palettes() {
    let mut h = harness().named("Roadmap");
    h.graph.add_node(&h.session, Some("2")).unwrap();
    h.graph.connect(&h.session, "2", "3").unwrap();
    h.graph.set_selection("3", false);
    h.palettes
        .add_palette(&h.session, "Mine", &["#abcdef".to_string()])
        .unwrap();
    let saved = h.save().unwrap();
    let stored = h
        .sync
        .store()
        .inner
        .get(ANONYMOUS_NAMESPACE, &saved.document_id)
        .unwrap()
        .unwrap();

    h.graph = GraphStore::with_seed(CanvasConfig::default(), 1);
    h.palettes = PaletteManager::new();
    let outcome = h.load(&saved.document_id).unwrap();

    assert_eq!(outcome.source, LoadSource::Remote);
    assert_eq!(outcome.name, "Roadmap");
    let snapshot = h.graph.snapshot(&h.session);
    assert_eq!(snapshot.nodes, stored.nodes);
    assert_eq!(snapshot.edges, stored.edges);
    assert_eq!(h.palettes.palettes(), &stored.palettes);
    assert_eq!(h.graph.selection().len(), 1);
    assert!(h.graph.selection().contains("3"));
    assert_eq!(h.graph.active(), None);
}

#[test]
fn load_merges_palettes_into_the_current_set() {
    let mut h = harness().named("Roadmap");
    let saved = h.save().unwrap();

    h.palettes = PaletteManager::new();
    h.palettes
        .add_palette(&h.session, "LocalOnly", &["#000000".to_string()])
        .unwrap();
    h.load(&saved.document_id).unwrap();

    assert!(h.palettes.palettes().contains_key("LocalOnly"));
    assert!(h.palettes.palettes().contains_key("Blues"));
    assert!(h.sync.cache().get(keys::PALETTES).unwrap().is_some());
}

#[test]
fn unreachable_store_falls_back_to_cache_mirror_after_retries() {
    let mut h = harness().named("Roadmap");
    h.graph.add_node(&h.session, Some("1")).unwrap();
    let saved = h.save().unwrap();
    let saved_nodes = h.graph.nodes().to_vec();

    h.graph = GraphStore::with_seed(CanvasConfig::default(), 3);
    h.sync.store().fail_reads(ALWAYS);
    let outcome = h.load(&saved.document_id).unwrap();

    assert_eq!(outcome.source, LoadSource::CacheFallback);
    assert_eq!(outcome.document_id, Some(saved.document_id.clone()));
    assert_eq!(outcome.name, "Roadmap");
    assert_eq!(h.graph.nodes(), saved_nodes.as_slice());
    assert_eq!(h.waits(), vec![Duration::from_secs(1), Duration::from_secs(2)]);
}

#[test]
fn unreachable_store_without_mirror_is_total_failure() {
    let mut h = harness();
    h.graph.add_node(&h.session, None).unwrap();
    let before = h.graph.snapshot(&h.session);
    h.sync.store().fail_reads(ALWAYS);

    let err = h.load("any").unwrap_err();

    assert!(matches!(err, SyncError::Unavailable { .. }));
    assert_eq!(h.graph.snapshot(&h.session), before);
    assert_eq!(h.sync.document_id(), None);
}

#[test]
fn corrupt_cache_mirror_is_not_applied() {
    let mut h = harness();
    h.sync.cache().set(keys::GRAPH, "{broken").unwrap();
    h.sync.store().fail_reads(ALWAYS);
    let before = h.graph.snapshot(&h.session);

    let err = h.load("any").unwrap_err();

    assert!(matches!(err, SyncError::Unavailable { ref cache_reason, .. } if cache_reason.contains("corrupt")));
    assert_eq!(h.graph.snapshot(&h.session), before);
}

#[test]
fn identity_is_retried_by_its_own_policy_and_cached_after_success() {
    let mut h = harness_with_identity_failures(2).named("Roadmap");

    h.save().unwrap();
    assert_eq!(h.identity_calls.get(), 3);
    assert_eq!(
        h.waits(),
        vec![Duration::from_millis(500), Duration::from_millis(1000)]
    );

    h.save().unwrap();
    assert_eq!(h.identity_calls.get(), 3);
}

#[test]
fn exhausted_identity_is_reported_and_rechecked_on_next_call() {
    let mut h = harness_with_identity_failures(3).named("Roadmap");

    let err = h.save().unwrap_err();
    assert!(matches!(err, SyncError::IdentityUnavailable(_)));
    assert_eq!(h.sync.store().write_calls.get(), 0);
    assert_eq!(h.sync.status(), SyncStatus::Idle);

    h.save().unwrap();
    assert_eq!(h.identity_calls.get(), 4);
}

#[test]
fn list_documents_is_scoped_and_leaves_graph_alone() {
    let mut h = harness().named("First");
    h.save().unwrap();
    h.sync
        .store()
        .inner
        .create("someone-else", &MindMapDocument::default())
        .unwrap();
    let before = h.graph.snapshot(&h.session);

    let listed = h.sync.list_documents().unwrap().to_vec();

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "First");
    assert_eq!(h.graph.snapshot(&h.session), before);
}

#[test]
fn list_documents_gives_up_after_retry_budget() {
    let mut h = harness();
    h.sync.store().fail_reads(ALWAYS);

    let err = h.sync.list_documents().unwrap_err();

    assert!(matches!(err, SyncError::Transport { attempts: 3, .. }));
    assert_eq!(h.sync.status(), SyncStatus::Idle);
}

#[test]
fn locked_session_blocks_save_and_load() {
    let mut h = harness().named("Roadmap");
    h.session.set_locked(true);

    assert!(matches!(h.save(), Err(SyncError::Locked(_))));
    assert!(matches!(h.load("x"), Err(SyncError::Locked(_))));
    assert_eq!(h.sync.store().write_calls.get(), 0);
    assert_eq!(h.sync.store().read_calls.get(), 0);
}
