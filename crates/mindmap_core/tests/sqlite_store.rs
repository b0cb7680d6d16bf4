use mindmap_core::db::migrations::latest_version;
use mindmap_core::db::{open_db, open_db_in_memory, DbError};
use mindmap_core::model::document::MindMapDocument;
use mindmap_core::model::node::{Edge, Node, Position, SyncedNode};
use mindmap_core::repo::local_cache::keys;
use mindmap_core::sync::identity::{AnonymousIdentity, ANONYMOUS_NAMESPACE};
use mindmap_core::{
    ControllerError, CoreConfig, DocumentStore, LoadSource, LocalCache, MindMapController, SqliteDocumentStore,
    SqliteLocalCache, StoreError, Theme,
};
use rusqlite::params;
use std::collections::BTreeMap;

fn document(name: &str, updated_at: i64) -> MindMapDocument {
    let nodes = vec![
        SyncedNode::from_node(&Node::new("1", Position::new(1.0, 2.0), "Root"), true, true),
        SyncedNode::from_node(&Node::new("2", Position::new(3.0, 4.0), "Leaf"), false, true),
    ];
    let mut palettes = BTreeMap::new();
    palettes.insert("Mine".to_string(), vec!["#123456".to_string()]);
    MindMapDocument {
        name: name.to_string(),
        nodes,
        edges: vec![Edge::connect("1", "2")],
        palettes,
        created_at: Some(100),
        updated_at,
    }
}

#[test]
fn open_db_applies_migrations_and_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("maps.sqlite3");

    let conn = open_db(&path).unwrap();
    let version: u32 = conn
        .query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(version, latest_version());
    drop(conn);

    let reopened = open_db(&path).unwrap();
    let tables: i64 = reopened
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('documents', 'local_cache');",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(tables, 2);
}

#[test]
fn newer_schema_version_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");
    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch("PRAGMA user_version = 99;").unwrap();
    }

    let err = open_db(&path).unwrap_err();
    assert!(matches!(
        err,
        DbError::UnsupportedSchemaVersion { db_version: 99, .. }
    ));
}

#[test]
fn document_store_create_get_update_round_trip() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::new(&conn);

    let id = store.create("ns", &document("First", 200)).unwrap();
    let loaded = store.get("ns", &id).unwrap().unwrap();
    assert_eq!(loaded, document("First", 200));

    let mut changed = document("Renamed", 300);
    changed.created_at = None;
    store.update("ns", &id, &changed).unwrap();
    let reloaded = store.get("ns", &id).unwrap().unwrap();
    assert_eq!(reloaded.name, "Renamed");
    assert_eq!(reloaded.created_at, Some(100));
    assert_eq!(reloaded.updated_at, 300);
}

#[test]
fn document_store_is_namespace_scoped() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::new(&conn);
    let mine = store.create("alice", &document("A", 200)).unwrap();
    store.create("alice", &document("B", 500)).unwrap();
    store.create("bob", &document("C", 900)).unwrap();

    let listed = store.list("alice").unwrap();
    let names: Vec<&str> = listed.iter().map(|doc| doc.name.as_str()).collect();
    assert_eq!(names, vec!["B", "A"]);

    assert_eq!(store.get("bob", &mine).unwrap(), None);
    assert!(matches!(
        store.update("bob", &mine, &document("X", 1)),
        Err(StoreError::NotFound(_))
    ));
}

#[test]
fn unreadable_body_is_invalid_data_and_not_retried() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::new(&conn);
    let id = store.create("ns", &document("First", 200)).unwrap();
    conn.execute(
        "UPDATE documents SET body = '{oops' WHERE id = ?1;",
        params![id],
    )
    .unwrap();

    let err = store.get("ns", &id).unwrap_err();
    assert!(matches!(err, StoreError::InvalidData(_)));
    assert!(!err.is_transient());
}

#[test]
fn local_cache_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.sqlite3");
    {
        let conn = open_db(&path).unwrap();
        let cache = SqliteLocalCache::new(&conn);
        cache.set(keys::THEME, "light").unwrap();
        cache.set(keys::THEME, "dark").unwrap();
        cache.set(keys::DOCUMENT_NAME, "Plan").unwrap();
        cache.remove(keys::DOCUMENT_NAME).unwrap();
    }

    let conn = open_db(&path).unwrap();
    let cache = SqliteLocalCache::new(&conn);
    assert_eq!(cache.get(keys::THEME).unwrap().as_deref(), Some("dark"));
    assert_eq!(cache.get(keys::DOCUMENT_NAME).unwrap(), None);
}

#[test]
fn controller_sessions_share_documents_and_preferences_through_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.sqlite3");
    let conn = open_db(&path).unwrap();

    let saved_id = {
        let mut first = MindMapController::new(
            CoreConfig::default(),
            SqliteDocumentStore::new(&conn),
            SqliteLocalCache::new(&conn),
            Box::new(AnonymousIdentity::default()),
        );
        first.select("2", false);
        first.add_node().unwrap();
        first.add_palette("Mine", &["#abcdef".to_string()]).unwrap();
        first.toggle_theme().unwrap();
        first.set_document_name("Shared").unwrap();
        let outcome = first.save().unwrap();
        assert!(outcome.created);
        assert!(outcome.cache_mirrored);
        outcome.document_id
    };

    let mut second = MindMapController::new(
        CoreConfig::default(),
        SqliteDocumentStore::new(&conn),
        SqliteLocalCache::new(&conn),
        Box::new(AnonymousIdentity::default()),
    );
    assert_eq!(second.session().theme(), Theme::Dark);
    assert!(second.palettes().palettes().contains_key("Mine"));
    assert_eq!(second.graph().nodes().len(), 2);

    let listed = second.list_documents().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "Shared");

    let loaded = second.load(&saved_id).unwrap();
    assert_eq!(loaded.source, LoadSource::Remote);
    assert_eq!(second.document_name(), "Shared");
    assert_eq!(second.document_id(), Some(saved_id.as_str()));
    let child = second.graph().node("3").unwrap();
    assert_eq!(child.position, Position::new(400.0, 200.0));
    assert!(second.graph().selection().contains("2"));
}

#[test]
fn corrupt_remote_document_is_reported_without_cache_fallback() {
    let conn = open_db_in_memory().unwrap();
    let mut controller = MindMapController::new(
        CoreConfig::default(),
        SqliteDocumentStore::new(&conn),
        SqliteLocalCache::new(&conn),
        Box::new(AnonymousIdentity::default()),
    );
    controller.set_document_name("Alpha").unwrap();
    let alpha_id = controller.save().unwrap().document_id;

    let store = SqliteDocumentStore::new(&conn);
    let beta_id = store
        .create(ANONYMOUS_NAMESPACE, &document("Beta", 300))
        .unwrap();
    conn.execute(
        "UPDATE documents SET body = '{oops' WHERE id = ?1;",
        params![beta_id],
    )
    .unwrap();

    let nodes_before = controller.graph().nodes().to_vec();
    let err = controller.load(&beta_id).unwrap_err();

    assert!(matches!(err, ControllerError::Corrupt(_)), "{err}");
    assert!(!err.is_retryable());
    assert_eq!(controller.document_id(), Some(alpha_id.as_str()));
    assert_eq!(controller.document_name(), "Alpha");
    assert_eq!(controller.graph().nodes(), nodes_before.as_slice());
}
