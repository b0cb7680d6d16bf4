//! Remote document store contract with SQLite and in-memory backends.
//!
//! # Responsibility
//! - List/create/update/get mind-map documents inside a namespace.
//! - Assign opaque document ids on create.
//!
//! # Invariants
//! - Documents are isolated by namespace.
//! - `update` keeps the original `created_at`.
//! - `get` of an absent id is `Ok(None)`, never an error.

use crate::db::DbError;
use crate::model::document::{now_epoch_ms, DocumentId, DocumentSummary, MindMapDocument};
use rusqlite::{params, Connection, OptionalExtension};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type StoreResult<T> = Result<T, StoreError>;

/// Document store error.
#[derive(Debug)]
pub enum StoreError {
    /// Store unreachable or the request failed in flight.
    Transport(String),
    Db(DbError),
    NotFound(DocumentId),
    InvalidData(String),
}

impl StoreError {
    /// Whether a retry may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Db(_))
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "document store unavailable: {message}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "document not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid stored document: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Remote document store collaborator. `namespace` is the identity token.
pub trait DocumentStore {
    fn list(&self, namespace: &str) -> StoreResult<Vec<DocumentSummary>>;
    fn create(&self, namespace: &str, document: &MindMapDocument) -> StoreResult<DocumentId>;
    fn update(&self, namespace: &str, id: &str, document: &MindMapDocument) -> StoreResult<()>;
    fn get(&self, namespace: &str, id: &str) -> StoreResult<Option<MindMapDocument>>;
}

/// SQLite-backed document store.
pub struct SqliteDocumentStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDocumentStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl DocumentStore for SqliteDocumentStore<'_> {
    fn list(&self, namespace: &str) -> StoreResult<Vec<DocumentSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, created_at, updated_at
             FROM documents
             WHERE namespace = ?1
             ORDER BY updated_at DESC, id ASC;",
        )?;
        let rows = stmt.query_map([namespace], |row| {
            Ok(DocumentSummary {
                id: row.get("id")?,
                name: row.get("name")?,
                created_at: row.get("created_at")?,
                updated_at: row.get("updated_at")?,
            })
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            summaries.push(row?);
        }
        Ok(summaries)
    }

    fn create(&self, namespace: &str, document: &MindMapDocument) -> StoreResult<DocumentId> {
        let id = Uuid::new_v4().to_string();
        let created_at = document.created_at.unwrap_or_else(now_epoch_ms);
        self.conn.execute(
            "INSERT INTO documents (namespace, id, name, body, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                namespace,
                id,
                document.name,
                encode_body(document)?,
                created_at,
                document.updated_at,
            ],
        )?;
        Ok(id)
    }

    fn update(&self, namespace: &str, id: &str, document: &MindMapDocument) -> StoreResult<()> {
        let changed = self.conn.execute(
            "UPDATE documents
             SET name = ?1, body = ?2, updated_at = ?3
             WHERE namespace = ?4 AND id = ?5;",
            params![
                document.name,
                encode_body(document)?,
                document.updated_at,
                namespace,
                id,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn get(&self, namespace: &str, id: &str) -> StoreResult<Option<MindMapDocument>> {
        let row = self
            .conn
            .query_row(
                "SELECT name, body, created_at, updated_at
                 FROM documents
                 WHERE namespace = ?1 AND id = ?2;",
                params![namespace, id],
                |row| {
                    Ok((
                        row.get::<_, String>("name")?,
                        row.get::<_, String>("body")?,
                        row.get::<_, i64>("created_at")?,
                        row.get::<_, i64>("updated_at")?,
                    ))
                },
            )
            .optional()?;

        let Some((name, body, created_at, updated_at)) = row else {
            return Ok(None);
        };
        let mut document = decode_body(&body, id)?;
        document.name = name;
        document.created_at = Some(created_at);
        document.updated_at = updated_at;
        Ok(Some(document))
    }
}

fn encode_body(document: &MindMapDocument) -> StoreResult<String> {
    serde_json::to_string(document).map_err(|err| StoreError::InvalidData(err.to_string()))
}

fn decode_body(body: &str, id: &str) -> StoreResult<MindMapDocument> {
    serde_json::from_str(body).map_err(|err| {
        StoreError::InvalidData(format!("document `{id}` has an unreadable body: {err}"))
    })
}

#[derive(Debug, Clone)]
struct StoredDocument {
    document: MindMapDocument,
    created_at: i64,
}

/// Process-local document store, used by tests and offline tooling.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: RefCell<BTreeMap<(String, DocumentId), StoredDocument>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents across all namespaces.
    pub fn len(&self) -> usize {
        self.documents.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.borrow().is_empty()
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn list(&self, namespace: &str) -> StoreResult<Vec<DocumentSummary>> {
        let mut summaries: Vec<DocumentSummary> = self
            .documents
            .borrow()
            .iter()
            .filter(|((owner, _), _)| owner == namespace)
            .map(|((_, id), stored)| DocumentSummary {
                id: id.clone(),
                name: stored.document.name.clone(),
                created_at: stored.created_at,
                updated_at: stored.document.updated_at,
            })
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        Ok(summaries)
    }

    fn create(&self, namespace: &str, document: &MindMapDocument) -> StoreResult<DocumentId> {
        let id = Uuid::new_v4().to_string();
        let created_at = document.created_at.unwrap_or_else(now_epoch_ms);
        self.documents.borrow_mut().insert(
            (namespace.to_string(), id.clone()),
            StoredDocument {
                document: document.clone(),
                created_at,
            },
        );
        Ok(id)
    }

    fn update(&self, namespace: &str, id: &str, document: &MindMapDocument) -> StoreResult<()> {
        let mut documents = self.documents.borrow_mut();
        let stored = documents
            .get_mut(&(namespace.to_string(), id.to_string()))
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        stored.document = document.clone();
        Ok(())
    }

    fn get(&self, namespace: &str, id: &str) -> StoreResult<Option<MindMapDocument>> {
        Ok(self
            .documents
            .borrow()
            .get(&(namespace.to_string(), id.to_string()))
            .map(|stored| {
                let mut document = stored.document.clone();
                document.created_at = Some(stored.created_at);
                document
            }))
    }
}
