//! Local key/value cache contract with SQLite and in-memory backends.
//!
//! # Responsibility
//! - Persist small string blobs (graph mirror, bound id, name, theme,
//!   palettes) on the local device.
//!
//! # Invariants
//! - Writes are last-write-wins per key.
//! - No transactional guarantee across keys.

use crate::db::DbError;
use rusqlite::{params, Connection, OptionalExtension};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Cache keys used by the core.
pub mod keys {
    /// Graph mirror written after a confirmed remote save.
    pub const GRAPH: &str = "mind_map";
    pub const DOCUMENT_ID: &str = "current_map_id";
    pub const DOCUMENT_NAME: &str = "map_name";
    pub const THEME: &str = "theme";
    pub const PALETTES: &str = "palettes";
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Local cache error.
#[derive(Debug)]
pub enum CacheError {
    Db(DbError),
    Unavailable(String),
}

impl Display for CacheError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Unavailable(message) => write!(f, "local cache unavailable: {message}"),
        }
    }
}

impl Error for CacheError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Unavailable(_) => None,
        }
    }
}

impl From<rusqlite::Error> for CacheError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Key/value string store on the local device.
pub trait LocalCache {
    fn get(&self, key: &str) -> CacheResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> CacheResult<()>;
    fn remove(&self, key: &str) -> CacheResult<()>;
}

/// SQLite-backed cache over the `local_cache` table.
pub struct SqliteLocalCache<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLocalCache<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl LocalCache for SqliteLocalCache<'_> {
    fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM local_cache WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> CacheResult<()> {
        self.conn.execute(
            "INSERT INTO local_cache (key, value, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> CacheResult<()> {
        self.conn
            .execute("DELETE FROM local_cache WHERE key = ?1;", [key])?;
        Ok(())
    }
}

/// Process-local cache.
#[derive(Debug, Default)]
pub struct MemoryLocalCache {
    entries: RefCell<BTreeMap<String, String>>,
}

impl MemoryLocalCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl LocalCache for MemoryLocalCache {
    fn get(&self, key: &str) -> CacheResult<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> CacheResult<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> CacheResult<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}
