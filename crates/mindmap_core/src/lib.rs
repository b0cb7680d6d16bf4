//! Core domain logic for the mind-map editor.
//! Graph editing, palettes, persistence and export live here; front-ends
//! only render state and forward user actions.

pub mod config;
pub mod db;
pub mod export;
pub mod graph;
pub mod logging;
pub mod model;
pub mod palette;
pub mod repo;
pub mod service;
pub mod session;
pub mod sync;

pub use config::{CanvasConfig, ConfigError, CoreConfig, ExportConfig, RetryConfig};
pub use export::{
    export_file_name, export_snapshot, import_snapshot, ExportArtifact, ExportError, ExportFormat,
    ImportError, MapSnapshot, RenderCollaborator,
};
pub use graph::store::{GraphError, GraphSnapshot, GraphStore, NodeChange};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::document::{DocumentSummary, MindMapDocument};
pub use model::node::{Edge, Node, NodeData, Position, SyncedNode};
pub use palette::manager::{PaletteError, PaletteManager};
pub use repo::document_store::{
    DocumentStore, InMemoryDocumentStore, SqliteDocumentStore, StoreError,
};
pub use repo::local_cache::{LocalCache, MemoryLocalCache, SqliteLocalCache};
pub use service::controller::{ControllerError, ControllerResult, MindMapController};
pub use session::{Operation, SessionState, Theme};
pub use sync::coordinator::{LoadOutcome, LoadSource, SaveOutcome, SyncStatus};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
