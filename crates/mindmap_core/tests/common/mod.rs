//! Collaborator doubles shared by integration tests.
#![allow(dead_code)]

use mindmap_core::model::document::{DocumentId, DocumentSummary, MindMapDocument};
use mindmap_core::repo::document_store::StoreResult;
use mindmap_core::sync::identity::{
    IdentityError, IdentityProvider, IdentityToken, ANONYMOUS_NAMESPACE,
};
use mindmap_core::sync::retry::Sleeper;
use mindmap_core::{DocumentStore, InMemoryDocumentStore, StoreError};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

pub const ALWAYS: u32 = u32::MAX;

#[derive(Clone, Default)]
pub struct RecordingSleeper {
    pub waits: Rc<RefCell<Vec<Duration>>>,
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.waits.borrow_mut().push(duration);
    }
}

/// In-memory store that fails the next N reads/writes with a transport error.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: InMemoryDocumentStore,
    failing_writes: Cell<u32>,
    failing_reads: Cell<u32>,
    pub write_calls: Cell<u32>,
    pub read_calls: Cell<u32>,
}

impl FlakyStore {
    pub fn fail_writes(&self, times: u32) {
        self.failing_writes.set(times);
    }

    pub fn fail_reads(&self, times: u32) {
        self.failing_reads.set(times);
    }

    fn trip(counter: &Cell<u32>, calls: &Cell<u32>) -> StoreResult<()> {
        calls.set(calls.get() + 1);
        match counter.get() {
            0 => Ok(()),
            ALWAYS => Err(StoreError::Transport("connection reset".to_string())),
            left => {
                counter.set(left - 1);
                Err(StoreError::Transport("connection reset".to_string()))
            }
        }
    }
}

impl DocumentStore for FlakyStore {
    fn list(&self, namespace: &str) -> StoreResult<Vec<DocumentSummary>> {
        Self::trip(&self.failing_reads, &self.read_calls)?;
        self.inner.list(namespace)
    }

    fn create(&self, namespace: &str, document: &MindMapDocument) -> StoreResult<DocumentId> {
        Self::trip(&self.failing_writes, &self.write_calls)?;
        self.inner.create(namespace, document)
    }

    fn update(&self, namespace: &str, id: &str, document: &MindMapDocument) -> StoreResult<()> {
        Self::trip(&self.failing_writes, &self.write_calls)?;
        self.inner.update(namespace, id, document)
    }

    fn get(&self, namespace: &str, id: &str) -> StoreResult<Option<MindMapDocument>> {
        Self::trip(&self.failing_reads, &self.read_calls)?;
        self.inner.get(namespace, id)
    }
}

/// Fails the first `failures` resolutions, then yields a fixed token.
pub struct FlakyIdentity {
    pub failures: u32,
    pub calls: Rc<Cell<u32>>,
}

impl IdentityProvider for FlakyIdentity {
    fn resolve(&self) -> Result<IdentityToken, IdentityError> {
        let call = self.calls.get() + 1;
        self.calls.set(call);
        if call <= self.failures {
            Err(IdentityError::new("auth service offline"))
        } else {
            Ok(ANONYMOUS_NAMESPACE.to_string())
        }
    }
}
