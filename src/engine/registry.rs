// src/engine/registry.rs

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{oneshot, watch};

use crate::engine::record::{ExecutionId, ExecutionRecord, ExecutionSnapshot, LaunchRequest};
use crate::engine::table::ExecutionTable;
use crate::engine::ExecutionEvent;
use crate::errors::{PlayctlError, Result};
use crate::exec::CommandLine;
use crate::types::ExecutionStatus;

/// Thread-safe store of every execution, keyed by identity.
///
/// Cheap to clone; clones share the same table. Every method takes the lock
/// for a short, non-async critical section, so callers never wait on process
/// I/O.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    table: Arc<Mutex<ExecutionTable>>,
}

impl Registry {
    pub fn new(max_retained: Option<usize>) -> Self {
        Self {
            table: Arc::new(Mutex::new(ExecutionTable::new(max_retained))),
        }
    }

    /// Allocate a fresh identity and insert a `Pending` record.
    pub fn create(&self, request: LaunchRequest, command_line: CommandLine) -> ExecutionId {
        let record = ExecutionRecord::new(ExecutionId::generate(), request, command_line);
        self.table.lock().insert(record)
    }

    pub fn get(&self, id: &ExecutionId) -> Result<ExecutionSnapshot> {
        self.table
            .lock()
            .get(id.as_str())
            .ok_or_else(|| PlayctlError::NotFound(id.to_string()))
    }

    pub fn status(&self, id: &ExecutionId) -> Option<ExecutionStatus> {
        self.table.lock().status(id.as_str())
    }

    pub fn list(&self) -> Vec<ExecutionSnapshot> {
        self.table.lock().list()
    }

    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.lock().is_empty()
    }

    pub fn cancel(&self, id: &ExecutionId) -> Result<()> {
        self.table.lock().cancel(id.as_str())
    }

    pub fn subscribe(&self, id: &ExecutionId) -> Result<watch::Receiver<ExecutionStatus>> {
        self.table
            .lock()
            .subscribe(id.as_str())
            .ok_or_else(|| PlayctlError::NotFound(id.to_string()))
    }

    pub(crate) fn mark_running(&self, id: &ExecutionId, cancel: oneshot::Sender<()>) -> bool {
        self.table.lock().mark_running(id.as_str(), cancel)
    }

    pub(crate) fn fail(&self, id: &ExecutionId, error: &str) -> bool {
        self.table.lock().fail(id.as_str(), error)
    }

    pub(crate) fn apply(&self, id: &ExecutionId, event: ExecutionEvent) {
        self.table.lock().apply(id.as_str(), event);
    }
}
