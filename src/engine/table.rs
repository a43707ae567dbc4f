// src/engine/table.rs

//! Synchronous core of the registry.
//!
//! `ExecutionTable` owns every record plus the per-record cancel handle and
//! status channel. It never awaits and never touches processes or files: the
//! registry wraps it in a mutex, the recorder feeds it [`ExecutionEvent`]s,
//! and `launch` / `cancel` drive the remaining transitions.

use std::collections::{HashMap, VecDeque};

use tokio::sync::{oneshot, watch};
use tracing::{debug, info};

use crate::engine::record::{ExecutionId, ExecutionRecord, ExecutionSnapshot};
use crate::engine::ExecutionEvent;
use crate::errors::{PlayctlError, Result};
use crate::types::ExecutionStatus;

struct Entry {
    record: ExecutionRecord,
    /// Present while the worker can still be asked to stop.
    cancel: Option<oneshot::Sender<()>>,
    status_tx: watch::Sender<ExecutionStatus>,
}

impl Entry {
    fn publish(&mut self) {
        let status = self.record.status();
        self.status_tx.send_replace(status);
        if status.is_terminal() {
            self.cancel = None;
        }
    }
}

#[derive(Default)]
pub struct ExecutionTable {
    entries: HashMap<ExecutionId, Entry>,
    /// Insertion order; the map alone does not keep one.
    order: VecDeque<ExecutionId>,
    max_retained: Option<usize>,
}

impl std::fmt::Debug for ExecutionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionTable")
            .field("len", &self.entries.len())
            .field("max_retained", &self.max_retained)
            .finish_non_exhaustive()
    }
}

impl ExecutionTable {
    pub fn new(max_retained: Option<usize>) -> Self {
        Self {
            max_retained,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a `Pending` record, evicting old finished records if the table
    /// is over its bound.
    pub fn insert(&mut self, record: ExecutionRecord) -> ExecutionId {
        let id = record.id().clone();
        let (status_tx, _) = watch::channel(record.status());
        self.entries.insert(
            id.clone(),
            Entry {
                record,
                cancel: None,
                status_tx,
            },
        );
        self.order.push_back(id.clone());
        self.evict_excess();
        id
    }

    pub fn get(&self, id: &str) -> Option<ExecutionSnapshot> {
        self.entries.get(id).map(|e| e.record.snapshot())
    }

    pub fn status(&self, id: &str) -> Option<ExecutionStatus> {
        self.entries.get(id).map(|e| e.record.status())
    }

    /// Snapshots in insertion order.
    pub fn list(&self) -> Vec<ExecutionSnapshot> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id))
            .map(|e| e.record.snapshot())
            .collect()
    }

    pub fn subscribe(&self, id: &str) -> Option<watch::Receiver<ExecutionStatus>> {
        self.entries.get(id).map(|e| e.status_tx.subscribe())
    }

    /// `Pending -> Running`, storing the handle used to stop the worker.
    pub fn mark_running(&mut self, id: &str, cancel: oneshot::Sender<()>) -> bool {
        let Some(entry) = self.entries.get_mut(id) else {
            return false;
        };
        if !entry.record.mark_running() {
            return false;
        }
        entry.cancel = Some(cancel);
        entry.publish();
        true
    }

    /// Move a non-terminal record to `Failed`, recording `error` in stderr.
    pub fn fail(&mut self, id: &str, error: &str) -> bool {
        let Some(entry) = self.entries.get_mut(id) else {
            return false;
        };
        let changed = entry.record.fail(error);
        if changed {
            entry.publish();
        }
        changed
    }

    /// Serve a cancel request.
    ///
    /// The record must be `Running` and its worker must still accept the
    /// stop signal. A worker that has already observed the process exit has
    /// closed its receiver, so a cancel racing a natural exit loses and the
    /// exit status is kept.
    pub fn cancel(&mut self, id: &str) -> Result<()> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| PlayctlError::NotFound(id.to_string()))?;

        let status = entry.record.status();
        if status != ExecutionStatus::Running {
            return Err(PlayctlError::NotCancellable(format!(
                "execution {id} is {status}"
            )));
        }

        let Some(cancel) = entry.cancel.take() else {
            return Err(PlayctlError::NotCancellable(format!(
                "execution {id} has no active process"
            )));
        };

        if cancel.send(()).is_err() {
            return Err(PlayctlError::NotCancellable(format!(
                "execution {id} process has already exited"
            )));
        }

        entry.record.cancel();
        entry.publish();
        info!(execution = %id, "execution cancelled");
        Ok(())
    }

    /// Apply one event reported by an execution's worker.
    pub fn apply(&mut self, id: &str, event: ExecutionEvent) {
        let Some(entry) = self.entries.get_mut(id) else {
            debug!(execution = %id, "event for unknown or evicted execution; dropping");
            return;
        };

        match event {
            ExecutionEvent::Output { stream, text } => {
                entry.record.append(stream, &text);
            }
            ExecutionEvent::Exited { return_code } => {
                if entry.record.complete(return_code) {
                    entry.publish();
                    info!(
                        execution = %id,
                        exit_code = return_code,
                        status = %entry.record.status(),
                        "execution finished"
                    );
                } else {
                    debug!(
                        execution = %id,
                        exit_code = return_code,
                        status = %entry.record.status(),
                        "exit reported for execution that is no longer running; ignoring"
                    );
                }
            }
            ExecutionEvent::Failed { error } => {
                if entry.record.fail(&error) {
                    entry.publish();
                    info!(execution = %id, error = %error, "execution failed");
                } else {
                    debug!(
                        execution = %id,
                        error = %error,
                        status = %entry.record.status(),
                        "failure reported for finished execution; ignoring"
                    );
                }
            }
            ExecutionEvent::Cancelled { forced } => {
                // The cancel path already moved the record; this only
                // confirms the process is gone.
                if entry.record.cancel() {
                    entry.publish();
                }
                debug!(execution = %id, forced, "cancelled process has exited");
            }
        }
    }

    /// Drop the oldest finished records until the table fits its bound.
    /// Active records are never evicted, so the table may stay over the
    /// bound while many executions run.
    fn evict_excess(&mut self) {
        let Some(max) = self.max_retained else {
            return;
        };

        let mut idx = 0;
        while self.entries.len() > max && idx < self.order.len() {
            let id = &self.order[idx];
            let terminal = self
                .entries
                .get(id)
                .is_none_or(|e| e.record.status().is_terminal());
            if terminal {
                if let Some(id) = self.order.remove(idx) {
                    self.entries.remove(&id);
                    debug!(execution = %id, "evicted finished execution from registry");
                }
            } else {
                idx += 1;
            }
        }
    }
}
