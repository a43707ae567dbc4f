// src/engine/mod.rs

//! Execution-tracking engine.
//!
//! - [`record`]: identity, launch parameters and the typed lifecycle phase.
//! - [`table`]: the synchronous state-transition core of the registry.
//! - [`registry`]: the lock-guarded, shareable registry.
//! - [`lifecycle`]: the per-execution worker and the recorder loop.
//!
//! [`Engine`] ties these to configuration and the playbook provider and is
//! the surface the front ends use.

pub mod lifecycle;
pub mod record;
pub mod registry;
pub mod table;

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::ConfigFile;
use crate::errors::{PlayctlError, Result};
use crate::exec::{build_command_line, spawn_process, CommandLine, OutputObserver};
use crate::playbook::{DirectoryCatalog, PlaybookProvider};
use crate::types::OutputStream;

use self::lifecycle::{spawn_recorder, spawn_worker, EventSender, Reporter, WorkerJob};

pub use record::{ExecutionId, ExecutionPhase, ExecutionRecord, ExecutionSnapshot, LaunchRequest};
pub use registry::Registry;
pub use table::ExecutionTable;
pub use crate::types::ExecutionStatus;

/// Events flowing from execution workers into the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionEvent {
    /// Output to append to the record's buffer for `stream`.
    Output { stream: OutputStream, text: String },
    /// The process ran to completion.
    Exited { return_code: i32 },
    /// The run broke down for a reason other than the process's exit code.
    Failed { error: String },
    /// A cancelled process is gone; `forced` if it had to be killed.
    Cancelled { forced: bool },
}

/// Launches playbooks and tracks their executions.
///
/// Construct once at startup and clone into whatever needs it; clones share
/// the registry. Must be created inside a Tokio runtime.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    config: ConfigFile,
    playbooks: Arc<dyn PlaybookProvider>,
    registry: Registry,
    events: EventSender,
    workers: Mutex<HashMap<ExecutionId, JoinHandle<()>>>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("project_dir", &self.inner.config.project_dir())
            .field("playbooks", &self.inner.playbooks)
            .field("registry", &self.inner.registry)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Engine over the playbooks in the configured project directory.
    pub fn new(config: ConfigFile) -> Result<Self> {
        let catalog = DirectoryCatalog::new(config.project_dir());
        Self::with_provider(config, Arc::new(catalog))
    }

    pub fn with_provider(config: ConfigFile, playbooks: Arc<dyn PlaybookProvider>) -> Result<Self> {
        tokio::runtime::Handle::try_current()
            .context("the execution engine must be created inside a Tokio runtime")?;

        let logs_dir = config.logs_dir();
        std::fs::create_dir_all(&logs_dir)?;

        let registry = Registry::new(config.runner.max_retained);
        let events = spawn_recorder(registry.clone());

        info!(
            project_dir = %config.project_dir().display(),
            logs_dir = %logs_dir.display(),
            "engine started"
        );

        Ok(Self {
            inner: Arc::new(EngineInner {
                config,
                playbooks,
                registry,
                events,
                workers: Mutex::new(HashMap::new()),
            }),
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.inner.config
    }

    pub fn playbooks(&self) -> &Arc<dyn PlaybookProvider> {
        &self.inner.playbooks
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Resolve the playbook and build the command line without launching.
    pub fn prepare(&self, request: &LaunchRequest) -> Result<CommandLine> {
        let cfg = &self.inner.config;
        let playbook_path = self
            .inner
            .playbooks
            .resolve(&request.playbook)
            .ok_or_else(|| PlayctlError::PlaybookNotFound(request.playbook.clone()))?;

        Ok(build_command_line(
            &cfg.runner.command,
            &cfg.inventory_path(),
            &playbook_path,
            request,
            cfg.project_dir(),
        ))
    }

    /// Start a playbook run and return its identity.
    ///
    /// Returns once the process is running; output is relayed in the
    /// background, to `observer` as well if given.
    ///
    /// - `PlaybookNotFound`: nothing was recorded or started.
    /// - `LaunchFailed`: the record exists and is `failed`, with the spawn
    ///   error in its stderr.
    pub fn launch(
        &self,
        request: LaunchRequest,
        observer: Option<Arc<dyn OutputObserver>>,
    ) -> Result<ExecutionId> {
        let command_line = self.prepare(&request)?;
        let registry = &self.inner.registry;
        let interactive = request.ask_password;
        let playbook = request.playbook.clone();

        let id = registry.create(request, command_line.clone());
        info!(execution = %id, playbook = %playbook, command = %command_line, "launching playbook");

        let process = match spawn_process(&command_line, interactive) {
            Ok(process) => process,
            Err(source) => {
                error!(execution = %id, playbook = %playbook, error = %source, "failed to start process");
                registry.fail(&id, &format!("failed to start process: {source}"));
                return Err(PlayctlError::LaunchFailed {
                    playbook,
                    execution: id.to_string(),
                    source,
                });
            }
        };

        let (cancel_tx, cancel_rx) = oneshot::channel();
        registry.mark_running(&id, cancel_tx);

        let worker = spawn_worker(WorkerJob {
            reporter: Reporter::new(id.clone(), self.inner.events.clone()),
            process,
            log_path: self.log_path(&id),
            observer,
            cancel_rx,
            kill_after: self.inner.config.runner.kill_after,
        });

        let mut workers = self.inner.workers.lock();
        workers.retain(|_, handle| !handle.is_finished());
        workers.insert(id.clone(), worker);

        Ok(id)
    }

    pub fn status(&self, id: &ExecutionId) -> Result<ExecutionSnapshot> {
        self.inner.registry.get(id)
    }

    /// Every retained execution, oldest first.
    pub fn list(&self) -> Vec<ExecutionSnapshot> {
        self.inner.registry.list()
    }

    pub fn cancel(&self, id: &ExecutionId) -> Result<()> {
        self.inner.registry.cancel(id)
    }

    /// Wait until the execution reaches a terminal state and return its
    /// snapshot at that moment.
    pub async fn wait(&self, id: &ExecutionId) -> Result<ExecutionSnapshot> {
        let mut status_rx = self.inner.registry.subscribe(id)?;
        status_rx
            .wait_for(|status| status.is_terminal())
            .await
            .map_err(|_| PlayctlError::NotFound(id.to_string()))?;
        self.status(id)
    }

    /// Wait until the execution's worker is gone.
    ///
    /// A cancelled record is terminal as soon as `cancel` returns, while its
    /// worker may still be terminating the process and writing the log. Once
    /// this returns, the log file is complete. Unknown or already joined
    /// executions return at once.
    pub async fn join(&self, id: &ExecutionId) {
        let handle = self.inner.workers.lock().remove(id);
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(execution = %id, error = %e, "execution worker did not finish cleanly");
            }
        }
    }

    pub fn log_path(&self, id: &ExecutionId) -> PathBuf {
        self.inner.config.logs_dir().join(format!("{id}.log"))
    }

    /// Contents of the execution's log file. Works for evicted executions
    /// too, as long as the file is still on disk.
    pub fn read_log(&self, id: &ExecutionId) -> Result<String> {
        read_log_file(&self.inner.config, id)
    }
}

/// Read a retained log without starting an engine.
pub fn read_log_file(config: &ConfigFile, id: &ExecutionId) -> Result<String> {
    let path = config.logs_dir().join(format!("{id}.log"));
    if !path.is_file() {
        return Err(PlayctlError::NotFound(id.to_string()));
    }
    Ok(std::fs::read_to_string(path)?)
}
