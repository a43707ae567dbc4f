// src/engine/lifecycle.rs

//! Per-execution worker and the recorder that applies its events.
//!
//! Workers never write to the registry directly. They send
//! [`ExecutionEvent`]s through a [`Reporter`]; a single recorder task applies
//! them to the [`Registry`] in arrival order. Each worker is the only
//! producer for its execution, so per-execution order is preserved.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{ChildStderr, ChildStdout};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::engine::record::ExecutionId;
use crate::engine::registry::Registry;
use crate::engine::ExecutionEvent;
use crate::exec::launcher::{exit_code, terminate, wait_after_terminate};
use crate::exec::relay::decode_line;
use crate::exec::{OutputObserver, OutputRelay, RunningProcess};

/// How long to keep draining pipes once the process itself is gone. A
/// grandchild that inherited the pipes can otherwise hold them open forever.
const DRAIN_GRACE: Duration = Duration::from_secs(5);

pub type EventSender = mpsc::UnboundedSender<(ExecutionId, ExecutionEvent)>;

/// Sends events for one execution.
#[derive(Debug, Clone)]
pub struct Reporter {
    id: ExecutionId,
    tx: EventSender,
}

impl Reporter {
    pub fn new(id: ExecutionId, tx: EventSender) -> Self {
        Self { id, tx }
    }

    pub fn id(&self) -> &ExecutionId {
        &self.id
    }

    pub fn report(&self, event: ExecutionEvent) {
        if self.tx.send((self.id.clone(), event)).is_err() {
            debug!(execution = %self.id, "recorder has shut down; dropping event");
        }
    }
}

/// Spawn the recorder loop and return the sender workers report through.
///
/// The loop ends once every sender is gone.
pub fn spawn_recorder(registry: Registry) -> EventSender {
    let (tx, mut rx) = mpsc::unbounded_channel::<(ExecutionId, ExecutionEvent)>();

    tokio::spawn(async move {
        debug!("recorder loop started");

        while let Some((id, event)) = rx.recv().await {
            registry.apply(&id, event);
        }

        debug!("recorder loop finished (channel closed)");
    });

    tx
}

/// Makes sure exactly one terminal event is reported per worker, whichever
/// way the worker ends (including panics and task abort).
struct FinishGuard {
    reporter: Reporter,
    finished: bool,
}

impl FinishGuard {
    fn new(reporter: Reporter) -> Self {
        Self {
            reporter,
            finished: false,
        }
    }

    fn finish(mut self, event: ExecutionEvent) {
        self.finished = true;
        self.reporter.report(event);
    }
}

impl Drop for FinishGuard {
    fn drop(&mut self) {
        if !self.finished {
            warn!(execution = %self.reporter.id(), "worker ended without an outcome");
            self.reporter.report(ExecutionEvent::Failed {
                error: "execution worker ended unexpectedly".to_string(),
            });
        }
    }
}

/// Everything a worker needs to drive one running process.
pub struct WorkerJob {
    pub reporter: Reporter,
    pub process: RunningProcess,
    pub log_path: PathBuf,
    pub observer: Option<Arc<dyn OutputObserver>>,
    pub cancel_rx: oneshot::Receiver<()>,
    pub kill_after: Option<Duration>,
}

/// Run the worker on its own Tokio task.
pub fn spawn_worker(job: WorkerJob) -> JoinHandle<()> {
    tokio::spawn(run_execution(job))
}

/// Relay output until the process exits or is cancelled, then report the
/// terminal event. Errors are reported as `Failed`; nothing propagates to
/// the caller.
pub async fn run_execution(job: WorkerJob) {
    let guard = FinishGuard::new(job.reporter.clone());
    let id = job.reporter.id().clone();

    let event = match run_execution_inner(job).await {
        Ok(event) => event,
        Err(err) => {
            error!(execution = %id, error = %format!("{err:#}"), "execution error");
            ExecutionEvent::Failed {
                error: format!("{err:#}"),
            }
        }
    };

    guard.finish(event);
}

/// How the stdout loop ended.
enum Ending {
    Exited(std::process::ExitStatus),
    CancelRequested,
}

async fn run_execution_inner(job: WorkerJob) -> Result<ExecutionEvent> {
    let WorkerJob {
        reporter,
        process,
        log_path,
        observer,
        mut cancel_rx,
        kill_after,
    } = job;
    let RunningProcess {
        mut child,
        pid,
        stdout,
        stderr,
    } = process;
    let id = reporter.id().clone();

    // On error the child is dropped and killed (kill_on_drop).
    let mut relay = OutputRelay::open(reporter, &log_path, observer).await?;

    // Stderr is collected concurrently so a full pipe cannot stall the
    // process, and relayed as one block at the end.
    let mut stderr_task = tokio::spawn(read_to_end(stderr));

    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();
    let mut stdout_open = true;
    let mut cancel_closed = false;

    let ending = loop {
        tokio::select! {
            cancel = &mut cancel_rx, if !cancel_closed => match cancel {
                Ok(()) => break Ending::CancelRequested,
                Err(_) => {
                    // Handle dropped without a request (record evicted).
                    cancel_closed = true;
                }
            },
            read = reader.read_until(b'\n', &mut buf), if stdout_open => {
                let n = read.context("reading process stdout")?;
                if n == 0 {
                    stdout_open = false;
                } else {
                    relay.relay_line(&decode_line(&buf)).await?;
                    buf.clear();
                }
            },
            status = child.wait() => {
                break Ending::Exited(status.context("waiting for process")?);
            },
        }
    };

    match ending {
        Ending::Exited(status) => {
            // From here on a cancel request can no longer be served.
            cancel_rx.close();
            let cancelled_meanwhile = !cancel_closed && cancel_rx.try_recv().is_ok();

            let code = exit_code(status);
            info!(execution = %id, pid, exit_code = code, success = status.success(), "process exited");

            if stdout_open {
                drain_stdout(&mut reader, &mut buf, &mut relay, &id).await?;
            }

            let stderr_text = collect_stderr(&mut stderr_task, &id).await;
            relay.relay_stderr_block(&stderr_text).await?;

            if cancelled_meanwhile {
                Ok(ExecutionEvent::Cancelled { forced: false })
            } else {
                Ok(ExecutionEvent::Exited { return_code: code })
            }
        }
        Ending::CancelRequested => {
            info!(execution = %id, pid, "cancellation requested; terminating process");
            terminate(&mut child).context("sending termination signal")?;

            let (status, forced) = wait_after_terminate(&mut child, kill_after)
                .await
                .context("waiting for terminated process")?;
            info!(execution = %id, pid, exit_code = exit_code(status), forced, "cancelled process exited");

            // Keep whatever was written before the process went away.
            if stdout_open {
                drain_stdout(&mut reader, &mut buf, &mut relay, &id).await?;
            }

            let stderr_text = collect_stderr(&mut stderr_task, &id).await;
            relay.relay_stderr_block(&stderr_text).await?;

            Ok(ExecutionEvent::Cancelled { forced })
        }
    }
}

/// Relay the rest of stdout once the process is gone, bounded by
/// [`DRAIN_GRACE`].
async fn drain_stdout(
    reader: &mut BufReader<ChildStdout>,
    buf: &mut Vec<u8>,
    relay: &mut OutputRelay,
    id: &ExecutionId,
) -> Result<()> {
    let drained = tokio::time::timeout(DRAIN_GRACE, async {
        loop {
            let n = reader.read_until(b'\n', buf).await?;
            if n == 0 {
                break;
            }
            relay.relay_line(&decode_line(buf)).await?;
            buf.clear();
        }
        Ok::<(), anyhow::Error>(())
    })
    .await;

    match drained {
        Ok(res) => res,
        Err(_) => {
            warn!(execution = %id, "stdout still open after exit; giving up draining");
            Ok(())
        }
    }
}

async fn read_to_end(stderr: ChildStderr) -> std::io::Result<String> {
    let mut reader = BufReader::new(stderr);
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Wait (bounded) for the stderr reader. Read errors degrade to whatever
/// could be collected, which is nothing.
async fn collect_stderr(
    task: &mut JoinHandle<std::io::Result<String>>,
    id: &ExecutionId,
) -> String {
    match tokio::time::timeout(DRAIN_GRACE, &mut *task).await {
        Ok(Ok(Ok(text))) => text,
        Ok(Ok(Err(e))) => {
            warn!(execution = %id, error = %e, "failed reading process stderr");
            String::new()
        }
        Ok(Err(e)) => {
            warn!(execution = %id, error = %e, "stderr reader task failed");
            String::new()
        }
        Err(_) => {
            warn!(execution = %id, "stderr still open after exit; giving up");
            task.abort();
            String::new()
        }
    }
}
