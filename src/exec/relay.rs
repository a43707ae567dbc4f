// src/exec/relay.rs

//! Output relay: every piece of output goes to the execution record, the
//! per-execution log file and the optional observer, in that order.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{trace, warn};

use crate::engine::lifecycle::Reporter;
use crate::engine::ExecutionEvent;
use crate::types::OutputStream;

/// Separator written to the log before the post-exit stderr block.
pub const STDERR_MARKER: &str = "--- STDERR ---";

/// Live consumer of execution output.
///
/// Called synchronously from the execution's worker task, once per stdout
/// line and once for the stderr block. Errors and panics are logged and
/// otherwise ignored; they never stop the relay.
pub trait OutputObserver: Send + Sync {
    fn on_output(&self, stream: OutputStream, text: &str) -> Result<()>;
}

impl<F> OutputObserver for F
where
    F: Fn(OutputStream, &str) -> Result<()> + Send + Sync,
{
    fn on_output(&self, stream: OutputStream, text: &str) -> Result<()> {
        self(stream, text)
    }
}

pub struct OutputRelay {
    reporter: Reporter,
    log: File,
    log_path: PathBuf,
    observer: Option<Arc<dyn OutputObserver>>,
}

impl OutputRelay {
    /// Create the log file (truncating any stale file with the same name).
    pub async fn open(
        reporter: Reporter,
        log_path: &Path,
        observer: Option<Arc<dyn OutputObserver>>,
    ) -> Result<Self> {
        if let Some(parent) = log_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating log directory {:?}", parent))?;
        }
        let log = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(log_path)
            .await
            .with_context(|| format!("creating log file {:?}", log_path))?;

        Ok(Self {
            reporter,
            log,
            log_path: log_path.to_path_buf(),
            observer,
        })
    }

    /// Relay one stdout line (without its trailing newline).
    pub async fn relay_line(&mut self, line: &str) -> Result<()> {
        trace!(execution = %self.reporter.id(), "stdout: {}", line);

        let text = format!("{line}\n");
        self.reporter.report(ExecutionEvent::Output {
            stream: OutputStream::Stdout,
            text: text.clone(),
        });
        self.append_log(&text).await?;
        self.notify(OutputStream::Stdout, line);
        Ok(())
    }

    /// Relay everything the process wrote to stderr, as one block.
    pub async fn relay_stderr_block(&mut self, block: &str) -> Result<()> {
        if block.is_empty() {
            return Ok(());
        }

        self.reporter.report(ExecutionEvent::Output {
            stream: OutputStream::Stderr,
            text: block.to_string(),
        });
        self.append_log(&format!("\n{STDERR_MARKER}\n{block}")).await?;
        self.notify(OutputStream::Stderr, block);
        Ok(())
    }

    async fn append_log(&mut self, text: &str) -> Result<()> {
        self.log
            .write_all(text.as_bytes())
            .await
            .with_context(|| format!("writing log file {:?}", self.log_path))?;
        self.log
            .flush()
            .await
            .with_context(|| format!("flushing log file {:?}", self.log_path))
    }

    fn notify(&self, stream: OutputStream, text: &str) {
        let Some(observer) = &self.observer else {
            return;
        };

        match catch_unwind(AssertUnwindSafe(|| observer.on_output(stream, text))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(
                    execution = %self.reporter.id(),
                    %stream,
                    error = %e,
                    "output observer failed; continuing"
                );
            }
            Err(_) => {
                warn!(
                    execution = %self.reporter.id(),
                    %stream,
                    "output observer panicked; continuing"
                );
            }
        }
    }
}

/// Decode one raw line, dropping the line terminator. Invalid UTF-8 is
/// replaced rather than treated as an error.
pub fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}
