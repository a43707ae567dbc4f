// src/engine/record.rs

//! Execution identity, launch parameters and the per-execution record.

use std::borrow::Borrow;
use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::exec::CommandLine;
use crate::types::{ExecutionStatus, OutputStream};

/// Opaque execution identity (a UUID v4 string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(String);

impl ExecutionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ExecutionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ExecutionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for ExecutionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// What to run. Immutable once handed to the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchRequest {
    /// Playbook file name, resolved by the playbook provider.
    pub playbook: String,
    /// Hosts or groups; empty means no restriction.
    #[serde(default)]
    pub hosts: Vec<String>,
    /// Tags; empty means all tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Extra variables, passed in insertion order.
    #[serde(default)]
    pub extra_vars: IndexMap<String, String>,
    #[serde(default)]
    pub ask_password: bool,
}

impl LaunchRequest {
    pub fn new(playbook: impl Into<String>) -> Self {
        Self {
            playbook: playbook.into(),
            ..Self::default()
        }
    }

    pub fn hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hosts = hosts.into_iter().map(Into::into).collect();
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn extra_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_vars.insert(key.into(), value.into());
        self
    }

    pub fn ask_password(mut self, ask: bool) -> Self {
        self.ask_password = ask;
        self
    }
}

/// Where an execution is in its lifecycle.
///
/// Terminal variants carry their finish time, so a terminal record without
/// `finished_at` (or a success without exit code 0) cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionPhase {
    Pending,
    Running,
    /// Exited with code 0.
    Succeeded { finished_at: DateTime<Utc> },
    /// `return_code` is `None` when the run failed for a reason other than
    /// the process's own exit (spawn error, I/O error while relaying).
    Failed {
        return_code: Option<i32>,
        finished_at: DateTime<Utc>,
    },
    Cancelled { finished_at: DateTime<Utc> },
}

impl ExecutionPhase {
    pub fn status(&self) -> ExecutionStatus {
        match self {
            ExecutionPhase::Pending => ExecutionStatus::Pending,
            ExecutionPhase::Running => ExecutionStatus::Running,
            ExecutionPhase::Succeeded { .. } => ExecutionStatus::Success,
            ExecutionPhase::Failed { .. } => ExecutionStatus::Failed,
            ExecutionPhase::Cancelled { .. } => ExecutionStatus::Cancelled,
        }
    }

    pub fn return_code(&self) -> Option<i32> {
        match self {
            ExecutionPhase::Succeeded { .. } => Some(0),
            ExecutionPhase::Failed { return_code, .. } => *return_code,
            _ => None,
        }
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        match self {
            ExecutionPhase::Succeeded { finished_at }
            | ExecutionPhase::Failed { finished_at, .. }
            | ExecutionPhase::Cancelled { finished_at } => Some(*finished_at),
            ExecutionPhase::Pending | ExecutionPhase::Running => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }
}

/// One execution: identity, parameters, phase and accumulated output.
///
/// Transition methods return `false` when the transition is not allowed from
/// the current phase; the record is left untouched in that case.
#[derive(Debug, Clone)]
pub struct ExecutionRecord {
    id: ExecutionId,
    request: LaunchRequest,
    command_line: CommandLine,
    started_at: DateTime<Utc>,
    phase: ExecutionPhase,
    stdout: String,
    stderr: String,
}

impl ExecutionRecord {
    pub fn new(id: ExecutionId, request: LaunchRequest, command_line: CommandLine) -> Self {
        Self {
            id,
            request,
            command_line,
            started_at: Utc::now(),
            phase: ExecutionPhase::Pending,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    pub fn id(&self) -> &ExecutionId {
        &self.id
    }

    pub fn request(&self) -> &LaunchRequest {
        &self.request
    }

    pub fn command_line(&self) -> &CommandLine {
        &self.command_line
    }

    pub fn phase(&self) -> &ExecutionPhase {
        &self.phase
    }

    pub fn status(&self) -> ExecutionStatus {
        self.phase.status()
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    /// `Pending -> Running`.
    pub fn mark_running(&mut self) -> bool {
        if self.phase != ExecutionPhase::Pending {
            return false;
        }
        self.phase = ExecutionPhase::Running;
        true
    }

    /// Buffers are append-only in every phase; output still draining after a
    /// cancel is kept.
    pub fn append(&mut self, stream: OutputStream, text: &str) {
        match stream {
            OutputStream::Stdout => self.stdout.push_str(text),
            OutputStream::Stderr => self.stderr.push_str(text),
        }
    }

    /// `Running -> Succeeded | Failed` from the process's exit code.
    pub fn complete(&mut self, return_code: i32) -> bool {
        if self.phase != ExecutionPhase::Running {
            return false;
        }
        let finished_at = Utc::now();
        self.phase = if return_code == 0 {
            ExecutionPhase::Succeeded { finished_at }
        } else {
            ExecutionPhase::Failed {
                return_code: Some(return_code),
                finished_at,
            }
        };
        true
    }

    /// `Pending | Running -> Failed` without an exit code. The error text is
    /// appended to stderr.
    pub fn fail(&mut self, error: &str) -> bool {
        if self.phase.is_terminal() {
            return false;
        }
        if !self.stderr.is_empty() && !self.stderr.ends_with('\n') {
            self.stderr.push('\n');
        }
        self.stderr.push_str(error);
        self.phase = ExecutionPhase::Failed {
            return_code: None,
            finished_at: Utc::now(),
        };
        true
    }

    /// `Running -> Cancelled`.
    pub fn cancel(&mut self) -> bool {
        if self.phase != ExecutionPhase::Running {
            return false;
        }
        self.phase = ExecutionPhase::Cancelled {
            finished_at: Utc::now(),
        };
        true
    }

    pub fn snapshot(&self) -> ExecutionSnapshot {
        ExecutionSnapshot {
            id: self.id.clone(),
            playbook: self.request.playbook.clone(),
            hosts: self.request.hosts.clone(),
            tags: self.request.tags.clone(),
            extra_vars: self.request.extra_vars.clone(),
            ask_password: self.request.ask_password,
            command: self.command_line.to_string(),
            argv: self.command_line.argv(),
            status: self.status(),
            return_code: self.phase.return_code(),
            stdout: self.stdout.clone(),
            stderr: self.stderr.clone(),
            started_at: self.started_at,
            finished_at: self.phase.finished_at(),
        }
    }
}

/// Point-in-time copy of a record, taken under the registry lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionSnapshot {
    pub id: ExecutionId,
    pub playbook: String,
    pub hosts: Vec<String>,
    pub tags: Vec<String>,
    pub extra_vars: IndexMap<String, String>,
    pub ask_password: bool,
    /// Display form of the command line.
    pub command: String,
    pub argv: Vec<String>,
    pub status: ExecutionStatus,
    pub return_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}
