// src/exec/launcher.rs

//! Starting, terminating and reaping the external process.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::{debug, info, warn};

use crate::exec::command::CommandLine;

/// A freshly spawned process with both output pipes taken.
#[derive(Debug)]
pub struct RunningProcess {
    pub child: Child,
    pub pid: Option<u32>,
    pub stdout: ChildStdout,
    pub stderr: ChildStderr,
}

/// Spawn `cmd` with stdout and stderr piped.
///
/// Stdin is inherited only when the automation tool has to prompt for a
/// password; otherwise it is closed. The child is killed if its handle is
/// dropped, so an aborted worker never leaks a process.
pub fn spawn_process(cmd: &CommandLine, interactive: bool) -> io::Result<RunningProcess> {
    let mut command = Command::new(&cmd.program);
    command
        .args(&cmd.args)
        .current_dir(&cmd.working_dir)
        .stdin(if interactive {
            Stdio::inherit()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn()?;
    let pid = child.id();

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("child stdout was not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::other("child stderr was not captured"))?;

    info!(pid, program = %cmd.program, "process started");

    Ok(RunningProcess {
        child,
        pid,
        stdout,
        stderr,
    })
}

/// Ask the process to stop (SIGTERM on unix).
#[cfg(unix)]
pub fn terminate(child: &mut Child) -> io::Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        debug!("terminate requested but process was already reaped");
        return Ok(());
    };
    let raw = i32::try_from(pid).map_err(|_| io::Error::other(format!("pid {pid} out of range")))?;
    kill(Pid::from_raw(raw), Signal::SIGTERM).map_err(io::Error::from)
}

#[cfg(not(unix))]
pub fn terminate(child: &mut Child) -> io::Result<()> {
    child.start_kill()
}

/// Wait for a terminated process to exit.
///
/// With `kill_after` set, a process still alive after the grace period is
/// killed outright. Returns the exit status and whether the kill was needed.
pub async fn wait_after_terminate(
    child: &mut Child,
    kill_after: Option<Duration>,
) -> io::Result<(ExitStatus, bool)> {
    let Some(grace) = kill_after else {
        return Ok((child.wait().await?, false));
    };

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(status) => Ok((status?, false)),
        Err(_) => {
            warn!(
                pid = child.id(),
                grace_ms = grace.as_millis() as u64,
                "process ignored termination request; killing"
            );
            child.kill().await?;
            Ok((child.wait().await?, true))
        }
    }
}

/// Exit code as recorded on the execution; `-1` when the process was ended
/// by a signal.
pub fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}
