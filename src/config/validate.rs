// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile, RawRunnerSection, RunnerSettings};
use crate::errors::{PlayctlError, Result};
use crate::types::parse_duration;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = PlayctlError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let runner = validate_runner(raw.runner)?;
        Ok(ConfigFile::new_unchecked(raw.project, runner))
    }
}

fn validate_runner(raw: RawRunnerSection) -> Result<RunnerSettings> {
    ensure_has_command(&raw)?;

    let kill_after = if raw.kill_after.trim().is_empty() {
        None
    } else {
        let dur = parse_duration(&raw.kill_after).map_err(|e| {
            PlayctlError::ConfigError(format!("[runner].kill_after: {e}"))
        })?;
        Some(dur)
    };

    if raw.max_retained == Some(0) {
        return Err(PlayctlError::ConfigError(
            "[runner].max_retained must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(RunnerSettings {
        command: raw.command,
        ask_password: raw.ask_password,
        kill_after,
        max_retained: raw.max_retained,
    })
}

fn ensure_has_command(raw: &RawRunnerSection) -> Result<()> {
    match raw.command.first() {
        None => Err(PlayctlError::ConfigError(
            "[runner].command must contain at least the program name".to_string(),
        )),
        Some(program) if program.trim().is_empty() => Err(PlayctlError::ConfigError(
            "[runner].command program name must not be empty".to_string(),
        )),
        Some(_) => Ok(()),
    }
}
