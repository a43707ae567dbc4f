// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw
/// `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** validate.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load, validate, and root the project directory at the config file's
/// parent.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let raw_config = load_from_path(path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config.rooted_at(&config_root_dir(path)))
}

/// Like [`load_and_validate`], but a missing file at the *default* location
/// yields the built-in defaults rooted at the current directory.
///
/// An explicitly requested file that does not exist is still an error.
pub fn load_or_default(path: impl AsRef<Path>, explicit: bool) -> Result<ConfigFile> {
    let path = path.as_ref();
    if !explicit && !path.exists() {
        debug!(path = %path.display(), "no config file found; using defaults");
        let cwd = std::env::current_dir()?;
        return Ok(ConfigFile::default().rooted_at(&cwd));
    }
    load_and_validate(path)
}

/// Default config path: `Playctl.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Playctl.toml")
}

/// - If the config path has a non-empty parent, use that directory.
/// - For a bare file name, fall back to the current working directory.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
