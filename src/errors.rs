// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlayctlError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Playbook not found: {0}")]
    PlaybookNotFound(String),

    #[error("Failed to launch playbook '{playbook}' (execution {execution}): {source}")]
    LaunchFailed {
        playbook: String,
        execution: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Execution not found: {0}")]
    NotFound(String),

    #[error("Execution cannot be cancelled: {0}")]
    NotCancellable(String),

    #[error("Inventory error: {0}")]
    InventoryError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PlayctlError>;
