// src/config/mod.rs

//! Configuration loading and validation for playctl.
//!
//! - The TOML-backed data model lives in `model.rs`.
//! - `loader.rs` reads a config file from disk.
//! - `validate.rs` turns a raw file into a validated [`ConfigFile`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{ConfigFile, ProjectSection, RawConfigFile, RawRunnerSection, RunnerSettings};
