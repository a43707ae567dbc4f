// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`command`] builds the argument vector for a launch.
//! - [`launcher`] spawns the process with piped output, terminates it on
//!   cancel and reaps it.
//! - [`relay`] forwards output to the record, the log file and observers.
//!
//! The per-execution worker that drives these lives in
//! [`crate::engine::lifecycle`].

pub mod command;
pub mod launcher;
pub mod relay;

pub use command::{build_command_line, CommandLine};
pub use launcher::{spawn_process, RunningProcess};
pub use relay::{OutputObserver, OutputRelay};
