// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Command-line arguments for `playctl`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "playctl",
    version,
    about = "Launch ad-hoc playbook runs and follow their output.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Playctl.toml` in the current working directory. When the
    /// default file does not exist, built-in defaults are used.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PLAYCTL_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run a playbook and stream its output until it finishes.
    Run(RunArgs),

    /// List playbooks with their description and tags.
    Playbooks {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Print the union of tags across all playbooks.
    Tags,

    /// Print inventory groups and their hosts.
    Inventory {
        /// Only this group (hosts of child groups included).
        #[arg(long, value_name = "NAME")]
        group: Option<String>,

        /// Print JSON instead of a listing.
        #[arg(long)]
        json: bool,
    },

    /// Print the log file of an execution.
    Logs {
        /// Execution id, as printed by `run`.
        id: String,
    },
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Playbook file name inside the project directory, e.g. `site.yml`.
    pub playbook: String,

    /// Comma-separated hosts or groups to limit the run to.
    #[arg(long, value_delimiter = ',', value_name = "HOSTS")]
    pub hosts: Vec<String>,

    /// Comma-separated tags to run.
    #[arg(long, value_delimiter = ',', value_name = "TAGS")]
    pub tags: Vec<String>,

    /// Extra variable, repeatable.
    #[arg(short = 'e', long = "extra-var", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub extra_vars: Vec<(String, String)>,

    /// Prompt for the SSH password (the terminal's stdin is passed through).
    #[arg(long)]
    pub ask_pass: bool,

    /// Print the command line without running it.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Parse `KEY=VALUE`. The value may itself contain `=`.
pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
