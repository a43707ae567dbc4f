// src/exec/command.rs

//! Deterministic construction of the automation command line.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::engine::LaunchRequest;

/// A fully materialized argument vector plus the directory to run it in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl CommandLine {
    /// Program followed by its arguments.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }

    /// True if `a` and `b` appear as adjacent arguments, in that order.
    pub fn has_arg_pair(&self, a: &str, b: &str) -> bool {
        self.args.windows(2).any(|w| w[0] == a && w[1] == b)
    }
}

impl fmt::Display for CommandLine {
    /// Shell-like rendering for display and audit; not meant to be re-parsed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.argv().iter().map(|a| quote_arg(a)).collect();
        f.write_str(&rendered.join(" "))
    }
}

/// Build the command line for one launch.
///
/// Order:
/// 1. `base` (program and any fixed leading arguments)
/// 2. `-i <inventory>` if the inventory file exists
/// 3. the playbook path
/// 4. `-e local=<hosts>` if hosts were given
/// 5. `-t <tags>` if tags were given
/// 6. `-e key=value` per extra var, in insertion order
/// 7. `-k` if a password prompt was requested
///
/// The caller must already have checked that `playbook` exists; `base` must
/// be non-empty (guaranteed by config validation).
pub fn build_command_line(
    base: &[String],
    inventory: &Path,
    playbook: &Path,
    request: &LaunchRequest,
    working_dir: &Path,
) -> CommandLine {
    let (program, prefix) = match base.split_first() {
        Some((program, rest)) => (program.clone(), rest.to_vec()),
        None => (String::new(), Vec::new()),
    };

    let mut args = prefix;

    if inventory.is_file() {
        args.push("-i".to_string());
        args.push(inventory.display().to_string());
    }

    args.push(playbook.display().to_string());

    if !request.hosts.is_empty() {
        args.push("-e".to_string());
        args.push(format!("local={}", request.hosts.join(",")));
    }

    if !request.tags.is_empty() {
        args.push("-t".to_string());
        args.push(request.tags.join(","));
    }

    for (key, value) in &request.extra_vars {
        args.push("-e".to_string());
        args.push(format!("{key}={value}"));
    }

    if request.ask_password {
        args.push("-k".to_string());
    }

    CommandLine {
        program,
        args,
        working_dir: working_dir.to_path_buf(),
    }
}

fn quote_arg(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=,:@+%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
