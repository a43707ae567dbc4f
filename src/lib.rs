// src/lib.rs

pub mod cli;
pub mod config;
pub mod console;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod inventory;
pub mod logging;
pub mod playbook;
pub mod types;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::{CliArgs, Command, RunArgs};
use crate::config::{default_config_path, load_or_default, ConfigFile};
use crate::console::TerminalObserver;
use crate::engine::{read_log_file, Engine, ExecutionId, ExecutionSnapshot, LaunchRequest};
use crate::errors::PlayctlError;
use crate::inventory::Inventory;
use crate::playbook::{DirectoryCatalog, PlaybookProvider};
use crate::types::ExecutionStatus;

/// Exit code of a run that was cancelled with Ctrl-C.
pub const EXIT_CANCELLED: i32 = 130;

/// High-level entry point used by `main.rs`. Returns the process exit code.
pub async fn run(args: CliArgs) -> Result<i32> {
    let explicit = args.config.is_some();
    let config_path = args.config.unwrap_or_else(default_config_path);
    let cfg = load_or_default(&config_path, explicit)
        .with_context(|| format!("loading config {}", config_path.display()))?;

    match args.command {
        Command::Run(run_args) => run_playbook(cfg, run_args).await,
        Command::Playbooks { json } => {
            let playbooks = DirectoryCatalog::new(cfg.project_dir()).list()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&playbooks)?);
            } else {
                console::print_playbooks(&playbooks);
            }
            Ok(0)
        }
        Command::Tags => {
            for tag in DirectoryCatalog::new(cfg.project_dir()).all_tags()? {
                println!("{tag}");
            }
            Ok(0)
        }
        Command::Inventory { group, json } => {
            let inventory = Inventory::load(cfg.inventory_path())?;
            match group {
                Some(name) => {
                    if inventory.group(&name).is_none() {
                        return Err(PlayctlError::InventoryError(format!("no such group: {name}")).into());
                    }
                    let hosts = inventory.hosts_in(&name);
                    if json {
                        println!("{}", serde_json::to_string_pretty(&hosts)?);
                    } else {
                        console::print_group(&name, &hosts);
                    }
                }
                None if json => println!("{}", serde_json::to_string_pretty(&inventory)?),
                None => console::print_inventory(&inventory),
            }
            Ok(0)
        }
        Command::Logs { id } => {
            print!("{}", read_log_file(&cfg, &ExecutionId::from(id))?);
            Ok(0)
        }
    }
}

/// Launch one playbook, stream its output and map the outcome to an exit
/// code. Ctrl-C cancels the run.
async fn run_playbook(cfg: ConfigFile, args: RunArgs) -> Result<i32> {
    let ask_password = args.ask_pass || cfg.runner.ask_password;
    let mut request = LaunchRequest::new(args.playbook)
        .hosts(args.hosts)
        .tags(args.tags)
        .ask_password(ask_password);
    for (key, value) in args.extra_vars {
        request = request.extra_var(key, value);
    }

    let engine = Engine::new(cfg)?;

    if args.dry_run {
        let command_line = engine.prepare(&request)?;
        println!("{command_line}");
        return Ok(0);
    }

    let id = engine.launch(request, Some(Arc::new(TerminalObserver)))?;
    eprintln!("execution {id} started");

    let snapshot = tokio::select! {
        done = engine.wait(&id) => done?,
        signal = tokio::signal::ctrl_c() => {
            signal.context("listening for Ctrl-C")?;
            info!(execution = %id, "interrupt received; cancelling");
            if let Err(e) = engine.cancel(&id) {
                // The run finished on its own in the meantime.
                warn!(execution = %id, error = %e, "cancel not applied");
            }
            engine.wait(&id).await?
        }
    };
    // The process may still be shutting down and flushing its log.
    engine.join(&id).await;

    console::print_outcome(&snapshot);
    Ok(exit_code_for(&snapshot))
}

/// `0` on success, the process's exit code on failure (`1` when there is
/// none), `130` when cancelled.
pub fn exit_code_for(snapshot: &ExecutionSnapshot) -> i32 {
    match snapshot.status {
        ExecutionStatus::Success => 0,
        ExecutionStatus::Cancelled => EXIT_CANCELLED,
        ExecutionStatus::Failed => match snapshot.return_code {
            Some(code) if code > 0 => code,
            _ => 1,
        },
        ExecutionStatus::Pending | ExecutionStatus::Running => 1,
    }
}
