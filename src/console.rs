// src/console.rs

//! Terminal rendering for the CLI: the live output observer and the listing
//! commands.

use std::io::Write;

use anyhow::Result;

use crate::engine::ExecutionSnapshot;
use crate::exec::OutputObserver;
use crate::inventory::{HostRecord, Inventory};
use crate::playbook::PlaybookInfo;
use crate::types::OutputStream;

/// Echoes execution output to the terminal: stdout lines to stdout, the
/// stderr block to stderr.
#[derive(Debug, Default)]
pub struct TerminalObserver;

impl OutputObserver for TerminalObserver {
    fn on_output(&self, stream: OutputStream, text: &str) -> Result<()> {
        match stream {
            OutputStream::Stdout => {
                let mut out = std::io::stdout().lock();
                writeln!(out, "{text}")?;
                out.flush()?;
            }
            OutputStream::Stderr => {
                let mut err = std::io::stderr().lock();
                err.write_all(text.as_bytes())?;
                if !text.ends_with('\n') {
                    writeln!(err)?;
                }
            }
        }
        Ok(())
    }
}

pub fn print_playbooks(playbooks: &[PlaybookInfo]) {
    if playbooks.is_empty() {
        println!("no playbooks found");
        return;
    }

    let width = playbooks.iter().map(|p| p.name.len()).max().unwrap_or(0);
    for pb in playbooks {
        let description = pb.description.as_deref().unwrap_or("-");
        println!("{:<width$}  {}", pb.name, description);
        if let Some(hosts) = &pb.hosts {
            println!("{:<width$}    hosts: {}", "", hosts);
        }
        if !pb.tags.is_empty() {
            println!("{:<width$}    tags: {}", "", pb.tags.join(", "));
        }
    }
}

pub fn print_inventory(inventory: &Inventory) {
    for group in inventory.groups() {
        println!("[{}]", group.name);
        for host in &group.hosts {
            println!("  {}", render_host(host));
        }
        for child in &group.children {
            println!("  @{child}");
        }
    }
}

pub fn print_group(name: &str, hosts: &[&HostRecord]) {
    println!("[{name}]");
    for host in hosts {
        println!("  {}", render_host(host));
    }
}

fn render_host(host: &HostRecord) -> String {
    match &host.ip {
        Some(ip) => format!("{} ({ip})", host.name),
        None => host.name.clone(),
    }
}

/// One-line outcome written to stderr after `run`.
pub fn print_outcome(snapshot: &ExecutionSnapshot) {
    let code = snapshot
        .return_code
        .map(|c| format!(" (exit code {c})"))
        .unwrap_or_default();
    eprintln!("execution {} {}{}", snapshot.id, snapshot.status, code);
}
