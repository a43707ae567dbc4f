// src/inventory/parser.rs

//! Line-oriented parser for INI inventories.

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::inventory::{Group, HostRecord, Inventory, UNGROUPED};

/// Which kind of section the parser is currently inside.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Section {
    Hosts(String),
    Vars(String),
    Children(String),
}

/// Parse INI inventory text.
///
/// Recognised:
/// - blank lines and `#` / `;` comments (skipped)
/// - `[group]`, `[group:vars]`, `[group:children]` headers
/// - host lines `name key=value ...` (`ansible_host` becomes the host IP)
/// - `key=value` lines inside `:vars` sections
/// - group names inside `:children` sections
///
/// Host lines appearing before any header land in `ungrouped`.
pub fn parse_inventory(text: &str) -> Inventory {
    let mut groups: IndexMap<String, Group> = IndexMap::new();
    let mut group_vars: IndexMap<String, IndexMap<String, String>> = IndexMap::new();
    let mut section = Section::Hosts(UNGROUPED.to_string());

    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(header) = parse_header(line) {
            section = header;
            match &section {
                Section::Hosts(name) | Section::Children(name) => {
                    groups
                        .entry(name.clone())
                        .or_insert_with(|| Group::new(name.clone()));
                }
                Section::Vars(name) => {
                    group_vars.entry(name.clone()).or_default();
                }
            }
            continue;
        }

        match &section {
            Section::Hosts(group) => {
                let host = parse_host_line(line, group);
                debug!(group = %group, host = %host.name, "parsed inventory host");
                groups
                    .entry(group.clone())
                    .or_insert_with(|| Group::new(group.clone()))
                    .hosts
                    .push(host);
            }
            Section::Vars(group) => match line.split_once('=') {
                Some((key, value)) => {
                    group_vars
                        .entry(group.clone())
                        .or_default()
                        .insert(key.trim().to_string(), value.trim().to_string());
                }
                None => {
                    warn!(group = %group, line = lineno + 1, "ignoring vars line without '='");
                }
            },
            Section::Children(group) => {
                if let Some(child) = line.split_whitespace().next() {
                    if let Some(g) = groups.get_mut(group) {
                        g.children.push(child.to_string());
                    }
                }
            }
        }
    }

    Inventory::from_parts(groups, group_vars)
}

fn parse_header(line: &str) -> Option<Section> {
    let inner = line.strip_prefix('[')?.strip_suffix(']')?.trim();
    if inner.is_empty() {
        return None;
    }
    if let Some(name) = inner.strip_suffix(":vars") {
        return Some(Section::Vars(name.to_string()));
    }
    if let Some(name) = inner.strip_suffix(":children") {
        return Some(Section::Children(name.to_string()));
    }
    Some(Section::Hosts(inner.to_string()))
}

fn parse_host_line(line: &str, group: &str) -> HostRecord {
    let mut parts = line.split_whitespace();
    let name = parts.next().unwrap_or_default().to_string();

    let mut vars = IndexMap::new();
    for part in parts {
        if let Some((key, value)) = part.split_once('=') {
            vars.insert(key.to_string(), value.to_string());
        }
    }

    let ip = vars.get("ansible_host").cloned();

    HostRecord {
        name,
        ip,
        group: group.to_string(),
        vars,
    }
}
