// src/inventory/mod.rs

//! Inventory provider.
//!
//! Reads an INI inventory into groups, hosts and group variables. The engine
//! itself only ever needs host *names*; the richer records are for listing.

pub mod parser;

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::Serialize;

use crate::errors::{PlayctlError, Result};

pub use parser::parse_inventory;

/// Group that collects host lines appearing before any section header.
pub const UNGROUPED: &str = "ungrouped";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostRecord {
    pub name: String,
    /// Value of `ansible_host`, if set.
    pub ip: Option<String>,
    pub group: String,
    pub vars: IndexMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub name: String,
    pub hosts: Vec<HostRecord>,
    /// Child group names from `[name:children]`.
    pub children: Vec<String>,
}

impl Group {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            hosts: Vec::new(),
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Inventory {
    groups: IndexMap<String, Group>,
    group_vars: IndexMap<String, IndexMap<String, String>>,
}

impl Inventory {
    pub(crate) fn from_parts(
        mut groups: IndexMap<String, Group>,
        group_vars: IndexMap<String, IndexMap<String, String>>,
    ) -> Self {
        // The implicit group only shows up when something landed in it.
        if groups.get(UNGROUPED).is_some_and(|g| g.hosts.is_empty() && g.children.is_empty()) {
            groups.shift_remove(UNGROUPED);
        }
        Self { groups, group_vars }
    }

    /// Read and parse an inventory file. A missing file is an error here;
    /// the launcher tolerates it separately.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(PlayctlError::InventoryError(format!(
                "inventory file not found: {}",
                path.display()
            )));
        }
        let text = fs::read_to_string(path)?;
        Ok(parse_inventory(&text))
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }

    pub fn group_names(&self) -> Vec<&str> {
        self.groups.keys().map(String::as_str).collect()
    }

    pub fn group_vars(&self, name: &str) -> Option<&IndexMap<String, String>> {
        self.group_vars.get(name)
    }

    /// All host records in file order (a host listed in two groups appears
    /// twice).
    pub fn hosts(&self) -> impl Iterator<Item = &HostRecord> {
        self.groups.values().flat_map(|g| g.hosts.iter())
    }

    /// Hosts of a group, including hosts of its child groups.
    pub fn hosts_in(&self, name: &str) -> Vec<&HostRecord> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        self.collect_hosts(name, &mut seen, &mut out);
        out
    }

    fn collect_hosts<'a>(
        &'a self,
        name: &str,
        seen: &mut HashSet<String>,
        out: &mut Vec<&'a HostRecord>,
    ) {
        if !seen.insert(name.to_string()) {
            return;
        }
        if let Some(group) = self.groups.get(name) {
            out.extend(group.hosts.iter());
            for child in &group.children {
                self.collect_hosts(child, seen, out);
            }
        }
    }

    /// Distinct host names in first-seen order.
    pub fn host_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.hosts()
            .filter(|h| seen.insert(h.name.clone()))
            .map(|h| h.name.clone())
            .collect()
    }
}
