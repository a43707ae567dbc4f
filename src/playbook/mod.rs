// src/playbook/mod.rs

//! Playbook provider.
//!
//! The engine only needs [`PlaybookProvider::resolve`] to turn a playbook
//! name into a path before launching; listing is for the front end.

pub mod catalog;
pub mod tags;

use std::collections::BTreeSet;
use std::fmt::Debug;
use std::path::PathBuf;

use serde::Serialize;

use crate::errors::Result;

pub use catalog::{describe_playbook, DirectoryCatalog};
pub use tags::extract_tags;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybookInfo {
    /// File name, e.g. `site.yml`. This is what launches refer to.
    pub name: String,
    pub path: PathBuf,
    pub tags: Vec<String>,
    /// `name` of the first play.
    pub description: Option<String>,
    /// `hosts` of the first play.
    pub hosts: Option<String>,
}

/// Source of playbooks.
pub trait PlaybookProvider: Send + Sync + Debug {
    /// Path of the named playbook, if it exists.
    fn resolve(&self, name: &str) -> Option<PathBuf>;

    /// All playbooks, sorted by name.
    fn list(&self) -> Result<Vec<PlaybookInfo>>;

    fn get(&self, name: &str) -> Result<Option<PlaybookInfo>> {
        Ok(self.list()?.into_iter().find(|p| p.name == name))
    }

    /// Union of the tags of every playbook.
    fn all_tags(&self) -> Result<BTreeSet<String>> {
        Ok(self
            .list()?
            .into_iter()
            .flat_map(|p| p.tags)
            .collect())
    }
}
