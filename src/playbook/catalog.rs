// src/playbook/catalog.rs

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use serde_yaml::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::playbook::tags::extract_tags;
use crate::playbook::{PlaybookInfo, PlaybookProvider};

/// Playbooks are the `*.yml` / `*.yaml` files directly inside one directory.
#[derive(Debug, Clone)]
pub struct DirectoryCatalog {
    dir: PathBuf,
}

impl DirectoryCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn playbook_paths(&self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("reading playbook directory {:?}", self.dir))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry
                .with_context(|| format!("listing playbook directory {:?}", self.dir))?
                .path();
            if path.is_file() && is_yaml(&path) {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

impl PlaybookProvider for DirectoryCatalog {
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        if !is_plain_file_name(name) {
            warn!(playbook = %name, "rejecting playbook name that is not a plain file name");
            return None;
        }
        let path = self.dir.join(name);
        path.is_file().then_some(path)
    }

    fn list(&self) -> Result<Vec<PlaybookInfo>> {
        self.playbook_paths()?
            .into_iter()
            .map(|path| describe_playbook(&path))
            .collect()
    }
}

/// Build a [`PlaybookInfo`] for a single file.
///
/// Tags come from the text scan; `description` and `hosts` come from the
/// first play when the file parses as YAML. A YAML error only loses those
/// two fields.
pub fn describe_playbook(path: &Path) -> Result<PlaybookInfo> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading playbook {:?}", path))?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut info = PlaybookInfo {
        name,
        path: path.to_path_buf(),
        tags: extract_tags(&content).into_iter().collect(),
        description: None,
        hosts: None,
    };

    match serde_yaml::from_str::<Value>(&content) {
        Ok(Value::Sequence(plays)) => {
            if let Some(Value::Mapping(first)) = plays.first() {
                info.description = first.get("name").and_then(scalar_to_string);
                info.hosts = first.get("hosts").and_then(hosts_to_string);
            }
        }
        Ok(_) => {
            debug!(playbook = %info.name, "playbook is not a list of plays");
        }
        Err(e) => {
            debug!(playbook = %info.name, error = %e, "playbook is not valid YAML; keeping tags only");
        }
    }

    Ok(info)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn hosts_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Sequence(items) => {
            let names: Vec<String> = items.iter().filter_map(scalar_to_string).collect();
            (!names.is_empty()).then(|| names.join(","))
        }
        other => scalar_to_string(other),
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml") | Some("yaml")
    )
}

/// Exactly one normal path component: no separators, no `..`, not absolute.
fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
