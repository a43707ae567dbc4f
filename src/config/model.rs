// src/config/model.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [project]
/// dir = "."
/// inventory = "inventory.ini"
/// logs_dir = "logs"
///
/// [runner]
/// command = ["ansible-playbook"]
/// ask_password = false
/// kill_after = "10s"
/// max_retained = 500
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub project: ProjectSection,

    #[serde(default)]
    pub runner: RawRunnerSection,
}

/// `[project]` section.
///
/// `dir` is resolved against the directory holding the config file;
/// `inventory` and `logs_dir` are resolved against `dir`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSection {
    /// Directory containing the playbooks. Also the working directory of
    /// every launched process.
    #[serde(default = "default_project_dir")]
    pub dir: PathBuf,

    /// Inventory file passed with `-i` when it exists.
    #[serde(default = "default_inventory")]
    pub inventory: PathBuf,

    /// Where per-execution log files are written.
    #[serde(default = "default_logs_dir")]
    pub logs_dir: PathBuf,
}

fn default_project_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_inventory() -> PathBuf {
    PathBuf::from("inventory.ini")
}

fn default_logs_dir() -> PathBuf {
    PathBuf::from("logs")
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            dir: default_project_dir(),
            inventory: default_inventory(),
            logs_dir: default_logs_dir(),
        }
    }
}

/// `[runner]` section exactly as written in TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRunnerSection {
    /// Base argument vector; playbook arguments are appended to it.
    #[serde(default = "default_command")]
    pub command: Vec<String>,

    /// Whether `-k` is passed when a launch does not say otherwise.
    #[serde(default)]
    pub ask_password: bool,

    /// Grace period between SIGTERM and SIGKILL on cancel (e.g. `"10s"`).
    /// An empty string disables escalation.
    #[serde(default = "default_kill_after")]
    pub kill_after: String,

    /// Upper bound on records kept in memory. Unbounded when absent.
    #[serde(default)]
    pub max_retained: Option<usize>,
}

fn default_command() -> Vec<String> {
    vec!["ansible-playbook".to_string()]
}

fn default_kill_after() -> String {
    "10s".to_string()
}

impl Default for RawRunnerSection {
    fn default() -> Self {
        Self {
            command: default_command(),
            ask_password: false,
            kill_after: default_kill_after(),
            max_retained: None,
        }
    }
}

/// Validated `[runner]` settings.
#[derive(Debug, Clone)]
pub struct RunnerSettings {
    pub command: Vec<String>,
    pub ask_password: bool,
    pub kill_after: Option<Duration>,
    pub max_retained: Option<usize>,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            command: default_command(),
            ask_password: false,
            kill_after: Some(Duration::from_secs(10)),
            max_retained: None,
        }
    }
}

/// Validated configuration.
///
/// Can only be obtained through [`TryFrom<RawConfigFile>`] (see
/// `validate.rs`) or the constructors below, which start from defaults.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    pub project: ProjectSection,
    pub runner: RunnerSettings,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(project: ProjectSection, runner: RunnerSettings) -> Self {
        Self { project, runner }
    }

    /// Defaults rooted at `dir`.
    pub fn for_project(dir: impl Into<PathBuf>) -> Self {
        let mut cfg = Self::default();
        cfg.project.dir = dir.into();
        cfg
    }

    /// Make `project.dir` absolute relative to `base` (usually the config
    /// file's parent directory).
    pub fn rooted_at(mut self, base: &Path) -> Self {
        if self.project.dir.is_relative() {
            self.project.dir = base.join(&self.project.dir);
        }
        self
    }

    pub fn project_dir(&self) -> &Path {
        &self.project.dir
    }

    pub fn inventory_path(&self) -> PathBuf {
        self.project.dir.join(&self.project.inventory)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.project.dir.join(&self.project.logs_dir)
    }
}
