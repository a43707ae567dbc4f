#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use playctl::config::{ConfigFile, ProjectSection, RawConfigFile, RawRunnerSection};
use playctl::engine::Engine;
use tempfile::TempDir;

/// Name passed as `$0` to fake runner scripts.
pub const FAKE_PROGRAM: &str = "fake-ansible";

/// Builder for `ConfigFile` to simplify test setup.
///
/// Goes through the same validation as a config file read from disk.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new(project_dir: &Path) -> Self {
        Self {
            config: RawConfigFile {
                project: ProjectSection {
                    dir: project_dir.to_path_buf(),
                    ..ProjectSection::default()
                },
                runner: RawRunnerSection::default(),
            },
        }
    }

    pub fn command(mut self, argv: &[&str]) -> Self {
        self.config.runner.command = argv.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Use `sh -c <script>` as the runner. The playbook arguments land in
    /// `$1..` where the script can inspect or ignore them.
    pub fn script(self, script: &str) -> Self {
        self.command(&["sh", "-c", script, FAKE_PROGRAM])
    }

    pub fn kill_after(mut self, value: &str) -> Self {
        self.config.runner.kill_after = value.to_string();
        self
    }

    pub fn max_retained(mut self, max: usize) -> Self {
        self.config.runner.max_retained = Some(max);
        self
    }

    pub fn ask_password(mut self, val: bool) -> Self {
        self.config.runner.ask_password = val;
        self
    }

    pub fn inventory(mut self, file: &str) -> Self {
        self.config.project.inventory = PathBuf::from(file);
        self
    }

    pub fn logs_dir(mut self, dir: &str) -> Self {
        self.config.project.logs_dir = PathBuf::from(dir);
        self
    }

    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

/// A throwaway project directory holding playbooks, an inventory and logs.
pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp project dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.path().join("logs")
    }

    pub fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&path, content).expect("write project file");
        path
    }

    pub fn write_playbook(&self, name: &str, content: &str) -> PathBuf {
        self.write_file(name, content)
    }

    /// A minimal playbook; the fake runner never reads it.
    pub fn touch_playbook(&self, name: &str) -> PathBuf {
        self.write_playbook(name, "- name: test play\n  hosts: all\n  tasks: []\n")
    }

    pub fn write_inventory(&self, content: &str) -> PathBuf {
        self.write_file("inventory.ini", content)
    }

    pub fn config(&self) -> ConfigFileBuilder {
        ConfigFileBuilder::new(self.path())
    }

    /// Engine whose runner is `sh -c <script>`.
    pub fn engine_with_script(&self, script: &str) -> Engine {
        Engine::new(self.config().script(script).build()).expect("build engine")
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}
