//! Settings file schema.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::shell::{default_shell_configs, expand_home};
use crate::sources::shell_config::ConfigFile;
use crate::sources::SourceId;

/// Directories scanned for symlinks when `symlink_dirs` is unset.
const DEFAULT_SYMLINK_DIRS: &[&str] = &["/opt/homebrew/bin", "/usr/local/bin", "/usr/bin", "~/.local/bin"];

/// Directories searched for git repositories when `git_roots` is unset.
const DEFAULT_GIT_ROOTS: &[&str] = &["~/code", "~/src", "~/projects", "~/dev", "~/Developer"];

/// Contents of `~/.devtopo/config.yml`. Every field is optional.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Ceiling for one background collection, in seconds
    #[serde(default = "default_collection_timeout")]
    pub collection_timeout_secs: u64,

    /// Delay before background collections start, in milliseconds
    #[serde(default = "default_startup_delay")]
    pub startup_delay_ms: u64,

    /// Upper bound on background worker threads
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Source ids never registered
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled_sources: Vec<String>,

    /// Directories the symlink source scans (`~` allowed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symlink_dirs: Option<Vec<String>>,

    /// Directories searched for git repositories (`~` allowed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_roots: Option<Vec<String>>,

    /// Shell config files scanned, in load order (`~` allowed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shell_configs: Option<Vec<String>>,

    /// Where shell config edits write backups
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_dir: Option<String>,
}

fn default_collection_timeout() -> u64 {
    30
}

fn default_startup_delay() -> u64 {
    50
}

fn default_max_workers() -> usize {
    4
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            collection_timeout_secs: default_collection_timeout(),
            startup_delay_ms: default_startup_delay(),
            max_workers: default_max_workers(),
            disabled_sources: Vec::new(),
            symlink_dirs: None,
            git_roots: None,
            shell_configs: None,
            backup_dir: None,
        }
    }
}

impl Settings {
    pub fn collection_timeout(&self) -> Duration {
        Duration::from_secs(self.collection_timeout_secs)
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    pub fn is_disabled(&self, id: &SourceId) -> bool {
        self.disabled_sources.iter().any(|d| SourceId::new(d) == *id)
    }

    pub fn symlink_dirs(&self, home: &Path) -> Vec<PathBuf> {
        match &self.symlink_dirs {
            Some(dirs) => dirs.iter().map(|d| expand_home(d, home)).collect(),
            None => DEFAULT_SYMLINK_DIRS.iter().map(|d| expand_home(d, home)).collect(),
        }
    }

    pub fn git_roots(&self, home: &Path) -> Vec<PathBuf> {
        match &self.git_roots {
            Some(dirs) => dirs.iter().map(|d| expand_home(d, home)).collect(),
            None => DEFAULT_GIT_ROOTS.iter().map(|d| expand_home(d, home)).collect(),
        }
    }

    pub fn shell_configs(&self, home: &Path) -> Vec<ConfigFile> {
        match &self.shell_configs {
            Some(files) => files
                .iter()
                .map(|f| ConfigFile {
                    path: expand_home(f, home),
                    description: "Listed in settings".to_string(),
                })
                .collect(),
            None => default_shell_configs(home)
                .into_iter()
                .map(|(path, description)| ConfigFile {
                    path,
                    description: description.to_string(),
                })
                .collect(),
        }
    }

    pub fn backup_dir(&self, home: &Path) -> PathBuf {
        match &self.backup_dir {
            Some(dir) => expand_home(dir, home),
            None => home.join(".devtopo").join("backups"),
        }
    }
}
