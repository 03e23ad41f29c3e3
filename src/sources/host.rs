//! Snapshot of the host environment a session inspects.
//!
//! Sources read the home directory, working directory, and environment
//! variables through [`HostEnv`] instead of the process globals so tests
//! can point them at a temporary directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{DevtopoError, Result};

#[derive(Debug, Clone)]
pub struct HostEnv {
    home: PathBuf,
    cwd: PathBuf,
    vars: HashMap<String, String>,
}

impl HostEnv {
    /// Environment with no variables set.
    pub fn new(home: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            cwd: cwd.into(),
            vars: HashMap::new(),
        }
    }

    /// Capture the current process environment.
    pub fn capture() -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            DevtopoError::Other(anyhow::anyhow!("could not determine home directory"))
        })?;
        let cwd = std::env::current_dir()?;
        Ok(Self {
            home,
            cwd,
            vars: std::env::vars().collect(),
        })
    }

    /// Set a variable (builder style).
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// A variable's value, treating empty as unset.
    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Directory named by `var`, or `default` under the home directory.
    ///
    /// Tool roots such as `NVM_DIR` or `RUSTUP_HOME` resolve this way.
    pub fn dir_from_var(&self, var: &str, default: &str) -> PathBuf {
        match self.var(var) {
            Some(value) => PathBuf::from(value),
            None => self.home.join(default),
        }
    }

    /// `PATH` split into its directories, skipping empty segments.
    pub fn path_dirs(&self) -> Vec<String> {
        self.var("PATH")
            .map(|path| {
                std::env::split_paths(path)
                    .map(|p| p.to_string_lossy().into_owned())
                    .filter(|p| !p.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}
