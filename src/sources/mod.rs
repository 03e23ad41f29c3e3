//! Data sources.
//!
//! A [`Source`] inspects one part of the developer environment. Every source
//! answers two questions with very different costs:
//!
//! - [`Source::is_available`]: is there anything to show? Filesystem checks
//!   only, never a subprocess.
//! - [`Source::collect`]: what is there? May shell out and take seconds.
//!
//! Sources declare a [`SourceSpeed`]. Fast sources are collected inline
//! before the first render; slow sources are handed to the background
//! worker pool by the scheduler.

pub mod brew;
pub mod git;
pub mod host;
pub mod id;
pub mod managers;
pub mod npm;
pub mod path;
pub mod python;
pub mod rustup;
pub mod shell_config;
pub mod shell_parse;
pub mod symlinks;

pub use host::HostEnv;
pub use id::SourceId;

use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::entry::Entry;
use crate::error::{DevtopoError, Result};
use crate::remediation::RemediationAction;
use crate::shell::{display_command, CommandResult, ProcessRunner};

/// Ceiling for one remediation command (package installs can be slow).
pub const REMEDIATION_TIMEOUT: Duration = Duration::from_secs(600);

/// Latency class of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceSpeed {
    /// Filesystem only; collected synchronously.
    Fast,
    /// Subprocess-bound; collected in the background.
    Slow,
}

impl fmt::Display for SourceSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceSpeed::Fast => write!(f, "fast"),
            SourceSpeed::Slow => write!(f, "slow"),
        }
    }
}

/// A pluggable view of one ecosystem.
pub trait Source: Send + Sync {
    /// Stable identifier, used for cache keys and on the command line.
    fn id(&self) -> SourceId;

    /// Category label shown as the tree heading.
    fn category(&self) -> &str;

    fn speed(&self) -> SourceSpeed;

    /// Whether the tool is installed AND has at least one item to show.
    ///
    /// Must stay cheap: filesystem existence and stat checks or light
    /// config parsing. Never spawns a process.
    fn is_available(&self) -> bool;

    /// Sub-scopes cached independently (e.g. `global` and `local` package
    /// listings). Empty means the source is cached as a whole.
    fn scopes(&self) -> Vec<String> {
        Vec::new()
    }

    /// Collect every entry for the source.
    fn collect(&self) -> Result<Vec<Entry>>;

    /// Collect one scope. Only called with a value from [`Source::scopes`].
    fn collect_scope(&self, scope: &str) -> Result<Vec<Entry>> {
        let _ = scope;
        self.collect()
    }

    /// Actions this source can perform.
    fn supported_actions(&self) -> &[RemediationAction] {
        &[]
    }

    /// Perform a mutating action, returning a short description of what
    /// happened.
    fn perform_remediation(
        &self,
        action: RemediationAction,
        scope: Option<&str>,
        target: &str,
    ) -> Result<String> {
        let _ = (scope, target);
        Err(DevtopoError::UnsupportedAction {
            source_id: self.id().to_string(),
            action: action.to_string(),
        })
    }
}

/// Whether `dir` exists and has at least one child.
pub(crate) fn dir_has_content(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

/// Names of the subdirectories of `dir`, sorted.
pub(crate) fn subdirectory_names(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| !name.starts_with('.'))
        .collect();
    names.sort();
    names
}

/// Map a failed remediation command into [`DevtopoError::RemediationFailed`].
pub(crate) fn remediation_failed(
    source: &SourceId,
    action: RemediationAction,
    message: impl Into<String>,
) -> DevtopoError {
    DevtopoError::RemediationFailed {
        source_id: source.to_string(),
        action: action.to_string(),
        message: message.into(),
    }
}

/// Run a listing command, turning a non-zero exit into
/// [`DevtopoError::CollectionFailed`] carrying the tool's own message.
pub(crate) fn run_listing(
    runner: &dyn ProcessRunner,
    source: &SourceId,
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<CommandResult> {
    let result = runner.run(program, args, timeout)?;
    if result.success {
        return Ok(result);
    }
    Err(DevtopoError::CollectionFailed {
        source_id: source.to_string(),
        message: format!(
            "`{}` exited with {}: {}",
            display_command(program, args),
            exit_label(result.exit_code),
            result.summary()
        ),
    })
}

/// Run a mutating command on behalf of a remediation.
pub(crate) fn run_remediation(
    runner: &dyn ProcessRunner,
    source: &SourceId,
    action: RemediationAction,
    program: &str,
    args: &[&str],
) -> Result<String> {
    let command = display_command(program, args);
    tracing::info!("Running `{}`", command);
    let result = runner
        .run(program, args, REMEDIATION_TIMEOUT)
        .map_err(|e| remediation_failed(source, action, e.to_string()))?;
    if !result.success {
        return Err(remediation_failed(
            source,
            action,
            format!("`{}` exited with {}: {}", command, exit_label(result.exit_code), result.summary()),
        ));
    }
    Ok(format!("Ran `{}`", command))
}

fn exit_label(code: Option<i32>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "signal".to_string())
}

/// Reject an empty remediation target.
pub(crate) fn require_target<'a>(
    source: &SourceId,
    action: RemediationAction,
    target: &'a str,
) -> Result<&'a str> {
    let target = target.trim();
    if target.is_empty() {
        return Err(remediation_failed(source, action, "a target is required"));
    }
    Ok(target)
}
