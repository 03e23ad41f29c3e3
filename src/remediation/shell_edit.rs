//! Shell config editing with backups.
//!
//! Every edit copies the file into the backup directory first, named
//! `<file>.<YYYYmmdd_HHMMSS>.bak`, with a counter before `.bak` when several
//! edits land in the same second.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::{DevtopoError, Result};

/// A `file:line` reference (1-based line).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRef {
    pub file: PathBuf,
    pub line: usize,
}

impl LineRef {
    /// Parse `path/to/file:42`. Splits on the last colon.
    pub fn parse(target: &str) -> Option<Self> {
        let (file, line) = target.trim().rsplit_once(':')?;
        let line: usize = line.parse().ok()?;
        if file.is_empty() || line == 0 {
            return None;
        }
        Some(Self {
            file: PathBuf::from(file),
            line,
        })
    }
}

/// Outcome of removing a line.
#[derive(Debug, Clone)]
pub struct LineRemoval {
    /// Where the pre-edit copy was written.
    pub backup: PathBuf,
    /// The removed line, without its terminator.
    pub removed: String,
}

/// Copy `file` into `backup_dir` with a timestamped name.
pub fn backup_file(file: &Path, backup_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(backup_dir)?;
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "config".to_string());
    let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup = unused_backup_path(backup_dir, &name, &stamp);
    fs::copy(file, &backup)?;
    tracing::debug!("Backed up {} to {}", file.display(), backup.display());
    Ok(backup)
}

/// `<name>.<stamp>.bak`, or `<name>.<stamp>.<n>.bak` when earlier edits in
/// the same second already took that name.
fn unused_backup_path(backup_dir: &Path, name: &str, stamp: &str) -> PathBuf {
    let first = backup_dir.join(format!("{}.{}.bak", name, stamp));
    if !first.exists() {
        return first;
    }
    (1..)
        .map(|n| backup_dir.join(format!("{}.{}.{}.bak", name, stamp, n)))
        .find(|candidate| !candidate.exists())
        .unwrap_or(first)
}

/// Remove line `line` (1-based) from `file`, backing it up first.
///
/// Out-of-range lines are refused before anything is written.
pub fn remove_line(file: &Path, line: usize, backup_dir: &Path) -> Result<LineRemoval> {
    let content = fs::read_to_string(file)?;
    let mut lines: Vec<&str> = content.split_inclusive('\n').collect();

    if line == 0 || line > lines.len() {
        return Err(DevtopoError::Other(anyhow::anyhow!(
            "line {} is out of range for {} ({} lines)",
            line,
            file.display(),
            lines.len()
        )));
    }

    let backup = backup_file(file, backup_dir)?;
    let removed = lines.remove(line - 1);
    let removed = removed.trim_end_matches(['\n', '\r']).to_string();
    fs::write(file, lines.concat())?;

    Ok(LineRemoval { backup, removed })
}
