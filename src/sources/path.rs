//! `$PATH` directories.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::entry::{Entry, Status};
use crate::error::Result;
use crate::remediation::{shell_edit, RemediationAction};

use super::shell_parse::path_additions;
use super::{remediation_failed, HostEnv, Source, SourceId, SourceSpeed};

/// Directories Homebrew installs into.
const HOMEBREW_DIRS: &[&str] = &["/opt/homebrew/bin", "/opt/homebrew/sbin", "/usr/local/bin"];

/// One entry per `$PATH` directory, in search order.
///
/// Missing directories are errors; duplicates and non-directories are
/// warnings. When a shell config line adds the directory, the entry
/// records which file and line.
pub struct PathSource {
    env: Arc<HostEnv>,
    shell_configs: Vec<PathBuf>,
    backup_dir: PathBuf,
}

impl PathSource {
    pub fn new(env: Arc<HostEnv>, shell_configs: Vec<PathBuf>, backup_dir: PathBuf) -> Self {
        Self {
            env,
            shell_configs,
            backup_dir,
        }
    }

    /// First config file and line adding each directory.
    fn definitions(&self) -> HashMap<String, (PathBuf, usize)> {
        let mut found = HashMap::new();
        for config in &self.shell_configs {
            let Ok(content) = fs::read_to_string(config) else {
                continue;
            };
            for (index, line) in content.lines().enumerate() {
                for dir in path_additions(line, self.env.home()) {
                    found
                        .entry(dir)
                        .or_insert_with(|| (config.clone(), index + 1));
                }
            }
        }
        found
    }
}

impl Source for PathSource {
    fn id(&self) -> SourceId {
        SourceId::new("path")
    }

    fn category(&self) -> &str {
        "PATH"
    }

    fn speed(&self) -> SourceSpeed {
        SourceSpeed::Fast
    }

    fn is_available(&self) -> bool {
        !self.env.path_dirs().is_empty()
    }

    fn collect(&self) -> Result<Vec<Entry>> {
        let dirs = self.env.path_dirs();
        let definitions = self.definitions();
        let total = dirs.len();
        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(total);

        for (index, dir) in dirs.iter().enumerate() {
            let path = Path::new(dir);
            let exists = path.exists();
            let is_dir = path.is_dir();
            let is_symlink = path
                .symlink_metadata()
                .map(|m| m.file_type().is_symlink())
                .unwrap_or(false);
            let duplicate = !seen.insert(dir.clone());

            let (status, issue) = if !exists {
                (Status::Error, Some("Directory does not exist"))
            } else if duplicate {
                (Status::Warning, Some("Duplicate entry"))
            } else if !is_dir {
                (Status::Warning, Some("Not a directory"))
            } else {
                (Status::Healthy, None)
            };

            let real_path = if is_symlink {
                fs::canonicalize(path)
                    .ok()
                    .map(|p| p.to_string_lossy().into_owned())
            } else {
                None
            };
            let definition = definitions.get(dir);

            let entry = Entry::builder(dir.as_str(), dir.as_str())
                .status(status)
                .detail("search_order", index + 1)
                .detail("total_paths", total)
                .detail("exists", exists)
                .detail("is_directory", is_dir)
                .detail("is_symlink", is_symlink)
                .detail("is_duplicate", duplicate)
                .detail("is_homebrew", HOMEBREW_DIRS.contains(&dir.as_str()) || dir.contains("/homebrew/"))
                .detail("executable_count", if is_dir { count_executables(path) } else { 0 })
                .detail_opt("real_path", real_path)
                .detail_opt("issue", issue)
                .detail_opt(
                    "source_file",
                    definition.map(|(file, _)| file.to_string_lossy().into_owned()),
                )
                .detail_opt("source_line", definition.map(|(_, line)| *line))
                .build()?;
            entries.push(entry);
        }

        Ok(entries)
    }

    fn supported_actions(&self) -> &[RemediationAction] {
        &[RemediationAction::RemoveLine]
    }

    /// `remove-line` accepts either a PATH directory (its defining line is
    /// looked up) or an explicit `file:line`.
    fn perform_remediation(
        &self,
        action: RemediationAction,
        _scope: Option<&str>,
        target: &str,
    ) -> Result<String> {
        if action != RemediationAction::RemoveLine {
            return Err(remediation_failed(&self.id(), action, "only remove-line is supported"));
        }

        let (file, line) = match shell_edit::LineRef::parse(target) {
            Some(line_ref) => (line_ref.file, line_ref.line),
            None => self.definitions().remove(target).ok_or_else(|| {
                remediation_failed(
                    &self.id(),
                    action,
                    format!("no shell config line adds '{}' to PATH", target),
                )
            })?,
        };

        let removal = shell_edit::remove_line(&file, line, &self.backup_dir)
            .map_err(|e| remediation_failed(&self.id(), action, e.to_string()))?;
        Ok(format!(
            "Removed line {} from {} (backup: {})",
            line,
            file.display(),
            removal.backup.display()
        ))
    }
}

fn count_executables(dir: &Path) -> usize {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };
    entries
        .filter_map(|e| e.ok())
        .filter(|e| e.metadata().map(|m| is_executable(&m)).unwrap_or(false))
        .count()
}

#[cfg(unix)]
fn is_executable(meta: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.is_file() && meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(meta: &fs::Metadata) -> bool {
    meta.is_file()
}
