//! Shell config files and what they define.

use std::fs;
use std::path::PathBuf;

use crate::entry::{Entry, Status};
use crate::error::Result;
use crate::remediation::{shell_edit, RemediationAction};

use super::shell_parse::{count_by_kind, parse_config};
use super::{remediation_failed, Source, SourceId, SourceSpeed};

/// A config file to scan and a note on when the shell loads it.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub path: PathBuf,
    pub description: String,
}

/// One entry per existing shell config file, in load order.
pub struct ShellConfigSource {
    files: Vec<ConfigFile>,
    backup_dir: PathBuf,
}

impl ShellConfigSource {
    pub fn new(files: Vec<ConfigFile>, backup_dir: PathBuf) -> Self {
        Self { files, backup_dir }
    }

    fn is_known(&self, path: &std::path::Path) -> bool {
        self.files.iter().any(|f| f.path == path)
    }
}

impl Source for ShellConfigSource {
    fn id(&self) -> SourceId {
        SourceId::new("shell")
    }

    fn category(&self) -> &str {
        "Shell Config"
    }

    fn speed(&self) -> SourceSpeed {
        SourceSpeed::Fast
    }

    fn is_available(&self) -> bool {
        self.files
            .iter()
            .any(|f| fs::metadata(&f.path).map(|m| m.is_file() && m.len() > 0).unwrap_or(false))
    }

    fn collect(&self) -> Result<Vec<Entry>> {
        let mut entries = Vec::new();
        let mut load_order = 0;

        for file in &self.files {
            if !file.path.is_file() {
                continue;
            }
            load_order += 1;
            let shown = file.path.to_string_lossy().into_owned();
            let name = file
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| shown.clone());

            let entry = match fs::read_to_string(&file.path) {
                Ok(content) => {
                    let items = parse_config(&content);
                    let mut builder = Entry::builder(name, shown.as_str())
                        .detail("load_order", load_order)
                        .detail("description", file.description.as_str())
                        .detail("line_count", content.lines().count())
                        .detail("size_bytes", content.len());
                    for (kind, count) in count_by_kind(&items) {
                        builder = builder.detail(format!("{}_count", kind), count);
                    }
                    builder
                        .detail("items", serde_json::to_value(&items).unwrap_or_default())
                        .build()?
                }
                Err(e) => {
                    tracing::warn!("Cannot read {}: {}", shown, e);
                    Entry::builder(name, shown.as_str())
                        .status(Status::Error)
                        .detail("load_order", load_order)
                        .detail("error", e.to_string())
                        .build()?
                }
            };
            entries.push(entry);
        }

        Ok(entries)
    }

    fn supported_actions(&self) -> &[RemediationAction] {
        &[RemediationAction::RemoveLine]
    }

    /// `remove-line` takes `file:line`; the file must be one this source scans.
    fn perform_remediation(
        &self,
        action: RemediationAction,
        _scope: Option<&str>,
        target: &str,
    ) -> Result<String> {
        if action != RemediationAction::RemoveLine {
            return Err(remediation_failed(&self.id(), action, "only remove-line is supported"));
        }
        let line_ref = shell_edit::LineRef::parse(target).ok_or_else(|| {
            remediation_failed(&self.id(), action, format!("expected FILE:LINE, got '{}'", target))
        })?;
        if !self.is_known(&line_ref.file) {
            return Err(remediation_failed(
                &self.id(),
                action,
                format!("{} is not a scanned shell config", line_ref.file.display()),
            ));
        }

        let removal = shell_edit::remove_line(&line_ref.file, line_ref.line, &self.backup_dir)
            .map_err(|e| remediation_failed(&self.id(), action, e.to_string()))?;
        Ok(format!(
            "Removed `{}` from {} (backup: {})",
            removal.removed,
            line_ref.file.display(),
            removal.backup.display()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn source(temp: &TempDir, names: &[&str]) -> ShellConfigSource {
        let files = names
            .iter()
            .map(|n| ConfigFile {
                path: temp.path().join(n),
                description: format!("{} description", n),
            })
            .collect();
        ShellConfigSource::new(files, temp.path().join("backups"))
    }

    #[test]
    fn unavailable_when_no_config_has_content() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(".zshrc"), "").unwrap();
        assert!(!source(&temp, &[".zshenv", ".zshrc"]).is_available());

        fs::write(temp.path().join(".zshrc"), "alias g=git\n").unwrap();
        assert!(source(&temp, &[".zshenv", ".zshrc"]).is_available());
    }

    #[test]
    fn load_order_counts_existing_files_only() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(".zprofile"), "export A=1\n").unwrap();
        fs::write(temp.path().join(".zshrc"), "alias g=git\nalias l=ls\n").unwrap();

        let entries = source(&temp, &[".zshenv", ".zprofile", ".zshrc"])
            .collect()
            .unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name(), ".zprofile");
        assert_eq!(entries[1].detail("load_order"), Some(&serde_json::json!(2)));
        assert_eq!(entries[1].detail("alias_count"), Some(&serde_json::json!(2)));
        assert_eq!(entries[0].detail("export_count"), Some(&serde_json::json!(1)));
    }

    #[test]
    fn unreadable_config_becomes_error_entry() {
        let temp = TempDir::new().unwrap();
        let zshrc = temp.path().join(".zshrc");
        fs::write(&zshrc, [0xff, 0xfe, 0x00, 0x41]).unwrap();

        let entries = source(&temp, &[".zshrc"]).collect().unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status(), Status::Error);
        assert_eq!(entries[0].path(), zshrc.to_string_lossy());
        assert!(entries[0].detail("error").is_some());
    }

    #[test]
    fn remove_line_refuses_unscanned_file() {
        let temp = TempDir::new().unwrap();
        let other = temp.path().join("other.sh");
        fs::write(&other, "echo hi\n").unwrap();

        let err = source(&temp, &[".zshrc"])
            .perform_remediation(
                RemediationAction::RemoveLine,
                None,
                &format!("{}:1", other.display()),
            )
            .unwrap_err();

        assert!(err.to_string().contains("not a scanned shell config"));
        assert_eq!(fs::read_to_string(&other).unwrap(), "echo hi\n");
    }

    #[test]
    fn remove_line_edits_scanned_file() {
        let temp = TempDir::new().unwrap();
        let rc = temp.path().join(".zshrc");
        fs::write(&rc, "alias g=git\nalias l=ls\n").unwrap();

        let message = source(&temp, &[".zshrc"])
            .perform_remediation(
                RemediationAction::RemoveLine,
                None,
                &format!("{}:1", rc.display()),
            )
            .unwrap();

        assert!(message.contains("alias g=git"));
        assert_eq!(fs::read_to_string(&rc).unwrap(), "alias l=ls\n");
    }
}
