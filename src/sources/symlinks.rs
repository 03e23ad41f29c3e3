//! Symlinks in common binary directories.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::entry::{Entry, Status};
use crate::error::Result;
use crate::remediation::RemediationAction;

use super::{remediation_failed, Source, SourceId, SourceSpeed};

/// Cap on links listed in one entry's details.
const MAX_LISTED: usize = 100;

#[derive(Debug, Clone, Serialize)]
struct LinkInfo {
    name: String,
    target: String,
    full_path: String,
}

#[derive(Debug, Default)]
struct Scan {
    healthy: Vec<LinkInfo>,
    broken: Vec<LinkInfo>,
}

impl Scan {
    fn is_empty(&self) -> bool {
        self.healthy.is_empty() && self.broken.is_empty()
    }
}

/// One entry per scanned directory that holds symlinks; broken links
/// turn the entry into a warning.
pub struct SymlinkSource {
    dirs: Vec<PathBuf>,
}

impl SymlinkSource {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    fn scan(dir: &Path) -> Scan {
        let mut scan = Scan::default();
        let Ok(entries) = fs::read_dir(dir) else {
            return scan;
        };
        for item in entries.filter_map(|e| e.ok()) {
            let path = item.path();
            let Ok(link_target) = fs::read_link(&path) else {
                continue;
            };
            let info = LinkInfo {
                name: item.file_name().to_string_lossy().into_owned(),
                target: link_target.to_string_lossy().into_owned(),
                full_path: path.to_string_lossy().into_owned(),
            };
            // `exists` follows the link.
            if path.exists() {
                scan.healthy.push(info);
            } else {
                scan.broken.push(info);
            }
        }
        scan.healthy.sort_by(|a, b| a.name.cmp(&b.name));
        scan.broken.sort_by(|a, b| a.name.cmp(&b.name));
        scan
    }

    fn has_symlink(dir: &Path) -> bool {
        fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .any(|e| e.file_type().map(|t| t.is_symlink()).unwrap_or(false))
            })
            .unwrap_or(false)
    }

    fn is_scanned(&self, link: &Path) -> bool {
        link.parent()
            .map(|parent| self.dirs.iter().any(|d| d == parent))
            .unwrap_or(false)
    }
}

impl Source for SymlinkSource {
    fn id(&self) -> SourceId {
        SourceId::new("symlinks")
    }

    fn category(&self) -> &str {
        "Symlinks"
    }

    fn speed(&self) -> SourceSpeed {
        SourceSpeed::Fast
    }

    fn is_available(&self) -> bool {
        self.dirs.iter().any(|d| Self::has_symlink(d))
    }

    fn collect(&self) -> Result<Vec<Entry>> {
        let mut entries = Vec::new();
        for dir in &self.dirs {
            let scan = Self::scan(dir);
            if scan.is_empty() {
                continue;
            }
            let shown = dir.to_string_lossy().into_owned();
            let status = if scan.broken.is_empty() {
                Status::Healthy
            } else {
                Status::Warning
            };
            let listed: Vec<_> = scan.healthy.iter().take(MAX_LISTED).collect();
            entries.push(
                Entry::builder(shown.as_str(), shown.as_str())
                    .status(status)
                    .detail("total_symlinks", scan.healthy.len() + scan.broken.len())
                    .detail("healthy", scan.healthy.len())
                    .detail("broken", scan.broken.len())
                    .detail("symlinks", serde_json::to_value(listed).unwrap_or_default())
                    .detail("broken_links", serde_json::to_value(&scan.broken).unwrap_or_default())
                    .build()?,
            );
        }
        Ok(entries)
    }

    fn supported_actions(&self) -> &[RemediationAction] {
        &[RemediationAction::Remove]
    }

    /// `remove` deletes one broken symlink inside a scanned directory.
    /// Healthy links and regular files are refused.
    fn perform_remediation(
        &self,
        action: RemediationAction,
        _scope: Option<&str>,
        target: &str,
    ) -> Result<String> {
        if action != RemediationAction::Remove {
            return Err(remediation_failed(&self.id(), action, "only remove is supported"));
        }
        let link = Path::new(target);
        if !self.is_scanned(link) {
            return Err(remediation_failed(
                &self.id(),
                action,
                format!("{} is not in a scanned directory", target),
            ));
        }
        let is_link = fs::symlink_metadata(link)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);
        if !is_link {
            return Err(remediation_failed(&self.id(), action, format!("{} is not a symlink", target)));
        }
        if link.exists() {
            return Err(remediation_failed(
                &self.id(),
                action,
                format!("{} is not broken; refusing to remove it", target),
            ));
        }

        fs::remove_file(link).map_err(|e| remediation_failed(&self.id(), action, e.to_string()))?;
        Ok(format!("Removed broken symlink {}", target))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let bin = temp.path().join("bin");
        fs::create_dir(&bin).unwrap();
        let real = temp.path().join("real-tool");
        fs::write(&real, "").unwrap();
        symlink(&real, bin.join("tool")).unwrap();
        (temp, bin)
    }

    #[test]
    fn available_only_with_symlinks() {
        let temp = TempDir::new().unwrap();
        let empty = temp.path().join("empty");
        fs::create_dir(&empty).unwrap();
        fs::write(empty.join("file"), "").unwrap();
        assert!(!SymlinkSource::new(vec![empty]).is_available());

        let (_temp, bin) = fixture();
        assert!(SymlinkSource::new(vec![bin]).is_available());
    }

    #[test]
    fn healthy_directory() {
        let (_temp, bin) = fixture();
        let entries = SymlinkSource::new(vec![bin]).collect().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status(), Status::Healthy);
        assert_eq!(entries[0].detail("healthy"), Some(&serde_json::json!(1)));
    }

    #[test]
    fn broken_link_warns_and_can_be_removed() {
        let (temp, bin) = fixture();
        let dangling = bin.join("dangling");
        symlink(temp.path().join("nowhere"), &dangling).unwrap();
        let source = SymlinkSource::new(vec![bin.clone()]);

        let entries = source.collect().unwrap();
        assert_eq!(entries[0].status(), Status::Warning);
        assert_eq!(entries[0].detail("broken"), Some(&serde_json::json!(1)));

        source
            .perform_remediation(RemediationAction::Remove, None, &dangling.display().to_string())
            .unwrap();
        assert!(fs::symlink_metadata(&dangling).is_err());
        assert_eq!(source.collect().unwrap()[0].status(), Status::Healthy);
    }

    #[test]
    fn refuses_to_remove_healthy_link() {
        let (_temp, bin) = fixture();
        let source = SymlinkSource::new(vec![bin.clone()]);
        let err = source
            .perform_remediation(
                RemediationAction::Remove,
                None,
                &bin.join("tool").display().to_string(),
            )
            .unwrap_err();
        assert!(err.to_string().contains("not broken"));
        assert!(bin.join("tool").exists());
    }
}
