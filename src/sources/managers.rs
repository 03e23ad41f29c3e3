//! Language version managers, detected by their install directories.

use std::path::PathBuf;
use std::sync::Arc;

use crate::entry::Entry;
use crate::error::Result;

use super::{dir_has_content, subdirectory_names, HostEnv, Source, SourceId, SourceSpeed};

/// Where one version manager keeps its installs.
struct ManagerLayout {
    kind: &'static str,
    label: &'static str,
    root_var: &'static str,
    default_root: &'static str,
    /// Directory under the root that lists installed versions or plugins.
    versions_dir: &'static str,
}

const MANAGERS: &[ManagerLayout] = &[
    ManagerLayout {
        kind: "nvm",
        label: "nvm (Node Version Manager)",
        root_var: "NVM_DIR",
        default_root: ".nvm",
        versions_dir: "versions/node",
    },
    ManagerLayout {
        kind: "pyenv",
        label: "pyenv (Python Version Manager)",
        root_var: "PYENV_ROOT",
        default_root: ".pyenv",
        versions_dir: "versions",
    },
    ManagerLayout {
        kind: "rbenv",
        label: "rbenv (Ruby Version Manager)",
        root_var: "RBENV_ROOT",
        default_root: ".rbenv",
        versions_dir: "versions",
    },
    ManagerLayout {
        kind: "asdf",
        label: "asdf (Multiple Runtime Version Manager)",
        root_var: "ASDF_DIR",
        default_root: ".asdf",
        versions_dir: "plugins",
    },
    ManagerLayout {
        kind: "volta",
        label: "Volta (JavaScript Tool Manager)",
        root_var: "VOLTA_HOME",
        default_root: ".volta",
        versions_dir: "tools/image/node",
    },
    ManagerLayout {
        kind: "fnm",
        label: "fnm (Fast Node Manager)",
        root_var: "FNM_DIR",
        default_root: ".fnm",
        versions_dir: "node-versions",
    },
    ManagerLayout {
        kind: "sdkman",
        label: "SDKMAN (JVM Version Manager)",
        root_var: "SDKMAN_DIR",
        default_root: ".sdkman",
        versions_dir: "candidates",
    },
    ManagerLayout {
        kind: "goenv",
        label: "goenv (Go Version Manager)",
        root_var: "GOENV_ROOT",
        default_root: ".goenv",
        versions_dir: "versions",
    },
];

/// One entry per installed version manager with its versions.
pub struct ManagerSource {
    env: Arc<HostEnv>,
}

impl ManagerSource {
    pub fn new(env: Arc<HostEnv>) -> Self {
        Self { env }
    }

    fn root(&self, layout: &ManagerLayout) -> PathBuf {
        self.env.dir_from_var(layout.root_var, layout.default_root)
    }
}

impl Source for ManagerSource {
    fn id(&self) -> SourceId {
        SourceId::new("managers")
    }

    fn category(&self) -> &str {
        "Version Managers"
    }

    fn speed(&self) -> SourceSpeed {
        SourceSpeed::Fast
    }

    fn is_available(&self) -> bool {
        MANAGERS
            .iter()
            .any(|m| dir_has_content(&self.root(m).join(m.versions_dir)))
    }

    fn collect(&self) -> Result<Vec<Entry>> {
        let mut entries = Vec::new();
        for layout in MANAGERS {
            let root = self.root(layout);
            if !root.is_dir() {
                continue;
            }
            let versions = subdirectory_names(&root.join(layout.versions_dir));
            entries.push(
                Entry::builder(layout.label, root.to_string_lossy())
                    .detail("type", layout.kind)
                    .detail("count", versions.len())
                    .detail("versions", versions)
                    .build()?,
            );
        }
        Ok(entries)
    }
}
