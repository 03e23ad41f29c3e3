//! Remediation actions.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// A mutating action an operator can request against a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemediationAction {
    /// Remove an installed package or toolchain.
    Uninstall,
    /// Upgrade one package to its latest version.
    Upgrade,
    /// Refresh the tool's own metadata (e.g. `brew update`).
    Update,
    /// Delete a filesystem item such as a broken symlink.
    Remove,
    /// Delete one line from a shell config file.
    RemoveLine,
}

impl RemediationAction {
    pub const ALL: [RemediationAction; 5] = [
        RemediationAction::Uninstall,
        RemediationAction::Upgrade,
        RemediationAction::Update,
        RemediationAction::Remove,
        RemediationAction::RemoveLine,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RemediationAction::Uninstall => "uninstall",
            RemediationAction::Upgrade => "upgrade",
            RemediationAction::Update => "update",
            RemediationAction::Remove => "remove",
            RemediationAction::RemoveLine => "remove-line",
        }
    }
}

impl fmt::Display for RemediationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RemediationAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == normalized)
            .ok_or_else(|| {
                let known: Vec<_> = Self::ALL.iter().map(|a| a.as_str()).collect();
                format!("unknown action '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}
