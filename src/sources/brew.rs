//! Homebrew formulae and casks.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::entry::{Entry, Status};
use crate::error::{DevtopoError, Result};
use crate::remediation::RemediationAction;
use crate::shell::ProcessRunner;

use super::{
    dir_has_content, remediation_failed, require_target, run_listing, run_remediation, HostEnv,
    Source, SourceId, SourceSpeed,
};

/// Install prefixes checked when `HOMEBREW_PREFIX` is unset.
const DEFAULT_PREFIXES: &[&str] = &["/opt/homebrew", "/usr/local", "/home/linuxbrew/.linuxbrew"];

#[derive(Debug, Deserialize)]
struct FormulaList {
    #[serde(default)]
    formulae: Vec<Formula>,
}

#[derive(Debug, Deserialize)]
struct Formula {
    name: String,
    #[serde(default)]
    desc: Option<String>,
    #[serde(default)]
    homepage: Option<String>,
    #[serde(default)]
    installed: Vec<InstalledVersion>,
}

#[derive(Debug, Deserialize)]
struct InstalledVersion {
    version: String,
}

#[derive(Debug, Default, Deserialize)]
struct OutdatedList {
    #[serde(default)]
    formulae: Vec<OutdatedPackage>,
    #[serde(default)]
    casks: Vec<OutdatedPackage>,
}

#[derive(Debug, Deserialize)]
struct OutdatedPackage {
    name: String,
    /// A list for formulae, a bare string for some cask versions.
    #[serde(default)]
    installed_versions: serde_json::Value,
    #[serde(default)]
    current_version: String,
}

impl OutdatedPackage {
    fn installed(&self) -> String {
        match &self.installed_versions {
            serde_json::Value::Array(versions) => versions
                .first()
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            serde_json::Value::String(version) => version.clone(),
            _ => String::new(),
        }
    }
}

/// Installed formulae and casks, with outdated packages flagged.
pub struct BrewSource {
    runner: Arc<dyn ProcessRunner>,
    prefixes: Vec<PathBuf>,
    timeout: Duration,
}

impl BrewSource {
    pub fn new(runner: Arc<dyn ProcessRunner>, prefixes: Vec<PathBuf>, timeout: Duration) -> Self {
        Self {
            runner,
            prefixes,
            timeout,
        }
    }

    /// Prefixes from `HOMEBREW_PREFIX`, or the standard install locations.
    pub fn prefixes_for(env: &HostEnv) -> Vec<PathBuf> {
        match env.var("HOMEBREW_PREFIX") {
            Some(prefix) => vec![PathBuf::from(prefix)],
            None => DEFAULT_PREFIXES.iter().map(PathBuf::from).collect(),
        }
    }

    fn list(&self, args: &[&str]) -> Result<String> {
        Ok(run_listing(self.runner.as_ref(), &self.id(), "brew", args, self.timeout)?.stdout)
    }

    fn parse_error(&self, what: &str, err: serde_json::Error) -> DevtopoError {
        DevtopoError::CollectionFailed {
            source_id: self.id().to_string(),
            message: format!("could not parse {}: {}", what, err),
        }
    }

    /// Outdated packages by name. Failures here only cost the flags.
    fn outdated(&self) -> HashMap<String, (String, String)> {
        let parsed = self
            .list(&["outdated", "--json=v2"])
            .and_then(|out| {
                serde_json::from_str::<OutdatedList>(&out)
                    .map_err(|e| self.parse_error("brew outdated output", e))
            });
        match parsed {
            Ok(list) => list
                .formulae
                .into_iter()
                .chain(list.casks)
                .map(|p| {
                    let installed = p.installed();
                    (p.name, (installed, p.current_version))
                })
                .collect(),
            Err(e) => {
                tracing::warn!("Skipping outdated check: {}", e);
                HashMap::new()
            }
        }
    }
}

impl Source for BrewSource {
    fn id(&self) -> SourceId {
        SourceId::new("brew")
    }

    fn category(&self) -> &str {
        "Homebrew"
    }

    fn speed(&self) -> SourceSpeed {
        SourceSpeed::Slow
    }

    fn is_available(&self) -> bool {
        self.prefixes
            .iter()
            .any(|p| dir_has_content(&p.join("Cellar")) || dir_has_content(&p.join("Caskroom")))
    }

    fn collect(&self) -> Result<Vec<Entry>> {
        let formulae: FormulaList = serde_json::from_str(&self.list(&["list", "--formula", "--json=v2"])?)
            .map_err(|e| self.parse_error("brew formula list", e))?;
        let casks = self.list(&["list", "--cask"])?;
        let outdated = self.outdated();

        let mut entries = Vec::new();
        let mut formulae = formulae.formulae;
        formulae.sort_by(|a, b| a.name.cmp(&b.name));

        for formula in formulae {
            let version = formula
                .installed
                .first()
                .map(|v| v.version.clone())
                .unwrap_or_else(|| "unknown".to_string());
            let latest = outdated.get(&formula.name).map(|(_, latest)| latest.clone());
            let status = if latest.is_some() {
                Status::Warning
            } else {
                Status::Healthy
            };
            entries.push(
                Entry::builder(formula.name.as_str(), version)
                    .status(status)
                    .detail("kind", "formula")
                    .detail_opt("description", formula.desc.filter(|d| !d.is_empty()))
                    .detail_opt("homepage", formula.homepage.filter(|h| !h.is_empty()))
                    .detail_opt("latest", latest)
                    .build()?,
            );
        }

        let mut cask_names: Vec<&str> = casks.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        cask_names.sort_unstable();
        for name in cask_names {
            let stale = outdated.get(name);
            let version = stale
                .map(|(installed, _)| installed.clone())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "cask".to_string());
            entries.push(
                Entry::builder(name, version)
                    .status(if stale.is_some() { Status::Warning } else { Status::Healthy })
                    .detail("kind", "cask")
                    .detail_opt("latest", stale.map(|(_, latest)| latest.clone()))
                    .build()?,
            );
        }

        Ok(entries)
    }

    fn supported_actions(&self) -> &[RemediationAction] {
        &[
            RemediationAction::Uninstall,
            RemediationAction::Upgrade,
            RemediationAction::Update,
        ]
    }

    fn perform_remediation(
        &self,
        action: RemediationAction,
        _scope: Option<&str>,
        target: &str,
    ) -> Result<String> {
        let id = self.id();
        let runner = self.runner.as_ref();
        match action {
            RemediationAction::Uninstall => {
                let package = require_target(&id, action, target)?;
                run_remediation(runner, &id, action, "brew", &["uninstall", package])
            }
            RemediationAction::Upgrade => {
                let package = require_target(&id, action, target)?;
                run_remediation(runner, &id, action, "brew", &["upgrade", package])
            }
            RemediationAction::Update => run_remediation(runner, &id, action, "brew", &["update"]),
            other => Err(remediation_failed(&id, other, "not supported by Homebrew")),
        }
    }
}
