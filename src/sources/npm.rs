//! npm packages, global and per-project.
//!
//! The two listings are cached under separate scopes (`npm:global` and
//! `npm:local`) so acting on a project dependency does not re-run the
//! slower global listing.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::entry::{Entry, Status};
use crate::error::{DevtopoError, Result};
use crate::remediation::RemediationAction;
use crate::shell::{display_command, ProcessRunner};

use super::{
    remediation_failed, require_target, run_remediation, HostEnv, Source, SourceId, SourceSpeed,
};

pub const GLOBAL: &str = "global";
pub const LOCAL: &str = "local";

/// Packages every global install carries; they do not count as content.
const BUNDLED: &[&str] = &["npm", "corepack"];

#[derive(Debug, Default, Deserialize)]
struct Listing {
    #[serde(default)]
    dependencies: BTreeMap<String, Dependency>,
}

#[derive(Debug, Default, Deserialize)]
struct Dependency {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    invalid: Option<serde_json::Value>,
}

/// The parts of `package.json` that decide whether a project has content.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    #[serde(default)]
    dependencies: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    dev_dependencies: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    optional_dependencies: BTreeMap<String, serde_json::Value>,
}

impl Manifest {
    fn declares_packages(&self) -> bool {
        !(self.dependencies.is_empty()
            && self.dev_dependencies.is_empty()
            && self.optional_dependencies.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct Outdated {
    #[serde(default)]
    wanted: Option<String>,
    #[serde(default)]
    latest: Option<String>,
}

pub struct NpmSource {
    runner: Arc<dyn ProcessRunner>,
    global_modules: Vec<PathBuf>,
    project_dir: PathBuf,
    timeout: Duration,
}

impl NpmSource {
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        global_modules: Vec<PathBuf>,
        project_dir: PathBuf,
        timeout: Duration,
    ) -> Self {
        Self {
            runner,
            global_modules,
            project_dir,
            timeout,
        }
    }

    /// Candidate global `node_modules` directories for this host.
    pub fn global_modules_for(env: &HostEnv) -> Vec<PathBuf> {
        let mut prefixes: Vec<PathBuf> = Vec::new();
        if let Some(prefix) = env.var("NPM_CONFIG_PREFIX") {
            prefixes.push(PathBuf::from(prefix));
        }
        prefixes.extend(["/opt/homebrew", "/usr/local", "/usr"].map(PathBuf::from));
        prefixes.push(env.home().join(".npm-global"));
        prefixes
            .into_iter()
            .map(|p| p.join("lib").join("node_modules"))
            .collect()
    }

    /// A project counts only when its `package.json` declares dependencies.
    fn has_project(&self) -> bool {
        let Ok(content) = std::fs::read_to_string(self.project_dir.join("package.json")) else {
            return false;
        };
        match serde_json::from_str::<Manifest>(&content) {
            Ok(manifest) => manifest.declares_packages(),
            Err(e) => {
                tracing::debug!("Ignoring unparseable package.json: {}", e);
                false
            }
        }
    }

    fn has_global_packages(&self) -> bool {
        self.global_modules
            .iter()
            .any(|dir| has_user_packages(dir))
    }

    fn project_arg(&self) -> String {
        self.project_dir.to_string_lossy().into_owned()
    }

    /// Run an npm listing. npm exits non-zero on dependency problems while
    /// still printing a usable JSON document, so output wins over exit code.
    fn run_json(&self, args: &[&str]) -> Result<String> {
        let result = self.runner.run("npm", args, self.timeout)?;
        if result.stdout.trim().is_empty() {
            return Err(DevtopoError::CollectionFailed {
                source_id: self.id().to_string(),
                message: format!("`{}` printed nothing: {}", display_command("npm", args), result.summary()),
            });
        }
        Ok(result.stdout)
    }

    fn listing(&self, args: &[&str]) -> Result<Listing> {
        serde_json::from_str(&self.run_json(args)?).map_err(|e| DevtopoError::CollectionFailed {
            source_id: self.id().to_string(),
            message: format!("could not parse npm listing: {}", e),
        })
    }

    fn outdated_global(&self) -> HashMap<String, Outdated> {
        let parsed = self
            .run_json(&["outdated", "-g", "--json"])
            .ok()
            .and_then(|out| serde_json::from_str(&out).ok());
        parsed.unwrap_or_else(|| {
            tracing::debug!("No outdated information for global npm packages");
            HashMap::new()
        })
    }

    fn collect_global(&self) -> Result<Vec<Entry>> {
        let listing = self.listing(&["list", "-g", "--json", "--depth=0"])?;
        let outdated = self.outdated_global();
        listing
            .dependencies
            .into_iter()
            .map(|(name, dep)| {
                let stale = outdated.get(&name);
                package_entry(&name, &dep, GLOBAL)
                    .status(match (package_status(&dep), stale) {
                        (Status::Healthy, Some(_)) => Status::Warning,
                        (status, _) => status,
                    })
                    .detail_opt("wanted", stale.and_then(|o| o.wanted.clone()))
                    .detail_opt("latest", stale.and_then(|o| o.latest.clone()))
                    .build()
                    .map_err(Into::into)
            })
            .collect()
    }

    fn collect_local(&self) -> Result<Vec<Entry>> {
        let prefix = self.project_arg();
        let listing = self.listing(&["list", "--json", "--depth=0", "--prefix", prefix.as_str()])?;
        listing
            .dependencies
            .into_iter()
            .map(|(name, dep)| {
                package_entry(&name, &dep, LOCAL)
                    .status(package_status(&dep))
                    .detail("project", prefix.as_str())
                    .build()
                    .map_err(Into::into)
            })
            .collect()
    }
}

fn package_entry(name: &str, dep: &Dependency, scope: &str) -> crate::entry::EntryBuilder {
    let version = dep
        .version
        .clone()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "unknown".to_string());
    Entry::builder(name, version).detail("scope", scope)
}

fn package_status(dep: &Dependency) -> Status {
    if dep.missing {
        Status::Error
    } else if dep.invalid.is_some() {
        Status::Warning
    } else {
        Status::Healthy
    }
}

/// Whether a global `node_modules` holds anything beyond npm itself.
fn has_user_packages(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries.filter_map(|e| e.ok()).any(|e| {
                let name = e.file_name().to_string_lossy().into_owned();
                !name.starts_with('.') && !BUNDLED.contains(&name.as_str())
            })
        })
        .unwrap_or(false)
}

impl Source for NpmSource {
    fn id(&self) -> SourceId {
        SourceId::new("npm")
    }

    fn category(&self) -> &str {
        "npm"
    }

    fn speed(&self) -> SourceSpeed {
        SourceSpeed::Slow
    }

    fn is_available(&self) -> bool {
        self.has_global_packages() || self.has_project()
    }

    fn scopes(&self) -> Vec<String> {
        let mut scopes = Vec::new();
        if self.has_global_packages() {
            scopes.push(GLOBAL.to_string());
        }
        if self.has_project() {
            scopes.push(LOCAL.to_string());
        }
        scopes
    }

    fn collect(&self) -> Result<Vec<Entry>> {
        let mut entries = Vec::new();
        for scope in self.scopes() {
            entries.extend(self.collect_scope(&scope)?);
        }
        Ok(entries)
    }

    fn collect_scope(&self, scope: &str) -> Result<Vec<Entry>> {
        match scope {
            GLOBAL => self.collect_global(),
            LOCAL => self.collect_local(),
            other => Err(DevtopoError::CollectionFailed {
                source_id: self.id().to_string(),
                message: format!("unknown scope '{}'", other),
            }),
        }
    }

    fn supported_actions(&self) -> &[RemediationAction] {
        &[RemediationAction::Uninstall, RemediationAction::Upgrade]
    }

    /// Scope `local` acts on the project; anything else acts globally.
    fn perform_remediation(
        &self,
        action: RemediationAction,
        scope: Option<&str>,
        target: &str,
    ) -> Result<String> {
        let id = self.id();
        let package = require_target(&id, action, target)?;
        let latest = format!("{}@latest", package);
        let prefix = self.project_arg();
        let local = scope == Some(LOCAL);

        let args: Vec<&str> = match (action, local) {
            (RemediationAction::Uninstall, false) => vec!["uninstall", "-g", package],
            (RemediationAction::Uninstall, true) => {
                vec!["uninstall", "--prefix", prefix.as_str(), package]
            }
            (RemediationAction::Upgrade, false) => vec!["install", "-g", latest.as_str()],
            (RemediationAction::Upgrade, true) => {
                vec!["install", "--prefix", prefix.as_str(), latest.as_str()]
            }
            (other, _) => return Err(remediation_failed(&id, other, "not supported by npm")),
        };
        run_remediation(self.runner.as_ref(), &id, action, "npm", &args)
    }
}
