//! Python interpreters and environments with their pip packages.
//!
//! Environments are found on disk (system and Homebrew interpreters, conda
//! installs, pyenv versions, virtualenvs). Each one is its own scope, keyed
//! by its root path, so acting on one environment only re-lists that one.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::entry::{Entry, Status};
use crate::error::{DevtopoError, Result};
use crate::remediation::RemediationAction;
use crate::shell::ProcessRunner;

use super::{
    remediation_failed, require_target, run_listing, run_remediation, subdirectory_names,
    HostEnv, Source, SourceId, SourceSpeed,
};

/// How an environment was installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvKind {
    System,
    Homebrew,
    Conda,
    Pyenv,
    Virtualenv,
}

impl EnvKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKind::System => "system",
            EnvKind::Homebrew => "homebrew",
            EnvKind::Conda => "conda",
            EnvKind::Pyenv => "pyenv",
            EnvKind::Virtualenv => "virtualenv",
        }
    }
}

/// Where to look for environments.
#[derive(Debug, Clone, Default)]
pub struct PythonRoots {
    /// Standalone interpreters, checked by exact path.
    pub interpreters: Vec<(EnvKind, PathBuf)>,
    /// Conda installs; each has a `base` environment and an `envs/` directory.
    pub conda_installs: Vec<PathBuf>,
    /// `$PYENV_ROOT/versions`.
    pub pyenv_versions: PathBuf,
    /// `$WORKON_HOME`, where virtualenvwrapper keeps environments.
    pub virtualenvs: PathBuf,
}

impl PythonRoots {
    pub fn for_host(env: &HostEnv) -> Self {
        let home = env.home();
        Self {
            interpreters: vec![
                (EnvKind::System, PathBuf::from("/usr/bin/python3")),
                (EnvKind::Homebrew, PathBuf::from("/opt/homebrew/bin/python3")),
                (EnvKind::Homebrew, PathBuf::from("/usr/local/bin/python3")),
            ],
            conda_installs: ["miniconda3", "anaconda3", "miniforge3", ".conda"]
                .iter()
                .map(|d| home.join(d))
                .collect(),
            pyenv_versions: env.dir_from_var("PYENV_ROOT", ".pyenv").join("versions"),
            virtualenvs: env.dir_from_var("WORKON_HOME", ".virtualenvs"),
        }
    }
}

/// One discovered environment.
#[derive(Debug, Clone, PartialEq)]
pub struct PythonEnv {
    pub kind: EnvKind,
    pub label: String,
    /// Environment directory, or the interpreter itself for standalone ones.
    pub root: PathBuf,
    pub interpreter: PathBuf,
}

impl PythonEnv {
    fn scope(&self) -> String {
        self.root.to_string_lossy().into_owned()
    }

    /// pyenv names its version directories after the version.
    fn known_version(&self) -> Option<String> {
        match self.kind {
            EnvKind::Pyenv => self
                .root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned()),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PipPackage {
    name: String,
    version: String,
}

pub struct PythonSource {
    runner: Arc<dyn ProcessRunner>,
    roots: PythonRoots,
    timeout: Duration,
}

impl PythonSource {
    pub fn new(runner: Arc<dyn ProcessRunner>, roots: PythonRoots, timeout: Duration) -> Self {
        Self {
            runner,
            roots,
            timeout,
        }
    }

    /// Every environment on disk, in display order. An interpreter reached
    /// through several paths is listed once.
    pub fn environments(&self) -> Vec<PythonEnv> {
        let mut found = Vec::new();

        for (kind, interpreter) in &self.roots.interpreters {
            if interpreter.is_file() {
                let label = match kind {
                    EnvKind::Homebrew => "Homebrew Python",
                    _ => "System Python",
                };
                found.push(PythonEnv {
                    kind: *kind,
                    label: label.to_string(),
                    root: interpreter.clone(),
                    interpreter: interpreter.clone(),
                });
            }
        }

        for install in &self.roots.conda_installs {
            if let Some(interpreter) = interpreter_in(install) {
                found.push(PythonEnv {
                    kind: EnvKind::Conda,
                    label: "conda: base".to_string(),
                    root: install.clone(),
                    interpreter,
                });
            }
            found.extend(envs_under(&install.join("envs"), EnvKind::Conda, "conda"));
        }

        found.extend(envs_under(&self.roots.pyenv_versions, EnvKind::Pyenv, "pyenv"));
        found.extend(envs_under(&self.roots.virtualenvs, EnvKind::Virtualenv, "venv"));

        let mut seen = HashSet::new();
        found.retain(|env| {
            let real = std::fs::canonicalize(&env.interpreter).unwrap_or_else(|_| env.interpreter.clone());
            seen.insert(real)
        });
        found
    }

    fn environment(&self, scope: &str) -> Option<PythonEnv> {
        self.environments().into_iter().find(|env| env.scope() == scope)
    }

    fn version(&self, env: &PythonEnv) -> Result<String> {
        if let Some(version) = env.known_version() {
            return Ok(version);
        }
        let program = env.interpreter.to_string_lossy();
        let result = run_listing(self.runner.as_ref(), &self.id(), &program, &["--version"], self.timeout)?;
        // Python 2 prints its version on stderr.
        let printed = if result.stdout.trim().is_empty() {
            result.stderr
        } else {
            result.stdout
        };
        let printed = printed.trim();
        Ok(printed.strip_prefix("Python ").unwrap_or(printed).to_string())
    }

    fn packages(&self, env: &PythonEnv) -> Result<Vec<PipPackage>> {
        let program = env.interpreter.to_string_lossy();
        let listing = run_listing(
            self.runner.as_ref(),
            &self.id(),
            &program,
            &["-m", "pip", "list", "--format=json"],
            self.timeout,
        )?;
        serde_json::from_str(&listing.stdout).map_err(|e| DevtopoError::CollectionFailed {
            source_id: self.id().to_string(),
            message: format!("could not parse pip listing: {}", e),
        })
    }

    fn environment_entry(&self, env: &PythonEnv) -> Result<Entry> {
        let builder = Entry::builder(env.label.as_str(), env.root.to_string_lossy())
            .detail("kind", env.kind.as_str())
            .detail("interpreter", env.interpreter.to_string_lossy().into_owned());

        let version = match self.version(env) {
            Ok(version) => version,
            Err(e) => {
                tracing::debug!("Interpreter {} did not run: {}", env.interpreter.display(), e);
                return Ok(builder.status(Status::Error).detail("error", e.to_string()).build()?);
            }
        };
        let builder = builder.detail("version", version);

        let entry = match self.packages(env) {
            Ok(packages) => {
                let listed: Vec<String> = packages
                    .iter()
                    .map(|p| format!("{}=={}", p.name, p.version))
                    .collect();
                builder
                    .detail("package_count", listed.len())
                    .detail("packages", listed)
                    .build()?
            }
            Err(e) => builder
                .status(Status::Warning)
                .detail("package_count", 0)
                .detail("pip_error", e.to_string())
                .build()?,
        };
        Ok(entry)
    }
}

/// `<dir>/bin/python` or `<dir>/bin/python3`, whichever exists.
fn interpreter_in(dir: &Path) -> Option<PathBuf> {
    ["python", "python3"]
        .iter()
        .map(|name| dir.join("bin").join(name))
        .find(|p| p.is_file())
}

fn envs_under(dir: &Path, kind: EnvKind, prefix: &str) -> Vec<PythonEnv> {
    subdirectory_names(dir)
        .into_iter()
        .filter_map(|name| {
            let root = dir.join(&name);
            interpreter_in(&root).map(|interpreter| PythonEnv {
                kind,
                label: format!("{}: {}", prefix, name),
                root,
                interpreter,
            })
        })
        .collect()
}

impl Source for PythonSource {
    fn id(&self) -> SourceId {
        SourceId::new("python")
    }

    fn category(&self) -> &str {
        "Python"
    }

    fn speed(&self) -> SourceSpeed {
        SourceSpeed::Slow
    }

    fn is_available(&self) -> bool {
        !self.environments().is_empty()
    }

    fn scopes(&self) -> Vec<String> {
        self.environments().iter().map(PythonEnv::scope).collect()
    }

    fn collect(&self) -> Result<Vec<Entry>> {
        self.environments()
            .iter()
            .map(|env| self.environment_entry(env))
            .collect()
    }

    fn collect_scope(&self, scope: &str) -> Result<Vec<Entry>> {
        match self.environment(scope) {
            Some(env) => Ok(vec![self.environment_entry(&env)?]),
            None => Ok(vec![Entry::builder("Environment not found", scope)
                .status(Status::Error)
                .detail("error", "environment no longer exists")
                .build()?]),
        }
    }

    fn supported_actions(&self) -> &[RemediationAction] {
        &[RemediationAction::Uninstall, RemediationAction::Upgrade]
    }

    /// Acts on one package in the environment named by `scope`.
    fn perform_remediation(
        &self,
        action: RemediationAction,
        scope: Option<&str>,
        target: &str,
    ) -> Result<String> {
        let id = self.id();
        let package = require_target(&id, action, target)?;
        let Some(scope) = scope else {
            return Err(remediation_failed(
                &id,
                action,
                "name the environment, e.g. python:<environment path>",
            ));
        };
        let env = self
            .environment(scope)
            .ok_or_else(|| remediation_failed(&id, action, format!("no environment at {}", scope)))?;

        let args: Vec<&str> = match action {
            RemediationAction::Uninstall => vec!["-m", "pip", "uninstall", "-y", package],
            RemediationAction::Upgrade => vec!["-m", "pip", "install", "--upgrade", package],
            other => return Err(remediation_failed(&id, other, "not supported by pip")),
        };
        let program = env.interpreter.to_string_lossy();
        run_remediation(self.runner.as_ref(), &id, action, &program, &args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::ScriptedRunner;
    use std::fs;
    use tempfile::TempDir;

    const PIP_LIST: &str = r#"[{"name":"requests","version":"2.31.0"},{"name":"pip","version":"24.0"}]"#;

    fn make_env(root: &Path) -> PathBuf {
        fs::create_dir_all(root.join("bin")).unwrap();
        let interpreter = root.join("bin/python");
        fs::write(&interpreter, "").unwrap();
        interpreter
    }

    fn fixture() -> (TempDir, Arc<ScriptedRunner>, PythonSource) {
        let temp = TempDir::new().unwrap();
        let env = HostEnv::new(temp.path(), temp.path());
        let mut roots = PythonRoots::for_host(&env);
        roots.interpreters = vec![(EnvKind::System, temp.path().join("usr/bin/python3"))];
        let runner = Arc::new(ScriptedRunner::new());
        let source = PythonSource::new(runner.clone(), roots, Duration::from_secs(5));
        (temp, runner, source)
    }

    fn command(interpreter: &Path, args: &str) -> String {
        format!("{} {}", interpreter.display(), args)
    }

    #[test]
    fn nothing_on_disk_is_unavailable() {
        let (_temp, runner, source) = fixture();
        assert!(!source.is_available());
        assert!(source.scopes().is_empty());
        assert!(runner.invocations().is_empty());
    }

    #[test]
    fn discovers_environments_in_display_order() {
        let (temp, runner, source) = fixture();
        let home = temp.path();
        fs::create_dir_all(home.join("usr/bin")).unwrap();
        fs::write(home.join("usr/bin/python3"), "").unwrap();
        make_env(&home.join("miniconda3"));
        make_env(&home.join("miniconda3/envs/ml"));
        make_env(&home.join(".pyenv/versions/3.12.1"));
        make_env(&home.join(".virtualenvs/tools"));
        // No interpreter inside; not an environment.
        fs::create_dir_all(home.join(".virtualenvs/empty")).unwrap();

        let labels: Vec<String> = source.environments().into_iter().map(|e| e.label).collect();
        assert_eq!(
            labels,
            vec!["System Python", "conda: base", "conda: ml", "pyenv: 3.12.1", "venv: tools"]
        );
        assert!(source.is_available());
        assert_eq!(source.scopes().len(), 5);
        assert!(runner.invocations().is_empty());
    }

    #[test]
    fn collects_packages_for_one_environment() {
        let (temp, runner, source) = fixture();
        let root = temp.path().join(".virtualenvs/tools");
        let interpreter = make_env(&root);
        runner.respond(&command(&interpreter, "--version"), "Python 3.11.7\n");
        runner.respond(&command(&interpreter, "-m pip list --format=json"), PIP_LIST);

        let entries = source.collect_scope(&root.to_string_lossy()).unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.name(), "venv: tools");
        assert_eq!(entry.status(), Status::Healthy);
        assert_eq!(entry.detail("version"), Some(&serde_json::json!("3.11.7")));
        assert_eq!(entry.detail("kind"), Some(&serde_json::json!("virtualenv")));
        assert_eq!(entry.detail("package_count"), Some(&serde_json::json!(2)));
        assert_eq!(
            entry.detail("packages"),
            Some(&serde_json::json!(["requests==2.31.0", "pip==24.0"]))
        );
    }

    #[test]
    fn pyenv_version_comes_from_directory_name() {
        let (temp, runner, source) = fixture();
        let root = temp.path().join(".pyenv/versions/3.10.13");
        let interpreter = make_env(&root);
        runner.respond(&command(&interpreter, "-m pip list --format=json"), "[]");

        let entries = source.collect_scope(&root.to_string_lossy()).unwrap();
        assert_eq!(entries[0].detail("version"), Some(&serde_json::json!("3.10.13")));
        assert_eq!(runner.count(&command(&interpreter, "--version")), 0);
    }

    #[test]
    fn missing_pip_is_a_warning() {
        let (temp, runner, source) = fixture();
        let root = temp.path().join(".virtualenvs/bare");
        let interpreter = make_env(&root);
        runner.respond(&command(&interpreter, "--version"), "Python 3.12.0\n");
        runner.fail(
            &command(&interpreter, "-m pip list --format=json"),
            1,
            "No module named pip",
        );

        let entries = source.collect_scope(&root.to_string_lossy()).unwrap();
        assert_eq!(entries[0].status(), Status::Warning);
        assert_eq!(entries[0].detail("package_count"), Some(&serde_json::json!(0)));
        assert!(entries[0].detail("pip_error").is_some());
    }

    #[test]
    fn broken_interpreter_is_an_error_entry() {
        let (temp, runner, source) = fixture();
        let root = temp.path().join(".virtualenvs/stale");
        let interpreter = make_env(&root);
        runner.fail(&command(&interpreter, "--version"), 127, "bad interpreter");

        let entries = source.collect_scope(&root.to_string_lossy()).unwrap();
        assert_eq!(entries[0].status(), Status::Error);
        assert!(entries[0].detail("error").is_some());
        assert_eq!(runner.count(&command(&interpreter, "-m pip list --format=json")), 0);
    }

    #[test]
    fn vanished_environment_is_an_error_entry() {
        let (temp, _runner, source) = fixture();
        let gone = temp.path().join(".virtualenvs/gone");
        let entries = source.collect_scope(&gone.to_string_lossy()).unwrap();
        assert_eq!(entries[0].name(), "Environment not found");
        assert_eq!(entries[0].status(), Status::Error);
    }

    #[test]
    fn uninstall_runs_pip_in_the_named_environment() {
        let (temp, runner, source) = fixture();
        let root = temp.path().join(".virtualenvs/tools");
        let interpreter = make_env(&root);
        let uninstall = command(&interpreter, "-m pip uninstall -y requests");
        runner.respond(&uninstall, "Successfully uninstalled requests-2.31.0\n");

        let scope = root.to_string_lossy().into_owned();
        source
            .perform_remediation(RemediationAction::Uninstall, Some(&scope), "requests")
            .unwrap();
        assert_eq!(runner.count(&uninstall), 1);
    }

    #[test]
    fn remediation_needs_a_known_environment() {
        let (temp, runner, source) = fixture();
        let err = source
            .perform_remediation(RemediationAction::Upgrade, None, "requests")
            .unwrap_err();
        assert!(err.to_string().contains("name the environment"));

        let elsewhere = temp.path().join("nowhere").to_string_lossy().into_owned();
        let err = source
            .perform_remediation(RemediationAction::Upgrade, Some(&elsewhere), "requests")
            .unwrap_err();
        assert!(err.to_string().contains("no environment"));
        assert!(runner.invocations().is_empty());
    }
}
