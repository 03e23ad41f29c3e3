//! Rust toolchains managed by rustup, plus `cargo install`ed binaries.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::entry::Entry;
use crate::error::Result;
use crate::remediation::RemediationAction;
use crate::shell::ProcessRunner;

use super::{
    dir_has_content, remediation_failed, require_target, run_listing, run_remediation, HostEnv,
    Source, SourceId, SourceSpeed,
};

/// Binaries rustup installs as proxies; not user-installed crates.
const PROXIES: &[&str] = &[
    "rustup",
    "cargo",
    "rustc",
    "rustfmt",
    "rustdoc",
    "clippy-driver",
    "cargo-fmt",
    "cargo-clippy",
    "cargo-miri",
    "rust-analyzer",
    "rust-gdb",
    "rust-gdbgui",
    "rust-lldb",
];

pub struct RustupSource {
    runner: Arc<dyn ProcessRunner>,
    rustup_home: PathBuf,
    cargo_home: PathBuf,
    timeout: Duration,
}

impl RustupSource {
    pub fn new(runner: Arc<dyn ProcessRunner>, env: &HostEnv, timeout: Duration) -> Self {
        Self {
            runner,
            rustup_home: env.dir_from_var("RUSTUP_HOME", ".rustup"),
            cargo_home: env.dir_from_var("CARGO_HOME", ".cargo"),
            timeout,
        }
    }

    fn cargo_binaries(&self) -> Vec<PathBuf> {
        let Ok(entries) = fs::read_dir(self.cargo_home.join("bin")) else {
            return Vec::new();
        };
        let mut bins: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .filter(|p| {
                p.file_stem()
                    .map(|s| s.to_string_lossy())
                    .is_some_and(|name| !name.starts_with('.') && !PROXIES.contains(&&*name))
            })
            .collect();
        bins.sort();
        bins
    }
}

/// Split a `rustup toolchain list` line into name and default flag.
///
/// Handles both `stable-x86_64 (default)` and the newer
/// `stable-x86_64 (active, default)` markers.
fn parse_toolchain_line(line: &str) -> Option<(String, bool, bool)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with("no installed toolchains") {
        return None;
    }
    let (name, markers) = match line.split_once(' ') {
        Some((name, rest)) => (name, rest),
        None => (line, ""),
    };
    Some((
        name.to_string(),
        markers.contains("default"),
        markers.contains("active"),
    ))
}

impl Source for RustupSource {
    fn id(&self) -> SourceId {
        SourceId::new("rustup")
    }

    fn category(&self) -> &str {
        "Rust"
    }

    fn speed(&self) -> SourceSpeed {
        SourceSpeed::Slow
    }

    fn is_available(&self) -> bool {
        dir_has_content(&self.rustup_home.join("toolchains"))
    }

    fn collect(&self) -> Result<Vec<Entry>> {
        let listing = run_listing(
            self.runner.as_ref(),
            &self.id(),
            "rustup",
            &["toolchain", "list"],
            self.timeout,
        )?;

        let mut entries = Vec::new();
        for (name, is_default, is_active) in listing.stdout.lines().filter_map(parse_toolchain_line) {
            let dir = self.rustup_home.join("toolchains").join(&name);
            let channel = name.split('-').next().unwrap_or_default().to_string();
            entries.push(
                Entry::builder(name.as_str(), dir.to_string_lossy())
                    .detail("kind", "toolchain")
                    .detail("channel", channel)
                    .detail("is_default", is_default)
                    .detail("is_active", is_active)
                    .build()?,
            );
        }

        for bin in self.cargo_binaries() {
            let name = bin
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            entries.push(
                Entry::builder(name, bin.to_string_lossy())
                    .detail("kind", "cargo-binary")
                    .build()?,
            );
        }

        Ok(entries)
    }

    fn supported_actions(&self) -> &[RemediationAction] {
        &[RemediationAction::Uninstall]
    }

    /// `uninstall` removes a toolchain by name.
    fn perform_remediation(
        &self,
        action: RemediationAction,
        _scope: Option<&str>,
        target: &str,
    ) -> Result<String> {
        let id = self.id();
        if action != RemediationAction::Uninstall {
            return Err(remediation_failed(&id, action, "only uninstall is supported"));
        }
        let toolchain = require_target(&id, action, target)?;
        run_remediation(
            self.runner.as_ref(),
            &id,
            action,
            "rustup",
            &["toolchain", "uninstall", toolchain],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::ScriptedRunner;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, Arc<ScriptedRunner>, RustupSource) {
        let temp = TempDir::new().unwrap();
        let env = HostEnv::new(temp.path(), temp.path());
        let runner = Arc::new(ScriptedRunner::new());
        let source = RustupSource::new(runner.clone(), &env, Duration::from_secs(5));
        (temp, runner, source)
    }

    #[test]
    fn parses_toolchain_markers() {
        assert_eq!(
            parse_toolchain_line("stable-aarch64-apple-darwin (default)"),
            Some(("stable-aarch64-apple-darwin".to_string(), true, false))
        );
        assert_eq!(
            parse_toolchain_line("stable-x86_64-unknown-linux-gnu (active, default)"),
            Some(("stable-x86_64-unknown-linux-gnu".to_string(), true, true))
        );
        assert_eq!(
            parse_toolchain_line("nightly-x86_64-unknown-linux-gnu"),
            Some(("nightly-x86_64-unknown-linux-gnu".to_string(), false, false))
        );
        assert_eq!(parse_toolchain_line("no installed toolchains"), None);
    }

    #[test]
    fn available_once_a_toolchain_exists() {
        let (temp, runner, source) = fixture();
        fs::create_dir_all(temp.path().join(".rustup/toolchains")).unwrap();
        assert!(!source.is_available());

        fs::create_dir_all(temp.path().join(".rustup/toolchains/stable-x86_64-unknown-linux-gnu"))
            .unwrap();
        assert!(source.is_available());
        assert!(runner.invocations().is_empty());
    }

    #[test]
    fn collects_toolchains_and_cargo_binaries() {
        let (temp, runner, source) = fixture();
        let bin = temp.path().join(".cargo/bin");
        fs::create_dir_all(&bin).unwrap();
        fs::write(bin.join("cargo"), "").unwrap();
        fs::write(bin.join("ripgrep"), "").unwrap();
        runner.respond(
            "rustup toolchain list",
            "stable-x86_64-unknown-linux-gnu (default)\nnightly-x86_64-unknown-linux-gnu\n",
        );

        let entries = source.collect().unwrap();

        let names: Vec<_> = entries.iter().map(|e| e.name()).collect();
        assert_eq!(
            names,
            vec![
                "stable-x86_64-unknown-linux-gnu",
                "nightly-x86_64-unknown-linux-gnu",
                "ripgrep"
            ]
        );
        assert_eq!(entries[0].detail("is_default"), Some(&serde_json::json!(true)));
        assert_eq!(entries[1].detail("channel").and_then(|v| v.as_str()), Some("nightly"));
    }

    #[test]
    fn uninstall_removes_toolchain() {
        let (_temp, runner, source) = fixture();
        runner.respond("rustup toolchain uninstall nightly", "");
        source
            .perform_remediation(RemediationAction::Uninstall, None, "nightly")
            .unwrap();
        assert_eq!(runner.count("rustup toolchain uninstall nightly"), 1);
    }
}
