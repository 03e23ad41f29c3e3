//! Platform and shell environment detection.

use std::path::{Path, PathBuf};

/// Shell config files in the order the shells read them, relative to `home`.
///
/// zsh files come first because zsh is the default login shell on macOS,
/// then the bash family. Each entry carries a short description of when
/// the file is loaded.
pub fn default_shell_configs(home: &Path) -> Vec<(PathBuf, &'static str)> {
    vec![
        (home.join(".zshenv"), "Loaded first for all zsh sessions"),
        (home.join(".zprofile"), "Loaded for login shells, before .zshrc"),
        (home.join(".zshrc"), "Loaded for interactive zsh shells"),
        (home.join(".zlogin"), "Loaded for login shells, after .zshrc"),
        (home.join(".bash_profile"), "Loaded for bash login shells"),
        (home.join(".bashrc"), "Loaded for interactive bash shells"),
        (home.join(".profile"), "Loaded by sh-compatible login shells"),
        (home.join(".config/fish/config.fish"), "Loaded by every fish shell"),
    ]
}

/// Expand a leading `~` against `home`.
pub fn expand_home(path: &str, home: &Path) -> PathBuf {
    if path == "~" {
        home.to_path_buf()
    } else if let Some(rest) = path.strip_prefix("~/") {
        home.join(rest)
    } else {
        PathBuf::from(path)
    }
}

/// Check if running in a CI environment.
///
/// Used to force non-interactive output in `main()`.
/// Checks common CI environment variables: `CI`, `GITHUB_ACTIONS`,
/// `GITLAB_CI`, `CIRCLECI`, `TRAVIS`, `JENKINS_URL`.
pub fn is_ci() -> bool {
    std::env::var("CI").is_ok()
        || std::env::var("GITHUB_ACTIONS").is_ok()
        || std::env::var("GITLAB_CI").is_ok()
        || std::env::var("CIRCLECI").is_ok()
        || std::env::var("TRAVIS").is_ok()
        || std::env::var("JENKINS_URL").is_ok()
}
