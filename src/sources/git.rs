//! Git repositories under the configured code directories.
//!
//! Repositories are found by walking the roots on disk. Each repository is
//! a scope keyed by its path, so fetching one repository only re-reads that
//! one.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::entry::{Entry, Status};
use crate::error::Result;
use crate::remediation::RemediationAction;
use crate::shell::ProcessRunner;

use super::{
    remediation_failed, require_target, run_listing, run_remediation, subdirectory_names,
    Source, SourceId, SourceSpeed,
};

/// How many directory levels below a root are searched.
const MAX_DEPTH: usize = 3;

const LOG_FORMAT: &str = "--format=%h%x1f%s%x1f%cr";

/// Directories that hold dependencies or build output, never projects.
const SKIP: &[&str] = &[
    "node_modules",
    "target",
    "build",
    "dist",
    "vendor",
    "venv",
    "env",
    "__pycache__",
    "coverage",
    "bower_components",
];

/// Parsed `git status --porcelain -b` output.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct RepoStatus {
    /// `None` on a detached HEAD.
    branch: Option<String>,
    upstream: Option<String>,
    ahead: u32,
    behind: u32,
    staged: u32,
    modified: u32,
    untracked: u32,
}

impl RepoStatus {
    fn parse(output: &str) -> Self {
        let mut status = Self::default();
        for line in output.lines() {
            if let Some(header) = line.strip_prefix("## ") {
                status.parse_header(header);
                continue;
            }
            let mut flags = line.chars();
            let (index, worktree) = (flags.next().unwrap_or(' '), flags.next().unwrap_or(' '));
            if index == '?' {
                status.untracked += 1;
                continue;
            }
            if index != ' ' {
                status.staged += 1;
            }
            if worktree != ' ' {
                status.modified += 1;
            }
        }
        status
    }

    /// `main...origin/main [ahead 1, behind 2]`, `HEAD (no branch)` or
    /// `No commits yet on main`.
    fn parse_header(&mut self, header: &str) {
        if header.starts_with("HEAD (no branch)") {
            return;
        }
        let header = header
            .strip_prefix("No commits yet on ")
            .or_else(|| header.strip_prefix("Initial commit on "))
            .unwrap_or(header);

        let (refs, tracking) = match header.split_once(" [") {
            Some((refs, tracking)) => (refs, tracking.trim_end_matches(']')),
            None => (header, ""),
        };
        match refs.split_once("...") {
            Some((branch, upstream)) => {
                self.branch = Some(branch.to_string());
                self.upstream = Some(upstream.to_string());
            }
            None => self.branch = Some(refs.trim().to_string()),
        }
        for part in tracking.split(", ") {
            if let Some(n) = part.strip_prefix("ahead ") {
                self.ahead = n.trim().parse().unwrap_or(0);
            } else if let Some(n) = part.strip_prefix("behind ") {
                self.behind = n.trim().parse().unwrap_or(0);
            }
        }
    }

    fn is_clean(&self) -> bool {
        self.staged == 0 && self.modified == 0 && self.untracked == 0
    }

    fn health(&self) -> Status {
        if self.branch.is_none() {
            Status::Error
        } else if !self.is_clean() || self.ahead > 0 || self.behind > 0 {
            Status::Warning
        } else {
            Status::Healthy
        }
    }
}

pub struct GitSource {
    runner: Arc<dyn ProcessRunner>,
    roots: Vec<PathBuf>,
    search_dirs: Vec<PathBuf>,
    timeout: Duration,
}

impl GitSource {
    /// `search_dirs` are where a `git` binary is looked for.
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        roots: Vec<PathBuf>,
        search_dirs: Vec<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            runner,
            roots,
            search_dirs,
            timeout,
        }
    }

    fn git_installed(&self) -> bool {
        self.search_dirs.iter().any(|dir| dir.join("git").is_file())
    }

    /// Every repository under the roots, sorted. Repositories are not
    /// searched for nested ones.
    pub fn repositories(&self) -> Vec<PathBuf> {
        let mut repos = Vec::new();
        for root in &self.roots {
            if is_repository(root) {
                repos.push(root.clone());
            } else {
                scan(root, 0, &mut repos);
            }
        }
        repos.sort();
        repos.dedup();
        repos
    }

    fn is_scanned(&self, repo: &Path) -> bool {
        self.repositories().iter().any(|r| r == repo)
    }

    fn git(&self, repo: &Path, args: &[&str]) -> Result<String> {
        let repo = repo.to_string_lossy().into_owned();
        let mut argv = vec!["-C", repo.as_str()];
        argv.extend_from_slice(args);
        let result = run_listing(self.runner.as_ref(), &self.id(), "git", &argv, self.timeout)?;
        Ok(result.stdout)
    }

    /// Like [`GitSource::git`], for details a repository may lack.
    fn optional(&self, repo: &Path, args: &[&str]) -> Option<String> {
        self.git(repo, args)
            .ok()
            .map(|out| out.trim().to_string())
            .filter(|out| !out.is_empty())
    }

    fn repository_entry(&self, repo: &Path) -> Result<Entry> {
        let name = repo
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| repo.to_string_lossy().into_owned());
        let path = repo.to_string_lossy().into_owned();

        if !is_repository(repo) {
            return Ok(Entry::builder(name, path)
                .status(Status::Error)
                .detail("error", "Repository not found")
                .build()?);
        }

        let status = match self.git(repo, &["status", "--porcelain", "-b"]) {
            Ok(out) => RepoStatus::parse(&out),
            Err(e) => {
                tracing::debug!("git status failed in {}: {}", path, e);
                return Ok(Entry::builder(name, path)
                    .status(Status::Error)
                    .detail("error", e.to_string())
                    .build()?);
            }
        };

        // Fields split on the unit separator; subjects may contain anything else.
        let last_commit = self.optional(repo, &["log", "-1", LOG_FORMAT]);
        let mut commit = last_commit.as_deref().unwrap_or_default().splitn(3, '\u{1f}');
        let (hash, subject, when) = (commit.next(), commit.next(), commit.next());

        Ok(Entry::builder(name, path)
            .status(status.health())
            .detail("branch", status.branch.clone().unwrap_or_else(|| "HEAD".to_string()))
            .detail("detached", status.branch.is_none())
            .detail("clean", status.is_clean())
            .detail("ahead", status.ahead)
            .detail("behind", status.behind)
            .detail("staged", status.staged)
            .detail("modified", status.modified)
            .detail("untracked", status.untracked)
            .detail_opt("upstream", status.upstream)
            .detail_opt("remote_url", self.optional(repo, &["remote", "get-url", "origin"]))
            .detail_opt("last_commit", hash.filter(|h| !h.is_empty()).map(str::to_string))
            .detail_opt("last_commit_msg", subject.map(str::to_string))
            .detail_opt("last_commit_date", when.map(str::to_string))
            .build()?)
    }
}

fn is_repository(dir: &Path) -> bool {
    dir.join(".git").exists()
}

fn scan(dir: &Path, depth: usize, repos: &mut Vec<PathBuf>) {
    if depth >= MAX_DEPTH {
        return;
    }
    for name in subdirectory_names(dir) {
        if SKIP.contains(&name.as_str()) {
            continue;
        }
        let child = dir.join(&name);
        if child.is_symlink() {
            continue;
        }
        if is_repository(&child) {
            repos.push(child);
        } else {
            scan(&child, depth + 1, repos);
        }
    }
}

impl Source for GitSource {
    fn id(&self) -> SourceId {
        SourceId::new("git")
    }

    fn category(&self) -> &str {
        "Git"
    }

    fn speed(&self) -> SourceSpeed {
        SourceSpeed::Slow
    }

    fn is_available(&self) -> bool {
        self.git_installed() && !self.repositories().is_empty()
    }

    fn scopes(&self) -> Vec<String> {
        self.repositories()
            .iter()
            .map(|r| r.to_string_lossy().into_owned())
            .collect()
    }

    fn collect(&self) -> Result<Vec<Entry>> {
        self.repositories()
            .iter()
            .map(|repo| self.repository_entry(repo))
            .collect()
    }

    fn collect_scope(&self, scope: &str) -> Result<Vec<Entry>> {
        Ok(vec![self.repository_entry(Path::new(scope))?])
    }

    fn supported_actions(&self) -> &[RemediationAction] {
        &[RemediationAction::Update, RemediationAction::Upgrade]
    }

    /// `update` fetches, `upgrade` fast-forwards. The target is the
    /// repository path.
    fn perform_remediation(
        &self,
        action: RemediationAction,
        _scope: Option<&str>,
        target: &str,
    ) -> Result<String> {
        let id = self.id();
        let repo = require_target(&id, action, target)?;
        if !self.is_scanned(Path::new(repo)) {
            return Err(remediation_failed(
                &id,
                action,
                format!("{} is not a scanned repository", repo),
            ));
        }
        let args: Vec<&str> = match action {
            RemediationAction::Update => vec!["-C", repo, "fetch", "--prune"],
            RemediationAction::Upgrade => vec!["-C", repo, "pull", "--ff-only"],
            other => return Err(remediation_failed(&id, other, "not supported by git")),
        };
        run_remediation(self.runner.as_ref(), &id, action, "git", &args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::ScriptedRunner;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, Arc<ScriptedRunner>, GitSource) {
        let temp = TempDir::new().unwrap();
        let bin = temp.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        fs::write(bin.join("git"), "").unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let source = GitSource::new(
            runner.clone(),
            vec![temp.path().join("code")],
            vec![bin],
            Duration::from_secs(5),
        );
        (temp, runner, source)
    }

    fn make_repo(dir: &Path) {
        fs::create_dir_all(dir.join(".git")).unwrap();
    }

    fn git(repo: &Path, args: &str) -> String {
        format!("git -C {} {}", repo.display(), args)
    }

    #[test]
    fn parses_tracking_header_and_counts() {
        let status = RepoStatus::parse(
            "## main...origin/main [ahead 2, behind 1]\nM  src/lib.rs\n M README.md\nMM Cargo.toml\n?? notes.txt\n",
        );
        assert_eq!(status.branch.as_deref(), Some("main"));
        assert_eq!(status.upstream.as_deref(), Some("origin/main"));
        assert_eq!((status.ahead, status.behind), (2, 1));
        assert_eq!((status.staged, status.modified, status.untracked), (2, 2, 1));
        assert_eq!(status.health(), Status::Warning);
    }

    #[test]
    fn parses_unusual_headers() {
        assert_eq!(RepoStatus::parse("## HEAD (no branch)\n").health(), Status::Error);

        let fresh = RepoStatus::parse("## No commits yet on main\n");
        assert_eq!(fresh.branch.as_deref(), Some("main"));
        assert_eq!(fresh.health(), Status::Healthy);

        let gone = RepoStatus::parse("## feature...origin/feature [gone]\n");
        assert_eq!(gone.branch.as_deref(), Some("feature"));
        assert_eq!((gone.ahead, gone.behind), (0, 0));
    }

    #[test]
    fn finds_repositories_without_descending_into_them() {
        let (temp, runner, source) = fixture();
        let code = temp.path().join("code");
        make_repo(&code.join("api"));
        make_repo(&code.join("api/vendor-copy"));
        make_repo(&code.join("team/web"));
        make_repo(&code.join("web/node_modules/dep"));
        make_repo(&code.join(".hidden/repo"));
        make_repo(&code.join("a/b/c/too-deep"));

        assert_eq!(source.repositories(), vec![code.join("api"), code.join("team/web")]);
        assert!(source.is_available());
        assert_eq!(source.scopes().len(), 2);
        assert!(runner.invocations().is_empty());
    }

    #[test]
    fn needs_git_binary_and_a_repository() {
        let (temp, _runner, source) = fixture();
        assert!(!source.is_available());

        make_repo(&temp.path().join("code/api"));
        let without_git = GitSource::new(
            Arc::new(ScriptedRunner::new()),
            vec![temp.path().join("code")],
            vec![temp.path().join("nowhere")],
            Duration::from_secs(5),
        );
        assert!(!without_git.is_available());
    }

    #[test]
    fn collects_one_repository_per_scope() {
        let (temp, runner, source) = fixture();
        let repo = temp.path().join("code/api");
        make_repo(&repo);
        runner.respond(&git(&repo, "status --porcelain -b"), "## main...origin/main\n");
        runner.respond(
            &git(&repo, &format!("log -1 {}", LOG_FORMAT)),
            "abc1234\u{1f}Fix parser | lexer split\u{1f}2 days ago\n",
        );
        runner.respond(&git(&repo, "remote get-url origin"), "git@example.com:team/api.git\n");

        let entries = source.collect_scope(&repo.to_string_lossy()).unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.name(), "api");
        assert_eq!(entry.status(), Status::Healthy);
        assert_eq!(entry.detail("branch"), Some(&serde_json::json!("main")));
        assert_eq!(entry.detail("clean"), Some(&serde_json::json!(true)));
        assert_eq!(entry.detail("last_commit"), Some(&serde_json::json!("abc1234")));
        assert_eq!(
            entry.detail("last_commit_msg"),
            Some(&serde_json::json!("Fix parser | lexer split"))
        );
        assert_eq!(entry.detail("last_commit_date"), Some(&serde_json::json!("2 days ago")));
        assert_eq!(
            entry.detail("remote_url"),
            Some(&serde_json::json!("git@example.com:team/api.git"))
        );
    }

    #[test]
    fn repository_without_commits_or_remote_still_lists() {
        let (temp, runner, source) = fixture();
        let repo = temp.path().join("code/scratch");
        make_repo(&repo);
        runner.respond(&git(&repo, "status --porcelain -b"), "## No commits yet on main\n?? a.txt\n");
        runner.fail(&git(&repo, &format!("log -1 {}", LOG_FORMAT)), 128, "fatal: no commits");
        runner.fail(&git(&repo, "remote get-url origin"), 2, "error: No such remote");

        let entries = source.collect_scope(&repo.to_string_lossy()).unwrap();
        assert_eq!(entries[0].status(), Status::Warning);
        assert_eq!(entries[0].detail("untracked"), Some(&serde_json::json!(1)));
        assert_eq!(entries[0].detail("last_commit"), None);
        assert_eq!(entries[0].detail("remote_url"), None);
    }

    #[test]
    fn removed_repository_is_an_error_entry() {
        let (temp, runner, source) = fixture();
        let repo = temp.path().join("code/gone");
        let entries = source.collect_scope(&repo.to_string_lossy()).unwrap();
        assert_eq!(entries[0].status(), Status::Error);
        assert_eq!(entries[0].detail("error"), Some(&serde_json::json!("Repository not found")));
        assert!(runner.invocations().is_empty());
    }

    #[test]
    fn failing_status_is_an_error_entry() {
        let (temp, runner, source) = fixture();
        let repo = temp.path().join("code/broken");
        make_repo(&repo);
        runner.fail(&git(&repo, "status --porcelain -b"), 128, "fatal: not a git repository");

        let entries = source.collect_scope(&repo.to_string_lossy()).unwrap();
        assert_eq!(entries[0].status(), Status::Error);
        assert!(entries[0].detail("error").is_some());
    }

    #[test]
    fn upgrade_fast_forwards_scanned_repository_only() {
        let (temp, runner, source) = fixture();
        let repo = temp.path().join("code/api");
        make_repo(&repo);
        let pull = git(&repo, "pull --ff-only");
        runner.respond(&pull, "Already up to date.\n");

        let target = repo.to_string_lossy().into_owned();
        source
            .perform_remediation(RemediationAction::Upgrade, Some(&target), &target)
            .unwrap();
        assert_eq!(runner.count(&pull), 1);

        let outside = temp.path().join("elsewhere").to_string_lossy().into_owned();
        let err = source
            .perform_remediation(RemediationAction::Update, None, &outside)
            .unwrap_err();
        assert!(err.to_string().contains("not a scanned repository"));
        assert_eq!(runner.invocations().len(), 1);
    }
}
