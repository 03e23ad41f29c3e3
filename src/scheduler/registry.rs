//! Source registry.
//!
//! Built once at startup and shared by reference with the orchestrator and
//! the remediation dispatcher. Registration order is display order.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Settings;
use crate::shell::ProcessRunner;
use crate::sources::brew::BrewSource;
use crate::sources::git::GitSource;
use crate::sources::managers::ManagerSource;
use crate::sources::npm::NpmSource;
use crate::sources::path::PathSource;
use crate::sources::python::{PythonRoots, PythonSource};
use crate::sources::rustup::RustupSource;
use crate::sources::shell_config::ShellConfigSource;
use crate::sources::symlinks::SymlinkSource;
use crate::sources::{HostEnv, Source, SourceId, SourceSpeed};

use super::timeout::RunningCollections;

/// A registered source with its identity resolved once.
#[derive(Clone)]
pub struct SourceDescriptor {
    id: SourceId,
    category: String,
    speed: SourceSpeed,
    source: Arc<dyn Source>,
    /// Shared by every clone, so every session on this registry sees the
    /// same collection threads.
    running: Arc<RunningCollections>,
}

impl SourceDescriptor {
    pub fn new(source: Arc<dyn Source>) -> Self {
        Self {
            id: source.id(),
            category: source.category().to_string(),
            speed: source.speed(),
            source,
            running: RunningCollections::new(),
        }
    }

    pub fn id(&self) -> &SourceId {
        &self.id
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn speed(&self) -> SourceSpeed {
        self.speed
    }

    pub fn source(&self) -> &Arc<dyn Source> {
        &self.source
    }

    pub fn running(&self) -> &Arc<RunningCollections> {
        &self.running
    }
}

impl std::fmt::Debug for SourceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceDescriptor")
            .field("id", &self.id)
            .field("category", &self.category)
            .field("speed", &self.speed)
            .finish()
    }
}

/// Ordered table of sources.
#[derive(Debug, Default, Clone)]
pub struct SourceRegistry {
    descriptors: Vec<SourceDescriptor>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source. A second source with the same id is ignored.
    pub fn register(&mut self, source: Arc<dyn Source>) -> &mut Self {
        let descriptor = SourceDescriptor::new(source);
        if self.get(descriptor.id()).is_some() {
            tracing::warn!("Source '{}' is already registered; ignoring", descriptor.id());
        } else {
            self.descriptors.push(descriptor);
        }
        self
    }

    /// Builder-style [`SourceRegistry::register`].
    pub fn with(mut self, source: Arc<dyn Source>) -> Self {
        self.register(source);
        self
    }

    /// The built-in sources, minus those disabled in `settings`.
    pub fn builtin(settings: &Settings, env: Arc<HostEnv>, runner: Arc<dyn ProcessRunner>) -> Self {
        let home = env.home().to_path_buf();
        let timeout = settings.collection_timeout();
        let backup_dir = settings.backup_dir(&home);
        let shell_configs = settings.shell_configs(&home);
        let config_paths: Vec<PathBuf> = shell_configs.iter().map(|c| c.path.clone()).collect();

        let candidates: Vec<Arc<dyn Source>> = vec![
            Arc::new(PathSource::new(Arc::clone(&env), config_paths, backup_dir.clone())),
            Arc::new(ShellConfigSource::new(shell_configs, backup_dir)),
            Arc::new(SymlinkSource::new(settings.symlink_dirs(&home))),
            Arc::new(ManagerSource::new(Arc::clone(&env))),
            Arc::new(BrewSource::new(
                Arc::clone(&runner),
                BrewSource::prefixes_for(&env),
                timeout,
            )),
            Arc::new(PythonSource::new(
                Arc::clone(&runner),
                PythonRoots::for_host(&env),
                timeout,
            )),
            Arc::new(NpmSource::new(
                Arc::clone(&runner),
                NpmSource::global_modules_for(&env),
                env.cwd().to_path_buf(),
                timeout,
            )),
            Arc::new(RustupSource::new(Arc::clone(&runner), &env, timeout)),
            Arc::new(GitSource::new(
                runner,
                settings.git_roots(&home),
                git_search_dirs(&env),
                timeout,
            )),
        ];

        let mut registry = Self::new();
        for source in candidates {
            if settings.is_disabled(&source.id()) {
                tracing::debug!("Source '{}' disabled by settings", source.id());
                continue;
            }
            registry.register(source);
        }
        registry
    }

    pub fn get(&self, id: &SourceId) -> Option<&SourceDescriptor> {
        self.descriptors.iter().find(|d| d.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceDescriptor> {
        self.descriptors.iter()
    }

    pub fn ids(&self) -> Vec<SourceId> {
        self.descriptors.iter().map(|d| d.id().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Number of registered slow sources.
    pub fn slow_count(&self) -> usize {
        self.descriptors
            .iter()
            .filter(|d| d.speed() == SourceSpeed::Slow)
            .count()
    }
}

/// `PATH` plus the usual install locations, for finding `git`.
fn git_search_dirs(env: &HostEnv) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = env.path_dirs().into_iter().map(PathBuf::from).collect();
    for fixed in ["/usr/bin", "/usr/local/bin", "/opt/homebrew/bin"] {
        let fixed = PathBuf::from(fixed);
        if !dirs.contains(&fixed) {
            dirs.push(fixed);
        }
    }
    dirs
}
