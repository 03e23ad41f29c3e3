//! Remediation dispatcher.
//!
//! Routes an operator's action to the owning source and, on success, drops
//! that source's cached listing so the next display re-collects. A failed
//! action leaves the cache alone: the system is presumed unchanged.

use std::sync::Arc;

use serde::Serialize;

use crate::cache::CacheKey;
use crate::error::{DevtopoError, Result};
use crate::scheduler::{Orchestrator, SourceDescriptor, SourceRegistry};
use crate::sources::SourceId;

use super::RemediationAction;

/// What a remediation did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemediationOutcome {
    pub source: SourceId,
    pub action: RemediationAction,
    pub target: String,
    /// Adapter's description, e.g. "Ran `brew uninstall wget`".
    pub message: String,
    pub dry_run: bool,
    /// The cache key dropped; `None` for a dry run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalidated: Option<String>,
}

pub struct RemediationDispatcher {
    registry: Arc<SourceRegistry>,
    dry_run: bool,
}

impl RemediationDispatcher {
    pub fn new(registry: Arc<SourceRegistry>) -> Self {
        Self {
            registry,
            dry_run: false,
        }
    }

    /// Log what would run instead of delegating. Nothing is invalidated.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Check that `key` names a registered source supporting `action`.
    pub fn check(&self, action: RemediationAction, key: &CacheKey) -> Result<&SourceDescriptor> {
        let descriptor = self
            .registry
            .get(key.source_id())
            .ok_or_else(|| DevtopoError::UnknownSource {
                source_id: key.source_id().to_string(),
            })?;
        if !descriptor.source().supported_actions().contains(&action) {
            return Err(DevtopoError::UnsupportedAction {
                source_id: key.source_id().to_string(),
                action: action.to_string(),
            });
        }
        Ok(descriptor)
    }

    /// Perform `action` on `target` through the source named by `key`.
    ///
    /// On success the affected cache slot is invalidated and the source is
    /// returned to pending in `session`.
    pub fn perform(
        &self,
        session: &mut Orchestrator,
        action: RemediationAction,
        key: &CacheKey,
        target: &str,
    ) -> Result<RemediationOutcome> {
        let descriptor = self.check(action, key)?;
        let id = descriptor.id().clone();

        if self.dry_run {
            tracing::info!("Dry run: would {} '{}' via '{}'", action, target, key);
            return Ok(RemediationOutcome {
                source: id,
                action,
                target: target.to_string(),
                message: format!("Would {} {}", action, target),
                dry_run: true,
                invalidated: None,
            });
        }

        let message = descriptor
            .source()
            .perform_remediation(action, key.scope(), target)
            .map_err(|err| as_remediation_failure(&id, action, err))?;
        tracing::info!("{} '{}' via '{}': {}", action, target, key, message);

        let invalidate = invalidation_key(descriptor, key);
        session.invalidate(&invalidate)?;

        Ok(RemediationOutcome {
            source: id,
            action,
            target: target.to_string(),
            message,
            dry_run: false,
            invalidated: Some(invalidate.to_string()),
        })
    }
}

/// A scope the source actually caches separately is invalidated alone;
/// anything else drops the whole source.
fn invalidation_key(descriptor: &SourceDescriptor, key: &CacheKey) -> CacheKey {
    match key.scope() {
        Some(scope) if descriptor.source().scopes().iter().any(|s| s == scope) => key.clone(),
        _ => CacheKey::source(key.source_id().clone()),
    }
}

fn as_remediation_failure(id: &SourceId, action: RemediationAction, err: DevtopoError) -> DevtopoError {
    match err {
        DevtopoError::RemediationFailed { .. } | DevtopoError::UnsupportedAction { .. } => err,
        other => DevtopoError::RemediationFailed {
            source_id: id.to_string(),
            action: action.to_string(),
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{Entry, Status};
    use crate::scheduler::{EntriesView, SchedulerOptions, SourceState};
    use crate::sources::{Source, SourceSpeed};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// A package manager holding an in-memory package list.
    struct FakeBrew {
        packages: Mutex<Vec<String>>,
        collects: AtomicUsize,
        broken: AtomicBool,
    }

    impl FakeBrew {
        fn new(packages: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                packages: Mutex::new(packages.iter().map(|p| p.to_string()).collect()),
                collects: AtomicUsize::new(0),
                broken: AtomicBool::new(false),
            })
        }
    }

    impl Source for FakeBrew {
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
            true
        }

        fn collect(&self) -> Result<Vec<Entry>> {
            self.collects.fetch_add(1, Ordering::SeqCst);
            let packages = self.packages.lock().unwrap();
            Ok(packages
                .iter()
                .map(|p| Entry::new(p.as_str(), "1.0", Status::Healthy).unwrap())
                .collect())
        }

        fn supported_actions(&self) -> &[RemediationAction] {
            &[RemediationAction::Uninstall]
        }

        fn perform_remediation(
            &self,
            _action: RemediationAction,
            _scope: Option<&str>,
            target: &str,
        ) -> Result<String> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(DevtopoError::CommandFailed {
                    command: format!("brew uninstall {}", target),
                    code: Some(1),
                });
            }
            self.packages.lock().unwrap().retain(|p| p != target);
            Ok(format!("Ran `brew uninstall {}`", target))
        }
    }

    fn session(brew: Arc<FakeBrew>) -> (Arc<SourceRegistry>, Orchestrator) {
        let registry = Arc::new(SourceRegistry::new().with(brew));
        let options = SchedulerOptions {
            collection_timeout: Duration::from_secs(5),
            startup_delay: Duration::ZERO,
            max_workers: 2,
        };
        let mut orch = Orchestrator::new(Arc::clone(&registry), options);
        orch.start_session();
        orch.schedule_background();
        assert!(orch.wait_for_idle(Duration::from_secs(5)));
        (registry, orch)
    }

    fn loaded_names(orch: &mut Orchestrator) -> Vec<String> {
        match orch.current_entries(&SourceId::new("brew")).unwrap() {
            EntriesView::Entries(entries) => entries.iter().map(|e| e.name().to_string()).collect(),
            other => panic!("Expected entries, got {:?}", other),
        }
    }

    #[test]
    fn success_returns_source_to_pending_and_recollects() {
        let brew = FakeBrew::new(&["foo", "wget"]);
        let (registry, mut orch) = session(Arc::clone(&brew));
        assert_eq!(brew.collects.load(Ordering::SeqCst), 1);

        let dispatcher = RemediationDispatcher::new(registry);
        let key: CacheKey = "brew:foo".parse().unwrap();
        let outcome = dispatcher
            .perform(&mut orch, RemediationAction::Uninstall, &key, "foo")
            .unwrap();

        assert_eq!(outcome.message, "Ran `brew uninstall foo`");
        assert_eq!(outcome.invalidated.as_deref(), Some("brew"));
        assert_eq!(orch.state(&SourceId::new("brew")), Some(SourceState::SlowPending));
        assert!(!orch.cache().is_valid(&CacheKey::source("brew")));

        assert_eq!(
            orch.current_entries(&SourceId::new("brew")).unwrap(),
            EntriesView::Loading
        );
        assert!(orch.wait_for_idle(Duration::from_secs(5)));
        assert_eq!(loaded_names(&mut orch), vec!["wget"]);
        assert_eq!(brew.collects.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failure_leaves_cache_untouched() {
        let brew = FakeBrew::new(&["foo"]);
        let (registry, mut orch) = session(Arc::clone(&brew));
        brew.broken.store(true, Ordering::SeqCst);

        let dispatcher = RemediationDispatcher::new(registry);
        let err = dispatcher
            .perform(&mut orch, RemediationAction::Uninstall, &CacheKey::source("brew"), "foo")
            .unwrap_err();

        assert!(matches!(err, DevtopoError::RemediationFailed { .. }));
        assert!(orch.cache().is_valid(&CacheKey::source("brew")));
        assert_eq!(orch.state(&SourceId::new("brew")), Some(SourceState::SlowLoaded));
        assert_eq!(loaded_names(&mut orch), vec!["foo"]);
        assert_eq!(brew.collects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsupported_action_is_rejected_before_delegating() {
        let brew = FakeBrew::new(&["foo"]);
        let (registry, mut orch) = session(Arc::clone(&brew));
        let err = RemediationDispatcher::new(registry)
            .perform(&mut orch, RemediationAction::RemoveLine, &CacheKey::source("brew"), "x:1")
            .unwrap_err();
        assert!(matches!(err, DevtopoError::UnsupportedAction { .. }));
        assert_eq!(brew.packages.lock().unwrap().len(), 1);
    }

    #[test]
    fn unknown_source_is_rejected() {
        let brew = FakeBrew::new(&[]);
        let (registry, mut orch) = session(brew);
        let err = RemediationDispatcher::new(registry)
            .perform(&mut orch, RemediationAction::Uninstall, &CacheKey::source("pip"), "x")
            .unwrap_err();
        assert!(matches!(err, DevtopoError::UnknownSource { .. }));
    }

    #[test]
    fn dry_run_neither_delegates_nor_invalidates() {
        let brew = FakeBrew::new(&["foo"]);
        let (registry, mut orch) = session(Arc::clone(&brew));
        let outcome = RemediationDispatcher::new(registry)
            .dry_run(true)
            .perform(&mut orch, RemediationAction::Uninstall, &CacheKey::source("brew"), "foo")
            .unwrap();

        assert!(outcome.dry_run);
        assert!(outcome.invalidated.is_none());
        assert_eq!(brew.packages.lock().unwrap().len(), 1);
        assert!(orch.cache().is_valid(&CacheKey::source("brew")));
    }
}
