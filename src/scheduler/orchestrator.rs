//! Session orchestration.
//!
//! The orchestrator owns one presentation session. It checks every source's
//! availability, collects fast sources inline, and hands slow sources to a
//! bounded worker pool whose results come back over a channel. The
//! presentation loop drains that channel with [`Orchestrator::poll_events`]
//! and never blocks on a collection.
//!
//! Collection failures are contained per source: the failing source shows a
//! single Error entry and every other source carries on.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::{CacheKey, CollectionCache};
use crate::config::Settings;
use crate::entry::{Entry, EntrySet};
use crate::error::{DevtopoError, Result};
use crate::sources::{SourceId, SourceSpeed};

use super::pool::WorkerPool;
use super::registry::{SourceDescriptor, SourceRegistry};
use super::snapshot::{Snapshot, SourceSnapshot};
use super::state::SourceState;

/// What the presentation layer shows for one source right now.
#[derive(Debug, Clone, PartialEq)]
pub enum EntriesView {
    Entries(EntrySet),
    Loading,
    Unavailable,
}

/// Which sources a manual refresh covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshTarget {
    Source(SourceId),
    All,
}

/// A background collection finished.
#[derive(Debug, Clone)]
pub struct CollectionEvent {
    pub source: SourceId,
    /// Schedule generation; results from superseded schedules are dropped.
    pub generation: u64,
    pub entries: EntrySet,
}

/// Scheduling knobs.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerOptions {
    pub collection_timeout: Duration,
    pub startup_delay: Duration,
    pub max_workers: usize,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for SchedulerOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            collection_timeout: settings.collection_timeout(),
            startup_delay: settings.startup_delay(),
            max_workers: settings.max_workers,
        }
    }
}

struct Tracked {
    descriptor: SourceDescriptor,
    state: SourceState,
    generation: u64,
    shown: Option<EntrySet>,
}

pub struct Orchestrator {
    registry: Arc<SourceRegistry>,
    cache: Arc<CollectionCache<EntrySet>>,
    options: SchedulerOptions,
    tracked: Vec<Tracked>,
    events_tx: Sender<CollectionEvent>,
    events_rx: Receiver<CollectionEvent>,
    pool: Option<WorkerPool>,
}

impl Orchestrator {
    pub fn new(registry: Arc<SourceRegistry>, options: SchedulerOptions) -> Self {
        Self::with_cache(registry, options, Arc::new(CollectionCache::new()))
    }

    /// Use an existing cache (shared with another session or a test).
    pub fn with_cache(
        registry: Arc<SourceRegistry>,
        options: SchedulerOptions,
        cache: Arc<CollectionCache<EntrySet>>,
    ) -> Self {
        let tracked = registry
            .iter()
            .map(|descriptor| Tracked {
                descriptor: descriptor.clone(),
                state: SourceState::Unchecked,
                generation: 0,
                shown: None,
            })
            .collect();
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            registry,
            cache,
            options,
            tracked,
            events_tx,
            events_rx,
            pool: None,
        }
    }

    pub fn registry(&self) -> &Arc<SourceRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<CollectionCache<EntrySet>> {
        &self.cache
    }

    /// Check availability of every source, then collect the fast ones.
    ///
    /// Returns once every available fast source is loaded. Slow sources are
    /// left pending for [`Orchestrator::schedule_background`].
    pub fn start_session(&mut self) {
        for index in 0..self.tracked.len() {
            self.check_availability(index);
        }
        for index in 0..self.tracked.len() {
            if self.tracked[index].state == SourceState::FastPending {
                self.load_fast(index);
            }
        }
    }

    /// Queue every pending slow source on the worker pool, each starting
    /// after the configured startup delay.
    pub fn schedule_background(&mut self) {
        let not_before = Instant::now() + self.options.startup_delay;
        for index in 0..self.tracked.len() {
            if self.tracked[index].state == SourceState::SlowPending {
                self.schedule_slow(index, Some(not_before));
            }
        }
    }

    /// Apply every finished background collection without blocking.
    ///
    /// Returns the sources whose entries changed.
    pub fn poll_events(&mut self) -> Vec<SourceId> {
        let mut updated = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            if let Some(id) = self.apply(event) {
                updated.push(id);
            }
        }
        updated
    }

    /// Block until the next background collection lands, up to `timeout`.
    ///
    /// Returns `None` on timeout or when nothing is loading.
    pub fn wait_next(&mut self, timeout: Duration) -> Option<SourceId> {
        let deadline = Instant::now() + timeout;
        while self.is_loading() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.events_rx.recv_timeout(remaining) {
                Ok(event) => {
                    if let Some(id) = self.apply(event) {
                        return Some(id);
                    }
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
        None
    }

    /// Wait until no source is loading. Returns false if `timeout` elapsed
    /// first.
    pub fn wait_for_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.is_loading() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            self.wait_next(remaining);
        }
        true
    }

    /// Whether any background collection is outstanding.
    pub fn is_loading(&self) -> bool {
        self.tracked
            .iter()
            .any(|t| t.state == SourceState::SlowLoading)
    }

    /// The entries to display for `id`.
    ///
    /// A pending fast source is collected on the spot. A pending slow source
    /// is scheduled and reported as loading.
    pub fn current_entries(&mut self, id: &SourceId) -> Result<EntriesView> {
        let index = self.index_of(id)?;
        if self.tracked[index].state == SourceState::Unchecked {
            self.check_availability(index);
        }

        let view = match self.tracked[index].state {
            SourceState::Unchecked | SourceState::Unavailable => EntriesView::Unavailable,
            SourceState::FastPending => {
                self.load_fast(index);
                self.loaded_view(index)
            }
            SourceState::SlowPending => {
                self.schedule_slow(index, None);
                EntriesView::Loading
            }
            SourceState::SlowLoading => EntriesView::Loading,
            SourceState::FastLoaded | SourceState::SlowLoaded => self.loaded_view(index),
        };
        Ok(view)
    }

    /// Manual refresh: drop cached results and re-check availability.
    ///
    /// Affected sources go back to pending (or unavailable); nothing is
    /// collected until the next [`Orchestrator::current_entries`] or
    /// [`Orchestrator::schedule_background`].
    pub fn request_refresh(&mut self, target: &RefreshTarget) -> Result<()> {
        match target {
            RefreshTarget::All => {
                tracing::debug!("Refreshing all sources");
                self.cache.invalidate_all();
                for index in 0..self.tracked.len() {
                    self.reset(index);
                }
            }
            RefreshTarget::Source(id) => {
                let index = self.index_of(id)?;
                tracing::debug!("Refreshing '{}'", id);
                self.cache.invalidate_source(id);
                self.reset(index);
            }
        }
        Ok(())
    }

    /// Invalidate a cache key and return its source to pending.
    ///
    /// A scoped key only drops that scope's cached listing; an unscoped key
    /// drops every scope of the source.
    pub fn invalidate(&mut self, key: &CacheKey) -> Result<()> {
        let index = self.index_of(key.source_id())?;
        match key.scope() {
            Some(_) => self.cache.invalidate(key),
            None => self.cache.invalidate_source(key.source_id()),
        }
        let tracked = &mut self.tracked[index];
        tracked.state = tracked.state.invalidated();
        tracked.shown = None;
        tracked.generation += 1;
        tracing::debug!("'{}' invalidated; now {}", key, tracked.state.label());
        Ok(())
    }

    pub fn state(&self, id: &SourceId) -> Option<SourceState> {
        self.tracked
            .iter()
            .find(|t| t.descriptor.id() == id)
            .map(|t| t.state)
    }

    /// Point-in-time view of every source for rendering or serialization.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            sources: self
                .tracked
                .iter()
                .map(|t| SourceSnapshot {
                    id: t.descriptor.id().clone(),
                    category: t.descriptor.category().to_string(),
                    speed: t.descriptor.speed(),
                    state: t.state,
                    entries: t.shown.as_ref().map(|set| set.to_vec()),
                })
                .collect(),
        }
    }

    fn index_of(&self, id: &SourceId) -> Result<usize> {
        self.tracked
            .iter()
            .position(|t| t.descriptor.id() == id)
            .ok_or_else(|| DevtopoError::UnknownSource {
                source_id: id.to_string(),
            })
    }

    fn check_availability(&mut self, index: usize) {
        let tracked = &mut self.tracked[index];
        let available = tracked.descriptor.source().is_available();
        tracked.state = SourceState::checked(available, tracked.descriptor.speed());
        tracing::debug!(
            "'{}' is {}",
            tracked.descriptor.id(),
            tracked.state.label()
        );
    }

    fn reset(&mut self, index: usize) {
        let tracked = &mut self.tracked[index];
        tracked.shown = None;
        tracked.generation += 1;
        tracked.state = SourceState::Unchecked;
        self.check_availability(index);
    }

    fn loaded_view(&self, index: usize) -> EntriesView {
        match &self.tracked[index].shown {
            Some(entries) => EntriesView::Entries(Arc::clone(entries)),
            None => EntriesView::Entries(Arc::from(Vec::new())),
        }
    }

    fn load_fast(&mut self, index: usize) {
        let timeout = self.options.collection_timeout;
        let entries = collect_entries(&self.cache, &self.tracked[index].descriptor, timeout);
        let tracked = &mut self.tracked[index];
        tracked.shown = Some(entries);
        tracked.state = SourceState::FastLoaded;
    }

    fn schedule_slow(&mut self, index: usize, not_before: Option<Instant>) {
        let slow_count = self
            .tracked
            .iter()
            .filter(|t| t.descriptor.speed() == SourceSpeed::Slow && t.state != SourceState::Unavailable)
            .count();
        let max_workers = self.options.max_workers;
        let pool = self
            .pool
            .get_or_insert_with(|| WorkerPool::new(max_workers.min(slow_count)));

        let tracked = &mut self.tracked[index];
        tracked.generation += 1;
        tracked.state = SourceState::SlowLoading;

        let generation = tracked.generation;
        let descriptor = tracked.descriptor.clone();
        let cache = Arc::clone(&self.cache);
        let events = self.events_tx.clone();
        let timeout = self.options.collection_timeout;
        tracing::debug!("Scheduling '{}' (generation {})", descriptor.id(), generation);

        let job = move || {
            let entries = collect_entries(&cache, &descriptor, timeout);
            let event = CollectionEvent {
                source: descriptor.id().clone(),
                generation,
                entries,
            };
            if events.send(event).is_err() {
                tracing::debug!("Session ended; discarding result for '{}'", descriptor.id());
            }
        };
        match not_before {
            Some(at) => pool.submit_after(at, job),
            None => pool.submit(job),
        }
    }

    fn apply(&mut self, event: CollectionEvent) -> Option<SourceId> {
        let tracked = self
            .tracked
            .iter_mut()
            .find(|t| *t.descriptor.id() == event.source)?;
        if tracked.state != SourceState::SlowLoading || tracked.generation != event.generation {
            tracing::debug!(
                "Discarding stale result for '{}' (generation {})",
                event.source,
                event.generation
            );
            return None;
        }
        tracked.shown = Some(event.entries);
        tracked.state = SourceState::SlowLoaded;
        Some(event.source)
    }
}

/// Collect a source through the cache, containing any failure.
///
/// Each scope is populated under its own key. A failing scope contributes
/// one Error entry; successful scopes still show.
pub(crate) fn collect_entries(
    cache: &CollectionCache<EntrySet>,
    descriptor: &SourceDescriptor,
    timeout: Duration,
) -> EntrySet {
    let id = descriptor.id();
    let scopes = descriptor.source().scopes();

    if scopes.is_empty() {
        let key = CacheKey::source(id.clone());
        return match cache.get_or_populate(&key, || populate(descriptor, None, timeout)) {
            Ok(entries) => entries,
            Err(err) => Arc::from(vec![failure_entry(descriptor, &err)]),
        };
    }

    let mut entries: Vec<Entry> = Vec::new();
    let mut failure = None;
    for scope in scopes {
        let key = CacheKey::scoped(id.clone(), scope.clone());
        match cache.get_or_populate(&key, || populate(descriptor, Some(scope), timeout)) {
            Ok(set) => entries.extend(set.iter().cloned()),
            Err(err) if failure.is_none() => failure = Some(err),
            Err(err) => tracing::debug!("Further failure for '{}': {}", id, err),
        }
    }
    if let Some(err) = failure {
        entries.push(failure_entry(descriptor, &err));
    }
    Arc::from(entries)
}

fn populate(
    descriptor: &SourceDescriptor,
    scope: Option<String>,
    timeout: Duration,
) -> Result<EntrySet> {
    let source = Arc::clone(descriptor.source());
    let id = descriptor.id().clone();
    match scope.as_deref() {
        Some(scope) => tracing::debug!("Collecting '{}' ({})", id, scope),
        None => tracing::debug!("Collecting '{}'", id),
    }

    let key = match &scope {
        Some(scope) => CacheKey::scoped(id.clone(), scope.clone()),
        None => CacheKey::source(id.clone()),
    };
    let result = descriptor.running().run(&key, timeout, move || {
        let entries = match scope.as_deref() {
            Some(scope) => source.collect_scope(scope)?,
            None => source.collect()?,
        };
        Ok(EntrySet::from(entries))
    });

    result.map_err(|err| match err {
        DevtopoError::InvalidEntry(inner) => DevtopoError::MalformedEntry {
            source_id: id.to_string(),
            message: inner.to_string(),
        },
        other => other,
    })
}

fn failure_entry(descriptor: &SourceDescriptor, err: &DevtopoError) -> Entry {
    let title = match err {
        DevtopoError::CollectionTimedOut { .. } => "Collection timed out",
        DevtopoError::MalformedEntry { .. } => "Malformed entry",
        _ => "Collection failed",
    };
    tracing::warn!("{} for '{}': {}", title, descriptor.id(), err);
    Entry::failure(descriptor.id().as_str(), title, err.to_string())
}
