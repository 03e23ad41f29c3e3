//! Coalescing in-memory cache.
//!
//! Values stay valid until explicitly invalidated; there is no time-based
//! expiry. At most one population per key is in flight at a time: callers
//! that arrive while a population runs block on it and receive its result.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use crate::error::{DevtopoError, Result};
use crate::sources::SourceId;

use super::key::CacheKey;

/// Counters describing cache behaviour since creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from a valid slot.
    pub hits: u64,
    /// Lookups that started a population.
    pub misses: u64,
    /// Lookups that joined a population already in flight.
    pub coalesced: u64,
    /// Populations that failed (slot left invalid).
    pub failures: u64,
    /// Slots invalidated (including in-flight populations marked stale).
    pub invalidations: u64,
}

/// Outcome shared with every caller waiting on a population.
#[derive(Clone)]
enum Outcome<V> {
    Value(V),
    Failed(String),
}

/// A population in progress.
struct Flight<V> {
    outcome: Mutex<Option<Outcome<V>>>,
    done: Condvar,
    stale: AtomicBool,
}

impl<V: Clone> Flight<V> {
    fn new() -> Self {
        Self {
            outcome: Mutex::new(None),
            done: Condvar::new(),
            stale: AtomicBool::new(false),
        }
    }

    fn publish(&self, outcome: Outcome<V>) {
        *lock(&self.outcome) = Some(outcome);
        self.done.notify_all();
    }

    fn wait(&self) -> Outcome<V> {
        let mut guard = lock(&self.outcome);
        loop {
            if let Some(outcome) = guard.as_ref() {
                return outcome.clone();
            }
            guard = self
                .done
                .wait(guard)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    fn mark_stale(&self) {
        self.stale.store(true, Ordering::SeqCst);
    }

    fn is_stale(&self) -> bool {
        self.stale.load(Ordering::SeqCst)
    }
}

enum Slot<V> {
    Valid(V),
    Loading(Arc<Flight<V>>),
}

enum Lookup<V> {
    Hit(V),
    Join(Arc<Flight<V>>),
    Lead(Arc<Flight<V>>),
}

/// Key-scoped memoization with explicit invalidation.
///
/// Absent keys are invalid. Different keys never contend beyond the short
/// critical section that reads or swaps a slot; populations run outside the
/// lock.
pub struct CollectionCache<V> {
    slots: Mutex<HashMap<CacheKey, Slot<V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    failures: AtomicU64,
    invalidations: AtomicU64,
}

impl<V: Clone> Default for CollectionCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> CollectionCache<V> {
    /// Create an empty (cold) cache.
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            coalesced: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    /// Return the cached value for `key`, populating it if invalid.
    ///
    /// Concurrent callers for the same key share one population. If the
    /// population fails, the caller that ran it receives the original error,
    /// joined callers receive [`DevtopoError::CollectionFailed`] with its
    /// message, and the slot stays invalid so the next call retries.
    ///
    /// A caller that finds a population already invalidated mid-flight waits
    /// for it to settle and then populates afresh.
    pub fn get_or_populate<F>(&self, key: &CacheKey, populate: F) -> Result<V>
    where
        F: FnOnce() -> Result<V>,
    {
        loop {
            match self.lookup(key) {
                Lookup::Hit(value) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(value);
                }
                Lookup::Join(flight) if flight.is_stale() => {
                    let _ = flight.wait();
                    continue;
                }
                Lookup::Join(flight) => {
                    self.coalesced.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!("Joining in-flight population of '{}'", key);
                    return match flight.wait() {
                        Outcome::Value(value) => Ok(value),
                        Outcome::Failed(message) => Err(DevtopoError::CollectionFailed {
                            source_id: key.source_id().to_string(),
                            message,
                        }),
                    };
                }
                Lookup::Lead(flight) => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    return self.lead(key, flight, populate);
                }
            }
        }
    }

    fn lookup(&self, key: &CacheKey) -> Lookup<V> {
        let mut slots = lock(&self.slots);
        match slots.get(key) {
            Some(Slot::Valid(value)) => Lookup::Hit(value.clone()),
            Some(Slot::Loading(flight)) => Lookup::Join(Arc::clone(flight)),
            None => {
                let flight = Arc::new(Flight::new());
                slots.insert(key.clone(), Slot::Loading(Arc::clone(&flight)));
                Lookup::Lead(flight)
            }
        }
    }

    fn lead<F>(&self, key: &CacheKey, flight: Arc<Flight<V>>, populate: F) -> Result<V>
    where
        F: FnOnce() -> Result<V>,
    {
        tracing::debug!("Populating '{}'", key);
        let mut guard = FlightGuard {
            cache: self,
            key,
            flight,
            settled: false,
        };

        let result = populate();
        match &result {
            Ok(value) => guard.settle(Outcome::Value(value.clone())),
            Err(err) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                guard.settle(Outcome::Failed(err.to_string()));
            }
        }
        result
    }

    /// Store or discard a finished population, then wake its waiters.
    fn settle(&self, key: &CacheKey, flight: &Arc<Flight<V>>, outcome: Outcome<V>) {
        {
            let mut slots = lock(&self.slots);
            let ours = matches!(
                slots.get(key),
                Some(Slot::Loading(current)) if Arc::ptr_eq(current, flight)
            );
            if ours {
                match &outcome {
                    Outcome::Value(value) if !flight.is_stale() => {
                        slots.insert(key.clone(), Slot::Valid(value.clone()));
                    }
                    _ => {
                        slots.remove(key);
                    }
                }
            }
        }
        flight.publish(outcome);
    }

    /// Mark `key` invalid; the next lookup repopulates.
    ///
    /// A population in flight for `key` is marked stale: its callers still
    /// receive the result, but it is not stored.
    pub fn invalidate(&self, key: &CacheKey) {
        let mut slots = lock(&self.slots);
        if Self::invalidate_slot(&mut slots, key) {
            self.invalidations.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Invalidated '{}'", key);
        }
    }

    /// Invalidate every scope of `source`.
    pub fn invalidate_source(&self, source: &SourceId) {
        let mut slots = lock(&self.slots);
        let keys: Vec<CacheKey> = slots
            .keys()
            .filter(|k| k.belongs_to(source))
            .cloned()
            .collect();
        for key in &keys {
            if Self::invalidate_slot(&mut slots, key) {
                self.invalidations.fetch_add(1, Ordering::Relaxed);
            }
        }
        tracing::debug!("Invalidated {} slot(s) for '{}'", keys.len(), source);
    }

    /// Invalidate everything (manual "refresh all").
    pub fn invalidate_all(&self) {
        let mut slots = lock(&self.slots);
        let keys: Vec<CacheKey> = slots.keys().cloned().collect();
        for key in &keys {
            if Self::invalidate_slot(&mut slots, key) {
                self.invalidations.fetch_add(1, Ordering::Relaxed);
            }
        }
        tracing::debug!("Invalidated all {} slot(s)", keys.len());
    }

    fn invalidate_slot(slots: &mut HashMap<CacheKey, Slot<V>>, key: &CacheKey) -> bool {
        match slots.get(key) {
            Some(Slot::Valid(_)) => {
                slots.remove(key);
                true
            }
            Some(Slot::Loading(flight)) => {
                flight.mark_stale();
                true
            }
            None => false,
        }
    }

    /// Whether `key` currently holds a valid value.
    pub fn is_valid(&self, key: &CacheKey) -> bool {
        matches!(lock(&self.slots).get(key), Some(Slot::Valid(_)))
    }

    /// The valid value for `key`, without populating.
    pub fn peek(&self, key: &CacheKey) -> Option<V> {
        match lock(&self.slots).get(key) {
            Some(Slot::Valid(value)) => Some(value.clone()),
            _ => None,
        }
    }

    /// Number of valid slots.
    pub fn len(&self) -> usize {
        lock(&self.slots)
            .values()
            .filter(|slot| matches!(slot, Slot::Valid(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }
}

/// Settles a flight even if the population panics, so waiters never hang
/// and the slot is left invalid.
struct FlightGuard<'a, V: Clone> {
    cache: &'a CollectionCache<V>,
    key: &'a CacheKey,
    flight: Arc<Flight<V>>,
    settled: bool,
}

impl<V: Clone> FlightGuard<'_, V> {
    fn settle(&mut self, outcome: Outcome<V>) {
        self.settled = true;
        self.cache.settle(self.key, &self.flight, outcome);
    }
}

impl<V: Clone> Drop for FlightGuard<'_, V> {
    fn drop(&mut self) {
        if !self.settled {
            self.cache.failures.fetch_add(1, Ordering::Relaxed);
            self.cache.settle(
                self.key,
                &self.flight,
                Outcome::Failed("population panicked".to_string()),
            );
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
