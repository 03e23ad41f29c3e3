//! Time ceiling for collections.
//!
//! The collection runs on its own thread. If it overruns, the caller gets
//! [`DevtopoError::CollectionTimedOut`] and the thread is left to finish
//! on its own; whatever it eventually returns is dropped.
//!
//! [`RunningCollections`] keeps at most one such thread per cache key: while
//! an abandoned collection is still running, a new one for the same key
//! fails at once instead of starting another thread.

use std::collections::HashSet;
use std::sync::{mpsc, Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use crate::cache::CacheKey;
use crate::error::{DevtopoError, Result};
use crate::sources::SourceId;

/// Keys whose collection thread has not finished yet.
#[derive(Debug, Default)]
pub struct RunningCollections {
    keys: Mutex<HashSet<CacheKey>>,
}

impl RunningCollections {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Run `work` for `key` under [`run_with_timeout`], unless an earlier
    /// collection for the same key is still on its thread.
    pub fn run<T, F>(self: &Arc<Self>, key: &CacheKey, timeout: Duration, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        if !self.lock().insert(key.clone()) {
            tracing::warn!("Earlier collection for '{}' is still running; skipping", key);
            return Err(DevtopoError::CollectionFailed {
                source_id: key.source_id().to_string(),
                message: "an earlier collection is still running".to_string(),
            });
        }

        // Dropped when the thread finishes, panics, or never starts.
        let release = Release {
            running: Arc::clone(self),
            key: key.clone(),
        };
        run_with_timeout(key.source_id(), timeout, move || {
            let _release = release;
            work()
        })
    }

    pub fn is_running(&self, key: &CacheKey) -> bool {
        self.lock().contains(key)
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<CacheKey>> {
        self.keys.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

struct Release {
    running: Arc<RunningCollections>,
    key: CacheKey,
}

impl Drop for Release {
    fn drop(&mut self) {
        self.running.lock().remove(&self.key);
    }
}

/// Run `work` with a ceiling of `timeout`.
pub fn run_with_timeout<T, F>(source: &SourceId, timeout: Duration, work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name(format!("collect-{}", source))
        .spawn(move || {
            // The receiver is gone once the caller timed out.
            let _ = tx.send(work());
        });
    if let Err(e) = spawned {
        return Err(DevtopoError::CollectionFailed {
            source_id: source.to_string(),
            message: format!("could not start collection thread: {}", e),
        });
    }

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            tracing::warn!(
                "Collection for '{}' exceeded {}s; abandoning it",
                source,
                timeout.as_secs()
            );
            Err(DevtopoError::CollectionTimedOut {
                source_id: source.to_string(),
                timeout,
            })
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(DevtopoError::CollectionFailed {
            source_id: source.to_string(),
            message: "collector panicked".to_string(),
        }),
    }
}
