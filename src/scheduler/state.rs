//! Per-source lifecycle within one session.
//!
//! ```text
//! Unchecked ─┬─> Unavailable
//!            ├─> FastPending ─> FastLoaded
//!            └─> SlowPending ─> SlowLoading ─> SlowLoaded
//! loaded ──invalidate──> its pending state
//! ```

use serde::Serialize;

use crate::sources::SourceSpeed;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceState {
    Unchecked,
    Unavailable,
    FastPending,
    FastLoaded,
    SlowPending,
    SlowLoading,
    SlowLoaded,
}

impl SourceState {
    /// Outcome of the availability check.
    pub fn checked(available: bool, speed: SourceSpeed) -> Self {
        match (available, speed) {
            (false, _) => SourceState::Unavailable,
            (true, SourceSpeed::Fast) => SourceState::FastPending,
            (true, SourceSpeed::Slow) => SourceState::SlowPending,
        }
    }

    /// The pending state for a source of this speed.
    pub fn pending(speed: SourceSpeed) -> Self {
        Self::checked(true, speed)
    }

    /// State after an invalidation. Sources not yet loaded keep their state
    /// except an in-flight load, which falls back to pending so its result
    /// is ignored.
    pub fn invalidated(self) -> Self {
        match self {
            SourceState::FastLoaded => SourceState::FastPending,
            SourceState::SlowLoaded | SourceState::SlowLoading => SourceState::SlowPending,
            other => other,
        }
    }

    pub fn is_pending(self) -> bool {
        matches!(self, SourceState::FastPending | SourceState::SlowPending)
    }

    pub fn is_loaded(self) -> bool {
        matches!(self, SourceState::FastLoaded | SourceState::SlowLoaded)
    }

    pub fn label(self) -> &'static str {
        match self {
            SourceState::Unchecked => "unchecked",
            SourceState::Unavailable => "unavailable",
            SourceState::FastPending | SourceState::SlowPending => "pending",
            SourceState::SlowLoading => "loading",
            SourceState::FastLoaded | SourceState::SlowLoaded => "loaded",
        }
    }
}
