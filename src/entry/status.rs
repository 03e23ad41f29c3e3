//! Entry health status.
//!
//! The set is closed: adapters map their own failure and ambiguity states
//! onto these three values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Health of a single entry.
///
/// Variants are ordered by severity so the worst status of a group is its
/// maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Present and working.
    Healthy,
    /// Usable, but something deserves attention (duplicate, outdated, broken link).
    Warning,
    /// Missing or failed.
    Error,
}

impl Status {
    /// Single-character icon used by the tree renderer.
    pub fn icon(&self) -> &'static str {
        match self {
            Status::Healthy => "✓",
            Status::Warning => "⚠",
            Status::Error => "✗",
        }
    }

    /// Most severe status in the iterator, `Healthy` when empty.
    pub fn worst<I>(statuses: I) -> Status
    where
        I: IntoIterator<Item = Status>,
    {
        statuses.into_iter().max().unwrap_or(Status::Healthy)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Status::Healthy => "healthy",
            Status::Warning => "warning",
            Status::Error => "error",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(Status::Healthy < Status::Warning);
        assert!(Status::Warning < Status::Error);
    }

    #[test]
    fn worst_picks_most_severe() {
        let statuses = [Status::Healthy, Status::Error, Status::Warning];
        assert_eq!(Status::worst(statuses), Status::Error);
    }

    #[test]
    fn worst_of_nothing_is_healthy() {
        assert_eq!(Status::worst(Vec::new()), Status::Healthy);
    }

    #[test]
    fn icons_are_distinct() {
        assert_ne!(Status::Healthy.icon(), Status::Warning.icon());
        assert_ne!(Status::Warning.icon(), Status::Error.icon());
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Status::Warning).unwrap(), "\"warning\"");
    }
}
