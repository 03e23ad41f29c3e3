//! The uniform record every source produces.
//!
//! An [`Entry`] is immutable once built: fields are private and only
//! readable through accessors. A fresh collection produces a fresh
//! [`EntrySet`] rather than mutating a prior one.
//!
//! # Example
//!
//! ```
//! use devtopo::entry::{Entry, Status};
//!
//! let entry = Entry::builder("wget", "/opt/homebrew/Cellar/wget")
//!     .status(Status::Warning)
//!     .detail("version", "1.21.4")
//!     .build()
//!     .unwrap();
//! assert_eq!(entry.name(), "wget");
//! assert_eq!(entry.detail("version").and_then(|v| v.as_str()), Some("1.21.4"));
//!
//! assert!(Entry::new("x", "", Status::Healthy).is_err());
//! ```

pub mod status;

pub use status::Status;

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Opaque display payload attached to an entry.
///
/// Nothing in the core branches on these values.
pub type Details = BTreeMap<String, serde_json::Value>;

/// An immutable, shareable sequence of entries from one collection.
///
/// Order is adapter-defined and preserved for display grouping.
pub type EntrySet = Arc<[Entry]>;

/// Reasons an entry is rejected at construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryError {
    #[error("entry name must not be empty")]
    EmptyName,

    #[error("entry '{name}' has an empty path")]
    EmptyPath { name: String },
}

/// One displayable item produced by a source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    name: String,
    path: String,
    status: Status,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    details: Details,
}

impl Entry {
    /// Create an entry without details.
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        status: Status,
    ) -> Result<Self, EntryError> {
        Self::builder(name, path).status(status).build()
    }

    /// Start building an entry. Validation happens in [`EntryBuilder::build`].
    pub fn builder(name: impl Into<String>, path: impl Into<String>) -> EntryBuilder {
        EntryBuilder {
            name: name.into(),
            path: path.into(),
            status: Status::Healthy,
            details: Details::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn details(&self) -> &Details {
        &self.details
    }

    /// Look up a single detail value.
    pub fn detail(&self, key: &str) -> Option<&serde_json::Value> {
        self.details.get(key)
    }

    /// The single Error entry standing in for a source whose collection
    /// failed. `source` becomes the path; a blank id falls back to
    /// `unknown` so the entry is always valid.
    pub fn failure(source: &str, title: &str, message: impl Into<String>) -> Self {
        let path = if source.trim().is_empty() {
            "unknown".to_string()
        } else {
            source.to_string()
        };
        let name = if title.trim().is_empty() {
            "Collection failed".to_string()
        } else {
            title.to_string()
        };
        let mut details = Details::new();
        details.insert("error".to_string(), serde_json::Value::String(message.into()));
        Entry {
            name,
            path,
            status: Status::Error,
            details,
        }
    }

    /// Comparator giving a stable order by name, then path.
    ///
    /// Display keeps adapter order; this is for deterministic comparison.
    pub fn by_name(a: &Entry, b: &Entry) -> Ordering {
        a.name.cmp(&b.name).then_with(|| a.path.cmp(&b.path))
    }
}

/// Builder for [`Entry`].
#[derive(Debug, Clone)]
pub struct EntryBuilder {
    name: String,
    path: String,
    status: Status,
    details: Details,
}

impl EntryBuilder {
    pub fn status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    /// Attach a display detail. Later values for the same key win.
    pub fn detail(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Attach a detail only when a value is present.
    pub fn detail_opt<V>(self, key: impl Into<String>, value: Option<V>) -> Self
    where
        V: Into<serde_json::Value>,
    {
        match value {
            Some(v) => self.detail(key, v),
            None => self,
        }
    }

    /// Validate and produce the entry.
    pub fn build(self) -> Result<Entry, EntryError> {
        if self.name.trim().is_empty() {
            return Err(EntryError::EmptyName);
        }
        if self.path.trim().is_empty() {
            return Err(EntryError::EmptyPath { name: self.name });
        }
        Ok(Entry {
            name: self.name,
            path: self.path,
            status: self.status,
            details: self.details,
        })
    }
}

/// Sorted copy of a sequence, for order-insensitive comparisons.
pub fn sorted_by_name(entries: &[Entry]) -> Vec<Entry> {
    let mut sorted = entries.to_vec();
    sorted.sort_by(Entry::by_name);
    sorted
}
