//! Error types for devtopo operations.
//!
//! This module defines [`DevtopoError`], the primary error type used throughout
//! the crate, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Failures are contained at the source boundary: a collection error becomes
//!   a single Error-status entry for that source, never an aborted session
//! - An unavailable source is a gating outcome, not an error, so it has no
//!   variant here
//! - Use `anyhow::Error` (via `DevtopoError::Other`) inside adapters for
//!   unexpected errors

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::entry::EntryError;

/// Core error type for devtopo operations.
#[derive(Debug, Error)]
pub enum DevtopoError {
    /// An adapter produced an entry that violates the entry contract.
    #[error("Malformed entry from '{source_id}': {message}")]
    MalformedEntry { source_id: String, message: String },

    /// An entry failed construction before its source was known.
    ///
    /// The orchestrator rewrites this into [`DevtopoError::MalformedEntry`]
    /// once the owning source is attached.
    #[error("Invalid entry: {0}")]
    InvalidEntry(#[from] EntryError),

    /// A source's collection failed (subprocess or parse error).
    #[error("Collection failed for '{source_id}': {message}")]
    CollectionFailed { source_id: String, message: String },

    /// A source's collection exceeded the configured ceiling.
    #[error("Collection for '{source_id}' timed out after {}s", .timeout.as_secs())]
    CollectionTimedOut { source_id: String, timeout: Duration },

    /// A mutating remediation action failed.
    #[error("{action} failed for '{source_id}': {message}")]
    RemediationFailed {
        source_id: String,
        action: String,
        message: String,
    },

    /// The source does not support the requested remediation.
    #[error("Source '{source_id}' does not support '{action}'")]
    UnsupportedAction { source_id: String, action: String },

    /// No source is registered under this identifier.
    #[error("Unknown source: {source_id}")]
    UnknownSource { source_id: String },

    /// External command failed to run or exited non-zero.
    #[error("Command failed with exit code {code:?}: {command}")]
    CommandFailed { command: String, code: Option<i32> },

    /// External command was killed after exceeding its ceiling.
    #[error("Command timed out after {}s: {command}", .timeout.as_secs())]
    CommandTimedOut { command: String, timeout: Duration },

    /// Failed to parse the settings file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for devtopo operations.
pub type Result<T> = std::result::Result<T, DevtopoError>;
