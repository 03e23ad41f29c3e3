//! Settings validation rules.
//!
//! All problems are collected rather than stopping at the first one.

use crate::config::schema::Settings;

/// Validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Settings field the rule applies to
    pub field: &'static str,
    /// Human-readable error message
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate settings and return all errors.
pub fn validate_settings(settings: &Settings) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if settings.collection_timeout_secs == 0 {
        errors.push(ValidationError {
            field: "collection_timeout_secs",
            message: "must be at least 1 second".to_string(),
        });
    }

    if settings.max_workers == 0 {
        errors.push(ValidationError {
            field: "max_workers",
            message: "must be at least 1".to_string(),
        });
    }

    for id in &settings.disabled_sources {
        if id.trim().is_empty() {
            errors.push(ValidationError {
                field: "disabled_sources",
                message: "entries must not be empty".to_string(),
            });
        }
    }

    errors
}
