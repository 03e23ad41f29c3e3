//! Source identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a registered source (e.g. `brew`, `path`).
///
/// Identifiers are trimmed and lowercased on construction so lookups from
/// the command line are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl AsRef<str> for SourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(SourceId::new(" Brew "), SourceId::new("brew"));
        assert_eq!(SourceId::new("NPM").as_str(), "npm");
    }

    #[test]
    fn displays_raw_id() {
        assert_eq!(SourceId::from("rustup").to_string(), "rustup");
    }
}
