//! Cache keys.

use std::fmt;
use std::str::FromStr;

use crate::sources::SourceId;

/// Key of one cache slot: a source, optionally narrowed to a sub-scope
/// such as `local` or `global` package listings.
///
/// Written as `source` or `source:scope`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    source: SourceId,
    scope: Option<String>,
}

impl CacheKey {
    /// Key covering a whole source.
    pub fn source(source: impl Into<SourceId>) -> Self {
        Self {
            source: source.into(),
            scope: None,
        }
    }

    /// Key for one scope of a source.
    pub fn scoped(source: impl Into<SourceId>, scope: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            scope: Some(scope.into()),
        }
    }

    pub fn source_id(&self) -> &SourceId {
        &self.source
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Whether this key belongs to `source`, whatever its scope.
    pub fn belongs_to(&self, source: &SourceId) -> bool {
        &self.source == source
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            Some(scope) => write!(f, "{}:{}", self.source, scope),
            None => write!(f, "{}", self.source),
        }
    }
}

impl FromStr for CacheKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (source, scope) = match s.split_once(':') {
            Some((source, scope)) => (source.trim(), Some(scope.trim())),
            None => (s.trim(), None),
        };
        if source.is_empty() {
            return Err(format!("missing source in cache key '{}'", s));
        }
        Ok(match scope {
            Some(scope) if !scope.is_empty() => Self::scoped(source, scope),
            _ => Self::source(source),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_source() {
        let key: CacheKey = "brew".parse().unwrap();
        assert_eq!(key, CacheKey::source("brew"));
        assert_eq!(key.scope(), None);
    }

    #[test]
    fn parses_scoped_key() {
        let key: CacheKey = "npm:global".parse().unwrap();
        assert_eq!(key.source_id().as_str(), "npm");
        assert_eq!(key.scope(), Some("global"));
        assert_eq!(key.to_string(), "npm:global");
    }

    #[test]
    fn trailing_colon_is_unscoped() {
        let key: CacheKey = "npm:".parse().unwrap();
        assert_eq!(key, CacheKey::source("npm"));
    }

    #[test]
    fn rejects_missing_source() {
        assert!(":global".parse::<CacheKey>().is_err());
        assert!("".parse::<CacheKey>().is_err());
    }

    #[test]
    fn belongs_to_ignores_scope() {
        let npm = SourceId::new("npm");
        assert!(CacheKey::scoped("npm", "local").belongs_to(&npm));
        assert!(CacheKey::source("npm").belongs_to(&npm));
        assert!(!CacheKey::source("brew").belongs_to(&npm));
    }
}
