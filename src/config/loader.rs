//! Settings file discovery and loading.

use crate::config::schema::Settings;
use crate::config::validator::validate_settings;
use crate::error::{DevtopoError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Default settings location: `~/.devtopo/config.yml`.
pub fn default_config_path() -> Option<PathBuf> {
    Some(dirs::home_dir()?.join(".devtopo").join("config.yml"))
}

/// Parse YAML content into [`Settings`] and validate it.
///
/// An empty document yields defaults.
pub fn parse_settings(content: &str, source_path: &Path) -> Result<Settings> {
    if content.trim().is_empty() {
        return Ok(Settings::default());
    }
    let settings: Settings =
        serde_yaml::from_str(content).map_err(|e| DevtopoError::ConfigParseError {
            path: source_path.to_path_buf(),
            message: e.to_string(),
        })?;

    let errors = validate_settings(&settings);
    if !errors.is_empty() {
        let message = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(DevtopoError::ConfigParseError {
            path: source_path.to_path_buf(),
            message,
        });
    }

    Ok(settings)
}

/// Load settings from `path`. A missing file yields defaults.
pub fn load_settings_file(path: &Path) -> Result<Settings> {
    match fs::read_to_string(path) {
        Ok(content) => {
            tracing::debug!("Loading settings from {}", path.display());
            parse_settings(&content, path)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No settings at {}, using defaults", path.display());
            Ok(Settings::default())
        }
        Err(e) => Err(DevtopoError::Io(e)),
    }
}

/// Load settings with optional path override.
///
/// An explicit override must exist; the default location may be absent.
pub fn load_settings(config_override: Option<&Path>) -> Result<Settings> {
    if let Some(path) = config_override {
        if !path.exists() {
            return Err(DevtopoError::ConfigParseError {
                path: path.to_path_buf(),
                message: "file not found".to_string(),
            });
        }
        return load_settings_file(path);
    }

    match default_config_path() {
        Some(path) => load_settings_file(&path),
        None => Ok(Settings::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let settings = load_settings_file(&temp.path().join("config.yml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn loads_values_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yml");
        fs::write(
            &path,
            "collection_timeout_secs: 5\ndisabled_sources:\n  - brew\n",
        )
        .unwrap();

        let settings = load_settings_file(&path).unwrap();

        assert_eq!(settings.collection_timeout_secs, 5);
        assert_eq!(settings.disabled_sources, vec!["brew".to_string()]);
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yml");
        fs::write(&path, "max_workers: [not, a, number").unwrap();

        let err = load_settings_file(&path).unwrap_err();
        assert!(matches!(err, DevtopoError::ConfigParseError { .. }));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = parse_settings("max_workers: 0", Path::new("c.yml")).unwrap_err();
        assert!(err.to_string().contains("max_workers"));
    }

    #[test]
    fn empty_document_gives_defaults() {
        assert_eq!(
            parse_settings("  \n", Path::new("c.yml")).unwrap(),
            Settings::default()
        );
    }

    #[test]
    fn missing_override_is_an_error() {
        let temp = TempDir::new().unwrap();
        let err = load_settings(Some(&temp.path().join("nope.yml"))).unwrap_err();
        assert!(err.to_string().contains("file not found"));
    }
}
