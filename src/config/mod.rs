//! Settings loading and validation.
//!
//! - Schema definitions in [`schema`]
//! - File discovery and loading in [`loader`]
//! - Validation in [`validator`]
//!
//! # Example
//!
//! ```
//! use devtopo::config::load_settings_file;
//! use tempfile::TempDir;
//! use std::fs;
//!
//! let temp = TempDir::new().unwrap();
//! let path = temp.path().join("config.yml");
//! fs::write(&path, "max_workers: 2").unwrap();
//!
//! let settings = load_settings_file(&path).unwrap();
//! assert_eq!(settings.max_workers, 2);
//! assert_eq!(settings.collection_timeout_secs, 30);
//! ```

pub mod loader;
pub mod schema;
pub mod validator;

pub use loader::{default_config_path, load_settings, load_settings_file, parse_settings};
pub use schema::Settings;
pub use validator::{validate_settings, ValidationError};
