//! Devtopo - an inventory of your local development toolchain.
//!
//! Devtopo inspects package managers, version managers, Python environments,
//! git repositories, shell configuration, `PATH`, and symlinks, and presents
//! what it finds as a categorized tree with a health status per item.
//! Operators can act on an item (uninstall, upgrade, remove a config line)
//! and see the source re-collected.
//!
//! # Modules
//!
//! - [`entry`] - The uniform record every source produces
//! - [`sources`] - The source contract and the built-in adapters
//! - [`cache`] - Keyed, coalescing collection cache
//! - [`scheduler`] - Session orchestration, background workers, timeouts
//! - [`remediation`] - Mutating actions and their dispatcher
//! - [`config`] - Settings loading and validation
//! - [`shell`] - External command execution
//! - [`cli`] - Command-line interface and argument parsing
//! - [`ui`] - Tree rendering, spinners, and prompts
//! - [`error`] - Error types and result aliases
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use devtopo::scheduler::{EntriesView, Orchestrator, SchedulerOptions, SourceRegistry};
//! use devtopo::sources::{managers::ManagerSource, HostEnv, SourceId};
//!
//! let env = Arc::new(HostEnv::new("/nonexistent/home", "/nonexistent/home"));
//! let registry = SourceRegistry::new().with(Arc::new(ManagerSource::new(env)));
//! let mut session = Orchestrator::new(Arc::new(registry), SchedulerOptions::default());
//! session.start_session();
//!
//! let view = session.current_entries(&SourceId::new("managers")).unwrap();
//! assert_eq!(view, EntriesView::Unavailable);
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod entry;
pub mod error;
pub mod remediation;
pub mod scheduler;
pub mod shell;
pub mod sources;
pub mod ui;

pub use error::{DevtopoError, Result};
