//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait, which provides a uniform
//! interface for executing commands and reporting results. Commands are
//! routed by [`CommandDispatcher`], which builds the source registry once
//! and hands it to every command.

pub mod completions;
pub mod dispatcher;
pub mod fix;
pub mod show;
pub mod sources;

pub use dispatcher::{
    Command, CommandContext, CommandDispatcher, CommandResult, EXIT_FAILURE, EXIT_UNKNOWN_SOURCE,
};
