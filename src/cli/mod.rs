//! Command-line interface for devtopo.
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`commands`] - Command implementations

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, CompletionsArgs, FixArgs, ShowArgs, SourcesArgs};
pub use commands::{Command, CommandDispatcher, CommandResult};
