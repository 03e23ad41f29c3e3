//! External command execution and shell environment helpers.

pub mod command;
pub mod mock;
pub mod platform;

pub use command::{display_command, CommandResult, ProcessRunner, SystemRunner};
pub use mock::ScriptedRunner;
pub use platform::{default_shell_configs, expand_home, is_ci};
