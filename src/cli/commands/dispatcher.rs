//! Command dispatching.
//!
//! This module provides the core command infrastructure:
//! - [`Command`] trait for implementing commands
//! - [`CommandResult`] for uniform result reporting
//! - [`CommandDispatcher`] for routing CLI subcommands

use std::path::Path;
use std::sync::Arc;

use crate::cli::args::{Cli, Commands, ShowArgs};
use crate::config::{load_settings, Settings};
use crate::error::Result;
use crate::scheduler::{SchedulerOptions, SourceRegistry};
use crate::shell::SystemRunner;
use crate::sources::HostEnv;
use crate::ui::UserInterface;

/// Exit code for a remediation, config, or other runtime failure.
pub const EXIT_FAILURE: i32 = 1;

/// Exit code when a named source is not registered.
pub const EXIT_UNKNOWN_SOURCE: i32 = 2;

/// Trait for command implementations.
pub trait Command {
    /// Execute the command, reporting through `ui`.
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    pub success: bool,

    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }
}

/// What every command needs: the source table and scheduling settings.
#[derive(Clone)]
pub struct CommandContext {
    pub registry: Arc<SourceRegistry>,
    pub options: SchedulerOptions,
}

/// Dispatches CLI commands to their implementations.
pub struct CommandDispatcher {
    context: CommandContext,
}

impl CommandDispatcher {
    pub fn new(registry: Arc<SourceRegistry>, options: SchedulerOptions) -> Self {
        Self {
            context: CommandContext { registry, options },
        }
    }

    /// Load settings and register the built-in sources against the real
    /// host environment.
    pub fn from_environment(config: Option<&Path>) -> Result<Self> {
        let settings = load_settings(config)?;
        Ok(Self::with_settings(&settings, HostEnv::capture()?))
    }

    pub fn with_settings(settings: &Settings, env: HostEnv) -> Self {
        let registry = SourceRegistry::builtin(settings, Arc::new(env), Arc::new(SystemRunner::new()));
        Self::new(Arc::new(registry), SchedulerOptions::from(settings))
    }

    pub fn context(&self) -> &CommandContext {
        &self.context
    }

    /// Route the CLI subcommand to its implementation and execute it.
    pub fn dispatch(&self, cli: &Cli, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let context = self.context.clone();
        match &cli.command {
            Some(Commands::Show(args)) => {
                super::show::ShowCommand::new(context, args.clone()).execute(ui)
            }
            Some(Commands::Sources(args)) => {
                super::sources::SourcesCommand::new(context, args.clone()).execute(ui)
            }
            Some(Commands::Fix(args)) => super::fix::FixCommand::new(context, args.clone()).execute(ui),
            Some(Commands::Completions(args)) => {
                super::completions::CompletionsCommand::new(args.clone()).execute(ui)
            }
            None => super::show::ShowCommand::new(context, ShowArgs::default()).execute(ui),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::MockUI;
    use clap::Parser;

    #[test]
    fn command_result_success() {
        let result = CommandResult::success();
        assert!(result.success);
        assert_eq!(result.exit_code, 0);
    }

    #[test]
    fn command_result_failure() {
        let result = CommandResult::failure(EXIT_UNKNOWN_SOURCE);
        assert!(!result.success);
        assert_eq!(result.exit_code, 2);
    }

    #[test]
    fn defaults_to_show() {
        let dispatcher =
            CommandDispatcher::new(Arc::new(SourceRegistry::new()), SchedulerOptions::default());
        let cli = Cli::parse_from(["devtopo"]);
        let mut ui = MockUI::new();

        let result = dispatcher.dispatch(&cli, &mut ui).unwrap();
        assert!(result.success);
        assert!(ui.has_message("No sources"));
    }

    #[test]
    fn builtin_registry_uses_settings() {
        let settings = Settings {
            disabled_sources: vec!["npm".to_string()],
            ..Default::default()
        };
        let dispatcher =
            CommandDispatcher::with_settings(&settings, HostEnv::new("/nonexistent", "/nonexistent"));
        let ids: Vec<String> = dispatcher
            .context()
            .registry
            .ids()
            .iter()
            .map(|id| id.to_string())
            .collect();
        assert!(!ids.contains(&"npm".to_string()));
        assert!(ids.contains(&"brew".to_string()));
    }
}
