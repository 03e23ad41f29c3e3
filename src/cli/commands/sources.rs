//! Sources command implementation.
//!
//! The `devtopo sources` command lists registered sources with their speed
//! class and whether they have anything to show. Only the cheap
//! availability check runs; nothing is collected.

use serde::Serialize;

use crate::cli::args::SourcesArgs;
use crate::error::Result;
use crate::sources::{SourceId, SourceSpeed};
use crate::ui::theme::DevtopoTheme;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandContext, CommandResult};

/// The sources command implementation.
pub struct SourcesCommand {
    context: CommandContext,
    args: SourcesArgs,
}

#[derive(Debug, Serialize)]
struct SourceRow {
    id: SourceId,
    category: String,
    speed: SourceSpeed,
    available: bool,
}

impl SourcesCommand {
    pub fn new(context: CommandContext, args: SourcesArgs) -> Self {
        Self { context, args }
    }

    fn rows(&self) -> Vec<SourceRow> {
        self.context
            .registry
            .iter()
            .map(|d| SourceRow {
                id: d.id().clone(),
                category: d.category().to_string(),
                speed: d.speed(),
                available: d.source().is_available(),
            })
            .collect()
    }
}

impl Command for SourcesCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let rows = self.rows();

        if self.args.json {
            let json = serde_json::to_string_pretty(&rows).map_err(anyhow::Error::from)?;
            ui.raw(&json);
            return Ok(CommandResult::success());
        }

        if rows.is_empty() {
            ui.message("No sources are registered.");
            return Ok(CommandResult::success());
        }

        let theme = DevtopoTheme::detect();
        for row in &rows {
            let availability = if row.available {
                theme.success.apply_to("available").to_string()
            } else {
                theme.dim.apply_to("not available").to_string()
            };
            ui.raw(&format!(
                "{:<10} {:<18} {:<5} {}",
                theme.highlight.apply_to(row.id.as_str()),
                row.category,
                row.speed,
                availability
            ));
        }
        Ok(CommandResult::success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{SchedulerOptions, SourceRegistry};
    use crate::sources::managers::ManagerSource;
    use crate::sources::HostEnv;
    use crate::ui::MockUI;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn context(home: &std::path::Path) -> CommandContext {
        let env = Arc::new(HostEnv::new(home, home));
        CommandContext {
            registry: Arc::new(SourceRegistry::new().with(Arc::new(ManagerSource::new(env)))),
            options: SchedulerOptions::default(),
        }
    }

    #[test]
    fn lists_availability() {
        let temp = TempDir::new().unwrap();
        let mut ui = MockUI::new();
        SourcesCommand::new(context(temp.path()), SourcesArgs::default())
            .execute(&mut ui)
            .unwrap();
        assert!(ui.raw_output()[0].contains("not available"));

        fs::create_dir_all(temp.path().join(".nvm/versions/node/v20.11.0")).unwrap();
        let mut ui = MockUI::new();
        SourcesCommand::new(context(temp.path()), SourcesArgs::default())
            .execute(&mut ui)
            .unwrap();
        assert!(ui.raw_output()[0].contains("available"));
        assert!(!ui.raw_output()[0].contains("not available"));
    }

    #[test]
    fn json_rows() {
        let temp = TempDir::new().unwrap();
        let mut ui = MockUI::new();
        SourcesCommand::new(context(temp.path()), SourcesArgs { json: true })
            .execute(&mut ui)
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&ui.raw_output()[0]).unwrap();
        assert_eq!(json[0]["id"], "managers");
        assert_eq!(json[0]["speed"], "fast");
        assert_eq!(json[0]["available"], false);
    }
}
