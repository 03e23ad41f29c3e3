//! Show command implementation.
//!
//! The `devtopo show` command runs one presentation session: fast sources
//! render immediately, slow sources render as their background collections
//! land.

use std::sync::Arc;
use std::time::Duration;

use crate::cli::args::ShowArgs;
use crate::entry::Status;
use crate::error::Result;
use crate::scheduler::{Orchestrator, Snapshot, SourceState};
use crate::sources::SourceId;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandContext, CommandResult, EXIT_UNKNOWN_SOURCE};

/// The show command implementation.
pub struct ShowCommand {
    context: CommandContext,
    args: ShowArgs,
}

impl ShowCommand {
    pub fn new(context: CommandContext, args: ShowArgs) -> Self {
        Self { context, args }
    }

    pub fn args(&self) -> &ShowArgs {
        &self.args
    }

    /// Longest wait for the next background result. One source may run
    /// several scoped collections back to back.
    fn wait_ceiling(&self) -> Duration {
        self.context.options.startup_delay + self.context.options.collection_timeout * 2
    }

    fn start(&self, session: &mut Orchestrator, selected: &[SourceId]) -> Result<()> {
        if self.args.sources.is_empty() {
            session.start_session();
            if !self.args.no_wait {
                session.schedule_background();
            }
        } else {
            for id in selected {
                session.current_entries(id)?;
            }
        }
        Ok(())
    }

    fn wait_and_render(&self, session: &mut Orchestrator, ui: &mut dyn UserInterface, selected: &[SourceId]) {
        while session.is_loading() {
            let loading = loading_names(&session.snapshot(), selected);
            let mut spinner = ui.start_spinner(&format!("Loading {}", loading.join(", ")));
            let landed = session.wait_next(self.wait_ceiling());
            spinner.finish_clear();

            match landed {
                Some(id) => {
                    if selected.contains(&id) {
                        if let Some(source) = session.snapshot().get(&id) {
                            ui.show_source(source);
                        }
                    }
                }
                None => {
                    ui.warning(&format!("Gave up waiting for {}", loading.join(", ")));
                    break;
                }
            }
        }
    }
}

impl Command for ShowCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let registry = Arc::clone(&self.context.registry);
        if registry.is_empty() {
            ui.message("No sources are registered.");
            return Ok(CommandResult::success());
        }

        let selected: Vec<SourceId> = if self.args.sources.is_empty() {
            registry.ids()
        } else {
            self.args.sources.iter().map(SourceId::new).collect()
        };
        let unknown: Vec<&SourceId> = selected.iter().filter(|id| registry.get(id).is_none()).collect();
        if let Some(id) = unknown.first() {
            ui.error(&format!("Unknown source: {}", id));
            ui.show_hint("Run `devtopo sources` to list available sources.");
            return Ok(CommandResult::failure(EXIT_UNKNOWN_SOURCE));
        }

        let mut session = Orchestrator::new(Arc::clone(&registry), self.context.options);
        self.start(&mut session, &selected)?;

        if self.args.json {
            if !self.args.no_wait {
                let ceiling = self.wait_ceiling() * registry.slow_count().max(1) as u32;
                if !session.wait_for_idle(ceiling) {
                    tracing::warn!("Some sources were still loading after {}s", ceiling.as_secs());
                }
            }
            let mut snapshot = session.snapshot();
            snapshot.retain(&selected);
            let json = serde_json::to_string_pretty(&snapshot).map_err(anyhow::Error::from)?;
            ui.raw(&json);
            return Ok(CommandResult::success());
        }

        // Everything not loading in the background renders now, in order.
        let initial = session.snapshot();
        for source in &initial.sources {
            if !selected.contains(&source.id) {
                continue;
            }
            if source.state != SourceState::SlowLoading {
                ui.show_source(source);
            }
        }

        if !self.args.no_wait {
            self.wait_and_render(&mut session, ui, &selected);
        }

        let mut snapshot = session.snapshot();
        snapshot.retain(&selected);
        summarize(&snapshot, ui);
        Ok(CommandResult::success())
    }
}

fn loading_names(snapshot: &Snapshot, selected: &[SourceId]) -> Vec<String> {
    snapshot
        .sources
        .iter()
        .filter(|s| s.state == SourceState::SlowLoading && selected.contains(&s.id))
        .map(|s| s.id.to_string())
        .collect()
}

fn summarize(snapshot: &Snapshot, ui: &mut dyn UserInterface) {
    let entries = snapshot
        .sources
        .iter()
        .filter_map(|s| s.entries.as_ref())
        .flatten();
    let (mut warnings, mut errors) = (0, 0);
    for entry in entries {
        match entry.status() {
            Status::Warning => warnings += 1,
            Status::Error => errors += 1,
            Status::Healthy => {}
        }
    }

    match snapshot.worst_status() {
        Status::Healthy => ui.success("Everything looks healthy"),
        Status::Warning => ui.warning(&format!("{} warning(s)", warnings)),
        Status::Error => ui.warning(&format!("{} error(s), {} warning(s)", errors, warnings)),
    }
    if errors + warnings > 0 {
        ui.show_hint("Run `devtopo show -v` for details, `devtopo fix` to act on an entry.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Entry;
    use crate::scheduler::{SchedulerOptions, SourceRegistry};
    use crate::sources::{Source, SourceSpeed};
    use crate::ui::MockUI;

    struct Fixed {
        id: &'static str,
        speed: SourceSpeed,
        status: Status,
    }

    impl Source for Fixed {
        fn id(&self) -> SourceId {
            SourceId::new(self.id)
        }

        fn category(&self) -> &str {
            self.id
        }

        fn speed(&self) -> SourceSpeed {
            self.speed
        }

        fn is_available(&self) -> bool {
            true
        }

        fn collect(&self) -> Result<Vec<Entry>> {
            Ok(vec![Entry::new(format!("{}-item", self.id), "/x", self.status)?])
        }
    }

    fn context() -> CommandContext {
        let registry = SourceRegistry::new()
            .with(Arc::new(Fixed {
                id: "path",
                speed: SourceSpeed::Fast,
                status: Status::Healthy,
            }))
            .with(Arc::new(Fixed {
                id: "brew",
                speed: SourceSpeed::Slow,
                status: Status::Warning,
            }));
        CommandContext {
            registry: Arc::new(registry),
            options: SchedulerOptions {
                collection_timeout: Duration::from_secs(5),
                startup_delay: Duration::ZERO,
                max_workers: 2,
            },
        }
    }

    #[test]
    fn renders_fast_then_slow() {
        let mut ui = MockUI::new();
        let result = ShowCommand::new(context(), ShowArgs::default())
            .execute(&mut ui)
            .unwrap();

        assert!(result.success);
        let path_at = ui.tree().iter().position(|l| l.contains("path-item")).unwrap();
        let brew_at = ui.tree().iter().position(|l| l.contains("brew-item")).unwrap();
        assert!(path_at < brew_at);
        assert!(ui.has_warning("1 warning"));
    }

    #[test]
    fn no_wait_shows_slow_sources_loading() {
        let mut ui = MockUI::new();
        let args = ShowArgs {
            no_wait: true,
            ..Default::default()
        };
        ShowCommand::new(context(), args).execute(&mut ui).unwrap();

        assert!(ui.has_tree_line("brew (brew) loading…"));
        assert!(!ui.has_tree_line("brew-item"));
    }

    #[test]
    fn filters_sources() {
        let mut ui = MockUI::new();
        let args = ShowArgs {
            sources: vec!["BREW".to_string()],
            ..Default::default()
        };
        ShowCommand::new(context(), args).execute(&mut ui).unwrap();

        assert!(ui.has_tree_line("brew-item"));
        assert!(!ui.has_tree_line("path"));
    }

    #[test]
    fn unknown_source_exits_2() {
        let mut ui = MockUI::new();
        let args = ShowArgs {
            sources: vec!["pip".to_string()],
            ..Default::default()
        };
        let result = ShowCommand::new(context(), args).execute(&mut ui).unwrap();

        assert_eq!(result.exit_code, EXIT_UNKNOWN_SOURCE);
        assert!(ui.has_error("Unknown source: pip"));
    }

    #[test]
    fn json_waits_for_slow_sources() {
        let mut ui = MockUI::new();
        let args = ShowArgs {
            json: true,
            ..Default::default()
        };
        ShowCommand::new(context(), args).execute(&mut ui).unwrap();

        let json: serde_json::Value = serde_json::from_str(&ui.raw_output()[0]).unwrap();
        assert_eq!(json["sources"][1]["id"], "brew");
        assert_eq!(json["sources"][1]["state"], "slow_loaded");
        assert_eq!(json["sources"][1]["entries"][0]["status"], "warning");
    }
}
