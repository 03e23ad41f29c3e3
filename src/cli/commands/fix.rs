//! Fix command implementation.
//!
//! The `devtopo fix` command runs one remediation through the dispatcher,
//! then re-collects and renders the affected source.

use std::sync::Arc;

use crate::cli::args::FixArgs;
use crate::error::{DevtopoError, Result};
use crate::remediation::RemediationDispatcher;
use crate::scheduler::Orchestrator;
use crate::ui::{Prompt, UserInterface};

use super::dispatcher::{Command, CommandContext, CommandResult, EXIT_FAILURE, EXIT_UNKNOWN_SOURCE};

/// The fix command implementation.
pub struct FixCommand {
    context: CommandContext,
    args: FixArgs,
}

impl FixCommand {
    pub fn new(context: CommandContext, args: FixArgs) -> Self {
        Self { context, args }
    }

    fn describe(&self) -> String {
        format!("{} {} via {}", self.args.action, self.args.target, self.args.key)
    }
}

impl Command for FixCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let args = &self.args;
        let dispatcher =
            RemediationDispatcher::new(Arc::clone(&self.context.registry)).dry_run(args.dry_run);

        match dispatcher.check(args.action, &args.key) {
            Ok(_) => {}
            Err(e @ DevtopoError::UnknownSource { .. }) => {
                ui.error(&e.to_string());
                ui.show_hint("Run `devtopo sources` to list available sources.");
                return Ok(CommandResult::failure(EXIT_UNKNOWN_SOURCE));
            }
            Err(e) => {
                ui.error(&e.to_string());
                return Ok(CommandResult::failure(EXIT_FAILURE));
            }
        }

        if !args.yes && !args.dry_run {
            let prompt = Prompt::new("fix", format!("{}?", capitalize(&self.describe())));
            if !ui.confirm(&prompt)? {
                ui.warning("Cancelled; nothing was changed");
                return Ok(CommandResult::failure(EXIT_FAILURE));
            }
        }

        let mut session = Orchestrator::new(Arc::clone(&self.context.registry), self.context.options);
        let mut spinner = ui.start_spinner(&capitalize(&self.describe()));
        let outcome = match dispatcher.perform(&mut session, args.action, &args.key, &args.target) {
            Ok(outcome) => {
                spinner.finish_success(&outcome.message);
                outcome
            }
            Err(e) => {
                spinner.finish_error(&e.to_string());
                ui.error(&e.to_string());
                return Ok(CommandResult::failure(EXIT_FAILURE));
            }
        };
        if outcome.dry_run {
            ui.message(&outcome.message);
            return Ok(CommandResult::success());
        }

        // Re-collect the source so the result of the fix is visible.
        let id = outcome.source;
        session.current_entries(&id)?;
        let ceiling = self.context.options.startup_delay + self.context.options.collection_timeout * 2;
        if !session.wait_for_idle(ceiling) {
            ui.warning(&format!("{} is still loading", id));
        }
        if let Some(source) = session.snapshot().get(&id) {
            ui.show_source(source);
        }
        Ok(CommandResult::success())
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKey;
    use crate::entry::{Entry, Status};
    use crate::remediation::RemediationAction;
    use crate::scheduler::{SchedulerOptions, SourceRegistry};
    use crate::sources::{Source, SourceId, SourceSpeed};
    use crate::ui::MockUI;
    use std::sync::Mutex;
    use std::time::Duration;

    struct Packages {
        installed: Mutex<Vec<String>>,
    }

    impl Source for Packages {
        fn id(&self) -> SourceId {
            SourceId::new("brew")
        }

        fn category(&self) -> &str {
            "Homebrew"
        }

        fn speed(&self) -> SourceSpeed {
            SourceSpeed::Slow
        }

        fn is_available(&self) -> bool {
            true
        }

        fn collect(&self) -> Result<Vec<Entry>> {
            let installed = self.installed.lock().unwrap();
            installed
                .iter()
                .map(|name| {
                    Entry::new(name.as_str(), "1.0", Status::Healthy).map_err(DevtopoError::from)
                })
                .collect()
        }

        fn supported_actions(&self) -> &[RemediationAction] {
            &[RemediationAction::Uninstall]
        }

        fn perform_remediation(
            &self,
            _action: RemediationAction,
            _scope: Option<&str>,
            target: &str,
        ) -> Result<String> {
            let mut installed = self.installed.lock().unwrap();
            if !installed.iter().any(|p| p == target) {
                return Err(DevtopoError::RemediationFailed {
                    source_id: "brew".into(),
                    action: "uninstall".into(),
                    message: format!("No such keg: {}", target),
                });
            }
            installed.retain(|p| p != target);
            Ok(format!("Ran `brew uninstall {}`", target))
        }
    }

    fn setup() -> (Arc<Packages>, CommandContext) {
        let packages = Arc::new(Packages {
            installed: Mutex::new(vec!["jq".to_string(), "wget".to_string()]),
        });
        let context = CommandContext {
            registry: Arc::new(SourceRegistry::new().with(packages.clone())),
            options: SchedulerOptions {
                collection_timeout: Duration::from_secs(5),
                startup_delay: Duration::ZERO,
                max_workers: 1,
            },
        };
        (packages, context)
    }

    fn args(key: &str, target: &str) -> FixArgs {
        FixArgs {
            action: RemediationAction::Uninstall,
            key: key.parse::<CacheKey>().unwrap(),
            target: target.to_string(),
            yes: true,
            dry_run: false,
        }
    }

    #[test]
    fn fix_runs_and_rerenders_source() {
        let (packages, context) = setup();
        let mut ui = MockUI::new();
        let result = FixCommand::new(context, args("brew", "wget"))
            .execute(&mut ui)
            .unwrap();

        assert!(result.success);
        assert_eq!(*packages.installed.lock().unwrap(), vec!["jq".to_string()]);
        assert!(ui.has_tree_line("jq"));
        assert!(!ui.has_tree_line("wget"));
    }

    #[test]
    fn declined_prompt_changes_nothing() {
        let (packages, context) = setup();
        let mut ui = MockUI::new();
        let mut fix = args("brew", "wget");
        fix.yes = false;

        let result = FixCommand::new(context, fix).execute(&mut ui).unwrap();

        assert_eq!(result.exit_code, EXIT_FAILURE);
        assert_eq!(ui.prompts_shown(), ["fix"]);
        assert_eq!(packages.installed.lock().unwrap().len(), 2);
    }

    #[test]
    fn failed_remediation_exits_1() {
        let (_, context) = setup();
        let mut ui = MockUI::new();
        let result = FixCommand::new(context, args("brew", "ghost"))
            .execute(&mut ui)
            .unwrap();
        assert_eq!(result.exit_code, EXIT_FAILURE);
        assert!(ui.has_error("No such keg"));
    }

    #[test]
    fn unknown_source_exits_2() {
        let (_, context) = setup();
        let mut ui = MockUI::new();
        let result = FixCommand::new(context, args("pip", "requests"))
            .execute(&mut ui)
            .unwrap();
        assert_eq!(result.exit_code, EXIT_UNKNOWN_SOURCE);
    }

    #[test]
    fn dry_run_skips_prompt_and_changes_nothing() {
        let (packages, context) = setup();
        let mut ui = MockUI::new();
        let mut fix = args("brew", "wget");
        fix.yes = false;
        fix.dry_run = true;

        let result = FixCommand::new(context, fix).execute(&mut ui).unwrap();

        assert!(result.success);
        assert!(ui.prompts_shown().is_empty());
        assert!(ui.has_message("Would uninstall wget"));
        assert_eq!(packages.installed.lock().unwrap().len(), 2);
    }

    #[test]
    fn capitalizes_first_letter() {
        assert_eq!(capitalize("uninstall wget via brew"), "Uninstall wget via brew");
        assert_eq!(capitalize(""), "");
    }
}
