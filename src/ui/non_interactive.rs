//! Non-interactive UI for CI/headless environments.

use std::collections::HashMap;

use crate::error::Result;
use crate::scheduler::SourceSnapshot;

use super::theme::DevtopoTheme;
use super::tree::render_source;
use super::{parse_answer, OutputMode, Prompt, SpinnerHandle, UserInterface};

const PROMPT_ENV_PREFIX: &str = "DEVTOPO_PROMPT_";

/// UI implementation for non-interactive mode.
///
/// Output is plain text. Questions are answered from `DEVTOPO_PROMPT_<KEY>`
/// environment variables, falling back to the prompt's default. In CI the
/// loading lines are suppressed since they only add noise to logs.
pub struct NonInteractiveUI {
    mode: OutputMode,
    theme: DevtopoTheme,
    env_overrides: HashMap<String, String>,
    is_ci: bool,
}

impl NonInteractiveUI {
    pub fn new(mode: OutputMode) -> Self {
        let env_overrides = std::env::vars()
            .filter(|(k, _)| k.starts_with(PROMPT_ENV_PREFIX))
            .collect();

        Self {
            mode,
            theme: DevtopoTheme::plain(),
            env_overrides,
            is_ci: crate::shell::is_ci(),
        }
    }

    /// Create with explicit overrides (for testing).
    pub fn with_overrides(mode: OutputMode, overrides: HashMap<String, String>) -> Self {
        Self {
            mode,
            theme: DevtopoTheme::plain(),
            env_overrides: overrides,
            is_ci: false,
        }
    }
}

impl UserInterface for NonInteractiveUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn set_output_mode(&mut self, mode: OutputMode) {
        self.mode = mode;
    }

    fn message(&mut self, msg: &str) {
        if self.mode.shows_status() {
            println!("{}", msg);
        }
    }

    fn success(&mut self, msg: &str) {
        if self.mode.shows_status() {
            println!("{}", self.theme.format_success(msg));
        }
    }

    fn warning(&mut self, msg: &str) {
        if self.mode.shows_status() {
            eprintln!("{}", self.theme.format_warning(msg));
        }
    }

    fn error(&mut self, msg: &str) {
        eprintln!("{}", self.theme.format_error(msg));
    }

    fn confirm(&mut self, prompt: &Prompt) -> Result<bool> {
        let env_key = format!("{}{}", PROMPT_ENV_PREFIX, prompt.key.to_uppercase());
        if let Some(value) = self.env_overrides.get(&env_key) {
            match parse_answer(value) {
                Some(answer) => return Ok(answer),
                None => tracing::warn!("Ignoring {}={:?}: expected yes or no", env_key, value),
            }
        }
        tracing::debug!(
            "Answering '{}' with default ({})",
            prompt.question,
            prompt.default
        );
        Ok(prompt.default)
    }

    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle> {
        if self.mode.shows_spinners() && !self.is_ci {
            println!("  {}", message);
        }
        Box::new(NoopSpinner {
            show: self.mode.shows_status(),
        })
    }

    fn show_header(&mut self, title: &str) {
        if self.mode.shows_status() {
            println!("\n{}\n", title);
        }
    }

    fn show_hint(&mut self, hint: &str) {
        if self.mode.shows_status() {
            println!("  {}", hint);
        }
    }

    fn show_source(&mut self, source: &SourceSnapshot) {
        if !self.mode.shows_tree() {
            return;
        }
        for line in render_source(source, &self.theme, self.mode.shows_details()) {
            println!("{}", line);
        }
        println!();
    }

    fn raw(&mut self, text: &str) {
        println!("{}", text);
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

/// Spinner stand-in that prints the final line only.
struct NoopSpinner {
    show: bool,
}

impl SpinnerHandle for NoopSpinner {
    fn set_message(&mut self, _msg: &str) {}

    fn finish_success(&mut self, msg: &str) {
        if self.show {
            println!("  ✓ {}", msg);
        }
    }

    fn finish_error(&mut self, msg: &str) {
        eprintln!("  ✗ {}", msg);
    }

    fn finish_clear(&mut self) {}
}
