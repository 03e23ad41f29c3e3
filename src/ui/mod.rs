//! Terminal output.
//!
//! This module provides:
//! - [`UserInterface`] trait for UI abstraction
//! - [`TerminalUI`] for interactive terminal usage
//! - [`NonInteractiveUI`] for CI/headless environments
//! - [`MockUI`] for tests
//! - [`tree`] rendering of a session snapshot
//!
//! # Example
//!
//! ```
//! use devtopo::ui::{create_ui, OutputMode};
//!
//! // Non-interactive mode is safe in doctests
//! let mut ui = create_ui(false, OutputMode::Quiet);
//! ui.show_header("Toolchain");
//! ui.success("Nothing to fix");
//! ```

pub mod mock;
pub mod non_interactive;
pub mod output;
pub mod prompts;
pub mod spinner;
pub mod terminal;
pub mod theme;
pub mod tree;

pub use mock::{MockSpinner, MockUI};
pub use non_interactive::NonInteractiveUI;
pub use output::OutputMode;
pub use prompts::confirm;
pub use spinner::ProgressSpinner;
pub use terminal::{create_ui, TerminalUI};
pub use theme::{should_use_colors, DevtopoTheme};

use crate::error::Result;
use crate::scheduler::SourceSnapshot;

/// Trait for user interface interactions.
///
/// This trait allows mocking the UI in tests.
pub trait UserInterface {
    fn output_mode(&self) -> OutputMode;

    fn set_output_mode(&mut self, mode: OutputMode);

    /// Display a message to the user.
    fn message(&mut self, msg: &str);

    fn success(&mut self, msg: &str);

    fn warning(&mut self, msg: &str);

    /// Errors are shown in every output mode.
    fn error(&mut self, msg: &str);

    /// Ask a yes/no question.
    fn confirm(&mut self, prompt: &Prompt) -> Result<bool>;

    /// Start a spinner for an operation.
    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle>;

    fn show_header(&mut self, title: &str);

    /// Show a short follow-up suggestion.
    fn show_hint(&mut self, hint: &str);

    /// Render one source of a snapshot as a tree.
    fn show_source(&mut self, source: &SourceSnapshot);

    /// Write raw text to stdout regardless of output mode (e.g. JSON).
    fn raw(&mut self, text: &str);

    fn is_interactive(&self) -> bool;
}

/// Handle for controlling a spinner.
pub trait SpinnerHandle {
    fn set_message(&mut self, msg: &str);

    fn finish_success(&mut self, msg: &str);

    fn finish_error(&mut self, msg: &str);

    /// Remove the spinner without leaving a line behind.
    fn finish_clear(&mut self);
}

/// A yes/no question.
#[derive(Debug, Clone)]
pub struct Prompt {
    /// Key for non-interactive overrides (`DEVTOPO_PROMPT_<KEY>`).
    pub key: String,
    pub question: String,
    /// Answer used when the user just presses enter.
    pub default: bool,
}

impl Prompt {
    pub fn new(key: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            question: question.into(),
            default: false,
        }
    }

    pub fn default_yes(mut self) -> Self {
        self.default = true;
        self
    }
}

/// Parse a yes/no answer. `None` when the text is neither.
pub fn parse_answer(text: &str) -> Option<bool> {
    match text.trim().to_lowercase().as_str() {
        "y" | "yes" | "true" | "1" => Some(true),
        "n" | "no" | "false" | "0" => Some(false),
        _ => None,
    }
}
