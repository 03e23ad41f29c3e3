//! Mock UI implementation for testing.
//!
//! `MockUI` implements the `UserInterface` trait and captures all
//! interactions for later assertion. Confirmation answers can be scripted
//! per prompt key.
//!
//! # Example
//!
//! ```
//! use devtopo::ui::{MockUI, Prompt, UserInterface};
//!
//! let mut ui = MockUI::new();
//! ui.set_answer("fix", true);
//!
//! assert!(ui.confirm(&Prompt::new("fix", "Uninstall wget?")).unwrap());
//! ui.success("Uninstalled wget");
//!
//! assert!(ui.has_success("wget"));
//! assert_eq!(ui.prompts_shown(), ["fix"]);
//! ```

use std::collections::HashMap;

use crate::error::Result;
use crate::scheduler::SourceSnapshot;

use super::theme::DevtopoTheme;
use super::tree::render_source;
use super::{OutputMode, Prompt, SpinnerHandle, UserInterface};

/// Mock UI implementation for testing.
#[derive(Debug, Default)]
pub struct MockUI {
    mode: OutputMode,
    interactive: bool,
    messages: Vec<String>,
    successes: Vec<String>,
    warnings: Vec<String>,
    errors: Vec<String>,
    headers: Vec<String>,
    hints: Vec<String>,
    spinners: Vec<String>,
    /// Plain-text tree lines, in render order.
    tree: Vec<String>,
    raw: Vec<String>,
    answers: HashMap<String, bool>,
    prompts_shown: Vec<String>,
}

impl MockUI {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: OutputMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Answer the prompt with this key. Unscripted prompts get their default.
    pub fn set_answer(&mut self, key: &str, answer: bool) {
        self.answers.insert(key.to_string(), answer);
    }

    pub fn set_interactive(&mut self, interactive: bool) {
        self.interactive = interactive;
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn successes(&self) -> &[String] {
        &self.successes
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn hints(&self) -> &[String] {
        &self.hints
    }

    /// Messages of every spinner started.
    pub fn spinners(&self) -> &[String] {
        &self.spinners
    }

    /// Every tree line rendered, without styling.
    pub fn tree(&self) -> &[String] {
        &self.tree
    }

    pub fn raw_output(&self) -> &[String] {
        &self.raw
    }

    /// Keys of the prompts shown, in order.
    pub fn prompts_shown(&self) -> &[String] {
        &self.prompts_shown
    }

    pub fn has_message(&self, msg: &str) -> bool {
        self.messages.iter().any(|m| m.contains(msg))
    }

    pub fn has_success(&self, msg: &str) -> bool {
        self.successes.iter().any(|m| m.contains(msg))
    }

    pub fn has_warning(&self, msg: &str) -> bool {
        self.warnings.iter().any(|m| m.contains(msg))
    }

    pub fn has_error(&self, msg: &str) -> bool {
        self.errors.iter().any(|m| m.contains(msg))
    }

    /// Whether any rendered tree line contains `text`.
    pub fn has_tree_line(&self, text: &str) -> bool {
        self.tree.iter().any(|line| line.contains(text))
    }

    /// Clear all captured interactions.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.successes.clear();
        self.warnings.clear();
        self.errors.clear();
        self.headers.clear();
        self.hints.clear();
        self.spinners.clear();
        self.tree.clear();
        self.raw.clear();
        self.prompts_shown.clear();
    }
}

impl UserInterface for MockUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn set_output_mode(&mut self, mode: OutputMode) {
        self.mode = mode;
    }

    fn message(&mut self, msg: &str) {
        self.messages.push(msg.to_string());
    }

    fn success(&mut self, msg: &str) {
        self.successes.push(msg.to_string());
    }

    fn warning(&mut self, msg: &str) {
        self.warnings.push(msg.to_string());
    }

    fn error(&mut self, msg: &str) {
        self.errors.push(msg.to_string());
    }

    fn confirm(&mut self, prompt: &Prompt) -> Result<bool> {
        self.prompts_shown.push(prompt.key.clone());
        Ok(self
            .answers
            .get(&prompt.key)
            .copied()
            .unwrap_or(prompt.default))
    }

    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle> {
        self.spinners.push(message.to_string());
        Box::new(MockSpinner::new())
    }

    fn show_header(&mut self, title: &str) {
        self.headers.push(title.to_string());
    }

    fn show_hint(&mut self, hint: &str) {
        self.hints.push(hint.to_string());
    }

    fn show_source(&mut self, source: &SourceSnapshot) {
        let lines = render_source(source, &DevtopoTheme::plain(), self.mode.shows_details());
        self.tree.extend(lines);
    }

    fn raw(&mut self, text: &str) {
        self.raw.push(text.to_string());
    }

    fn is_interactive(&self) -> bool {
        self.interactive
    }
}

/// Mock spinner that captures its messages.
#[derive(Debug, Default)]
pub struct MockSpinner {
    messages: Vec<String>,
    finish_message: Option<String>,
    status: Option<SpinnerStatus>,
}

/// How a mock spinner finished.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpinnerStatus {
    Success,
    Error,
    Cleared,
}

impl MockSpinner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn finish_message(&self) -> Option<&str> {
        self.finish_message.as_deref()
    }

    pub fn status(&self) -> Option<SpinnerStatus> {
        self.status
    }
}

impl SpinnerHandle for MockSpinner {
    fn set_message(&mut self, msg: &str) {
        self.messages.push(msg.to_string());
    }

    fn finish_success(&mut self, msg: &str) {
        self.finish_message = Some(msg.to_string());
        self.status = Some(SpinnerStatus::Success);
    }

    fn finish_error(&mut self, msg: &str) {
        self.finish_message = Some(msg.to_string());
        self.status = Some(SpinnerStatus::Error);
    }

    fn finish_clear(&mut self) {
        self.status = Some(SpinnerStatus::Cleared);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_messages() {
        let mut ui = MockUI::new();
        ui.message("Checking sources");
        ui.warning("npm timed out");
        ui.error("brew failed");

        assert!(ui.has_message("Checking"));
        assert!(ui.has_warning("npm"));
        assert!(ui.has_error("brew"));
    }

    #[test]
    fn scripted_answer_overrides_default() {
        let mut ui = MockUI::new();
        let prompt = Prompt::new("fix", "Proceed?").default_yes();
        assert!(ui.confirm(&prompt).unwrap());

        ui.set_answer("fix", false);
        assert!(!ui.confirm(&prompt).unwrap());
        assert_eq!(ui.prompts_shown().len(), 2);
    }

    #[test]
    fn spinner_records_finish() {
        let mut spinner = MockSpinner::new();
        spinner.set_message("Loading brew");
        spinner.finish_error("Timed out");
        assert_eq!(spinner.messages(), ["Loading brew"]);
        assert_eq!(spinner.finish_message(), Some("Timed out"));
        assert_eq!(spinner.status(), Some(SpinnerStatus::Error));
    }

    #[test]
    fn mode_and_interactivity_are_configurable() {
        let mut ui = MockUI::with_mode(OutputMode::Quiet);
        assert_eq!(ui.output_mode(), OutputMode::Quiet);
        assert!(!ui.is_interactive());

        ui.set_interactive(true);
        assert!(ui.is_interactive());
    }

    #[test]
    fn clear_resets_everything() {
        let mut ui = MockUI::new();
        ui.success("done");
        ui.raw("{}");
        ui.start_spinner("Loading");
        ui.clear();
        assert!(ui.successes().is_empty());
        assert!(ui.raw_output().is_empty());
        assert!(ui.spinners().is_empty());
    }
}
