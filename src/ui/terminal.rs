//! Interactive terminal UI.

use console::Term;
use std::io::Write;

use crate::error::Result;
use crate::scheduler::SourceSnapshot;

use super::tree::render_source;
use super::{
    confirm, DevtopoTheme, NonInteractiveUI, OutputMode, ProgressSpinner, Prompt, SpinnerHandle,
    UserInterface,
};

/// Interactive terminal UI implementation.
pub struct TerminalUI {
    term: Term,
    theme: DevtopoTheme,
    mode: OutputMode,
}

impl TerminalUI {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            term: Term::stdout(),
            theme: DevtopoTheme::detect(),
            mode,
        }
    }
}

impl UserInterface for TerminalUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn set_output_mode(&mut self, mode: OutputMode) {
        self.mode = mode;
    }

    fn message(&mut self, msg: &str) {
        if self.mode.shows_status() {
            writeln!(self.term, "{}", msg).ok();
        }
    }

    fn success(&mut self, msg: &str) {
        if self.mode.shows_status() {
            writeln!(self.term, "{}", self.theme.format_success(msg)).ok();
        }
    }

    fn warning(&mut self, msg: &str) {
        if self.mode.shows_status() {
            writeln!(self.term, "{}", self.theme.format_warning(msg)).ok();
        }
    }

    fn error(&mut self, msg: &str) {
        let mut stderr = Term::stderr();
        writeln!(stderr, "{}", self.theme.format_error(msg)).ok();
    }

    fn confirm(&mut self, prompt: &Prompt) -> Result<bool> {
        confirm(prompt, &self.term)
    }

    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle> {
        if self.mode.shows_spinners() {
            Box::new(ProgressSpinner::new(message))
        } else {
            Box::new(ProgressSpinner::hidden())
        }
    }

    fn show_header(&mut self, title: &str) {
        if self.mode.shows_status() {
            writeln!(self.term, "\n{}\n", self.theme.format_header(title)).ok();
        }
    }

    fn show_hint(&mut self, hint: &str) {
        if self.mode.shows_status() {
            writeln!(self.term, "  {}", self.theme.hint.apply_to(hint)).ok();
        }
    }

    fn show_source(&mut self, source: &SourceSnapshot) {
        if !self.mode.shows_tree() {
            return;
        }
        for line in render_source(source, &self.theme, self.mode.shows_details()) {
            writeln!(self.term, "{}", line).ok();
        }
        writeln!(self.term).ok();
    }

    fn raw(&mut self, text: &str) {
        writeln!(self.term, "{}", text).ok();
    }

    fn is_interactive(&self) -> bool {
        self.term.is_term()
    }
}

/// Create the appropriate UI based on context.
pub fn create_ui(interactive: bool, mode: OutputMode) -> Box<dyn UserInterface> {
    if interactive && Term::stdout().is_term() {
        Box::new(TerminalUI::new(mode))
    } else {
        Box::new(NonInteractiveUI::new(mode))
    }
}
