//! Visual theme and styling.

use console::Style;

use crate::entry::Status;

/// Devtopo's visual theme.
#[derive(Debug, Clone)]
pub struct DevtopoTheme {
    /// Healthy entries and success messages (green).
    pub success: Style,
    /// Warning entries (orange).
    pub warning: Style,
    /// Error entries (red bold).
    pub error: Style,
    /// Loading indicators (magenta).
    pub info: Style,
    /// Secondary text: paths, counts, unavailable sources.
    pub dim: Style,
    pub highlight: Style,
    /// Category headings (magenta bold).
    pub header: Style,
    /// Commands shown in output (dim italic).
    pub command: Style,
    /// Tree guides.
    pub border: Style,
    pub hint: Style,
    /// Detail keys in verbose output.
    pub key: Style,
}

impl Default for DevtopoTheme {
    fn default() -> Self {
        Self::new()
    }
}

impl DevtopoTheme {
    pub fn new() -> Self {
        Self {
            success: Style::new().green(),
            warning: Style::new().color256(208),
            error: Style::new().red().bold(),
            info: Style::new().magenta(),
            dim: Style::new().dim(),
            highlight: Style::new().bold(),
            header: Style::new().bold().magenta(),
            command: Style::new().dim().italic(),
            border: Style::new().dim(),
            hint: Style::new().magenta().dim(),
            key: Style::new().bold(),
        }
    }

    /// Create a theme without colors (for non-TTY or --no-color).
    pub fn plain() -> Self {
        Self {
            success: Style::new(),
            warning: Style::new(),
            error: Style::new(),
            info: Style::new(),
            dim: Style::new(),
            highlight: Style::new(),
            header: Style::new(),
            command: Style::new(),
            border: Style::new(),
            hint: Style::new(),
            key: Style::new(),
        }
    }

    /// The theme for the current terminal.
    pub fn detect() -> Self {
        if should_use_colors() {
            Self::new()
        } else {
            Self::plain()
        }
    }

    pub fn format_success(&self, msg: &str) -> String {
        format!("{}", self.success.apply_to(format!("✓ {}", msg)))
    }

    pub fn format_warning(&self, msg: &str) -> String {
        format!("{}", self.warning.apply_to(format!("⚠ {}", msg)))
    }

    pub fn format_error(&self, msg: &str) -> String {
        format!("{}", self.error.apply_to(format!("✗ {}", msg)))
    }

    pub fn format_header(&self, title: &str) -> String {
        format!("{}", self.header.apply_to(title))
    }

    /// Style for an entry status.
    pub fn status_style(&self, status: Status) -> &Style {
        match status {
            Status::Healthy => &self.success,
            Status::Warning => &self.warning,
            Status::Error => &self.error,
        }
    }

    /// Status icon in its status color.
    pub fn status_icon(&self, status: Status) -> String {
        self.status_style(status).apply_to(status.icon()).to_string()
    }
}

/// Check if colors should be enabled.
pub fn should_use_colors() -> bool {
    // https://no-color.org/
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    console::Term::stdout().is_term()
}
