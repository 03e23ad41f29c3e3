//! Tree rendering of a session snapshot.
//!
//! ```text
//! Homebrew (brew) ⚠ 3 entries
//! ├─ ✓ jq  1.7.1
//! ├─ ⚠ wget  1.21.4
//! │     latest: 1.24.5
//! └─ ✓ firefox  121.0
//! ```

use serde_json::Value;

use crate::entry::Entry;
use crate::scheduler::{SourceSnapshot, SourceState};

use super::theme::DevtopoTheme;

/// Detail values longer than this are cut.
const MAX_DETAIL_WIDTH: usize = 72;

/// Render one source: its heading, then one line per entry.
///
/// With `verbose`, each entry's details follow it, one per line.
pub fn render_source(source: &SourceSnapshot, theme: &DevtopoTheme, verbose: bool) -> Vec<String> {
    let mut lines = vec![heading(source, theme)];
    let Some(entries) = &source.entries else {
        return lines;
    };

    for (index, entry) in entries.iter().enumerate() {
        let last = index + 1 == entries.len();
        let branch = if last { "└─" } else { "├─" };
        lines.push(format!("{} {}", theme.border.apply_to(branch), entry_line(entry, theme)));

        if verbose {
            let guide = if last { " " } else { "│" };
            for (key, value) in entry.details() {
                lines.push(format!(
                    "{}     {}: {}",
                    theme.border.apply_to(guide),
                    theme.key.apply_to(key),
                    format_detail(value)
                ));
            }
        }
    }
    lines
}

fn heading(source: &SourceSnapshot, theme: &DevtopoTheme) -> String {
    let title = format!(
        "{} {}",
        theme.header.apply_to(&source.category),
        theme.dim.apply_to(format!("({})", source.id))
    );
    let suffix = match source.state {
        SourceState::Unavailable => theme.dim.apply_to("not available").to_string(),
        SourceState::Unchecked => theme.dim.apply_to("not checked").to_string(),
        SourceState::FastPending | SourceState::SlowPending | SourceState::SlowLoading => {
            theme.info.apply_to("loading…").to_string()
        }
        SourceState::FastLoaded | SourceState::SlowLoaded => match source.worst_status() {
            Some(worst) => {
                let count = source.entries.as_ref().map(Vec::len).unwrap_or(0);
                let noun = if count == 1 { "entry" } else { "entries" };
                format!(
                    "{} {}",
                    theme.status_icon(worst),
                    theme.dim.apply_to(format!("{} {}", count, noun))
                )
            }
            None => theme.dim.apply_to("no entries").to_string(),
        },
    };
    format!("{} {}", title, suffix)
}

fn entry_line(entry: &Entry, theme: &DevtopoTheme) -> String {
    let name = theme.status_style(entry.status()).apply_to(entry.name());
    if entry.path() == entry.name() {
        format!("{} {}", theme.status_icon(entry.status()), name)
    } else {
        format!(
            "{} {}  {}",
            theme.status_icon(entry.status()),
            name,
            theme.dim.apply_to(entry.path())
        )
    }
}

/// Human-readable form of a detail value.
///
/// Scalars print bare, lists of scalars are comma-joined, anything nested
/// is summarized by size.
pub fn format_detail(value: &Value) -> String {
    let text = match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => String::from(if *b { "yes" } else { "no" }),
        Value::Number(n) => n.to_string(),
        Value::Array(items) if items.iter().all(is_scalar) => items
            .iter()
            .map(format_detail)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Array(items) => format!("{} items", items.len()),
        Value::Object(map) => format!("{} fields", map.len()),
    };
    truncate(text)
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

fn truncate(text: String) -> String {
    if text.chars().count() <= MAX_DETAIL_WIDTH {
        return text;
    }
    let cut: String = text.chars().take(MAX_DETAIL_WIDTH - 3).collect();
    format!("{}...", cut)
}
