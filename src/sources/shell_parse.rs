//! Line-level parsing of shell config files.
//!
//! Recognizes the handful of constructs worth showing in an inventory:
//! aliases, exports, PATH edits, `source` lines, functions, and `eval`s.
//! Anything else is ignored.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

static ALIAS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^alias\s+([^=]+)=["']?(.+?)["']?\s*$"#).expect("ALIAS must compile")
});
static EXPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^export\s+([^=]+)=(.+)$").expect("EXPORT must compile"));
static PATH_EDIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:export\s+)?PATH\s*=|path\s*\+=").expect("PATH_EDIT must compile")
});
static SOURCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:source|\.)\s+(.+)$").expect("SOURCE must compile"));
static FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:function\s+)?(\w+)\s*\(\)\s*\{").expect("FUNCTION must compile")
});
static EVAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^eval\s+"?\$\((.+)\)"?"#).expect("EVAL must compile"));

/// Assignments that put directories on PATH.
static PATH_VALUE: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r#"export\s+PATH\s*=\s*["']?([^"'\n]+)["']?"#).expect("PATH_VALUE must compile"),
        Regex::new(r#"PATH\s*=\s*["']?([^"'\n]+)["']?"#).expect("PATH_VALUE must compile"),
        Regex::new(r"path\s*\+=\s*\(([^)]+)\)").expect("PATH_VALUE must compile"),
    ]
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Alias,
    Export,
    Path,
    Source,
    Function,
    Eval,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Alias => "alias",
            ItemKind::Export => "export",
            ItemKind::Path => "path",
            ItemKind::Source => "source",
            ItemKind::Function => "function",
            ItemKind::Eval => "eval",
        }
    }
}

/// One recognized construct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigItem {
    pub kind: ItemKind,
    pub name: String,
    pub value: String,
    /// 1-based line where the construct starts.
    pub line: usize,
    /// Last line of a multi-line function body.
    pub end_line: usize,
}

/// Parse the recognized constructs out of a config file's content.
pub fn parse_config(content: &str) -> Vec<ConfigItem> {
    let lines: Vec<&str> = content.lines().collect();
    let mut items = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line_no = i + 1;
        let stripped = lines[i].trim();

        if stripped.is_empty() || stripped.starts_with('#') {
            i += 1;
            continue;
        }

        if let Some(caps) = FUNCTION.captures(stripped) {
            let mut depth = brace_delta(stripped);
            let mut j = i + 1;
            while j < lines.len() && depth > 0 {
                depth += brace_delta(lines[j]);
                j += 1;
            }
            items.push(ConfigItem {
                kind: ItemKind::Function,
                name: caps[1].to_string(),
                value: "(function)".to_string(),
                line: line_no,
                end_line: j.max(line_no),
            });
            i = j.max(i + 1);
            continue;
        }

        let item = if let Some(caps) = ALIAS.captures(stripped) {
            Some((
                ItemKind::Alias,
                caps[1].trim().to_string(),
                caps[2].trim().trim_end_matches(['\'', '"']).to_string(),
            ))
        } else if PATH_EDIT.is_match(stripped) {
            Some((ItemKind::Path, "PATH".to_string(), stripped.to_string()))
        } else if let Some(caps) = EXPORT.captures(stripped) {
            Some((
                ItemKind::Export,
                caps[1].trim().to_string(),
                caps[2].trim().trim_matches(['\'', '"']).to_string(),
            ))
        } else if let Some(caps) = SOURCE.captures(stripped) {
            Some((ItemKind::Source, "source".to_string(), caps[1].trim().to_string()))
        } else {
            EVAL.captures(stripped)
                .map(|caps| (ItemKind::Eval, "eval".to_string(), caps[1].trim().to_string()))
        };

        if let Some((kind, name, value)) = item {
            items.push(ConfigItem {
                kind,
                name,
                value,
                line: line_no,
                end_line: line_no,
            });
        }
        i += 1;
    }

    items
}

fn brace_delta(line: &str) -> i64 {
    line.matches('{').count() as i64 - line.matches('}').count() as i64
}

/// Count items per kind.
pub fn count_by_kind(items: &[ConfigItem]) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for item in items {
        *counts.entry(item.kind.as_str()).or_insert(0) += 1;
    }
    counts
}

/// Directories a config line adds to PATH, with `~` expanded.
///
/// Segments that reference variables (`$PATH`, `$HOME/...`) are skipped
/// except for a leading `$HOME`, which is expanded against `home`.
pub fn path_additions(line: &str, home: &Path) -> Vec<String> {
    let stripped = line.trim();
    if stripped.starts_with('#') {
        return Vec::new();
    }
    let Some(raw) = PATH_VALUE
        .iter()
        .find_map(|re| re.captures(stripped).map(|caps| caps[1].to_string()))
    else {
        return Vec::new();
    };

    raw.split([':', ' '])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| {
            if let Some(rest) = part.strip_prefix("$HOME") {
                Some(format!("{}{}", home.display(), rest))
            } else if part.starts_with('$') {
                None
            } else if let Some(rest) = part.strip_prefix("~/") {
                Some(home.join(rest).to_string_lossy().into_owned())
            } else {
                Some(part.to_string())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZSHRC: &str = r#"# comment
alias ll='ls -la'
export EDITOR="nvim"
export PATH="$HOME/.cargo/bin:$PATH"
source ~/.zsh_plugins
eval "$(starship init zsh)"

mkcd() {
  mkdir -p "$1"
  if true; then { cd "$1"; } fi
}
alias g=git
"#;

    #[test]
    fn recognizes_each_kind() {
        let items = parse_config(ZSHRC);
        let kinds: Vec<_> = items.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ItemKind::Alias,
                ItemKind::Export,
                ItemKind::Path,
                ItemKind::Source,
                ItemKind::Eval,
                ItemKind::Function,
                ItemKind::Alias,
            ]
        );
    }

    #[test]
    fn captures_alias_name_and_value() {
        let items = parse_config(ZSHRC);
        assert_eq!(items[0].name, "ll");
        assert_eq!(items[0].value, "ls -la");
        assert_eq!(items[0].line, 2);
    }

    #[test]
    fn function_spans_its_body() {
        let items = parse_config(ZSHRC);
        let func = items.iter().find(|i| i.kind == ItemKind::Function).unwrap();
        assert_eq!(func.name, "mkcd");
        assert_eq!(func.line, 8);
        assert_eq!(func.end_line, 11);
        // The alias after the function is still found.
        assert_eq!(items.last().unwrap().name, "g");
    }

    #[test]
    fn counts_by_kind() {
        let counts = count_by_kind(&parse_config(ZSHRC));
        assert_eq!(counts.get("alias"), Some(&2));
        assert_eq!(counts.get("function"), Some(&1));
        assert_eq!(counts.get("export"), Some(&1));
    }

    #[test]
    fn path_additions_expand_home_and_skip_vars() {
        let home = Path::new("/home/dev");
        assert_eq!(
            path_additions(r#"export PATH="$HOME/.cargo/bin:$PATH""#, home),
            vec!["/home/dev/.cargo/bin"]
        );
        assert_eq!(
            path_additions("PATH=~/bin:/opt/tools/bin:$PATH", home),
            vec!["/home/dev/bin", "/opt/tools/bin"]
        );
        assert_eq!(
            path_additions("path+=(/opt/homebrew/bin)", home),
            vec!["/opt/homebrew/bin"]
        );
        assert!(path_additions("# export PATH=/nope", home).is_empty());
        assert!(path_additions("alias ll='ls'", home).is_empty());
    }
}
