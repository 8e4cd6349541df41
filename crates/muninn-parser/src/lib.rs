//! muninn-parser: tool-call → candidate file paths (spec.md §4.2).
//!
//! Pure functions only — no cache, no database. `muninn-enrich` calls
//! [`parse`] then [`skip_filter`] before handing the surviving paths to the
//! enricher registry.

use muninn_core::{MuninnError, Tool};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// 1 MiB, the hard cap on serialized `raw_input` size (spec.md §4.2).
pub const MAX_INPUT_BYTES: usize = 1024 * 1024;

/// What a tool hook handed us: either a structured payload (the common case)
/// or a free-form string (e.g. a raw Bash command with no JSON wrapper).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawInput {
    Structured(serde_json::Value),
    FreeString(String),
}

impl RawInput {
    fn byte_len(&self) -> usize {
        match self {
            RawInput::Structured(v) => v.to_string().len(),
            RawInput::FreeString(s) => s.len(),
        }
    }

    fn field(&self, name: &str) -> Option<String> {
        match self {
            RawInput::Structured(v) => v.get(name)?.as_str().map(String::from),
            RawInput::FreeString(_) => None,
        }
    }

    fn as_free_str(&self) -> Option<&str> {
        match self {
            RawInput::FreeString(s) => Some(s),
            RawInput::Structured(v) => v.as_str(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedInput {
    pub tool: Tool,
    pub files: Vec<String>,
}

static BASH_READ_CMD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:cat|head|tail|less|more|vim|nano|code|edit)\s+(\S+)").unwrap()
});
static BASH_REDIRECT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[<>]\s*(\S+)").unwrap());
static BASH_FS_CMD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:rm|cp|mv|touch|mkdir)\s+((?:-\S+\s+)*)(\S+)").unwrap()
});
static FREE_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\.{1,2}/|/)?[\w./-]+\.[A-Za-z0-9]{1,8}\b").unwrap()
});
static URL_LIKE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(https?://|www\.)").unwrap());
static VERSION_LIKE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^v?\d+\.\d+\.\d+").unwrap());

fn looks_like_path(candidate: &str) -> bool {
    !candidate.is_empty() && !URL_LIKE.is_match(candidate) && !VERSION_LIKE.is_match(candidate)
}

fn dedup(mut files: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    files.retain(|f| seen.insert(f.clone()));
    files
}

/// Parse a `(tool_name, raw_input)` pair into a normalized tool and its
/// candidate file paths. Fails only on oversized input (spec.md §4.2).
pub fn parse(tool_name: &str, raw_input: &RawInput) -> Result<ParsedInput, MuninnError> {
    let size = raw_input.byte_len();
    if size > MAX_INPUT_BYTES {
        return Err(MuninnError::OversizedInput { size });
    }

    let tool = Tool::normalize(tool_name);
    let files = match tool {
        Tool::Read | Tool::Edit | Tool::Write => raw_input
            .field("file_path")
            .into_iter()
            .collect(),
        Tool::Bash => {
            let command = raw_input
                .field("command")
                .or_else(|| raw_input.as_free_str().map(String::from))
                .unwrap_or_default();
            extract_bash_paths(&command)
        }
        Tool::Glob => {
            let mut out = Vec::new();
            if let Some(pattern) = raw_input.field("pattern") {
                out.push(pattern);
            }
            if let Some(path) = raw_input.field("path") {
                out.push(path);
            }
            out
        }
        Tool::Grep => {
            let mut out = Vec::new();
            if let Some(path) = raw_input.field("path") {
                out.push(path);
            }
            if let Some(pattern) = raw_input.field("pattern") {
                out.push(pattern);
            }
            out
        }
        Tool::Wildcard => raw_input
            .as_free_str()
            .map(extract_free_string_paths)
            .unwrap_or_default(),
    };

    let files = dedup(files.into_iter().filter(|f| looks_like_path(f)).collect());
    Ok(ParsedInput { tool, files })
}

fn extract_bash_paths(command: &str) -> Vec<String> {
    let mut out = Vec::new();
    for cap in BASH_READ_CMD.captures_iter(command) {
        out.push(cap[1].to_string());
    }
    for cap in BASH_REDIRECT.captures_iter(command) {
        out.push(cap[1].to_string());
    }
    for cap in BASH_FS_CMD.captures_iter(command) {
        out.push(cap[2].to_string());
    }
    out.into_iter().filter(|p| !p.starts_with('-')).collect()
}

fn extract_free_string_paths(text: &str) -> Vec<String> {
    FREE_PATH
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .filter(|p| looks_like_path(p))
        .collect()
}

/// True if `path` should be dropped before enrichment (spec.md §4.2).
/// Patterns starting with `*.` compare extensions; others are substring
/// matches.
pub fn matches_skip_pattern(path: &str, pattern: &str) -> bool {
    if let Some(ext) = pattern.strip_prefix("*.") {
        path.rsplit('.').next().is_some_and(|e| e == ext)
    } else {
        path.contains(pattern)
    }
}

pub const DEFAULT_SKIP_PATTERNS: &[&str] =
    &["node_modules", ".git", "dist", "build", ".next", "coverage", "*.lock"];

/// Drop any path matching one of `patterns`.
pub fn skip_filter(files: Vec<String>, patterns: &[String]) -> Vec<String> {
    files
        .into_iter()
        .filter(|f| !patterns.iter().any(|p| matches_skip_pattern(f, p)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structured(json: serde_json::Value) -> RawInput {
        RawInput::Structured(json)
    }

    #[test]
    fn test_parse_edit_extracts_file_path() {
        let input = structured(serde_json::json!({"file_path": "src/main.rs"}));
        let parsed = parse("Edit", &input).unwrap();
        assert_eq!(parsed.tool, Tool::Edit);
        assert_eq!(parsed.files, vec!["src/main.rs".to_string()]);
    }

    #[test]
    fn test_parse_rejects_oversized_input() {
        let huge = "x".repeat(MAX_INPUT_BYTES + 1);
        let input = RawInput::FreeString(huge);
        let err = parse("Bash", &input).unwrap_err();
        assert!(matches!(err, MuninnError::OversizedInput { .. }));
    }

    #[test]
    fn test_parse_bash_cat_command() {
        let input = structured(serde_json::json!({"command": "cat src/lib.rs"}));
        let parsed = parse("Bash", &input).unwrap();
        assert_eq!(parsed.files, vec!["src/lib.rs".to_string()]);
    }

    #[test]
    fn test_parse_bash_redirection() {
        let input = structured(serde_json::json!({"command": "echo hi > out/log.txt"}));
        let parsed = parse("Bash", &input).unwrap();
        assert_eq!(parsed.files, vec!["out/log.txt".to_string()]);
    }

    #[test]
    fn test_parse_bash_rm_skips_flags() {
        let input = structured(serde_json::json!({"command": "rm -rf build/artifact.o"}));
        let parsed = parse("Bash", &input).unwrap();
        assert_eq!(parsed.files, vec!["build/artifact.o".to_string()]);
    }

    #[test]
    fn test_parse_glob_collects_pattern_and_path() {
        let input = structured(serde_json::json!({"pattern": "*.rs", "path": "src"}));
        let parsed = parse("Glob", &input).unwrap();
        assert_eq!(parsed.files, vec!["*.rs".to_string(), "src".to_string()]);
    }

    #[test]
    fn test_parse_unknown_tool_is_wildcard() {
        let input = RawInput::FreeString("look at ./src/app.tsx please".to_string());
        let parsed = parse("WebFetch", &input).unwrap();
        assert_eq!(parsed.tool, Tool::Wildcard);
        assert_eq!(parsed.files, vec!["./src/app.tsx".to_string()]);
    }

    #[test]
    fn test_free_string_rejects_urls_and_versions() {
        let input = RawInput::FreeString(
            "see https://example.com/readme.md and v1.2.3 and ./real/file.ts".to_string(),
        );
        let parsed = parse("*", &input).unwrap();
        assert_eq!(parsed.files, vec!["./real/file.ts".to_string()]);
    }

    #[test]
    fn test_free_string_dedupes() {
        let input = RawInput::FreeString("./a/b.rs appears twice: ./a/b.rs".to_string());
        let parsed = parse("*", &input).unwrap();
        assert_eq!(parsed.files, vec!["./a/b.rs".to_string()]);
    }

    #[test]
    fn test_skip_filter_extension_pattern() {
        let files = vec!["pkg/Cargo.lock".to_string(), "src/lib.rs".to_string()];
        let patterns: Vec<String> = DEFAULT_SKIP_PATTERNS.iter().map(|s| s.to_string()).collect();
        let remaining = skip_filter(files, &patterns);
        assert_eq!(remaining, vec!["src/lib.rs".to_string()]);
    }

    #[test]
    fn test_skip_filter_substring_pattern() {
        let files = vec!["node_modules/x/index.js".to_string(), "src/index.js".to_string()];
        let patterns: Vec<String> = DEFAULT_SKIP_PATTERNS.iter().map(|s| s.to_string()).collect();
        let remaining = skip_filter(files, &patterns);
        assert_eq!(remaining, vec!["src/index.js".to_string()]);
    }
}
