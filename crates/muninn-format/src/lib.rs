//! muninn-format: the dense, attention-friendly record renderer (spec.md §4.3).
//!
//! Small, pure, heavily-unit-tested string functions — no single teacher file
//! matches this 1:1, but every `csa-hooks` string helper (`xml_escape_attr`,
//! `xml_escape_text`) follows the same shape: one function per concern, each
//! covered by a handful of table-driven tests.

pub const PURPOSE_CAP: usize = 50;
pub const TITLE_CAP: usize = 50;
pub const CONTENT_CAP: usize = 60;

const ESCAPED: [char; 4] = ['|', '[', ']', '\\'];

/// Escape `|`, `[`, `]`, `\` with a `\`-prefix so rendered records stay
/// parseable by a downstream reader splitting on those delimiters.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if ESCAPED.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Inverse of [`escape`].
pub fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Truncate to at most `cap` characters, appending `…` when truncated.
pub fn truncate(s: &str, cap: usize) -> String {
    if s.chars().count() <= cap {
        return s.to_string();
    }
    let mut out: String = s.chars().take(cap.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn field(s: &str, cap: usize) -> String {
    escape(&truncate(s, cap))
}

/// `ceil(length / 4)`, the token-budget estimator (spec.md §4.3).
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

pub fn format_file(path: &str, fragility: u8, file_type: &str, purpose: Option<&str>, deps: usize) -> String {
    format!(
        "F[{}|frag:{}|type:{}|purpose:{}|deps:{}]",
        field(path, 255),
        fragility,
        file_type,
        purpose.map(|p| field(p, PURPOSE_CAP)).unwrap_or_default(),
        deps,
    )
}

pub fn format_learning(kind: &str, entities: &[String], when: &str, do_: &str, why: &str, confidence: f64) -> String {
    format!(
        "K[{}|ent:{}|when:{}|do:{}|why:{}|conf:{}]",
        kind,
        entities.iter().map(|e| escape(e)).collect::<Vec<_>>().join(","),
        field(when, CONTENT_CAP),
        field(do_, CONTENT_CAP),
        field(why, CONTENT_CAP),
        confidence.round() as i64,
    )
}

pub fn format_decision(
    title: &str,
    choice: &str,
    alternative: Option<&str>,
    why: &str,
    confidence: f64,
    outcome_status: &str,
) -> String {
    let body = format!(
        "D[{}|choice:{}|alt:{}|why:{}|conf:{}|out:{}]",
        field(title, TITLE_CAP),
        field(choice, CONTENT_CAP),
        alternative.map(|a| field(a, CONTENT_CAP)).unwrap_or_default(),
        field(why, CONTENT_CAP),
        confidence.round() as i64,
        outcome_status,
    );
    if outcome_status == "failed" {
        format!("\u{26a0}\u{fe0f} FAILED: {body}")
    } else {
        body
    }
}

pub fn format_issue(id: i64, severity: u8, issue_type: &str, title: &str) -> String {
    format!("I[#{}|sev:{}|type:{}|{}]", id, severity, issue_type, field(title, TITLE_CAP))
}

pub fn format_blast(score: u32, direct: u32, transitive: u32, tests: u32, routes: u32, risk: &str) -> String {
    format!(
        "B[score:{score}|direct:{direct}|trans:{transitive}|tests:{tests}|routes:{routes}|risk:{risk}]"
    )
}

pub fn format_correlation(cochangers: &[String], tests: &[String]) -> String {
    format!(
        "R[cochangers:{}|tests:{}]",
        cochangers.iter().map(|f| escape(f)).collect::<Vec<_>>().join(","),
        tests.iter().map(|f| escape(f)).collect::<Vec<_>>().join(","),
    )
}

pub fn format_code_intel(
    file: &str,
    exports: u32,
    callers: u32,
    caller_files: u32,
    tests: u32,
    top: &[String],
) -> String {
    format!(
        "CI[{}|exports:{}|callers:{} in {} files|tests:{}|top:{}]",
        field(file, 255),
        exports,
        callers,
        caller_files,
        tests,
        top.iter().map(|f| escape(f)).collect::<Vec<_>>().join(","),
    )
}

pub fn format_tests(file: &str, tests: &[String]) -> String {
    format!(
        "T[{}|tests:{}]",
        field(file, 255),
        tests.iter().map(|t| escape(t)).collect::<Vec<_>>().join(","),
    )
}

pub fn format_blocked(reason: &str) -> String {
    format!("!BLOCKED: {reason}")
}

pub fn format_approval_required(operation_id: &str) -> String {
    format!("!APPROVAL REQUIRED: To proceed: muninn approve {operation_id}")
}

pub fn format_warning(message: &str) -> String {
    format!("!WARNING: {message}")
}

/// Assemble a final context block from a block message and priority-ordered
/// enricher outputs (spec.md §4.6 step 5).
pub fn assemble(block_message: Option<String>, mut records: Vec<(i32, String)>) -> String {
    records.sort_by_key(|(priority, _)| *priority);
    let mut lines: Vec<String> = Vec::new();
    if let Some(block) = block_message {
        lines.push(block);
    }
    lines.extend(records.into_iter().map(|(_, r)| r));
    lines.join("\n")
}

pub const CONTEXT_HEADER: &str = "## Muninn Context (auto-injected)";

/// Wrap an assembled, non-empty context body with the injection header
/// (spec.md §4.6 step 7).
pub fn wrap_with_header(body: &str) -> String {
    format!("{CONTEXT_HEADER}\n{body}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_unescape_roundtrip() {
        let original = "a|b[c]d\\e";
        let escaped = escape(original);
        assert_eq!(escaped, "a\\|b\\[c\\]d\\\\e");
        assert_eq!(unescape(&escaped), original);
    }

    #[test]
    fn test_escape_leaves_plain_text_untouched() {
        assert_eq!(escape("plain text"), "plain text");
    }

    #[test]
    fn test_truncate_under_cap_unchanged() {
        assert_eq!(truncate("short", 50), "short");
    }

    #[test]
    fn test_truncate_over_cap_appends_ellipsis() {
        let truncated = truncate(&"x".repeat(60), 50);
        assert_eq!(truncated.chars().count(), 50);
        assert!(truncated.ends_with('…'));
    }

    #[test]
    fn test_estimate_tokens_rounds_up() {
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn test_format_file_shape() {
        let rendered = format_file("src/lib.rs", 70, "util", Some("entry point"), 3);
        assert_eq!(rendered, "F[src/lib.rs|frag:70|type:util|purpose:entry point|deps:3]");
    }

    #[test]
    fn test_format_decision_failed_gets_warning_prefix() {
        let rendered = format_decision("Use SQLite", "sqlx", None, "simplicity", 0.8, "failed");
        assert!(rendered.starts_with("\u{26a0}\u{fe0f} FAILED: D["));
    }

    #[test]
    fn test_format_decision_non_failed_has_no_prefix() {
        let rendered = format_decision("Use SQLite", "sqlx", None, "simplicity", 0.8, "succeeded");
        assert!(rendered.starts_with("D["));
    }

    #[test]
    fn test_format_issue_shape() {
        assert_eq!(format_issue(42, 80, "bug", "null deref"), "I[#42|sev:80|type:bug|null deref]");
    }

    #[test]
    fn test_format_blast_shape() {
        let rendered = format_blast(85, 5, 15, 3, 1, "critical");
        assert_eq!(rendered, "B[score:85|direct:5|trans:15|tests:3|routes:1|risk:critical]");
    }

    #[test]
    fn test_assemble_sorts_by_priority_and_prepends_block() {
        let assembled = assemble(
            Some("!BLOCKED: fragile file".to_string()),
            vec![(60, "B[...]".to_string()), (10, "F[...]".to_string())],
        );
        assert_eq!(assembled, "!BLOCKED: fragile file\nF[...]\nB[...]");
    }

    #[test]
    fn test_wrap_with_header() {
        let wrapped = wrap_with_header("F[...]");
        assert!(wrapped.starts_with(CONTEXT_HEADER));
    }

    #[test]
    fn test_format_tests_shape() {
        let rendered = format_tests("src/auth.ts", &["src/auth.test.ts".to_string()]);
        assert_eq!(rendered, "T[src/auth.ts|tests:src/auth.test.ts]");
    }

    #[test]
    fn test_format_approval_required_contains_command() {
        let msg = format_approval_required("op_abc123");
        assert!(msg.contains("muninn approve op_abc123"));
    }
}
