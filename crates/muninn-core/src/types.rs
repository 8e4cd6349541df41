use serde::{Deserialize, Serialize};

/// Project scoping key. `None` means a global (cross-project) entity.
pub type ProjectId = i64;

/// Tool invoking the enrichment pipeline. Normalized from whatever the
/// hook's `tool_name` field contains; unrecognized names collapse to
/// `Wildcard` so enrichers registered for `*` still fire (spec.md §4.2).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tool {
    Read,
    Edit,
    Write,
    Bash,
    Glob,
    Grep,
    /// Matches any `supported_tools` set that contains `*`.
    Wildcard,
}

impl Tool {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "Read",
            Self::Edit => "Edit",
            Self::Write => "Write",
            Self::Bash => "Bash",
            Self::Glob => "Glob",
            Self::Grep => "Grep",
            Self::Wildcard => "*",
        }
    }

    /// Normalize an arbitrary tool-hook name. Unknown names still need to
    /// reach enrichers registered for `*`, so they are not rejected — they
    /// just don't match any tool-specific filter. See spec.md §4.2.
    pub fn normalize(raw: &str) -> Tool {
        match raw {
            "Read" => Tool::Read,
            "Edit" => Tool::Edit,
            "Write" => Tool::Write,
            "Bash" => Tool::Bash,
            "Glob" => Tool::Glob,
            "Grep" => Tool::Grep,
            _ => Tool::Wildcard,
        }
    }

    /// True if this tool can mutate file content (gates C5's write-only
    /// enrichers: blocker, blast-radius, code-intel, correlations, tests).
    pub fn is_write_like(&self) -> bool {
        matches!(self, Tool::Edit | Tool::Write)
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recency class driving enrichment priority and archival eligibility.
/// Ordered hot < warm < cold is intentional: it is the sort key enrichers
/// use when two items otherwise tie (spec.md §4.5 "Effective confidence").
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Temperature {
    Hot,
    Warm,
    Cold,
}

impl Temperature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hot => "hot",
            Self::Warm => "warm",
            Self::Cold => "cold",
        }
    }
}

impl std::fmt::Display for Temperature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Temperature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hot" => Ok(Self::Hot),
            "warm" => Ok(Self::Warm),
            "cold" => Ok(Self::Cold),
            other => Err(format!("invalid temperature '{other}'")),
        }
    }
}

/// Risk bucket shared by the blocker (fragility) and blast-radius enrichers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        write!(f, "{s}")
    }
}

/// Blocker severity levels from spec.md §4.5/§4.6.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockLevel {
    Warn,
    Soft,
    Hard,
}

impl std::fmt::Display for BlockLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Warn => "warn",
            Self::Soft => "soft",
            Self::Hard => "hard",
        };
        write!(f, "{s}")
    }
}
