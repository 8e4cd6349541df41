//! C4 — the enricher registry (spec.md §4.4).
//!
//! Enrichers themselves are pure functions living in [`crate::enrichers`];
//! this module only holds the *metadata* that decides which of them apply to
//! a given tool call, and in what order. Mirrors the teacher's
//! `csa-hooks::config` merge-over-defaults shape, generalized from one
//! config struct per hook event to one per enricher.

use muninn_core::Tool;

/// One of the nine enrichers named in spec.md §4.5, in their fixed priority
/// order. The variant order here is cosmetic; `priority()` is what actually
/// governs assembly order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnricherName {
    FileKnowledge,
    Blocker,
    Learnings,
    Issues,
    Decisions,
    BlastRadius,
    CodeIntel,
    Correlations,
    Tests,
}

impl EnricherName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FileKnowledge => "file-knowledge",
            Self::Blocker => "blocker",
            Self::Learnings => "learnings",
            Self::Issues => "issues",
            Self::Decisions => "decisions",
            Self::BlastRadius => "blast-radius",
            Self::CodeIntel => "code-intel",
            Self::Correlations => "correlations",
            Self::Tests => "tests",
        }
    }

    /// Fixed default priority (spec.md §4.5 table). Lower runs/sorts first.
    pub fn default_priority(&self) -> i32 {
        match self {
            Self::FileKnowledge => 10,
            Self::Blocker => 20,
            Self::Learnings => 30,
            Self::Issues => 40,
            Self::Decisions => 50,
            Self::BlastRadius => 60,
            Self::CodeIntel => 65,
            Self::Correlations => 70,
            Self::Tests => 80,
        }
    }

    /// Tools this enricher is registered for by default (spec.md §4.5
    /// table's "Tools" column). `file-knowledge`/`learnings`/`issues`/
    /// `decisions` run for every tool (`*`); the rest are write-only.
    pub fn default_tools(&self) -> &'static [Tool] {
        match self {
            Self::FileKnowledge | Self::Learnings | Self::Issues | Self::Decisions => &[],
            Self::Blocker
            | Self::BlastRadius
            | Self::CodeIntel
            | Self::Correlations
            | Self::Tests => &[Tool::Edit, Tool::Write],
        }
    }

    fn supports_wildcard(&self) -> bool {
        self.default_tools().is_empty()
    }
}

/// Registration record. `can_enrich` is evaluated with the already-parsed
/// file list available, so it can reject e.g. an empty input without the
/// enricher body itself needing to repeat that check.
#[derive(Clone, Debug)]
pub struct EnricherDef {
    pub name: EnricherName,
    pub priority: i32,
    pub supported_tools: Vec<Tool>,
    /// `true` if this enricher is also registered for `*` (any tool).
    pub wildcard: bool,
    pub token_budget: usize,
    pub enabled: bool,
}

impl EnricherDef {
    fn defaults(name: EnricherName, token_budget: usize) -> Self {
        Self {
            priority: name.default_priority(),
            supported_tools: name.default_tools().to_vec(),
            wildcard: name.supports_wildcard(),
            token_budget,
            enabled: true,
            name,
        }
    }

    pub fn supports(&self, tool: Tool) -> bool {
        self.wildcard || tool == Tool::Wildcard || self.supported_tools.contains(&tool)
    }
}

/// A registration override merged in at registry construction (spec.md
/// §4.4: "Configuration overrides (enabled, priority, budget) are merged at
/// registration").
#[derive(Clone, Copy, Debug, Default)]
pub struct EnricherOverride {
    pub enabled: Option<bool>,
    pub priority: Option<i32>,
    pub token_budget: Option<usize>,
}

pub struct EnricherRegistry {
    defs: Vec<EnricherDef>,
}

const ALL_NAMES: [EnricherName; 9] = [
    EnricherName::FileKnowledge,
    EnricherName::Blocker,
    EnricherName::Learnings,
    EnricherName::Issues,
    EnricherName::Decisions,
    EnricherName::BlastRadius,
    EnricherName::CodeIntel,
    EnricherName::Correlations,
    EnricherName::Tests,
];

impl EnricherRegistry {
    /// Build the registry with the nine built-in enrichers at their default
    /// priority/tools/budget, with no overrides applied.
    pub fn new() -> Self {
        Self::with_overrides(&[])
    }

    /// Build the registry, applying `overrides` by `EnricherName` match.
    pub fn with_overrides(overrides: &[(EnricherName, EnricherOverride)]) -> Self {
        let mut defs: Vec<EnricherDef> =
            ALL_NAMES.iter().map(|n| EnricherDef::defaults(*n, 400)).collect();
        for (name, over) in overrides {
            if let Some(def) = defs.iter_mut().find(|d| d.name == *name) {
                if let Some(e) = over.enabled {
                    def.enabled = e;
                }
                if let Some(p) = over.priority {
                    def.priority = p;
                }
                if let Some(b) = over.token_budget {
                    def.token_budget = b;
                }
            }
        }
        Self { defs }
    }

    /// Enabled enrichers applicable to `tool`, sorted ascending by priority
    /// (spec.md §4.4 `get_applicable`).
    pub fn applicable(&self, tool: Tool) -> Vec<EnricherDef> {
        let mut applicable: Vec<EnricherDef> =
            self.defs.iter().filter(|d| d.enabled && d.supports(tool)).cloned().collect();
        applicable.sort_by_key(|d| d.priority);
        applicable
    }
}

impl Default for EnricherRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_sorted_by_priority() {
        let registry = EnricherRegistry::new();
        let applicable = registry.applicable(Tool::Edit);
        let priorities: Vec<i32> = applicable.iter().map(|d| d.priority).collect();
        let mut sorted = priorities.clone();
        sorted.sort();
        assert_eq!(priorities, sorted);
    }

    #[test]
    fn test_read_only_excludes_write_enrichers() {
        let registry = EnricherRegistry::new();
        let applicable = registry.applicable(Tool::Read);
        assert!(!applicable.iter().any(|d| d.name == EnricherName::Blocker));
        assert!(applicable.iter().any(|d| d.name == EnricherName::FileKnowledge));
    }

    #[test]
    fn test_edit_includes_write_only_enrichers() {
        let registry = EnricherRegistry::new();
        let applicable = registry.applicable(Tool::Edit);
        assert!(applicable.iter().any(|d| d.name == EnricherName::Blocker));
        assert!(applicable.iter().any(|d| d.name == EnricherName::Tests));
    }

    #[test]
    fn test_disabled_override_removes_enricher() {
        let registry = EnricherRegistry::with_overrides(&[(
            EnricherName::Tests,
            EnricherOverride { enabled: Some(false), ..Default::default() },
        )]);
        let applicable = registry.applicable(Tool::Edit);
        assert!(!applicable.iter().any(|d| d.name == EnricherName::Tests));
    }

    #[test]
    fn test_priority_override_reorders() {
        let registry = EnricherRegistry::with_overrides(&[(
            EnricherName::Tests,
            EnricherOverride { priority: Some(1), ..Default::default() },
        )]);
        let applicable = registry.applicable(Tool::Edit);
        assert_eq!(applicable.first().unwrap().name, EnricherName::Tests);
    }

    #[test]
    fn test_wildcard_tool_matches_every_enricher() {
        let registry = EnricherRegistry::new();
        let applicable = registry.applicable(Tool::Wildcard);
        assert_eq!(applicable.len(), 9);
    }
}
