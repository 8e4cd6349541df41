use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::merge::merge_toml_values;

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub capacity: usize,
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 1_000, ttl_secs: 300 }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub skip_patterns: Vec<String>,
    pub max_input_bytes: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            skip_patterns: muninn_parser_defaults(),
            max_input_bytes: 1024 * 1024,
        }
    }
}

fn muninn_parser_defaults() -> Vec<String> {
    ["node_modules", ".git", "dist", "build", ".next", "coverage", "*.lock"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Fragility thresholds at which the blocker enricher warns/soft-blocks/
/// hard-blocks (spec.md §4.5, §8 "defaults 7/8/9").
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FragilityThresholds {
    pub warn: u8,
    pub soft: u8,
    pub hard: u8,
}

impl Default for FragilityThresholds {
    fn default() -> Self {
        Self { warn: 7, soft: 8, hard: 9 }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EnricherCaps {
    pub max_learnings: usize,
    pub max_gotchas: usize,
    pub max_issues: usize,
    pub max_decisions: usize,
    pub max_cochangers: usize,
    pub max_tests: usize,
    pub max_top_callers: usize,
}

impl Default for EnricherCaps {
    fn default() -> Self {
        Self {
            max_learnings: 5,
            max_gotchas: 2,
            max_issues: 3,
            max_decisions: 3,
            max_cochangers: 3,
            max_tests: 3,
            max_top_callers: 3,
        }
    }
}

/// Risk-bucket boundaries for blast-radius scores (spec.md §4.8/§8: "20/50/80
/// transition risk buckets at equality (≥)").
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BlastConfig {
    pub max_depth: u32,
    pub weight_direct: u32,
    pub weight_transitive: u32,
    pub weight_tests: u32,
    pub weight_routes: u32,
    pub risk_medium: u32,
    pub risk_high: u32,
    pub risk_critical: u32,
    pub cochange_edge_threshold: u32,
}

impl Default for BlastConfig {
    fn default() -> Self {
        Self {
            max_depth: 4,
            weight_direct: 4,
            weight_transitive: 2,
            weight_tests: 5,
            weight_routes: 3,
            risk_medium: 20,
            risk_high: 50,
            risk_critical: 80,
            cochange_edge_threshold: 3,
        }
    }
}

/// Learning confidence decay rates, per day (spec.md §3: "default 0.05/day;
/// gotchas 0.02/day").
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayConfig {
    pub default_rate_per_day: f64,
    pub gotcha_rate_per_day: f64,
    pub cold_after_sessions: u32,
    pub warm_floor_sessions: u32,
    pub warm_ceiling_sessions: u32,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            default_rate_per_day: 0.05,
            gotcha_rate_per_day: 0.02,
            cold_after_sessions: 10,
            warm_floor_sessions: 3,
            warm_ceiling_sessions: 10,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchivalConfig {
    pub low_confidence_threshold: f64,
    pub low_confidence_age_days: i64,
    pub never_reinforced_confidence_threshold: f64,
    pub never_reinforced_age_days: i64,
    pub failed_decision_age_days: i64,
    pub resolved_issue_age_days: i64,
}

impl Default for ArchivalConfig {
    fn default() -> Self {
        Self {
            low_confidence_threshold: 3.0,
            low_confidence_age_days: 60,
            never_reinforced_confidence_threshold: 5.0,
            never_reinforced_age_days: 90,
            failed_decision_age_days: 90,
            resolved_issue_age_days: 90,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightConfig {
    pub sessions_since_threshold: u32,
    pub correlation_updates_threshold: u32,
    pub new_decisions_threshold: u32,
    pub cochange_count_threshold: u32,
    pub fragility_anomaly_threshold: u8,
    pub change_count_recommendation_threshold: u32,
    pub auto_dismiss_shown_count: u32,
    pub scope_creep_session_window: u32,
    pub scope_creep_files_touched_threshold: usize,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            sessions_since_threshold: 3,
            correlation_updates_threshold: 5,
            new_decisions_threshold: 2,
            cochange_count_threshold: 8,
            fragility_anomaly_threshold: 7,
            change_count_recommendation_threshold: 10,
            auto_dismiss_shown_count: 5,
            scope_creep_session_window: 20,
            scope_creep_files_touched_threshold: 5,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StartupConfig {
    pub budget_ms: u64,
    pub open_issue_attention_threshold: u32,
    pub stale_file_attention_threshold: u32,
    pub high_fragility_attention_threshold: u32,
    pub git_diff_timeout_secs: u64,
    pub update_check_cache_hours: u64,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            budget_ms: 1_500,
            open_issue_attention_threshold: 5,
            stale_file_attention_threshold: 10,
            high_fragility_attention_threshold: 5,
            git_diff_timeout_secs: 5,
            update_check_cache_hours: 6,
        }
    }
}

/// Every tunable spec.md pins as a default (SPEC_FULL.md §3), loaded from an
/// optional `muninn.toml` layered over these built-in defaults — the same
/// two-tier merge `csa-config::config` performs for its defaults/project
/// split.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MuninnConfig {
    pub cache: CacheConfig,
    pub parser: ParserConfig,
    pub fragility: FragilityThresholds,
    pub enricher_caps: EnricherCaps,
    pub blast: BlastConfig,
    pub decay: DecayConfig,
    pub archival: ArchivalConfig,
    pub insights: InsightConfig,
    pub startup: StartupConfig,
}

impl MuninnConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    pub fn startup_budget(&self) -> Duration {
        Duration::from_millis(self.startup.budget_ms)
    }

    /// Load built-in defaults, then merge in `muninn.toml` at `project_root`
    /// if present. Missing or empty overlays are not an error.
    pub fn load(project_root: &Path) -> anyhow::Result<Self> {
        let overlay_path = crate::paths::project_override_path(project_root);
        let defaults = toml::Value::try_from(Self::default())?;
        let merged = if overlay_path.exists() {
            let raw = std::fs::read_to_string(&overlay_path)
                .map_err(|e| anyhow::anyhow!("reading {}: {e}", overlay_path.display()))?;
            let overlay: toml::Value = toml::from_str(&raw)
                .map_err(|e| anyhow::anyhow!("parsing {}: {e}", overlay_path.display()))?;
            merge_toml_values(defaults, overlay)
        } else {
            defaults
        };
        merged.try_into().map_err(|e| anyhow::anyhow!("invalid config shape: {e}"))
    }
}
