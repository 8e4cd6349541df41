//! C6 — the enrichment pipeline (spec.md §4.6).
//!
//! `enrich()` runs: reject oversized input -> parse -> skip-filter -> run
//! applicable enrichers (blocker first, the rest concurrently, each
//! isolated so one failure never blocks the others) -> assemble -> record
//! a best-effort metric. Mirrors the teacher's `csa-hooks::guard` stance:
//! "warn and skip, never block the host tool call."

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use muninn_cache::Cache;
use muninn_config::config::MuninnConfig;
use muninn_core::{BlockLevel, MuninnError, ProjectId};
use muninn_db::adapter::DatabaseAdapter;
use muninn_db::rows::{
    BlastSummary, DecisionRow, EnrichmentMetricRow, FileCorrelationRow, FileRow, IssueRow,
};
use muninn_format::{assemble, estimate_tokens, wrap_with_header};
use muninn_parser::{parse, skip_filter, RawInput};
use tracing::warn;

use crate::enrichers::{blast_radius, blocker, code_intel, correlations, decisions, file_knowledge, issues, learnings, CodeIntelSnapshot};
use crate::enrichers::tests as tests_enricher;
use crate::registry::{EnricherName, EnricherRegistry};

/// One cache per enricher value shape, held by the caller across many
/// `enrich()` calls for the life of a session (spec.md §4.1).
pub struct EnrichCaches {
    pub files: Cache<FileRow>,
    pub blast: Cache<BlastSummary>,
    pub code_intel: Cache<CodeIntelSnapshot>,
    pub tests: Cache<Vec<String>>,
    pub issues: Cache<Vec<IssueRow>>,
    pub decisions: Cache<Vec<DecisionRow>>,
    pub correlations: Cache<Vec<FileCorrelationRow>>,
}

impl EnrichCaches {
    pub fn new(capacity: usize) -> Self {
        Self {
            files: Cache::new(capacity),
            blast: Cache::new(capacity),
            code_intel: Cache::new(capacity),
            tests: Cache::new(capacity),
            issues: Cache::new(capacity),
            decisions: Cache::new(capacity),
            correlations: Cache::new(capacity),
        }
    }

    fn combined_hits_misses(&self) -> (u64, u64) {
        let stats = [
            self.files.stats(),
            self.blast.stats(),
            self.code_intel.stats(),
            self.tests.stats(),
            self.issues.stats(),
            self.decisions.stats(),
            self.correlations.stats(),
        ];
        (stats.iter().map(|s| s.hits).sum(), stats.iter().map(|s| s.misses).sum())
    }
}

impl Default for EnrichCaches {
    fn default() -> Self {
        Self::new(muninn_cache::DEFAULT_CAPACITY)
    }
}

#[derive(Clone, Debug, Default)]
pub struct EnrichmentResult {
    /// `None` when nothing fired and the context is empty (spec.md §4.6
    /// step 7: "nothing is injected").
    pub context: Option<String>,
    pub total_tokens: usize,
    pub enrichers_used: Vec<String>,
    pub blocked: Option<BlockLevel>,
    pub operation_id: Option<String>,
}

async fn run_one(
    db: &dyn DatabaseAdapter,
    caches: &EnrichCaches,
    config: &MuninnConfig,
    name: EnricherName,
    project: ProjectId,
    files: &[String],
    at: DateTime<Utc>,
) -> Result<Option<String>, MuninnError> {
    let ttl = Some(config.cache_ttl());
    match name {
        EnricherName::Blocker => unreachable!("blocker is dispatched separately"),
        EnricherName::FileKnowledge => {
            file_knowledge::enrich(db, &caches.files, ttl, project, files).await
        }
        EnricherName::Learnings => {
            learnings::enrich(db, ttl, config.enricher_caps, project, files, at).await
        }
        EnricherName::Issues => {
            issues::enrich(db, &caches.issues, ttl, config.enricher_caps, project, files).await
        }
        EnricherName::Decisions => {
            decisions::enrich(db, &caches.decisions, ttl, config.enricher_caps, project, files).await
        }
        EnricherName::BlastRadius => {
            blast_radius::enrich(db, &caches.blast, ttl, config.blast, project, files).await
        }
        EnricherName::CodeIntel => {
            code_intel::enrich(db, &caches.code_intel, ttl, config.enricher_caps, project, files).await
        }
        EnricherName::Correlations => {
            correlations::enrich(db, &caches.correlations, ttl, config.enricher_caps, project, files).await
        }
        EnricherName::Tests => {
            tests_enricher::enrich(db, &caches.tests, ttl, config.enricher_caps, project, files).await
        }
    }
}

/// Run the full pipeline for one tool call. Returns `Err` only for
/// oversized input (spec.md §7) — every other enricher failure is caught,
/// logged, and skipped.
pub async fn enrich(
    db: &dyn DatabaseAdapter,
    caches: &EnrichCaches,
    config: &MuninnConfig,
    registry: &EnricherRegistry,
    project: ProjectId,
    tool_name: &str,
    raw_input: RawInput,
    at: DateTime<Utc>,
) -> Result<EnrichmentResult, MuninnError> {
    let started = Instant::now();
    let parsed = parse(tool_name, &raw_input)?;
    let files = skip_filter(parsed.files, &config.parser.skip_patterns);

    let (hits_before, misses_before) = caches.combined_hits_misses();
    let applicable = registry.applicable(parsed.tool);

    let mut outcome = blocker::BlockOutcome::default();
    if applicable.iter().any(|d| d.name == EnricherName::Blocker) {
        outcome = blocker::run(
            db,
            &caches.files,
            Some(config.cache_ttl()),
            config.fragility,
            project,
            parsed.tool,
            &files,
            at,
        )
        .await?;
    }

    let mut used = Vec::new();
    if outcome.level.is_some() {
        used.push(EnricherName::Blocker.as_str().to_string());
    }

    let mut records: Vec<(i32, String)> = Vec::new();
    for def in applicable.iter().filter(|d| d.name != EnricherName::Blocker) {
        match run_one(db, caches, config, def.name, project, &files, at).await {
            Ok(Some(text)) => {
                records.push((def.priority, text));
                used.push(def.name.as_str().to_string());
            }
            Ok(None) => {}
            Err(err) => {
                warn!(enricher = def.name.as_str(), error = %err, "enricher failed, skipping");
            }
        }
    }

    let body = assemble(outcome.message.clone(), records);
    let context = if body.is_empty() { None } else { Some(wrap_with_header(&body)) };
    let total_tokens = context.as_deref().map(estimate_tokens).unwrap_or(0);

    let (hits_after, misses_after) = caches.combined_hits_misses();
    record_metric(
        db,
        project,
        parsed.tool.as_str(),
        files.first().cloned(),
        started.elapsed(),
        &used,
        total_tokens,
        outcome.level.is_some(),
        (hits_after - hits_before) as u32,
        (misses_after - misses_before) as u32,
        at,
    )
    .await;

    Ok(EnrichmentResult {
        context,
        total_tokens,
        enrichers_used: used,
        blocked: outcome.level,
        operation_id: outcome.operation_id,
    })
}

#[allow(clippy::too_many_arguments)]
async fn record_metric(
    db: &dyn DatabaseAdapter,
    project: ProjectId,
    tool: &str,
    file_path: Option<String>,
    latency: Duration,
    enrichers_used: &[String],
    tokens_injected: usize,
    blocked: bool,
    cache_hits: u32,
    cache_misses: u32,
    at: DateTime<Utc>,
) {
    let metric = EnrichmentMetricRow {
        project_id: project,
        tool: tool.to_string(),
        file_path,
        latency_ms: latency.as_millis() as u64,
        enrichers_used: enrichers_used.to_vec(),
        tokens_injected: tokens_injected as u32,
        blocked,
        cache_hits,
        cache_misses,
        created_at: at,
    };
    if let Err(err) = db.record_enrichment_metric(&metric).await {
        warn!(error = %err, "failed to record enrichment metric");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use muninn_core::Temperature;
    use muninn_db::rows::{FileStatus, FileType, FragilitySignals};
    use muninn_db::InMemoryAdapter;
    use std::collections::BTreeSet;

    fn file(path: &str, fragility: u8) -> FileRow {
        FileRow {
            id: 0,
            project_id: 1,
            path: path.to_string(),
            file_type: FileType::Service,
            purpose: Some("auth".to_string()),
            fragility,
            fragility_reason: None,
            fragility_signals: FragilitySignals::default(),
            content_hash: None,
            last_analyzed: None,
            dependencies: BTreeSet::new(),
            dependents: BTreeSet::new(),
            velocity_score: 0.0,
            change_count: 0,
            temperature: Temperature::Hot,
            last_referenced_at: None,
            status: FileStatus::Active,
        }
    }

    #[tokio::test]
    async fn test_read_tool_never_invokes_blocker() {
        let db = InMemoryAdapter::new();
        db.upsert_file(&file("src/db.ts", 10)).await.unwrap();
        let caches = EnrichCaches::new(10);
        let config = MuninnConfig::default();
        let registry = EnricherRegistry::new();
        let input = RawInput::Structured(serde_json::json!({"file_path": "src/db.ts"}));
        let result = enrich(&db, &caches, &config, &registry, 1, "Read", input, Utc::now())
            .await
            .unwrap();
        assert!(result.blocked.is_none());
        assert!(result.context.unwrap().contains("F[src/db.ts"));
    }

    #[tokio::test]
    async fn test_hard_block_on_write_to_fragile_file() {
        let db = InMemoryAdapter::new();
        db.upsert_file(&file("src/db.ts", 9)).await.unwrap();
        let caches = EnrichCaches::new(10);
        let config = MuninnConfig::default();
        let registry = EnricherRegistry::new();
        let input = RawInput::Structured(serde_json::json!({"file_path": "src/db.ts"}));
        let result = enrich(&db, &caches, &config, &registry, 1, "Edit", input, Utc::now())
            .await
            .unwrap();
        assert_eq!(result.blocked, Some(BlockLevel::Hard));
        assert!(result.operation_id.is_some());
        assert!(result.context.unwrap().starts_with("## Muninn Context"));
    }

    #[tokio::test]
    async fn test_oversized_input_is_rejected() {
        let db = InMemoryAdapter::new();
        let caches = EnrichCaches::new(10);
        let config = MuninnConfig::default();
        let registry = EnricherRegistry::new();
        let huge = RawInput::FreeString("x".repeat(2 * 1024 * 1024));
        let err = enrich(&db, &caches, &config, &registry, 1, "Bash", huge, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, MuninnError::OversizedInput { .. }));
    }

    #[tokio::test]
    async fn test_no_matching_enrichers_yields_empty_context() {
        let db = InMemoryAdapter::new();
        let caches = EnrichCaches::new(10);
        let config = MuninnConfig::default();
        let registry = EnricherRegistry::new();
        let input = RawInput::Structured(serde_json::json!({"file_path": "src/unknown.ts"}));
        let result = enrich(&db, &caches, &config, &registry, 1, "Read", input, Utc::now())
            .await
            .unwrap();
        assert!(result.context.is_none());
        assert_eq!(result.total_tokens, 0);
    }

    #[tokio::test]
    async fn test_metric_recorded_best_effort() {
        let db = InMemoryAdapter::new();
        db.upsert_file(&file("src/db.ts", 2)).await.unwrap();
        let caches = EnrichCaches::new(10);
        let config = MuninnConfig::default();
        let registry = EnricherRegistry::new();
        let input = RawInput::Structured(serde_json::json!({"file_path": "src/db.ts"}));
        enrich(&db, &caches, &config, &registry, 1, "Read", input, Utc::now()).await.unwrap();
        assert_eq!(db.metrics_for(1).await.len(), 1);
    }
}
