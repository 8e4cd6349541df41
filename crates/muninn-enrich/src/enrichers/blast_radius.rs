//! `blast-radius` — priority 60, write-only (spec.md §4.5, §4.8).
//!
//! Prefers a materialized `BlastSummary` row when one exists; otherwise
//! walks the live dependency graph via [`muninn_graph::compute_blast_radius`]
//! and scores the closure itself. Either path is cached under
//! `blast:{project}:{path}`.

use std::time::Duration;

use muninn_cache::{key, Cache};
use muninn_config::config::BlastConfig;
use muninn_core::{MuninnError, ProjectId};
use muninn_db::adapter::DatabaseAdapter;
use muninn_db::rows::BlastSummary;
use muninn_format::format_blast;
use muninn_graph::{compute_blast_radius, risk_bucket, score_blast_radius};

async fn summary_for(
    db: &dyn DatabaseAdapter,
    cache: &Cache<BlastSummary>,
    ttl: Option<Duration>,
    config: BlastConfig,
    project: ProjectId,
    file: &str,
) -> Result<BlastSummary, MuninnError> {
    let cache_key = key::blast(project, file);
    if let Some(summary) = cache.get(&cache_key) {
        return Ok(summary);
    }
    if let Some(summary) = db.get_blast_summary(project, file).await? {
        cache.set(&cache_key, summary, ttl);
        return Ok(summary);
    }
    let closure = compute_blast_radius(db, project, file, config.max_depth).await?;
    let score = score_blast_radius(
        closure.direct_count(),
        closure.transitive_count(),
        closure.test_count(),
        closure.route_count(),
    );
    let summary = BlastSummary {
        blast_score: score,
        direct_dependents: closure.direct_count(),
        transitive_dependents: closure.transitive_count(),
        affected_tests: closure.test_count(),
        affected_routes: closure.route_count(),
    };
    cache.set(&cache_key, summary, ttl);
    Ok(summary)
}

pub async fn enrich(
    db: &dyn DatabaseAdapter,
    cache: &Cache<BlastSummary>,
    ttl: Option<Duration>,
    config: BlastConfig,
    project: ProjectId,
    files: &[String],
) -> Result<Option<String>, MuninnError> {
    let mut lines = Vec::new();
    for path in files {
        let summary = summary_for(db, cache, ttl, config, project, path).await?;
        if summary.blast_score == 0 {
            continue;
        }
        lines.push(format_blast(
            summary.blast_score,
            summary.direct_dependents,
            summary.transitive_dependents,
            summary.affected_tests,
            summary.affected_routes,
            &risk_bucket(summary.blast_score).to_string(),
        ));
    }
    Ok(if lines.is_empty() { None } else { Some(lines.join("\n")) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use muninn_core::Temperature;
    use muninn_db::rows::{FileStatus, FileType, FragilitySignals, FileRow};
    use muninn_db::InMemoryAdapter;
    use std::collections::BTreeSet;

    fn file(path: &str, dependents: &[&str]) -> FileRow {
        FileRow {
            id: 0,
            project_id: 1,
            path: path.to_string(),
            file_type: FileType::Util,
            purpose: None,
            fragility: 0,
            fragility_reason: None,
            fragility_signals: FragilitySignals::default(),
            content_hash: None,
            last_analyzed: None,
            dependencies: BTreeSet::new(),
            dependents: dependents.iter().map(|s| s.to_string()).collect(),
            velocity_score: 0.0,
            change_count: 0,
            temperature: Temperature::Hot,
            last_referenced_at: None,
            status: FileStatus::Active,
        }
    }

    #[tokio::test]
    async fn test_computes_and_caches_live_closure() {
        let db = InMemoryAdapter::new();
        db.upsert_file(&file("a.ts", &["b.ts", "c.ts"])).await.unwrap();
        let cache = Cache::new(10);
        let out = enrich(&db, &cache, None, BlastConfig::default(), 1, &["a.ts".to_string()])
            .await
            .unwrap()
            .unwrap();
        assert!(out.starts_with("B["));
        assert!(cache.has(&key::blast(1, "a.ts")));
    }

    #[tokio::test]
    async fn test_isolated_file_produces_no_record() {
        let db = InMemoryAdapter::new();
        db.upsert_file(&file("lonely.ts", &[])).await.unwrap();
        let cache = Cache::new(10);
        let out = enrich(&db, &cache, None, BlastConfig::default(), 1, &["lonely.ts".to_string()])
            .await
            .unwrap();
        assert!(out.is_none());
    }
}
