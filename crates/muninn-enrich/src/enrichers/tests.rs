//! `tests` — priority 80, write-only (spec.md §4.5).
//!
//! Resolves each source file's test files: first the materialized
//! `test_source_map` table, then a stored `file →tests→ file` relationship
//! edge, then a path heuristic over its dependents. Top `max_tests`.

use std::time::Duration;

use muninn_cache::{key, Cache};
use muninn_config::config::EnricherCaps;
use muninn_core::{MuninnError, ProjectId};
use muninn_db::adapter::DatabaseAdapter;
use muninn_format::format_tests;
use muninn_graph::blast::looks_like_test_path;

async fn tests_for(
    db: &dyn DatabaseAdapter,
    cache: &Cache<Vec<String>>,
    ttl: Option<Duration>,
    caps: EnricherCaps,
    project: ProjectId,
    file: &str,
) -> Result<Vec<String>, MuninnError> {
    let cache_key = key::test(project, file);
    if let Some(found) = cache.get(&cache_key) {
        return Ok(found);
    }

    let mapped = db.get_test_source_map(project, file).await?;
    let mut found: Vec<String> = mapped.into_iter().map(|m| m.test_file).collect();

    if found.is_empty() {
        found = db.test_relationship_targets(project, file).await?;
    }

    if found.is_empty() {
        found = db
            .file_dependents(project, file)
            .await?
            .into_iter()
            .filter(|d| looks_like_test_path(d))
            .collect();
    }

    found.truncate(caps.max_tests);
    cache.set(&cache_key, found.clone(), ttl);
    Ok(found)
}

pub async fn enrich(
    db: &dyn DatabaseAdapter,
    cache: &Cache<Vec<String>>,
    ttl: Option<Duration>,
    caps: EnricherCaps,
    project: ProjectId,
    files: &[String],
) -> Result<Option<String>, MuninnError> {
    let mut lines = Vec::new();
    for path in files {
        let found = tests_for(db, cache, ttl, caps, project, path).await?;
        if found.is_empty() {
            continue;
        }
        lines.push(format_tests(path, &found));
    }
    Ok(if lines.is_empty() { None } else { Some(lines.join("\n")) })
}

#[cfg(test)]
mod tests_mod {
    use super::*;
    use muninn_core::Temperature;
    use muninn_db::rows::{FileRow, FileStatus, FileType, FragilitySignals};
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
    async fn test_heuristic_fallback_when_no_mapping_or_edge() {
        let db = InMemoryAdapter::new();
        db.upsert_file(&file("src/auth.ts", &["src/auth.test.ts", "src/other.ts"])).await.unwrap();
        let cache = Cache::new(10);
        let out = enrich(&db, &cache, None, EnricherCaps::default(), 1, &["src/auth.ts".to_string()])
            .await
            .unwrap()
            .unwrap();
        assert!(out.contains("src/auth.test.ts"));
        assert!(!out.contains("src/other.ts"));
    }

    #[tokio::test]
    async fn test_no_dependents_yields_none() {
        let db = InMemoryAdapter::new();
        db.upsert_file(&file("src/lonely.ts", &[])).await.unwrap();
        let cache = Cache::new(10);
        let out = enrich(&db, &cache, None, EnricherCaps::default(), 1, &["src/lonely.ts".to_string()])
            .await
            .unwrap();
        assert!(out.is_none());
    }
}
