//! `correlations` — priority 70, write-only (spec.md §4.5, §4.8).
//!
//! Top co-changing files for the touched set, split into ordinary
//! cochangers and the subset that look like test files.

use std::time::Duration;

use muninn_cache::{key, Cache};
use muninn_config::config::EnricherCaps;
use muninn_core::{MuninnError, ProjectId};
use muninn_db::adapter::DatabaseAdapter;
use muninn_db::rows::FileCorrelationRow;
use muninn_format::format_correlation;
use muninn_graph::blast::looks_like_test_path;

fn cache_key(project: ProjectId, files: &[String]) -> String {
    let mut sorted = files.to_vec();
    sorted.sort();
    key::corr(project, &sorted.join(","))
}

pub async fn enrich(
    db: &dyn DatabaseAdapter,
    cache: &Cache<Vec<FileCorrelationRow>>,
    ttl: Option<Duration>,
    caps: EnricherCaps,
    project: ProjectId,
    files: &[String],
) -> Result<Option<String>, MuninnError> {
    if files.is_empty() {
        return Ok(None);
    }
    let cache_key = cache_key(project, files);
    let rows = if let Some(cached) = cache.get(&cache_key) {
        cached
    } else {
        let fetched = db
            .top_cochangers(project, files, files, caps.max_cochangers as u32)
            .await?;
        cache.set(&cache_key, fetched.clone(), ttl);
        fetched
    };
    if rows.is_empty() {
        return Ok(None);
    }

    let mut cochangers = Vec::new();
    let mut tests = Vec::new();
    for row in &rows {
        let other = if files.contains(&row.file_a) { row.file_b.clone() } else { row.file_a.clone() };
        if looks_like_test_path(&other) {
            tests.push(other);
        } else {
            cochangers.push(other);
        }
    }

    Ok(Some(format_correlation(&cochangers, &tests)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use muninn_db::InMemoryAdapter;
    use muninn_graph::record_session_correlations;

    #[tokio::test]
    async fn test_splits_test_and_non_test_cochangers() {
        let db = InMemoryAdapter::new();
        let now = Utc::now();
        record_session_correlations(
            &db,
            1,
            &["src/auth.ts".to_string(), "src/auth.test.ts".to_string(), "src/util.ts".to_string()],
            now,
        )
        .await
        .unwrap();
        let cache = Cache::new(10);
        let out = enrich(&db, &cache, None, EnricherCaps::default(), 1, &["src/auth.ts".to_string()])
            .await
            .unwrap()
            .unwrap();
        assert!(out.contains("src/auth.test.ts"));
        assert!(out.contains("src/util.ts"));
    }

    #[tokio::test]
    async fn test_no_files_returns_none() {
        let db = InMemoryAdapter::new();
        let cache = Cache::new(10);
        let out = enrich(&db, &cache, None, EnricherCaps::default(), 1, &[]).await.unwrap();
        assert!(out.is_none());
    }
}
