//! `code-intel` — priority 65, write-only (spec.md §4.5).
//!
//! Exported symbol count, caller count/spread, mapped test count, and the
//! top caller files by call count.

use std::collections::HashMap;
use std::time::Duration;

use muninn_cache::{key, Cache};
use muninn_config::config::EnricherCaps;
use muninn_core::{MuninnError, ProjectId};
use muninn_db::adapter::DatabaseAdapter;
use muninn_format::format_code_intel;

/// Everything this enricher needs about one file, cached as a single unit
/// under `codeintel:{project}:{path}`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CodeIntelSnapshot {
    pub exports: u32,
    pub callers: u32,
    pub caller_files: u32,
    pub tests: u32,
    pub top_callers: Vec<String>,
}

async fn snapshot_for(
    db: &dyn DatabaseAdapter,
    cache: &Cache<CodeIntelSnapshot>,
    ttl: Option<Duration>,
    caps: EnricherCaps,
    project: ProjectId,
    file: &str,
) -> Result<CodeIntelSnapshot, MuninnError> {
    let cache_key = key::codeintel(project, file);
    if let Some(snapshot) = cache.get(&cache_key) {
        return Ok(snapshot);
    }

    let exports = db
        .get_symbols(project, file)
        .await?
        .iter()
        .filter(|s| s.exported)
        .count() as u32;

    let callers = db.get_callers(project, file).await?;
    let mut by_file: HashMap<String, u32> = HashMap::new();
    for edge in &callers {
        *by_file.entry(edge.caller_file.clone()).or_insert(0) += 1;
    }
    let distinct_caller_files = by_file.len() as u32;
    let mut top: Vec<(String, u32)> = by_file.into_iter().collect();
    top.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let top_callers: Vec<String> = top.into_iter().take(caps.max_top_callers).map(|(f, _)| f).collect();

    let tests = db.get_test_source_map(project, file).await?.len() as u32;

    let snapshot = CodeIntelSnapshot {
        exports,
        callers: callers.len() as u32,
        caller_files: distinct_caller_files,
        tests,
        top_callers,
    };
    cache.set(&cache_key, snapshot.clone(), ttl);
    Ok(snapshot)
}

pub async fn enrich(
    db: &dyn DatabaseAdapter,
    cache: &Cache<CodeIntelSnapshot>,
    ttl: Option<Duration>,
    caps: EnricherCaps,
    project: ProjectId,
    files: &[String],
) -> Result<Option<String>, MuninnError> {
    let mut lines = Vec::new();
    for path in files {
        let snapshot = snapshot_for(db, cache, ttl, caps, project, path).await?;
        if snapshot.exports == 0 && snapshot.callers == 0 && snapshot.tests == 0 {
            continue;
        }
        lines.push(format_code_intel(
            path,
            snapshot.exports,
            snapshot.callers,
            snapshot.caller_files,
            snapshot.tests,
            &snapshot.top_callers,
        ));
    }
    Ok(if lines.is_empty() { None } else { Some(lines.join("\n")) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use muninn_db::InMemoryAdapter;

    #[tokio::test]
    async fn test_empty_snapshot_produces_no_record() {
        let db = InMemoryAdapter::new();
        let cache = Cache::new(10);
        let out = enrich(&db, &cache, None, EnricherCaps::default(), 1, &["a.ts".to_string()])
            .await
            .unwrap();
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn test_caches_snapshot_across_calls() {
        let db = InMemoryAdapter::new();
        let cache = Cache::new(10);
        enrich(&db, &cache, None, EnricherCaps::default(), 1, &["a.ts".to_string()]).await.unwrap();
        assert!(cache.has(&key::codeintel(1, "a.ts")));
    }
}
