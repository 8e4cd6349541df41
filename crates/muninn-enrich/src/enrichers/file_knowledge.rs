//! `file-knowledge` — priority 10, runs for every tool (spec.md §4.5).
//!
//! One `F[...]` record per known input file: fragility, type, purpose,
//! dependent count.

use std::time::Duration;

use muninn_cache::Cache;
use muninn_core::{MuninnError, ProjectId};
use muninn_db::adapter::DatabaseAdapter;
use muninn_db::rows::{FileRow, FileType};
use muninn_format::format_file;

use super::support::fetch_file;

fn file_type_str(file_type: FileType) -> &'static str {
    match file_type {
        FileType::Component => "component",
        FileType::Route => "route",
        FileType::Util => "util",
        FileType::Config => "config",
        FileType::Schema => "schema",
        FileType::Service => "service",
        FileType::Hook => "hook",
        FileType::Middleware => "middleware",
        FileType::Test => "test",
        FileType::Other => "other",
    }
}

pub async fn enrich(
    db: &dyn DatabaseAdapter,
    cache: &Cache<FileRow>,
    ttl: Option<Duration>,
    project: ProjectId,
    files: &[String],
) -> Result<Option<String>, MuninnError> {
    let mut lines = Vec::new();
    for path in files {
        let Some(row) = fetch_file(db, cache, ttl, project, path).await? else {
            continue;
        };
        lines.push(format_file(
            &row.path,
            row.fragility,
            file_type_str(row.file_type),
            row.purpose.as_deref(),
            row.dependents.len(),
        ));
    }
    Ok(if lines.is_empty() { None } else { Some(lines.join("\n")) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use muninn_db::rows::{FragilitySignals, FileStatus};
    use muninn_db::InMemoryAdapter;
    use muninn_core::Temperature;
    use std::collections::BTreeSet;

    fn row(project: ProjectId, path: &str) -> FileRow {
        FileRow {
            id: 0,
            project_id: project,
            path: path.to_string(),
            file_type: FileType::Service,
            purpose: Some("handles auth".to_string()),
            fragility: 6,
            fragility_reason: None,
            fragility_signals: FragilitySignals::default(),
            content_hash: None,
            last_analyzed: None,
            dependencies: BTreeSet::new(),
            dependents: BTreeSet::from(["a.ts".to_string(), "b.ts".to_string()]),
            velocity_score: 0.0,
            change_count: 0,
            temperature: Temperature::Hot,
            last_referenced_at: Some(Utc::now()),
            status: FileStatus::Active,
        }
    }

    #[tokio::test]
    async fn test_known_file_renders_record() {
        let db = InMemoryAdapter::new();
        db.upsert_file(&row(1, "src/auth.ts")).await.unwrap();
        let cache = Cache::new(10);
        let out = enrich(&db, &cache, None, 1, &["src/auth.ts".to_string()]).await.unwrap();
        let text = out.unwrap();
        assert!(text.starts_with("F[src/auth.ts|frag:6|type:service|purpose:handles auth|deps:2]"));
    }

    #[tokio::test]
    async fn test_unknown_file_skipped() {
        let db = InMemoryAdapter::new();
        let cache = Cache::new(10);
        let out = enrich(&db, &cache, None, 1, &["src/missing.ts".to_string()]).await.unwrap();
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn test_second_lookup_hits_cache() {
        let db = InMemoryAdapter::new();
        db.upsert_file(&row(1, "src/auth.ts")).await.unwrap();
        let cache = Cache::new(10);
        enrich(&db, &cache, None, 1, &["src/auth.ts".to_string()]).await.unwrap();
        assert!(cache.has(&muninn_cache::key::file(1, "src/auth.ts")));
        let out = enrich(&db, &cache, None, 1, &["src/auth.ts".to_string()]).await.unwrap();
        assert!(out.is_some());
    }
}
