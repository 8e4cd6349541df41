//! `issues` — priority 40, runs for every tool (spec.md §4.5).
//!
//! Open issues touching any input file, capped at `max_issues`, highest
//! severity first.

use std::time::Duration;

use muninn_cache::{key, Cache};
use muninn_config::config::EnricherCaps;
use muninn_core::{MuninnError, ProjectId};
use muninn_db::adapter::DatabaseAdapter;
use muninn_db::rows::IssueRow;
use muninn_format::format_issue;

fn issue_type_str(issue_type: muninn_db::rows::IssueType) -> &'static str {
    use muninn_db::rows::IssueType::*;
    match issue_type {
        Bug => "bug",
        TechDebt => "tech-debt",
        Enhancement => "enhancement",
        Question => "question",
        Potential => "potential",
    }
}

fn cache_key(project: ProjectId, files: &[String]) -> String {
    let mut sorted = files.to_vec();
    sorted.sort();
    key::issue(project, &sorted.join(","))
}

pub async fn enrich(
    db: &dyn DatabaseAdapter,
    cache: &Cache<Vec<IssueRow>>,
    ttl: Option<Duration>,
    caps: EnricherCaps,
    project: ProjectId,
    files: &[String],
) -> Result<Option<String>, MuninnError> {
    if files.is_empty() {
        return Ok(None);
    }
    let cache_key = cache_key(project, files);
    let mut issues = if let Some(cached) = cache.get(&cache_key) {
        cached
    } else {
        let fetched = db.open_issues_for_files(project, files, caps.max_issues as u32).await?;
        cache.set(&cache_key, fetched.clone(), ttl);
        fetched
    };
    issues.sort_by(|a, b| b.severity.cmp(&a.severity));
    issues.truncate(caps.max_issues);
    if issues.is_empty() {
        return Ok(None);
    }
    let lines: Vec<String> = issues
        .iter()
        .map(|i| format_issue(i.id, i.severity, issue_type_str(i.issue_type), &i.title))
        .collect();
    Ok(Some(lines.join("\n")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use muninn_core::Temperature;
    use muninn_db::rows::{IssueRow, IssueStatus, IssueType};
    use muninn_db::InMemoryAdapter;

    fn issue(title: &str, severity: u8, files: &[&str]) -> IssueRow {
        IssueRow {
            id: 0,
            project_id: 1,
            issue_type: IssueType::Bug,
            title: title.to_string(),
            severity,
            status: IssueStatus::Open,
            affected_files: files.iter().map(|s| s.to_string()).collect(),
            related_symbols: Vec::new(),
            resolved_at: None,
            updated_at: Utc::now(),
            temperature: Temperature::Hot,
            last_referenced_at: None,
        }
    }

    #[tokio::test]
    async fn test_sorted_by_severity_descending() {
        let db = InMemoryAdapter::new();
        db.insert_issue(&issue("low", 3, &["a.ts"])).await.unwrap();
        db.insert_issue(&issue("high", 9, &["a.ts"])).await.unwrap();
        let cache = Cache::new(10);
        let out = enrich(&db, &cache, None, EnricherCaps::default(), 1, &["a.ts".to_string()])
            .await
            .unwrap()
            .unwrap();
        assert!(out.find("high").unwrap() < out.find("low").unwrap());
    }

    #[tokio::test]
    async fn test_no_files_returns_none() {
        let db = InMemoryAdapter::new();
        let cache = Cache::new(10);
        let out = enrich(&db, &cache, None, EnricherCaps::default(), 1, &[]).await.unwrap();
        assert!(out.is_none());
    }
}
