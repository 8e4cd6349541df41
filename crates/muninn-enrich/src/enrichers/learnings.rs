//! `learnings` — priority 30, runs for every tool (spec.md §4.5).
//!
//! Search terms are derived from path segments (len >= 3) and basenames.
//! FTS is tried first; a query error falls back to a LIKE search (spec.md
//! §7 "FTS unavailable"). Up to two gotcha learnings are always reserved a
//! slot; the remainder is filled by temperature (hot first), tie-broken by
//! effective confidence, capped at `max_learnings`.

use std::collections::{BTreeSet, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use muninn_config::config::EnricherCaps;
use muninn_core::{days_since, MuninnError, ProjectId};
use muninn_db::adapter::DatabaseAdapter;
use muninn_db::rows::LearningRow;
use muninn_format::format_learning;
use tracing::warn;

fn search_terms(files: &[String]) -> Vec<String> {
    let mut terms: BTreeSet<String> = BTreeSet::new();
    for path in files {
        let basename = path.rsplit('/').next().unwrap_or(path);
        if basename.len() >= 3 {
            terms.insert(basename.to_lowercase());
        }
        for segment in path.split(['/', '.', '_', '-']) {
            if segment.len() >= 3 {
                terms.insert(segment.to_lowercase());
            }
        }
    }
    terms.into_iter().collect()
}

fn effective_confidence(learning: &LearningRow, at: DateTime<Utc>) -> f64 {
    let since = learning.last_reinforced_at.unwrap_or(learning.created_at);
    let days = days_since(since, at);
    learning.confidence * (-learning.decay_rate * days).exp()
}

fn sort_by_temperature_then_confidence(rows: &mut [LearningRow], at: DateTime<Utc>) {
    rows.sort_by(|a, b| {
        a.temperature.cmp(&b.temperature).then(
            effective_confidence(b, at)
                .partial_cmp(&effective_confidence(a, at))
                .unwrap_or(std::cmp::Ordering::Equal),
        )
    });
}

async fn search(
    db: &dyn DatabaseAdapter,
    project: ProjectId,
    term: &str,
    limit: u32,
) -> Vec<LearningRow> {
    match db.search_learnings_fts(Some(project), term, limit).await {
        Ok(rows) => rows,
        Err(err) => {
            warn!(term, error = %err, "learnings FTS query failed, falling back to LIKE");
            db.search_learnings_like(Some(project), term, limit)
                .await
                .unwrap_or_default()
        }
    }
}

fn category_str(category: muninn_db::rows::LearningCategory) -> &'static str {
    use muninn_db::rows::LearningCategory::*;
    match category {
        Pattern => "pattern",
        Gotcha => "gotcha",
        Preference => "preference",
        Convention => "convention",
        Architecture => "architecture",
    }
}

fn render(learning: &LearningRow, files: &[String]) -> String {
    format_learning(
        category_str(learning.category),
        files,
        learning.context.as_deref().unwrap_or("any"),
        &learning.content,
        &learning.title,
        learning.confidence,
    )
}

pub async fn enrich(
    db: &dyn DatabaseAdapter,
    _ttl: Option<Duration>,
    caps: EnricherCaps,
    project: ProjectId,
    files: &[String],
    at: DateTime<Utc>,
) -> Result<Option<String>, MuninnError> {
    let mut gotchas = db
        .gotcha_learnings(Some(project), caps.max_gotchas as u32)
        .await?;
    gotchas.truncate(caps.max_gotchas);
    let gotcha_ids: HashSet<i64> = gotchas.iter().map(|l| l.id).collect();

    let mut candidates: Vec<LearningRow> = Vec::new();
    for term in search_terms(files) {
        candidates.extend(search(db, project, &term, 10).await);
    }
    let mut seen: HashSet<i64> = HashSet::new();
    candidates.retain(|l| seen.insert(l.id) && !gotcha_ids.contains(&l.id));

    sort_by_temperature_then_confidence(&mut candidates, at);
    let remaining_slots = caps.max_learnings.saturating_sub(gotchas.len());
    candidates.truncate(remaining_slots);

    let mut combined = candidates;
    combined.extend(gotchas);
    sort_by_temperature_then_confidence(&mut combined, at);
    combined.truncate(caps.max_learnings);

    if combined.is_empty() {
        return Ok(None);
    }
    let lines: Vec<String> = combined.iter().map(|l| render(l, files)).collect();
    Ok(Some(lines.join("\n")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use muninn_core::Temperature;
    use muninn_db::rows::{LearningCategory, PromotionStatus, ReviewStatus};
    use muninn_db::InMemoryAdapter;

    fn learning(title: &str, category: LearningCategory, confidence: f64, temperature: Temperature, at: DateTime<Utc>) -> LearningRow {
        LearningRow {
            id: 0,
            project_id: Some(1),
            category,
            title: title.to_string(),
            content: format!("{title} content"),
            context: Some("auth flow".to_string()),
            confidence,
            times_applied: 0,
            times_confirmed: 0,
            last_reinforced_at: None,
            last_applied: None,
            decay_rate: 0.05,
            temperature,
            review_status: ReviewStatus::Pending,
            sessions_since_review: 0,
            review_after_sessions: 30,
            foundational: false,
            promotion_status: PromotionStatus::NotReady,
            archived_at: None,
            auto_reinforcement_count: 0,
            created_at: at,
            updated_at: at,
            last_referenced_at: None,
        }
    }

    #[tokio::test]
    async fn test_matches_by_path_segment() {
        let db = InMemoryAdapter::new();
        let at = Utc::now();
        db.insert_learning(&learning("auth pattern", LearningCategory::Pattern, 8.0, Temperature::Hot, at))
            .await
            .unwrap();
        let out = enrich(&db, None, EnricherCaps::default(), 1, &["src/auth.ts".to_string()], at)
            .await
            .unwrap();
        assert!(out.unwrap().contains("auth pattern"));
    }

    #[tokio::test]
    async fn test_gotchas_always_included() {
        let db = InMemoryAdapter::new();
        let at = Utc::now();
        db.insert_learning(&learning("watch out", LearningCategory::Gotcha, 6.0, Temperature::Cold, at))
            .await
            .unwrap();
        for i in 0..6 {
            db.insert_learning(&learning(
                &format!("auth rule {i}"),
                LearningCategory::Pattern,
                9.0,
                Temperature::Hot,
                at,
            ))
            .await
            .unwrap();
        }
        let out = enrich(&db, None, EnricherCaps::default(), 1, &["src/auth.ts".to_string()], at)
            .await
            .unwrap()
            .unwrap();
        assert!(out.contains("watch out"));
    }

    #[tokio::test]
    async fn test_no_match_returns_none() {
        let db = InMemoryAdapter::new();
        let out = enrich(&db, None, EnricherCaps::default(), 1, &["src/unrelated.ts".to_string()], Utc::now())
            .await
            .unwrap();
        assert!(out.is_none());
    }
}
