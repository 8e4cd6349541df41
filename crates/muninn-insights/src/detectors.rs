//! The five insight detectors (spec.md §4.10). Each returns draft rows
//! (`id=0`, `status=New`, `shown_count=0`) the caller upserts by
//! `(project, title)`.

use chrono::{DateTime, Utc};
use muninn_config::config::InsightConfig;
use muninn_core::{MuninnError, ProjectId};
use muninn_db::adapter::DatabaseAdapter;
use muninn_db::rows::{InsightRow, InsightStatus, InsightType, OutcomeStatus};

fn draft(
    project: ProjectId,
    title: impl Into<String>,
    insight_type: InsightType,
    content: impl Into<String>,
    evidence: Vec<String>,
    confidence: f64,
    at: DateTime<Utc>,
) -> InsightRow {
    InsightRow {
        id: 0,
        project_id: project,
        title: title.into(),
        insight_type,
        content: content.into(),
        evidence,
        confidence,
        status: InsightStatus::New,
        shown_count: 0,
        created_at: at,
    }
}

fn dirname(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Co-change pairs with `cochange_count≥threshold` in different directories.
pub async fn detect_cochange(
    db: &dyn DatabaseAdapter,
    project: ProjectId,
    config: &InsightConfig,
    at: DateTime<Utc>,
) -> Result<Vec<InsightRow>, MuninnError> {
    let pairs = db.correlations_above(project, config.cochange_count_threshold).await?;
    Ok(pairs
        .into_iter()
        .filter(|p| dirname(&p.file_a) != dirname(&p.file_b))
        .map(|p| {
            let confidence = (0.5 + 0.05 * p.cochange_count as f64).min(0.9);
            draft(
                project,
                format!("Frequent co-change: {} & {}", p.file_a, p.file_b),
                InsightType::Correlation,
                format!(
                    "{} and {} changed together {} times across directories",
                    p.file_a, p.file_b, p.cochange_count
                ),
                vec![p.file_a.clone(), p.file_b.clone()],
                confidence,
                at,
            )
        })
        .collect())
}

/// Files with `velocity_score>0.5`: high fragility is an anomaly, a merely
/// high change count is a recommendation to watch the file.
pub async fn detect_fragility_trends(
    db: &dyn DatabaseAdapter,
    project: ProjectId,
    config: &InsightConfig,
    at: DateTime<Utc>,
) -> Result<Vec<InsightRow>, MuninnError> {
    let files = db.files_with_velocity_above(project, 0.5).await?;
    let mut out = Vec::new();
    for file in files {
        if file.fragility >= config.fragility_anomaly_threshold {
            out.push(draft(
                project,
                format!("Fragility trending up: {}", file.path),
                InsightType::Anomaly,
                format!(
                    "{} has fragility {} with velocity {:.2} — churn is concentrating on an already-fragile file",
                    file.path, file.fragility, file.velocity_score
                ),
                vec![file.path.clone()],
                0.8,
                at,
            ));
        } else if file.change_count >= config.change_count_recommendation_threshold {
            out.push(draft(
                project,
                format!("High-churn file: {}", file.path),
                InsightType::Recommendation,
                format!(
                    "{} has changed {} times with velocity {:.2} — consider stabilizing before it becomes fragile",
                    file.path, file.change_count, file.velocity_score
                ),
                vec![file.path.clone()],
                0.6,
                at,
            ));
        }
    }
    Ok(out)
}

/// ≥3 reviewed decisions: a high failure rate or a strong track record.
pub async fn detect_decision_outcomes(
    db: &dyn DatabaseAdapter,
    project: ProjectId,
    at: DateTime<Utc>,
) -> Result<Vec<InsightRow>, MuninnError> {
    let reviewed = db.reviewed_decisions(project).await?;
    if reviewed.len() < 3 {
        return Ok(Vec::new());
    }
    let total = reviewed.len() as f64;
    let failed = reviewed.iter().filter(|d| d.outcome_status == OutcomeStatus::Failed).count();
    let succeeded = reviewed.iter().filter(|d| d.outcome_status == OutcomeStatus::Succeeded).count();

    let mut out = Vec::new();
    if failed >= 2 {
        let rate = failed as f64 / total;
        out.push(draft(
            project,
            "Decision failure rate is elevated",
            InsightType::Pattern,
            format!("{failed} of {} reviewed decisions failed ({:.0}%)", reviewed.len(), rate * 100.0),
            reviewed.iter().filter(|d| d.outcome_status == OutcomeStatus::Failed).map(|d| d.title.clone()).collect(),
            0.7,
            at,
        ));
    }
    if succeeded >= 3 && succeeded as f64 / total >= 0.8 {
        let rate = succeeded as f64 / total;
        out.push(draft(
            project,
            "Decisions are tracking well",
            InsightType::Pattern,
            format!("{succeeded} of {} reviewed decisions succeeded ({:.0}%)", reviewed.len(), rate * 100.0),
            reviewed.iter().filter(|d| d.outcome_status == OutcomeStatus::Succeeded).map(|d| d.title.clone()).collect(),
            0.75,
            at,
        ));
    }
    Ok(out)
}

/// Workflow patterns used ≥3 times that have gone quiet (never used again,
/// or not used in 30 days).
pub async fn detect_workflow_deviations(
    db: &dyn DatabaseAdapter,
    project: ProjectId,
    at: DateTime<Utc>,
) -> Result<Vec<InsightRow>, MuninnError> {
    let patterns = db.workflow_patterns(project).await?;
    Ok(patterns
        .into_iter()
        .filter(|w| w.times_used >= 3 && w.last_used_at.is_none_or(|last| muninn_core::days_since(last, at) > 30.0))
        .map(|w| {
            draft(
                project,
                format!("Workflow pattern stalled: {}", w.name),
                InsightType::Recommendation,
                format!("\"{}\" was used {} times but hasn't run recently", w.name, w.times_used),
                vec![w.name.clone()],
                0.6,
                at,
            )
        })
        .collect())
}

/// Over the last N sessions, a rising share touching many files (and, of
/// those, carrying issues) signals scope creep.
pub async fn detect_scope_creep(
    db: &dyn DatabaseAdapter,
    project: ProjectId,
    config: &InsightConfig,
    at: DateTime<Utc>,
) -> Result<Vec<InsightRow>, MuninnError> {
    let sessions = db.recent_sessions(project, config.scope_creep_session_window).await?;
    if sessions.is_empty() {
        return Ok(Vec::new());
    }
    let wide: Vec<_> = sessions
        .iter()
        .filter(|s| s.files_touched.len() >= config.scope_creep_files_touched_threshold)
        .collect();
    let with_issues = wide.iter().filter(|s| !s.issues_found.is_empty()).count();
    if with_issues < 2 {
        return Ok(Vec::new());
    }
    let rate = with_issues as f64 / wide.len() as f64;
    Ok(vec![draft(
        project,
        "Wide-scope sessions are accumulating issues",
        InsightType::Pattern,
        format!(
            "{with_issues} of {} sessions touching {}+ files also surfaced issues ({:.0}%)",
            wide.len(),
            config.scope_creep_files_touched_threshold,
            rate * 100.0
        ),
        wide.iter().map(|s| s.id.to_string()).collect(),
        0.65,
        at,
    )])
}

#[cfg(test)]
mod tests {
    use super::*;
    use muninn_db::rows::WorkflowPatternRow;
    use muninn_db::InMemoryAdapter;

    #[tokio::test]
    async fn test_cochange_requires_different_directories() {
        let db = InMemoryAdapter::new();
        let at = Utc::now();
        db.upsert_file_correlation(1, "src/a.ts", "src/b.ts", at).await.unwrap();
        for _ in 0..9 {
            db.upsert_file_correlation(1, "src/a.ts", "src/b.ts", at).await.unwrap();
        }
        let found = detect_cochange(&db, 1, &InsightConfig::default(), at).await.unwrap();
        assert!(found.is_empty(), "same-directory pair must not surface a co-change insight");
    }

    #[tokio::test]
    async fn test_cochange_different_directories_surfaces() {
        let db = InMemoryAdapter::new();
        let at = Utc::now();
        for _ in 0..9 {
            db.upsert_file_correlation(1, "src/a.ts", "tests/b.ts", at).await.unwrap();
        }
        let found = detect_cochange(&db, 1, &InsightConfig::default(), at).await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].confidence <= 0.9);
    }

    #[tokio::test]
    async fn test_decision_outcomes_needs_three_reviewed() {
        let db = InMemoryAdapter::new();
        let found = detect_decision_outcomes(&db, 1, Utc::now()).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_workflow_deviation_requires_three_uses() {
        let db = InMemoryAdapter::new();
        db.seed_workflow_pattern(WorkflowPatternRow {
            project_id: 1,
            name: "review-then-merge".to_string(),
            times_used: 2,
            last_used_at: None,
        })
        .await;
        let found = detect_workflow_deviations(&db, 1, Utc::now()).await.unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_dirname() {
        assert_eq!(dirname("src/a.ts"), "src");
        assert_eq!(dirname("a.ts"), "");
    }
}
