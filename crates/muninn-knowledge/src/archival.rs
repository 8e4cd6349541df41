//! Periodic archival sweep and restore (spec.md §4.7 "Archival") plus the
//! metrics-table retention sweep this spec supplements it with.

use chrono::{DateTime, Utc};
use muninn_config::config::ArchivalConfig;
use muninn_core::{MuninnError, ProjectId};
use muninn_db::adapter::DatabaseAdapter;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArchivalCounts {
    pub stale_learnings: u32,
    pub unreinforced_learnings: u32,
    pub failed_decisions: u32,
    pub resolved_issues: u32,
}

pub async fn sweep(
    db: &dyn DatabaseAdapter,
    project: ProjectId,
    config: &ArchivalConfig,
    at: DateTime<Utc>,
) -> Result<ArchivalCounts, MuninnError> {
    let stale_learnings = db
        .archive_stale_learnings(project, config.low_confidence_threshold, config.low_confidence_age_days, at)
        .await?;
    let unreinforced_learnings = db
        .archive_unreinforced_learnings(
            project,
            config.never_reinforced_confidence_threshold,
            config.never_reinforced_age_days,
            at,
        )
        .await?;
    let failed_decisions = db.archive_failed_decisions(project, config.failed_decision_age_days, at).await?;
    let resolved_issues = db.archive_resolved_issues(project, config.resolved_issue_age_days, at).await?;
    Ok(ArchivalCounts { stale_learnings, unreinforced_learnings, failed_decisions, resolved_issues })
}

/// Restore a single archived row. Only `learnings`/`decisions` are
/// restorable; the adapter returns [`MuninnError::RestoreNotPermitted`] for
/// anything else.
pub async fn restore(db: &dyn DatabaseAdapter, table: &str, id: i64) -> Result<(), MuninnError> {
    db.restore_from_archive(table, id).await
}

/// Drop `enrichment_metrics` rows older than `before`. Not part of spec.md's
/// archival rules, which cover knowledge tables only — this is the ambient
/// retention sweep every long-lived metrics table needs.
pub async fn prune_metrics(db: &dyn DatabaseAdapter, project: ProjectId, before: DateTime<Utc>) -> Result<u32, MuninnError> {
    db.prune_metrics_older_than(project, before).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use muninn_core::Temperature;
    use muninn_db::rows::{LearningCategory, LearningRow, PromotionStatus, ReviewStatus};
    use muninn_db::InMemoryAdapter;
    use chrono::Duration;

    fn old_low_confidence_learning() -> LearningRow {
        let now = Utc::now();
        LearningRow {
            id: 0,
            project_id: Some(1),
            category: LearningCategory::Pattern,
            title: "stale".to_string(),
            content: "probably wrong".to_string(),
            context: None,
            confidence: 1.0,
            times_applied: 0,
            times_confirmed: 0,
            last_reinforced_at: None,
            last_applied: None,
            decay_rate: 0.05,
            temperature: Temperature::Cold,
            review_status: ReviewStatus::Pending,
            sessions_since_review: 0,
            review_after_sessions: 30,
            foundational: false,
            promotion_status: PromotionStatus::NotReady,
            archived_at: None,
            auto_reinforcement_count: 0,
            created_at: now - Duration::days(90),
            updated_at: now - Duration::days(90),
        }
    }

    #[tokio::test]
    async fn test_sweep_archives_stale_learning() {
        let db = InMemoryAdapter::new();
        let id = db.insert_learning(&old_low_confidence_learning()).await.unwrap();
        let config = ArchivalConfig::default();
        let counts = sweep(&db, 1, &config, Utc::now()).await.unwrap();
        assert_eq!(counts.stale_learnings, 1);
        let row = db.get_learning(id).await.unwrap().unwrap();
        assert!(row.archived_at.is_some());
    }

    #[tokio::test]
    async fn test_restore_rejects_unknown_table() {
        let db = InMemoryAdapter::new();
        let err = restore(&db, "files", 1).await.unwrap_err();
        assert!(matches!(err, MuninnError::RestoreNotPermitted(_)));
    }
}
