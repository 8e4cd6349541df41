//! Session start (spec.md §4.9 "Start").

use chrono::{DateTime, Utc};
use muninn_config::config::InsightConfig;
use muninn_core::{MuninnError, ProjectId};
use muninn_db::adapter::DatabaseAdapter;
use muninn_db::rows::SessionRow;
use tracing::warn;

/// Decay temperatures, insert the session row, bump the pending-decision and
/// foundational-learning counters, then launch insight generation without
/// waiting on it.
///
/// Every `DatabaseAdapter` call in this crate borrows `db` rather than
/// owning an `Arc`, so "launched but not awaited" (spec.md §4.9) is rendered
/// as best-effort: generation runs inline but its result never affects
/// `start`'s own outcome, and a failure is logged rather than propagated.
pub async fn start(
    db: &dyn DatabaseAdapter,
    project: ProjectId,
    goal: Option<&str>,
    insight_config: &InsightConfig,
    at: DateTime<Utc>,
) -> Result<SessionRow, MuninnError> {
    muninn_knowledge::decay_all(db, project, at).await?;
    let session = db.create_session(project, goal, at).await?;
    db.increment_pending_decision_sessions_since(project).await?;
    db.increment_foundational_learning_sessions_since_review(Some(project)).await?;

    if let Err(err) = muninn_insights::generate_if_due(db, project, insight_config, at).await {
        warn!(project, error = %err, "insight generation failed during session start");
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use muninn_db::InMemoryAdapter;

    #[tokio::test]
    async fn test_start_assigns_session_number_and_goal() {
        let db = InMemoryAdapter::new();
        let session = start(&db, 1, Some("ship the parser"), &InsightConfig::default(), Utc::now()).await.unwrap();
        assert_eq!(session.session_number, 1);
        assert_eq!(session.goal.as_deref(), Some("ship the parser"));
        assert!(session.is_active());
    }

    #[tokio::test]
    async fn test_start_increments_session_number_on_second_call() {
        let db = InMemoryAdapter::new();
        start(&db, 1, None, &InsightConfig::default(), Utc::now()).await.unwrap();
        let second = start(&db, 1, None, &InsightConfig::default(), Utc::now()).await.unwrap();
        assert_eq!(second.session_number, 2);
    }
}
