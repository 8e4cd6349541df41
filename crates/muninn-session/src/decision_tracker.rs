//! Decision outcome auto-tracker (spec.md §4.9). No test-execution results
//! are modeled anywhere in this schema, so "any test failure recorded
//! against an overlapping file" is read as: an issue the session itself
//! found (`issues_found`) whose `affected_files` overlaps the decision's
//! `affects` list — the closest signal this system actually stores.

use muninn_core::{MuninnError, ProjectId};
use muninn_db::adapter::DatabaseAdapter;
use muninn_db::rows::{OutcomeStatus, SessionRow, SessionSuccess};

async fn session_found_overlapping_issue(
    db: &dyn DatabaseAdapter,
    project: ProjectId,
    session: &SessionRow,
    affects: &[String],
) -> Result<bool, MuninnError> {
    if session.issues_found.is_empty() {
        return Ok(false);
    }
    let candidates = db.open_issues_for_files(project, affects, 50).await?;
    Ok(candidates.iter().any(|issue| session.issues_found.contains(&issue.id)))
}

/// Accumulate `{positive, negative}` for every active, still-pending-ish
/// decision touched by this session, and settle it once a threshold fires
/// (spec.md §4.9 "Thresholds"). Returns the number of decisions updated.
pub async fn track_decision_outcomes(
    db: &dyn DatabaseAdapter,
    project: ProjectId,
    session: &SessionRow,
) -> Result<u32, MuninnError> {
    if session.files_touched.is_empty() {
        return Ok(0);
    }
    let candidates = db.active_decisions_affecting(project, &session.files_touched).await?;
    let mut touched = 0;
    for decision in candidates
        .into_iter()
        .filter(|d| matches!(d.outcome_status, OutcomeStatus::Pending | OutcomeStatus::NeedsReview))
    {
        let positive_delta = if session.success == Some(SessionSuccess::Success) { 1 } else { 0 };
        let negative_delta =
            if session_found_overlapping_issue(db, project, session, &decision.affects).await? { 1 } else { 0 };

        let positive = decision.outcome_notes.positive as i32 + positive_delta;
        let negative = decision.outcome_notes.negative as i32 + negative_delta;
        let new_status = if positive >= 3 && negative == 0 {
            OutcomeStatus::Succeeded
        } else if negative >= 2 {
            OutcomeStatus::NeedsReview
        } else {
            decision.outcome_status
        };

        db.update_decision_outcome(decision.id, new_status, positive_delta, negative_delta).await?;
        touched += 1;
    }
    Ok(touched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use muninn_core::Temperature;
    use muninn_db::rows::{DecisionRow, DecisionStatus, IssueRow, IssueStatus, IssueType, OutcomeNotes};
    use muninn_db::InMemoryAdapter;

    fn decision(affects: Vec<String>, positive: u32, negative: u32) -> DecisionRow {
        let now = Utc::now();
        DecisionRow {
            id: 0,
            project_id: 1,
            title: "use sqlx".to_string(),
            decision: "adopt sqlx over diesel".to_string(),
            reasoning: None,
            affects,
            status: DecisionStatus::Active,
            outcome_status: OutcomeStatus::Pending,
            outcome_notes: OutcomeNotes { positive, negative },
            check_after_sessions: 3,
            sessions_since: 0,
            temperature: Temperature::Hot,
            last_referenced_at: None,
            archived_at: None,
            decided_at: now,
            updated_at: now,
        }
    }

    fn session(files_touched: Vec<String>, issues_found: Vec<i64>, success: Option<SessionSuccess>) -> SessionRow {
        SessionRow {
            id: 1,
            project_id: 1,
            session_number: 1,
            goal: None,
            outcome: None,
            started_at: Utc::now(),
            ended_at: Some(Utc::now()),
            success,
            next_steps: None,
            files_read: vec![],
            queries_made: vec![],
            files_touched,
            decisions_made: vec![],
            issues_found,
            issues_resolved: vec![],
            learnings: None,
        }
    }

    #[tokio::test]
    async fn test_third_success_settles_decision() {
        let db = InMemoryAdapter::new();
        let id = db.insert_decision(&decision(vec!["src/a.ts".to_string()], 2, 0)).await.unwrap();
        let s = session(vec!["src/a.ts".to_string()], vec![], Some(SessionSuccess::Success));
        let touched = track_decision_outcomes(&db, 1, &s).await.unwrap();
        assert_eq!(touched, 1);
        let row = db.get_decision(id).await.unwrap().unwrap();
        assert_eq!(row.outcome_status, OutcomeStatus::Succeeded);
        assert_eq!(row.outcome_notes.positive, 3);
    }

    #[tokio::test]
    async fn test_second_overlapping_failure_flags_for_review() {
        let db = InMemoryAdapter::new();
        let id = db.insert_decision(&decision(vec!["src/a.ts".to_string()], 0, 1)).await.unwrap();
        db.insert_issue(&IssueRow {
            id: 0,
            project_id: 1,
            issue_type: IssueType::Bug,
            title: "flaky test".to_string(),
            severity: 5,
            status: IssueStatus::Open,
            affected_files: vec!["src/a.ts".to_string()],
            related_symbols: vec![],
            resolved_at: None,
            updated_at: Utc::now(),
            temperature: Temperature::Hot,
            last_referenced_at: None,
        })
        .await
        .unwrap();
        let issue_id = db.open_issues_for_files(1, &["src/a.ts".to_string()], 10).await.unwrap()[0].id;
        let s = session(vec!["src/a.ts".to_string()], vec![issue_id], None);
        track_decision_outcomes(&db, 1, &s).await.unwrap();
        let row = db.get_decision(id).await.unwrap().unwrap();
        assert_eq!(row.outcome_status, OutcomeStatus::NeedsReview);
        assert_eq!(row.outcome_notes.negative, 2);
    }

    #[tokio::test]
    async fn test_no_touched_files_is_a_no_op() {
        let db = InMemoryAdapter::new();
        let s = session(vec![], vec![], Some(SessionSuccess::Success));
        assert_eq!(track_decision_outcomes(&db, 1, &s).await.unwrap(), 0);
    }
}
