//! Confidence reinforcement/reduction and review flagging driven by a
//! decision's outcome (spec.md §4.7). The caller (C9's decision auto-tracker)
//! supplies the decision id and its newly-settled [`OutcomeStatus`]; this
//! module walks the `decision_learnings` links with `contribution=
//! 'influenced'` and applies the matching learning-side effect to each.

use chrono::{DateTime, Utc};
use muninn_core::{MuninnError, Temperature};
use muninn_db::adapter::DatabaseAdapter;
use muninn_db::rows::OutcomeStatus;

/// Apply the learning-side effect for one decision's settled outcome.
/// No-ops (returns `Ok(0)`) for outcomes with no defined effect
/// (`Pending`/`NeedsReview`/`Unknown`).
pub async fn apply_decision_outcome(
    db: &dyn DatabaseAdapter,
    decision_id: i64,
    outcome: OutcomeStatus,
    at: DateTime<Utc>,
) -> Result<usize, MuninnError> {
    let influenced = db.decision_learnings_influenced(decision_id).await?;
    let mut touched = 0;
    for learning_id in influenced {
        match outcome {
            OutcomeStatus::Succeeded => {
                db.snapshot_learning_version(learning_id, at).await?;
                db.reinforce_learning(learning_id, at).await?;
                touched += 1;
            }
            OutcomeStatus::Failed => {
                db.snapshot_learning_version(learning_id, at).await?;
                if let Some(learning) = db.get_learning(learning_id).await? {
                    let reduced = (learning.confidence - 1.0).max(1.0);
                    db.reduce_learning_confidence(learning_id, reduced).await?;
                }
                db.set_learning_temperature(learning_id, Temperature::Cold).await?;
                touched += 1;
            }
            OutcomeStatus::Revised => {
                db.snapshot_learning_version(learning_id, at).await?;
                db.flag_learning_for_review(learning_id).await?;
                if let Some(learning) = db.get_learning(learning_id).await? {
                    if learning.promotion_status != muninn_db::rows::PromotionStatus::NotReady {
                        db.demote_learning(learning_id).await?;
                    }
                }
                touched += 1;
            }
            OutcomeStatus::Pending | OutcomeStatus::NeedsReview | OutcomeStatus::Unknown => {}
        }
    }
    Ok(touched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use muninn_core::Temperature;
    use muninn_db::rows::{LearningCategory, LearningRow, PromotionStatus, ReviewStatus};
    use muninn_db::InMemoryAdapter;

    fn learning(confidence: f64, temperature: Temperature) -> LearningRow {
        let now = Utc::now();
        LearningRow {
            id: 0,
            project_id: Some(1),
            category: LearningCategory::Pattern,
            title: "use sqlx".to_string(),
            content: "prefer sqlx for db access".to_string(),
            context: None,
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
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_succeeded_reinforces_influenced_learnings() {
        let db = InMemoryAdapter::new();
        let learning_id = db.insert_learning(&learning(6.0, Temperature::Warm)).await.unwrap();
        db.seed_decision_learning(1, learning_id, "influenced").await;
        let touched = apply_decision_outcome(&db, 1, OutcomeStatus::Succeeded, Utc::now()).await.unwrap();
        assert_eq!(touched, 1);
        let row = db.get_learning(learning_id).await.unwrap().unwrap();
        assert_eq!(row.confidence, 6.5);
    }

    #[tokio::test]
    async fn test_failed_reduces_confidence_and_cools() {
        let db = InMemoryAdapter::new();
        let learning_id = db.insert_learning(&learning(2.0, Temperature::Hot)).await.unwrap();
        db.seed_decision_learning(1, learning_id, "influenced").await;
        apply_decision_outcome(&db, 1, OutcomeStatus::Failed, Utc::now()).await.unwrap();
        let row = db.get_learning(learning_id).await.unwrap().unwrap();
        assert_eq!(row.confidence, 1.0);
        assert_eq!(row.temperature, Temperature::Cold);
    }

    #[tokio::test]
    async fn test_pending_outcome_is_a_no_op() {
        let db = InMemoryAdapter::new();
        let learning_id = db.insert_learning(&learning(6.0, Temperature::Warm)).await.unwrap();
        db.seed_decision_learning(1, learning_id, "influenced").await;
        let touched = apply_decision_outcome(&db, 1, OutcomeStatus::Pending, Utc::now()).await.unwrap();
        assert_eq!(touched, 0);
    }
}
