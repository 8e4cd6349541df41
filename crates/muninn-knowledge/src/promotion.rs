//! Learning confirm/promote lifecycle (spec.md §4.7 "Promotion"). The
//! adapter owns each individual transition (`confirm_learning`,
//! `mark_learning_candidate`, `promote_learning`, `demote_learning`); this
//! module owns the eligibility test that decides when `confirm` should also
//! flip a learning to `candidate`.

use muninn_core::MuninnError;
use muninn_db::adapter::DatabaseAdapter;
use muninn_db::rows::{LearningRow, PromotionStatus};

/// `foundational ∧ confidence≥8 ∧ times_confirmed≥3 ∧ times_applied≥5 ∧ not archived`.
pub fn is_candidate_eligible(learning: &LearningRow) -> bool {
    learning.foundational
        && learning.confidence >= 8.0
        && learning.times_confirmed >= 3
        && learning.times_applied >= 5
        && learning.archived_at.is_none()
}

/// Run a promotion-cycle confirm, then mark the learning `candidate` if it
/// just became eligible. No-op on the candidate transition if the learning
/// was already `candidate` or `promoted` (the adapter guards on `NotReady`).
pub async fn confirm(db: &dyn DatabaseAdapter, learning_id: i64) -> Result<(), MuninnError> {
    db.confirm_learning(learning_id).await?;
    if let Some(learning) = db.get_learning(learning_id).await? {
        if learning.promotion_status == PromotionStatus::NotReady && is_candidate_eligible(&learning) {
            db.mark_learning_candidate(learning_id).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use muninn_core::Temperature;
    use muninn_db::rows::{LearningCategory, ReviewStatus};
    use muninn_db::InMemoryAdapter;

    fn foundational_learning(confidence: f64, times_confirmed: i32, times_applied: i32) -> LearningRow {
        let now = Utc::now();
        LearningRow {
            id: 0,
            project_id: Some(1),
            category: LearningCategory::Pattern,
            title: "prefer sqlx".to_string(),
            content: "use sqlx for db access".to_string(),
            context: None,
            confidence,
            times_applied,
            times_confirmed,
            last_reinforced_at: None,
            last_applied: None,
            decay_rate: 0.02,
            temperature: Temperature::Hot,
            review_status: ReviewStatus::Pending,
            sessions_since_review: 0,
            review_after_sessions: 30,
            foundational: true,
            promotion_status: PromotionStatus::NotReady,
            archived_at: None,
            auto_reinforcement_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_confirm_promotes_to_candidate_when_eligible() {
        let db = InMemoryAdapter::new();
        let id = db.insert_learning(&foundational_learning(7.5, 3, 5)).await.unwrap();
        confirm(&db, id).await.unwrap();
        let row = db.get_learning(id).await.unwrap().unwrap();
        assert_eq!(row.confidence, 8.5);
        assert_eq!(row.times_confirmed, 4);
        assert_eq!(row.promotion_status, PromotionStatus::Candidate);
    }

    #[tokio::test]
    async fn test_confirm_leaves_not_ready_when_under_threshold() {
        let db = InMemoryAdapter::new();
        let id = db.insert_learning(&foundational_learning(3.0, 0, 1)).await.unwrap();
        confirm(&db, id).await.unwrap();
        let row = db.get_learning(id).await.unwrap().unwrap();
        assert_eq!(row.promotion_status, PromotionStatus::NotReady);
    }

    #[tokio::test]
    async fn test_confirm_does_not_reset_already_promoted() {
        let db = InMemoryAdapter::new();
        let id = db.insert_learning(&foundational_learning(9.0, 5, 6)).await.unwrap();
        db.promote_learning(id).await.unwrap();
        confirm(&db, id).await.unwrap();
        let row = db.get_learning(id).await.unwrap().unwrap();
        assert_eq!(row.promotion_status, PromotionStatus::Promoted);
    }
}
