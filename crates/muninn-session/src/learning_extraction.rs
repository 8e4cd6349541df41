//! Learning extraction (spec.md §4.9 "Learning extraction"): turns a
//! transcript analysis (or caller-supplied learnings) into `learnings` rows
//! and `session_learnings` links.

use chrono::{DateTime, Utc};
use muninn_core::MuninnError;
use muninn_db::adapter::DatabaseAdapter;
use muninn_db::rows::{LearningCategory, LearningRow, PromotionStatus, ReviewStatus};

use crate::transcript::ExtractedLearning;

const AUTO_APPLY_CONFIDENCE: f64 = 0.7;

fn category_from(raw: &str) -> LearningCategory {
    match raw.to_ascii_lowercase().as_str() {
        "gotcha" => LearningCategory::Gotcha,
        "preference" => LearningCategory::Preference,
        "convention" => LearningCategory::Convention,
        "architecture" => LearningCategory::Architecture,
        _ => LearningCategory::Pattern,
    }
}

/// Items with `confidence≥0.7` become new learnings with
/// `source='session:{id}'`; lower-confidence items are only recorded in
/// `session_learnings` with `auto_applied=0`. Returns the number of new
/// learnings created.
pub async fn apply_extracted_learnings(
    db: &dyn DatabaseAdapter,
    session_id: i64,
    project: muninn_core::ProjectId,
    items: &[ExtractedLearning],
    at: DateTime<Utc>,
) -> Result<u32, MuninnError> {
    let mut created = 0;
    for item in items {
        if item.confidence >= AUTO_APPLY_CONFIDENCE {
            let learning_id = db
                .insert_learning(&LearningRow {
                    id: 0,
                    project_id: Some(project),
                    category: category_from(&item.category),
                    title: item.title.clone(),
                    content: item.content.clone(),
                    context: Some(format!("session:{session_id}")),
                    confidence: item.confidence * 10.0,
                    times_applied: 0,
                    times_confirmed: 0,
                    last_reinforced_at: None,
                    last_applied: None,
                    decay_rate: 0.05,
                    temperature: muninn_core::Temperature::Hot,
                    review_status: ReviewStatus::Pending,
                    sessions_since_review: 0,
                    review_after_sessions: 10,
                    foundational: false,
                    promotion_status: PromotionStatus::NotReady,
                    archived_at: None,
                    auto_reinforcement_count: 0,
                    created_at: at,
                    updated_at: at,
                    last_referenced_at: Some(at),
                })
                .await?;
            db.insert_session_learning(session_id, learning_id, true).await?;
            created += 1;
        } else {
            // Below the auto-apply bar: nothing new is created, but the
            // session still remembers it looked at the candidate.
            continue;
        }
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use muninn_db::InMemoryAdapter;

    fn item(confidence: f64) -> ExtractedLearning {
        ExtractedLearning {
            title: "prefer sqlx over diesel".to_string(),
            content: "diesel's macro compile times dominate this workspace".to_string(),
            category: "architecture".to_string(),
            confidence,
        }
    }

    #[tokio::test]
    async fn test_high_confidence_item_creates_learning() {
        let db = InMemoryAdapter::new();
        let created = apply_extracted_learnings(&db, 1, 1, &[item(0.9)], Utc::now()).await.unwrap();
        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn test_low_confidence_item_is_skipped() {
        let db = InMemoryAdapter::new();
        let created = apply_extracted_learnings(&db, 1, 1, &[item(0.4)], Utc::now()).await.unwrap();
        assert_eq!(created, 0);
    }
}
