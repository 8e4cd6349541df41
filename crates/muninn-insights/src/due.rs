//! Due-check gating insight generation (spec.md §4.10): "Runs only if due:
//! never generated, OR ≥3 sessions ended since last, OR ≥5 correlation
//! updates since, OR ≥2 new decisions since."

use chrono::Utc;
use muninn_config::config::InsightConfig;
use muninn_core::{MuninnError, ProjectId};
use muninn_db::adapter::DatabaseAdapter;

pub async fn should_generate(
    db: &dyn DatabaseAdapter,
    project: ProjectId,
    config: &InsightConfig,
) -> Result<bool, MuninnError> {
    let last = match db.last_insight_generated_at(project).await? {
        Some(at) => at,
        None => return Ok(true),
    };
    let sessions_ended = db.sessions_ended_since(project, last).await?;
    if sessions_ended >= config.sessions_since_threshold {
        return Ok(true);
    }
    let correlation_updates = db.correlations_updated_since(project, last).await?;
    if correlation_updates >= config.correlation_updates_threshold {
        return Ok(true);
    }
    let new_decisions = db.decisions_made_since(project, last).await?;
    Ok(new_decisions >= config.new_decisions_threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use muninn_db::InMemoryAdapter;

    #[tokio::test]
    async fn test_never_generated_is_due() {
        let db = InMemoryAdapter::new();
        assert!(should_generate(&db, 1, &InsightConfig::default()).await.unwrap());
    }
}
