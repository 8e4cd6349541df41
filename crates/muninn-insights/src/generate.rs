//! Runs every detector (if due) and persists whatever they find.

use chrono::{DateTime, Utc};
use muninn_config::config::InsightConfig;
use muninn_core::{MuninnError, ProjectId};
use muninn_db::adapter::DatabaseAdapter;
use tracing::debug;

use crate::detectors::{
    detect_cochange, detect_decision_outcomes, detect_fragility_trends, detect_scope_creep,
    detect_workflow_deviations,
};
use crate::due::should_generate;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GenerationCounts {
    pub upserted: u32,
    pub auto_dismissed: u32,
}

/// Run all five detectors and upsert their findings, then sweep stale `new`
/// insights. No-ops (returns `Ok(default)`) when not due.
pub async fn generate_if_due(
    db: &dyn DatabaseAdapter,
    project: ProjectId,
    config: &InsightConfig,
    at: DateTime<Utc>,
) -> Result<GenerationCounts, MuninnError> {
    if !should_generate(db, project, config).await? {
        debug!(project, "insight generation skipped: not due");
        return Ok(GenerationCounts::default());
    }

    let mut drafts = Vec::new();
    drafts.extend(detect_cochange(db, project, config, at).await?);
    drafts.extend(detect_fragility_trends(db, project, config, at).await?);
    drafts.extend(detect_decision_outcomes(db, project, at).await?);
    drafts.extend(detect_workflow_deviations(db, project, at).await?);
    drafts.extend(detect_scope_creep(db, project, config, at).await?);

    let mut upserted = 0;
    for draft in &drafts {
        db.upsert_insight(draft).await?;
        upserted += 1;
    }

    let auto_dismissed = db.auto_dismiss_stale_insights(project, config.auto_dismiss_shown_count).await?;
    Ok(GenerationCounts { upserted, auto_dismissed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use muninn_db::InMemoryAdapter;

    #[tokio::test]
    async fn test_generate_runs_when_never_generated() {
        let db = InMemoryAdapter::new();
        let counts = generate_if_due(&db, 1, &InsightConfig::default(), Utc::now()).await.unwrap();
        assert_eq!(counts.upserted, 0);
    }
}
