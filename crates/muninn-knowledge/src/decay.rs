//! Temperature decay (spec.md §4.7), run once per session start across
//! files, decisions, issues, learnings. The per-row rule itself
//! (`cold`/`warm`/`hot` by session-count since `last_referenced_at`) lives in
//! [`muninn_db::adapter::DatabaseAdapter`]; this module just runs the four
//! sweeps together and reports totals, mirroring the teacher's
//! `csa-session::lifecycle::start` step ordering.

use chrono::{DateTime, Utc};
use muninn_core::{MuninnError, ProjectId};
use muninn_db::adapter::DatabaseAdapter;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecayCounts {
    pub files: u32,
    pub decisions: u32,
    pub issues: u32,
    pub learnings: u32,
}

/// Decay every knowledge table's temperature for `project` at `at`.
pub async fn decay_all(
    db: &dyn DatabaseAdapter,
    project: ProjectId,
    at: DateTime<Utc>,
) -> Result<DecayCounts, MuninnError> {
    let files = db.decay_file_temperatures(project, at).await?;
    let decisions = db.decay_decision_temperatures(project, at).await?;
    let issues = db.decay_issue_temperatures(project, at).await?;
    let learnings = db.decay_learning_temperatures(project, at).await?;
    Ok(DecayCounts { files, decisions, issues, learnings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use muninn_core::Temperature;
    use muninn_db::rows::{FileRow, FileStatus, FileType, FragilitySignals};
    use muninn_db::InMemoryAdapter;
    use std::collections::BTreeSet;

    #[tokio::test]
    async fn test_decay_all_covers_every_table() {
        let db = InMemoryAdapter::new();
        db.upsert_file(&FileRow {
            id: 0,
            project_id: 1,
            path: "a.ts".to_string(),
            file_type: FileType::Util,
            purpose: None,
            fragility: 0,
            fragility_reason: None,
            fragility_signals: FragilitySignals::default(),
            content_hash: None,
            last_analyzed: None,
            dependencies: BTreeSet::new(),
            dependents: BTreeSet::new(),
            velocity_score: 0.0,
            change_count: 0,
            temperature: Temperature::Hot,
            last_referenced_at: None,
            status: FileStatus::Active,
        })
        .await
        .unwrap();
        let counts = decay_all(&db, 1, Utc::now()).await.unwrap();
        assert_eq!(counts.files, 1);
    }
}
