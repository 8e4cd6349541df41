//! Tracking-list appends (spec.md §4.9 "Tracking"). Dedup and the
//! `queries_made` FIFO-50 bound already live adapter-side
//! (`DatabaseAdapter::append_session_tracking`); this module only resolves
//! "the current active session" and no-ops when there isn't one.

use muninn_core::ProjectId;
use muninn_db::adapter::{DatabaseAdapter, SessionTrackingField};

async fn track(
    db: &dyn DatabaseAdapter,
    project: ProjectId,
    field: SessionTrackingField,
    value: &str,
) -> Result<(), muninn_core::MuninnError> {
    let Some(session) = db.get_active_session(project).await? else {
        return Ok(());
    };
    db.append_session_tracking(session.id, field, value).await
}

pub async fn track_file_read(db: &dyn DatabaseAdapter, project: ProjectId, path: &str) -> Result<(), muninn_core::MuninnError> {
    track(db, project, SessionTrackingField::FilesRead, path).await
}

pub async fn track_query(db: &dyn DatabaseAdapter, project: ProjectId, query: &str) -> Result<(), muninn_core::MuninnError> {
    track(db, project, SessionTrackingField::QueriesMade, query).await
}

pub async fn track_file_touched(db: &dyn DatabaseAdapter, project: ProjectId, path: &str) -> Result<(), muninn_core::MuninnError> {
    track(db, project, SessionTrackingField::FilesTouched, path).await
}

pub async fn track_decision_made(db: &dyn DatabaseAdapter, project: ProjectId, decision_id: i64) -> Result<(), muninn_core::MuninnError> {
    track(db, project, SessionTrackingField::DecisionsMade, &decision_id.to_string()).await
}

pub async fn track_issue_found(db: &dyn DatabaseAdapter, project: ProjectId, issue_id: i64) -> Result<(), muninn_core::MuninnError> {
    track(db, project, SessionTrackingField::IssuesFound, &issue_id.to_string()).await
}

pub async fn track_issue_resolved(db: &dyn DatabaseAdapter, project: ProjectId, issue_id: i64) -> Result<(), muninn_core::MuninnError> {
    track(db, project, SessionTrackingField::IssuesResolved, &issue_id.to_string()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use muninn_db::InMemoryAdapter;

    #[tokio::test]
    async fn test_track_without_active_session_is_a_no_op() {
        let db = InMemoryAdapter::new();
        track_file_read(&db, 1, "src/a.ts").await.unwrap();
    }

    #[tokio::test]
    async fn test_track_appends_to_active_session() {
        let db = InMemoryAdapter::new();
        let session = db.create_session(1, None, chrono::Utc::now()).await.unwrap();
        track_file_touched(&db, 1, "src/a.ts").await.unwrap();
        let reloaded = db.get_active_session(1).await.unwrap().unwrap();
        assert_eq!(reloaded.id, session.id);
        assert_eq!(reloaded.files_touched, vec!["src/a.ts".to_string()]);
    }
}
