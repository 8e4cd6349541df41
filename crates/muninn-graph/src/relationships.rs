//! Derives `relationships` edges from a just-ended session's tracking lists
//! and its file correlations (spec.md §4.8 "Relationship edges").
//!
//! Five of the six edge kinds come straight off the session row; the sixth
//! (`file→tests→file`) is a path-basename heuristic applied to the session's
//! own `files_touched`, mirroring the tests enricher's heuristic in
//! `muninn-enrich` rather than re-deriving it from a separate source.

use muninn_core::ProjectId;
use muninn_db::adapter::{DatabaseAdapter, DbResult};
use muninn_db::rows::{EntityKind, RelationshipKind, SessionRow};

use crate::blast::looks_like_test_path;

/// Default minimum co-change count for a `cochanges` edge to be derived
/// (spec.md §4.8: "where `cochange_count ≥ threshold` (default 3)").
pub const DEFAULT_COCHANGE_EDGE_THRESHOLD: u32 = 3;

/// Strip a test-ish suffix/prefix off `path` to recover the basename a
/// matching source file would carry (spec.md §4.8 "file →tests→ file…
/// heuristic (file in a tests dir with a matching source basename)").
fn source_basename_guess(test_path: &str) -> Option<String> {
    let file_name = test_path.rsplit('/').next().unwrap_or(test_path);
    for suffix in [".test.ts", ".test.tsx", ".spec.ts", ".spec.tsx", ".test.js", ".spec.js"] {
        if let Some(stem) = file_name.strip_suffix(suffix) {
            return Some(stem.to_string());
        }
    }
    None
}

fn basename_stem(path: &str) -> String {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    file_name.rsplit_once('.').map(|(stem, _)| stem.to_string()).unwrap_or_else(|| file_name.to_string())
}

/// Find, among `files_touched`, a plausible source file for a test path:
/// same basename stem, not itself test-shaped.
fn find_source_for_test<'a>(test_path: &str, files_touched: &'a [String]) -> Option<&'a String> {
    let stem = source_basename_guess(test_path)?;
    files_touched
        .iter()
        .find(|candidate| !looks_like_test_path(candidate) && basename_stem(candidate) == stem)
}

/// Derive and insert every relationship edge implied by an ended session
/// (spec.md §4.8). Returns the number of edges inserted. Idempotent only in
/// the sense that re-running on the same session re-derives the same set —
/// callers are expected to run this once, at session end.
pub async fn derive_session_relationships(
    db: &dyn DatabaseAdapter,
    project: ProjectId,
    session: &SessionRow,
    cochange_edge_threshold: u32,
) -> DbResult<u32> {
    let mut count = 0u32;
    let session_id = session.id.to_string();

    for decision_id in &session.decisions_made {
        db.insert_relationship(
            project,
            EntityKind::Session,
            &session_id,
            RelationshipKind::Made,
            EntityKind::Decision,
            &decision_id.to_string(),
        )
        .await?;
        count += 1;
    }

    for issue_id in &session.issues_found {
        db.insert_relationship(
            project,
            EntityKind::Session,
            &session_id,
            RelationshipKind::Found,
            EntityKind::Issue,
            &issue_id.to_string(),
        )
        .await?;
        count += 1;
    }

    for issue_id in &session.issues_resolved {
        db.insert_relationship(
            project,
            EntityKind::Session,
            &session_id,
            RelationshipKind::Resolved,
            EntityKind::Issue,
            &issue_id.to_string(),
        )
        .await?;
        count += 1;
    }

    for learning_id in db.session_learning_ids(session.id).await? {
        db.insert_relationship(
            project,
            EntityKind::Session,
            &session_id,
            RelationshipKind::Learned,
            EntityKind::Learning,
            &learning_id.to_string(),
        )
        .await?;
        count += 1;
    }

    for row in db.correlations_above(project, cochange_edge_threshold).await? {
        db.insert_relationship(
            project,
            EntityKind::File,
            &row.file_a,
            RelationshipKind::Cochanges,
            EntityKind::File,
            &row.file_b,
        )
        .await?;
        count += 1;
    }

    for test_path in session.files_touched.iter().filter(|f| looks_like_test_path(f)) {
        if let Some(source) = find_source_for_test(test_path, &session.files_touched) {
            db.insert_relationship(
                project,
                EntityKind::File,
                source,
                RelationshipKind::Tests,
                EntityKind::File,
                test_path,
            )
            .await?;
            count += 1;
        }
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use muninn_db::InMemoryAdapter;

    fn session(files_touched: Vec<String>) -> SessionRow {
        SessionRow {
            id: 1,
            project_id: 1,
            session_number: 1,
            goal: None,
            outcome: None,
            started_at: Utc::now(),
            ended_at: Some(Utc::now()),
            success: None,
            next_steps: None,
            files_read: vec![],
            queries_made: vec![],
            files_touched,
            decisions_made: vec![10, 11],
            issues_found: vec![20],
            issues_resolved: vec![21],
            learnings: None,
        }
    }

    #[tokio::test]
    async fn test_made_found_resolved_edges() {
        let db = InMemoryAdapter::new();
        let count = derive_session_relationships(&db, 1, &session(vec![]), DEFAULT_COCHANGE_EDGE_THRESHOLD)
            .await
            .unwrap();
        // 2 made + 1 found + 1 resolved
        assert_eq!(count, 4);
    }

    #[tokio::test]
    async fn test_tests_edge_from_basename_heuristic() {
        let db = InMemoryAdapter::new();
        let s = session(vec!["src/auth.ts".to_string(), "src/auth.test.ts".to_string()]);
        let before = derive_session_relationships(&db, 1, &s, DEFAULT_COCHANGE_EDGE_THRESHOLD).await.unwrap();
        // 4 (made/found/resolved) + 1 tests edge
        assert_eq!(before, 5);
    }

    #[tokio::test]
    async fn test_no_source_match_skips_tests_edge() {
        let db = InMemoryAdapter::new();
        let s = session(vec!["src/orphan.test.ts".to_string()]);
        let count = derive_session_relationships(&db, 1, &s, DEFAULT_COCHANGE_EDGE_THRESHOLD).await.unwrap();
        assert_eq!(count, 4);
    }

    #[test]
    fn test_source_basename_guess_strips_suffix() {
        assert_eq!(source_basename_guess("src/foo.test.ts"), Some("foo".to_string()));
        assert_eq!(source_basename_guess("src/foo.spec.tsx"), Some("foo".to_string()));
        assert_eq!(source_basename_guess("src/foo.ts"), None);
    }
}
