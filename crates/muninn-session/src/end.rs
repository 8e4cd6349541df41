//! Session end (spec.md §4.9 "End").

use chrono::{DateTime, Utc};
use muninn_core::{MuninnError, ProjectId};
use muninn_db::adapter::DatabaseAdapter;
use muninn_db::rows::SessionSuccess;
use tracing::warn;

use crate::decision_tracker::track_decision_outcomes;
use crate::impact::classify_injections;
use crate::learning_extraction::apply_extracted_learnings;
use crate::transcript::{ExtractedLearning, TranscriptAnalyzer};

const ANALYZE_TRANSCRIPT_TAIL_LIMIT: usize = 12 * 1024;

#[derive(Default)]
pub struct EndSessionRequest<'a> {
    pub outcome: Option<&'a str>,
    pub next_steps: Option<&'a str>,
    pub success: Option<SessionSuccess>,
    /// Caller-supplied learnings, used verbatim when transcript analysis
    /// wasn't run (spec.md §4.9 "upsert provided learnings with
    /// `confidence≥0.7`").
    pub learnings: Vec<ExtractedLearning>,
    /// A captured transcript to analyze, when `analyze` was requested.
    pub transcript: Option<&'a str>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EndSessionCounts {
    pub learnings_created: u32,
    pub correlations_updated: u32,
    pub relationships_derived: u32,
    pub decisions_touched: u32,
    pub injections_classified: u32,
}

/// Ends the active session, updates file correlations and relationship
/// edges from what it touched, extracts learnings (via `analyzer` if a
/// transcript was captured, otherwise from `request.learnings`), runs the
/// decision outcome auto-tracker, and classifies context injections.
pub async fn end(
    db: &dyn DatabaseAdapter,
    project: ProjectId,
    session_id: i64,
    request: EndSessionRequest<'_>,
    analyzer: &dyn TranscriptAnalyzer,
    at: DateTime<Utc>,
) -> Result<EndSessionCounts, MuninnError> {
    let active = db.get_active_session(project).await?.ok_or(MuninnError::NoActiveSession)?;
    if active.id != session_id {
        return Err(MuninnError::NoActiveSession);
    }

    db.end_session(session_id, request.outcome, request.success, request.next_steps, at).await?;
    // `end_session` only ever touches outcome/success/next_steps/ended_at,
    // so the tracking lists captured in `active` are still accurate.
    let session = muninn_db::rows::SessionRow { success: request.success, ended_at: Some(at), ..active };

    let correlations_updated = muninn_graph::record_session_correlations(db, project, &session.files_touched, at).await?;
    let relationships_derived = muninn_graph::derive_session_relationships(
        db,
        project,
        &session,
        muninn_graph::DEFAULT_COCHANGE_EDGE_THRESHOLD,
    )
    .await?;

    let learnings_created = if let Some(transcript) = request.transcript {
        let tail = tail_bytes(transcript, ANALYZE_TRANSCRIPT_TAIL_LIMIT);
        match analyzer.analyze(request.outcome, &session.files_touched, tail).await {
            Ok(analysis) => apply_extracted_learnings(db, session_id, project, &analysis.learnings, at).await?,
            Err(err) => {
                warn!(session_id, error = %err, "transcript analysis failed, no learnings extracted");
                0
            }
        }
    } else {
        let high_confidence: Vec<_> = request.learnings.into_iter().filter(|l| l.confidence >= 0.7).collect();
        apply_extracted_learnings(db, session_id, project, &high_confidence, at).await?
    };

    let decisions_touched = track_decision_outcomes(db, project, &session).await?;
    let injections_classified = classify_injections(db, project, session.success).await?;

    Ok(EndSessionCounts {
        learnings_created,
        correlations_updated,
        relationships_derived,
        decisions_touched,
        injections_classified,
    })
}

fn tail_bytes(s: &str, limit: usize) -> &str {
    if s.len() <= limit {
        return s;
    }
    let start = s.len() - limit;
    let mut idx = start;
    while idx < s.len() && !s.is_char_boundary(idx) {
        idx += 1;
    }
    &s[idx..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::NoopAnalyzer;
    use muninn_db::InMemoryAdapter;

    #[tokio::test]
    async fn test_end_with_no_active_session_errors() {
        let db = InMemoryAdapter::new();
        let err = end(&db, 1, 999, EndSessionRequest::default(), &NoopAnalyzer, Utc::now()).await.unwrap_err();
        assert!(matches!(err, MuninnError::NoActiveSession));
    }

    #[tokio::test]
    async fn test_end_settles_session_and_records_high_confidence_learning() {
        let db = InMemoryAdapter::new();
        let session = db.create_session(1, None, Utc::now()).await.unwrap();
        db.append_session_tracking(session.id, muninn_db::adapter::SessionTrackingField::FilesTouched, "src/a.ts")
            .await
            .unwrap();

        let request = EndSessionRequest {
            success: Some(SessionSuccess::Success),
            learnings: vec![ExtractedLearning {
                title: "use sqlx".to_string(),
                content: "diesel macro times dominate build".to_string(),
                category: "architecture".to_string(),
                confidence: 0.9,
            }],
            ..Default::default()
        };
        let counts = end(&db, 1, session.id, request, &NoopAnalyzer, Utc::now()).await.unwrap();
        assert_eq!(counts.learnings_created, 1);
        assert!(db.get_active_session(1).await.unwrap().is_none());
    }
}
