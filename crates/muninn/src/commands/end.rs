use chrono::Utc;
use muninn_core::{MuninnError, ProjectId};
use muninn_db::rows::SessionSuccess;
use muninn_db::SqliteAdapter;
use muninn_session::{ApiAnalyzer, EndSessionRequest, NoopAnalyzer, TranscriptAnalyzer};
use std::io::Read as _;

#[allow(clippy::too_many_arguments)]
pub async fn run(
    db: &SqliteAdapter,
    project: ProjectId,
    session_id: i64,
    outcome: Option<&str>,
    success: Option<u8>,
    next_steps: Option<&str>,
    analyze: bool,
    api_base_url: Option<&str>,
    api_key: Option<&str>,
) -> Result<(), MuninnError> {
    let success = success.map(|s| match s {
        0 => SessionSuccess::Failure,
        1 => SessionSuccess::Partial,
        _ => SessionSuccess::Success,
    });

    let mut transcript_buf = String::new();
    let transcript = if analyze {
        std::io::stdin().read_to_string(&mut transcript_buf).ok();
        Some(transcript_buf.as_str())
    } else {
        None
    };

    let api_analyzer;
    let noop_analyzer = NoopAnalyzer;
    let analyzer: &dyn TranscriptAnalyzer = if analyze {
        if let (Some(base_url), Some(key)) = (api_base_url, api_key) {
            api_analyzer = ApiAnalyzer::new(base_url.to_string(), key.to_string(), "gpt-4o-mini".to_string());
            &api_analyzer
        } else {
            &noop_analyzer
        }
    } else {
        &noop_analyzer
    };

    let request = EndSessionRequest { outcome, next_steps, success, learnings: Vec::new(), transcript };
    let counts = muninn_session::end(db, project, session_id, request, analyzer, Utc::now()).await?;

    println!(
        "session {session_id} ended: {} learnings, {} correlations updated, {} relationships derived, {} decisions touched, {} injections classified",
        counts.learnings_created,
        counts.correlations_updated,
        counts.relationships_derived,
        counts.decisions_touched,
        counts.injections_classified,
    );
    Ok(())
}
