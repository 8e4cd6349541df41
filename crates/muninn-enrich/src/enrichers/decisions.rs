//! `decisions` — priority 50, runs for every tool (spec.md §4.5).
//!
//! Active decisions affecting any input file, capped at `max_decisions`.
//! A decision's outcome notes (positive/negative signal counts accumulated
//! by the session-end auto-tracker, spec.md §4.9) stand in for the
//! confidence the renderer expects: 5 is neutral, each net positive signal
//! nudges it up, each net negative nudges it down, clamped to `[0,10]`.

use std::time::Duration;

use muninn_cache::{key, Cache};
use muninn_config::config::EnricherCaps;
use muninn_core::{MuninnError, ProjectId};
use muninn_db::adapter::DatabaseAdapter;
use muninn_db::rows::{DecisionRow, OutcomeStatus};
use muninn_format::format_decision;

fn outcome_status_str(status: OutcomeStatus) -> &'static str {
    match status {
        OutcomeStatus::Pending => "pending",
        OutcomeStatus::Succeeded => "succeeded",
        OutcomeStatus::Failed => "failed",
        OutcomeStatus::Revised => "revised",
        OutcomeStatus::NeedsReview => "needs_review",
        OutcomeStatus::Unknown => "unknown",
    }
}

fn decision_confidence(row: &DecisionRow) -> f64 {
    let net = row.outcome_notes.positive as i64 - row.outcome_notes.negative as i64;
    (5 + net).clamp(0, 10) as f64
}

fn cache_key(project: ProjectId, files: &[String]) -> String {
    let mut sorted = files.to_vec();
    sorted.sort();
    key::decision(project, &sorted.join(","))
}

pub async fn enrich(
    db: &dyn DatabaseAdapter,
    cache: &Cache<Vec<DecisionRow>>,
    ttl: Option<Duration>,
    caps: EnricherCaps,
    project: ProjectId,
    files: &[String],
) -> Result<Option<String>, MuninnError> {
    if files.is_empty() {
        return Ok(None);
    }
    let cache_key = cache_key(project, files);
    let mut decisions = if let Some(cached) = cache.get(&cache_key) {
        cached
    } else {
        let fetched = db.active_decisions_affecting(project, files).await?;
        cache.set(&cache_key, fetched.clone(), ttl);
        fetched
    };
    decisions.sort_by(|a, b| b.decided_at.cmp(&a.decided_at));
    decisions.truncate(caps.max_decisions);
    if decisions.is_empty() {
        return Ok(None);
    }
    let lines: Vec<String> = decisions
        .iter()
        .map(|d| {
            format_decision(
                &d.title,
                &d.decision,
                None,
                d.reasoning.as_deref().unwrap_or(""),
                decision_confidence(d),
                outcome_status_str(d.outcome_status),
            )
        })
        .collect();
    Ok(Some(lines.join("\n")))
}
