//! Impact classification (spec.md §4.9 "Impact classification").

use muninn_core::{MuninnError, ProjectId};
use muninn_db::adapter::DatabaseAdapter;
use muninn_db::rows::{ContextInjectionRow, ImpactClassification, SessionSuccess};

fn classify(row: &ContextInjectionRow, success: Option<SessionSuccess>) -> ImpactClassification {
    if !row.was_used {
        return ImpactClassification::Irrelevant;
    }
    match success {
        Some(SessionSuccess::Success) => ImpactClassification::Helped,
        Some(SessionSuccess::Failure) => ImpactClassification::Harmful,
        Some(SessionSuccess::Partial) => {
            if row.relevance.is_some_and(|r| r >= 0.5) {
                ImpactClassification::Helped
            } else {
                ImpactClassification::Unknown
            }
        }
        None => ImpactClassification::Unknown,
    }
}

/// Classify every not-yet-classified `context_injections` row for `project`
/// against the ended session's `success` outcome. Returns the count touched.
pub async fn classify_injections(
    db: &dyn DatabaseAdapter,
    project: ProjectId,
    success: Option<SessionSuccess>,
) -> Result<u32, MuninnError> {
    let pending = db.unclassified_injections(project).await?;
    let mut touched = 0;
    for injection in pending {
        db.classify_injection_impact(injection.id, classify(&injection, success)).await?;
        touched += 1;
    }
    Ok(touched)
}
