//! Resume markdown (spec.md §4.11 "Resume markdown").

use muninn_db::rows::{DecisionRow, FileRow, InsightRow, LearningRow, ObservationRow, SessionRow};

use crate::health::HealthLevel;

pub struct ResumeContext<'a> {
    pub health: HealthLevel,
    pub decisions_due: &'a [DecisionRow],
    pub new_insights: &'a [InsightRow],
    pub foundational_due: &'a [LearningRow],
    pub fragile_hot_files: &'a [FileRow],
    pub recent_files: &'a [String],
    pub recent_observations: &'a [ObservationRow],
    pub last_ended_session: Option<&'a SessionRow>,
}

/// Renders the native format's resume block: required actions, warnings,
/// a resume point, and a trailing instruction to start the next session.
pub fn render(ctx: &ResumeContext) -> String {
    let mut md = String::new();

    let has_required_actions =
        !ctx.decisions_due.is_empty() || !ctx.new_insights.is_empty() || !ctx.foundational_due.is_empty();
    if has_required_actions {
        md.push_str("## Required actions\n\n");
        for decision in ctx.decisions_due {
            md.push_str(&format!("- Review decision: {}\n", decision.title));
        }
        for insight in ctx.new_insights {
            md.push_str(&format!("- New insight: {}\n", insight.title));
        }
        for learning in ctx.foundational_due {
            md.push_str(&format!("- Re-confirm foundational learning: {}\n", learning.title));
        }
        md.push('\n');
    }

    if !ctx.fragile_hot_files.is_empty() {
        md.push_str("## Warnings\n\n");
        for file in ctx.fragile_hot_files {
            md.push_str(&format!("- {} is fragile ({}) and hot\n", file.path, file.fragility));
        }
        md.push('\n');
    }

    md.push_str("## Resume point\n\n");
    md.push_str(&format!("Health: {}\n\n", health_label(ctx.health)));
    if !ctx.recent_files.is_empty() {
        md.push_str(&format!("Recent files: {}\n", ctx.recent_files.join(", ")));
    }
    if !ctx.recent_observations.is_empty() {
        md.push_str("Recent observations:\n");
        for obs in ctx.recent_observations {
            md.push_str(&format!("- {}\n", obs.content));
        }
    }

    if let Some(session) = ctx.last_ended_session {
        if let Some(next_steps) = &session.next_steps {
            md.push_str("\n## Next steps\n\n");
            for line in next_steps.lines().filter(|l| !l.trim().is_empty()) {
                md.push_str(&format!("- {}\n", line.trim()));
            }
        }
    }

    md.push_str("\nStart the next session to continue.\n");
    md
}

fn health_label(health: HealthLevel) -> &'static str {
    match health {
        HealthLevel::Critical => "critical",
        HealthLevel::Attention => "attention",
        HealthLevel::Good => "good",
    }
}
