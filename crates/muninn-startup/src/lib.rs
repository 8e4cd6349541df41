//! muninn-startup: C11 (spec.md §4.11) — the single `start` call a session
//! driver makes before doing anything else: a wide concurrent read fan-out,
//! then the same sequential session-open steps C9 performs, then health
//! classification and resume markdown.

pub mod git_diff;
pub mod health;
pub mod resume;
pub mod update_check;

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use muninn_config::config::StartupConfig;
use muninn_core::{MuninnError, ProjectId};
use muninn_db::adapter::DatabaseAdapter;

pub use health::HealthLevel;

#[derive(Clone, Debug)]
pub struct SmartStatus {
    pub health: HealthLevel,
    pub critical_issue_count: u32,
    pub open_issue_count: u32,
    pub tech_debt_count: u32,
    pub stale_file_count: u32,
    pub high_fragility_count: u32,
    pub had_ongoing_session: bool,
}

pub struct StartupResult {
    pub resume_md: String,
    pub smart_status: SmartStatus,
    pub session_id: i64,
    pub update_available: Option<String>,
}

/// Everything the planner needs besides `(db, project, project_path, goal)`:
/// the insight-generation config (passed through to [`muninn_session::start`])
/// plus where/how to run the update check.
pub struct StartupEnv<'a> {
    pub config: &'a StartupConfig,
    pub insight_config: &'a muninn_config::config::InsightConfig,
    pub current_version: &'a str,
    pub release_check_url: Option<&'a str>,
    pub update_cache_path: &'a Path,
}

const FRAGILE_THRESHOLD: u8 = 7;
const STALE_FILE_AGE_DAYS: f64 = 30.0;
const RESUME_FILE_LIST_LIMIT: usize = 10;
const RESUME_OBSERVATION_LIMIT: u32 = 5;

pub async fn start(
    db: &dyn DatabaseAdapter,
    project: ProjectId,
    project_path: &Path,
    goal: Option<&str>,
    env: &StartupEnv<'_>,
    at: DateTime<Utc>,
) -> Result<StartupResult, MuninnError> {
    let http = reqwest::Client::new();
    let git_diff_timeout = Duration::from_secs(env.config.git_diff_timeout_secs);

    let (
        last_sessions,
        decisions_due,
        new_insights,
        foundational_due,
        fragile_hot,
        critical_issues,
        ongoing_session,
        all_fragile,
        last_ended,
        tech_debt,
        open_issue_count,
        high_fragility_count,
        recent_observations,
        stale_file_count,
        diff,
        update_available,
    ) = tokio::join!(
        db.recent_sessions(project, 1),
        db.decisions_due_for_review(project),
        db.new_insights(project, 10),
        db.foundational_learnings_due(Some(project)),
        db.fragile_and_hot_files(project, 10),
        db.critical_open_issues(project),
        db.get_active_session(project),
        db.all_fragile_files(project, FRAGILE_THRESHOLD),
        db.get_last_ended_session(project),
        db.tech_debt_issues(project, 10),
        db.open_issue_count(project),
        db.high_fragility_file_count(project, FRAGILE_THRESHOLD),
        db.recent_observations(project, RESUME_OBSERVATION_LIMIT),
        db.stale_file_count(project, STALE_FILE_AGE_DAYS),
        git_diff::working_tree_diff(project_path, git_diff_timeout),
        maybe_check_update(&http, env, at),
    );

    let _ = last_sessions?;
    let decisions_due = decisions_due?;
    let new_insights = new_insights?;
    let foundational_due = foundational_due?;
    let fragile_hot = fragile_hot?;
    let critical_issues = critical_issues?;
    let had_ongoing_session = ongoing_session?.is_some();
    let all_fragile = all_fragile?;
    let last_ended = last_ended?;
    let tech_debt_count = tech_debt?.len() as u32;
    let open_issue_count = open_issue_count?;
    let high_fragility_count = high_fragility_count?;
    let recent_observations = recent_observations?;
    let stale_file_count = stale_file_count?;
    let _ = diff;

    let session = muninn_session::start(db, project, goal, env.insight_config, at).await?;

    let health = health::classify(
        env.config,
        critical_issues.len() as u32,
        open_issue_count,
        stale_file_count,
        high_fragility_count,
    );
    let smart_status = SmartStatus {
        health,
        critical_issue_count: critical_issues.len() as u32,
        open_issue_count,
        tech_debt_count,
        stale_file_count,
        high_fragility_count,
        had_ongoing_session,
    };

    let recent_files: Vec<String> =
        all_fragile.iter().take(RESUME_FILE_LIST_LIMIT).map(|f| f.path.clone()).collect();

    let ctx = resume::ResumeContext {
        health,
        decisions_due: &decisions_due,
        new_insights: &new_insights,
        foundational_due: &foundational_due,
        fragile_hot_files: &fragile_hot,
        recent_files: &recent_files,
        recent_observations: &recent_observations,
        last_ended_session: last_ended.as_ref(),
    };
    let resume_md = resume::render(&ctx);

    Ok(StartupResult { resume_md, smart_status, session_id: session.id, update_available })
}

async fn maybe_check_update(client: &reqwest::Client, env: &StartupEnv<'_>, at: DateTime<Utc>) -> Option<String> {
    let url = env.release_check_url?;
    update_check::check_for_update(client, url, env.current_version, env.update_cache_path, env.config.update_check_cache_hours, at)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use muninn_config::config::InsightConfig;
    use muninn_db::InMemoryAdapter;

    #[tokio::test]
    async fn test_start_returns_good_health_on_empty_project() {
        let db = InMemoryAdapter::new();
        let startup_config = StartupConfig::default();
        let insight_config = InsightConfig::default();
        let cache_dir = tempfile::tempdir().unwrap();
        let env = StartupEnv {
            config: &startup_config,
            insight_config: &insight_config,
            current_version: "0.1.0",
            release_check_url: None,
            update_cache_path: &cache_dir.path().join("update-check.json"),
        };
        let result = start(&db, 1, cache_dir.path(), Some("explore"), &env, Utc::now()).await.unwrap();
        assert_eq!(result.smart_status.health, HealthLevel::Good);
        assert!(result.update_available.is_none());
        assert!(result.resume_md.contains("Start the next session to continue."));
    }
}
