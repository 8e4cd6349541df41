use std::path::Path;

use chrono::Utc;
use muninn_config::config::MuninnConfig;
use muninn_core::{MuninnError, ProjectId};
use muninn_db::SqliteAdapter;
use muninn_startup::StartupEnv;

pub async fn run(
    db: &SqliteAdapter,
    project: ProjectId,
    project_root: &Path,
    config: &MuninnConfig,
    goal: Option<&str>,
) -> Result<(), MuninnError> {
    let cache_path = muninn_config::paths::update_check_cache_path(project_root);
    let env = StartupEnv {
        config: &config.startup,
        insight_config: &config.insights,
        current_version: env!("CARGO_PKG_VERSION"),
        release_check_url: None,
        update_cache_path: &cache_path,
    };

    let result = muninn_startup::start(db, project, project_root, goal, &env, Utc::now()).await?;

    println!("{}", result.resume_md);
    println!("session {} opened, health: {:?}", result.session_id, result.smart_status.health);
    if let Some(version) = result.update_available {
        println!("update available: {version}");
    }
    Ok(())
}
