//! `muninn`: the CLI surface over the context-intelligence engine. Thin
//! dispatch only, mirroring the teacher's `cli-sub-agent::main` — business
//! logic lives in the library crates, this binary just parses args, opens
//! the database, and calls into them.

mod cli;
mod commands;
mod db;
mod project_id;

use clap::Parser;
use cli::{Cli, Commands};
use muninn_config::config::MuninnConfig;
use muninn_core::MuninnError;
use muninn_db::adapter::DatabaseAdapter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();

    let cli = Cli::parse();
    let exit_code = run(cli).await;
    std::process::exit(exit_code);
}

async fn run(cli: Cli) -> i32 {
    let project_root = match cli.cd {
        Some(path) => path,
        None => match std::env::current_dir() {
            Ok(cwd) => cwd,
            Err(e) => {
                eprintln!("could not resolve current directory: {e}");
                return 1;
            }
        },
    };

    let config = match MuninnConfig::load(&project_root) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("could not load configuration: {e:#}");
            return 1;
        }
    };

    let db_path = muninn_config::paths::project_db_path(&project_root);
    let adapter = match db::open(&db_path).await {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{e}");
            return exit_code_for(&e);
        }
    };

    let project = project_id::resolve(&project_root);

    let result = match cli.command {
        Commands::Start { goal } => {
            commands::start::run(&adapter, project, &project_root, &config, goal.as_deref()).await
        }
        Commands::End { outcome, success, next_steps, analyze } => {
            handle_end(&adapter, project, outcome.as_deref(), success, next_steps.as_deref(), analyze).await
        }
        Commands::Enrich { tool } => commands::enrich::run(&adapter, project, &config, &tool).await,
        Commands::Approve { operation_id } => commands::approve::run(&adapter, &operation_id).await,
    };

    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{e}");
            exit_code_for(&e)
        }
    }
}

async fn handle_end(
    adapter: &muninn_db::SqliteAdapter,
    project: muninn_core::ProjectId,
    outcome: Option<&str>,
    success: Option<u8>,
    next_steps: Option<&str>,
    analyze: bool,
) -> Result<(), MuninnError> {
    let active = adapter.get_active_session(project).await?.ok_or(MuninnError::NoActiveSession)?;
    let api_base_url = std::env::var("MUNINN_LLM_BASE_URL").ok();
    let api_key = std::env::var("MUNINN_LLM_API_KEY").ok();
    commands::end::run(
        adapter,
        project,
        active.id,
        outcome,
        success,
        next_steps,
        analyze,
        api_base_url.as_deref(),
        api_key.as_deref(),
    )
    .await
}

/// Maps the engine's error kinds onto process exit codes (spec.md §6).
fn exit_code_for(err: &MuninnError) -> i32 {
    match err {
        MuninnError::OversizedInput { .. } => 2,
        MuninnError::NotInitialized => 3,
        MuninnError::DbWriteFailed(_) | MuninnError::DbReadFailed(_) => 4,
        _ => 1,
    }
}
