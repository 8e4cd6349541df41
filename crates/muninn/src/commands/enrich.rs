use std::io::Read as _;

use chrono::Utc;
use muninn_config::config::MuninnConfig;
use muninn_core::{MuninnError, ProjectId};
use muninn_db::SqliteAdapter;
use muninn_enrich::{EnrichCaches, EnricherRegistry};
use muninn_parser::RawInput;

/// Manual smoke-test entry point: reads one tool-call payload from stdin,
/// runs the full enrichment pipeline, and prints whatever would have been
/// injected. A long-lived host process would instead keep `EnrichCaches`
/// and `EnricherRegistry` alive across many calls; this command builds
/// fresh ones each run, matching its one-shot CLI purpose.
pub async fn run(db: &SqliteAdapter, project: ProjectId, config: &MuninnConfig, tool: &str) -> Result<(), MuninnError> {
    let mut raw = String::new();
    std::io::stdin().read_to_string(&mut raw).map_err(|e| MuninnError::DbReadFailed(e.to_string()))?;
    let input: RawInput = match serde_json::from_str::<serde_json::Value>(&raw) {
        Ok(value) => RawInput::Structured(value),
        Err(_) => RawInput::FreeString(raw),
    };

    let caches = EnrichCaches::new(config.cache.capacity);
    let registry = EnricherRegistry::new();

    let result = muninn_enrich::enrich(db, &caches, config, &registry, project, tool, input, Utc::now()).await?;

    if let Some(context) = &result.context {
        println!("{context}");
    } else {
        println!("(nothing injected)");
    }
    eprintln!(
        "enrichers used: {:?}, tokens: {}, blocked: {:?}",
        result.enrichers_used, result.total_tokens, result.blocked
    );
    Ok(())
}
