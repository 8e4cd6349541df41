//! `blocker` — priority 20, write-only (spec.md §4.5/§4.6).
//!
//! The only enricher with side effects: a hard block creates a pending
//! approval row. Its output is never a normal priority record — the engine
//! prepends it to the assembled context as the block message.

use std::time::Duration;

use chrono::{DateTime, Utc};
use muninn_cache::Cache;
use muninn_config::config::FragilityThresholds;
use muninn_core::{BlockLevel, MuninnError, ProjectId, Tool};
use muninn_db::adapter::DatabaseAdapter;
use muninn_db::rows::FileRow;
use muninn_format::{format_blocked, format_approval_required, format_warning};

use super::support::fetch_file;
use crate::approval::create_hard_block;

#[derive(Clone, Debug, Default)]
pub struct BlockOutcome {
    pub level: Option<BlockLevel>,
    pub message: Option<String>,
    pub operation_id: Option<String>,
}

/// Finds the most-fragile known input file and compares it against
/// `thresholds`. Non-write tools and empty/unknown file lists never block.
#[allow(clippy::too_many_arguments)]
pub async fn run(
    db: &dyn DatabaseAdapter,
    file_cache: &Cache<FileRow>,
    cache_ttl: Option<Duration>,
    thresholds: FragilityThresholds,
    project: ProjectId,
    tool: Tool,
    files: &[String],
    at: DateTime<Utc>,
) -> Result<BlockOutcome, MuninnError> {
    if !tool.is_write_like() || files.is_empty() {
        return Ok(BlockOutcome::default());
    }

    let mut worst: Option<(String, u8)> = None;
    for path in files {
        if let Some(row) = fetch_file(db, file_cache, cache_ttl, project, path).await? {
            let is_worse = worst.as_ref().is_none_or(|(_, f)| row.fragility > *f);
            if is_worse {
                worst = Some((row.path.clone(), row.fragility));
            }
        }
    }
    let Some((path, fragility)) = worst else {
        return Ok(BlockOutcome::default());
    };

    if fragility >= thresholds.hard {
        let reason = format!("Fragility {fragility}/10 - This file is critical.");
        let operation_id =
            create_hard_block(db, project, tool.as_str(), &path, &reason, at).await?;
        let message = format!(
            "{}\nFile: {path}\n{}",
            format_blocked(&reason),
            format_approval_required(&operation_id),
        );
        Ok(BlockOutcome { level: Some(BlockLevel::Hard), message: Some(message), operation_id: Some(operation_id) })
    } else if fragility >= thresholds.soft {
        let reason = format!("Fragility {fragility}/10 - exercise caution, explain your approach.");
        let message = format!("{}\nFile: {path}", format_blocked(&reason));
        Ok(BlockOutcome { level: Some(BlockLevel::Soft), message: Some(message), operation_id: None })
    } else if fragility >= thresholds.warn {
        let reason = format!("Fragility {fragility}/10 - handle with care.");
        let message = format!("{}\nFile: {path}", format_warning(&reason));
        Ok(BlockOutcome { level: Some(BlockLevel::Warn), message: Some(message), operation_id: None })
    } else {
        Ok(BlockOutcome::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use muninn_db::rows::{FileStatus, FileType, FragilitySignals};
    use muninn_db::InMemoryAdapter;
    use muninn_core::Temperature;
    use std::collections::BTreeSet;

    fn row(path: &str, fragility: u8) -> FileRow {
        FileRow {
            id: 0,
            project_id: 1,
            path: path.to_string(),
            file_type: FileType::Service,
            purpose: None,
            fragility,
            fragility_reason: None,
            fragility_signals: FragilitySignals::default(),
            content_hash: None,
            last_analyzed: None,
            dependencies: BTreeSet::new(),
            dependents: BTreeSet::new(),
            velocity_score: 0.0,
            change_count: 0,
            temperature: Temperature::Hot,
            last_referenced_at: None,
            status: FileStatus::Active,
        }
    }

    #[tokio::test]
    async fn test_hard_block_creates_approval_and_message() {
        let db = InMemoryAdapter::new();
        db.upsert_file(&row("src/db.ts", 9)).await.unwrap();
        let cache = Cache::new(10);
        let outcome = run(
            &db, &cache, None, FragilityThresholds::default(), 1, Tool::Edit,
            &["src/db.ts".to_string()], Utc::now(),
        ).await.unwrap();
        assert_eq!(outcome.level, Some(BlockLevel::Hard));
        assert!(outcome.message.as_ref().unwrap().starts_with("!BLOCKED: Fragility 9/10 - This file is critical."));
        assert!(outcome.operation_id.is_some());
    }

    #[tokio::test]
    async fn test_soft_block_has_no_approval() {
        let db = InMemoryAdapter::new();
        db.upsert_file(&row("src/cache.ts", 8)).await.unwrap();
        let cache = Cache::new(10);
        let outcome = run(
            &db, &cache, None, FragilityThresholds::default(), 1, Tool::Edit,
            &["src/cache.ts".to_string()], Utc::now(),
        ).await.unwrap();
        assert_eq!(outcome.level, Some(BlockLevel::Soft));
        assert!(outcome.operation_id.is_none());
    }

    #[tokio::test]
    async fn test_warn_level_only_warns() {
        let db = InMemoryAdapter::new();
        db.upsert_file(&row("src/util.ts", 7)).await.unwrap();
        let cache = Cache::new(10);
        let outcome = run(
            &db, &cache, None, FragilityThresholds::default(), 1, Tool::Write,
            &["src/util.ts".to_string()], Utc::now(),
        ).await.unwrap();
        assert_eq!(outcome.level, Some(BlockLevel::Warn));
        assert!(outcome.message.unwrap().starts_with("!WARNING:"));
    }

    #[tokio::test]
    async fn test_below_warn_threshold_no_block() {
        let db = InMemoryAdapter::new();
        db.upsert_file(&row("src/util.ts", 3)).await.unwrap();
        let cache = Cache::new(10);
        let outcome = run(
            &db, &cache, None, FragilityThresholds::default(), 1, Tool::Edit,
            &["src/util.ts".to_string()], Utc::now(),
        ).await.unwrap();
        assert!(outcome.level.is_none());
    }

    #[tokio::test]
    async fn test_read_only_tool_never_blocks() {
        let db = InMemoryAdapter::new();
        db.upsert_file(&row("src/db.ts", 10)).await.unwrap();
        let cache = Cache::new(10);
        let outcome = run(
            &db, &cache, None, FragilityThresholds::default(), 1, Tool::Read,
            &["src/db.ts".to_string()], Utc::now(),
        ).await.unwrap();
        assert!(outcome.level.is_none());
    }
}
