//! `SqliteAdapter`: the production `DatabaseAdapter`, backed by `sqlx`.
//!
//! Grounded on oldnordic-odincode's `StorageManager` (bind-param queries,
//! `Row` extraction, JSON-encoded array columns) with one deliberate
//! difference: this adapter never issues `CREATE TABLE`. Schema and
//! migrations are an external collaborator's responsibility (spec.md §1) —
//! `SqliteAdapter::new` just wraps a pool that already points at an
//! initialized database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use muninn_core::{MuninnError, ProjectId};
use sqlx::{Row, SqlitePool};

use crate::adapter::{DatabaseAdapter, DbResult, SessionTrackingField};
use crate::rows::*;

pub struct SqliteAdapter {
    pool: SqlitePool,
}

impl SqliteAdapter {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn db_err(context: &str) -> impl Fn(sqlx::Error) -> MuninnError + '_ {
        move |e| MuninnError::DbReadFailed(format!("{context}: {e}"))
    }

    fn write_err(context: &str) -> impl Fn(sqlx::Error) -> MuninnError + '_ {
        move |e| MuninnError::DbWriteFailed(format!("{context}: {e}"))
    }

    fn json_col<T: serde::de::DeserializeOwned + Default>(raw: Option<String>) -> T {
        raw.and_then(|s| serde_json::from_str(&s).ok()).unwrap_or_default()
    }

    /// Stamp `archived_at` on a matched `learnings` row and mirror it into
    /// `archived_knowledge`, used by both learning-archival variants.
    async fn archive_learning_rows(
        &self,
        rows: &[sqlx::sqlite::SqliteRow],
        at: DateTime<Utc>,
        reason: &str,
    ) -> DbResult<u32> {
        let mut n = 0;
        for row in rows {
            let id: i64 = row.try_get("id").unwrap_or_default();
            let title: String = row.try_get("title").unwrap_or_default();
            let content: String = row.try_get("content").unwrap_or_default();
            sqlx::query("UPDATE learnings SET archived_at = ? WHERE id = ?")
                .bind(at)
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(Self::write_err("archive_learning_rows:update"))?;
            self.insert_archived_row("learnings", id, &title, &content, reason, at).await?;
            n += 1;
        }
        Ok(n)
    }

    /// Mirror an archived row into `archived_knowledge` (spec.md §4.7
    /// "every archival writes a corresponding `archived_knowledge` row").
    async fn insert_archived_row(
        &self,
        source_table: &str,
        source_id: i64,
        title: &str,
        content: &str,
        reason: &str,
        at: DateTime<Utc>,
    ) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO archived_knowledge (source_table, source_id, title, content, reason, archived_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(source_table)
        .bind(source_id)
        .bind(title)
        .bind(content)
        .bind(reason)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(Self::write_err("insert_archived_row"))?;
        Ok(())
    }

    fn file_from_row(row: &sqlx::sqlite::SqliteRow) -> DbResult<FileRow> {
        let file_type: String = row.try_get("file_type").unwrap_or_default();
        let status: String = row.try_get("status").unwrap_or_default();
        let temperature: String = row.try_get("temperature").unwrap_or_default();
        Ok(FileRow {
            id: row.try_get("id").unwrap_or_default(),
            project_id: row.try_get("project_id").unwrap_or_default(),
            path: row.try_get("path").unwrap_or_default(),
            file_type: parse_file_type(&file_type),
            purpose: row.try_get("purpose").ok(),
            fragility: row.try_get::<i64, _>("fragility").unwrap_or(0) as u8,
            fragility_reason: row.try_get("fragility_reason").ok(),
            fragility_signals: Self::json_col(row.try_get("fragility_signals").ok()),
            content_hash: row.try_get("content_hash").ok(),
            last_analyzed: row.try_get("last_analyzed").ok(),
            dependencies: Self::json_col(row.try_get("dependencies").ok()),
            dependents: Self::json_col(row.try_get("dependents").ok()),
            velocity_score: row.try_get("velocity_score").unwrap_or(0.0),
            change_count: row.try_get::<i64, _>("change_count").unwrap_or(0) as u32,
            temperature: temperature.parse().unwrap_or(muninn_core::Temperature::Warm),
            last_referenced_at: row.try_get("last_referenced_at").ok(),
            status: parse_file_status(&status),
        })
    }
}

fn parse_file_type(s: &str) -> FileType {
    match s {
        "component" => FileType::Component,
        "route" => FileType::Route,
        "util" => FileType::Util,
        "config" => FileType::Config,
        "schema" => FileType::Schema,
        "service" => FileType::Service,
        "hook" => FileType::Hook,
        "middleware" => FileType::Middleware,
        "test" => FileType::Test,
        _ => FileType::Other,
    }
}

fn parse_file_status(s: &str) -> FileStatus {
    match s {
        "deprecated" => FileStatus::Deprecated,
        "do_not_touch" => FileStatus::DoNotTouch,
        "generated" => FileStatus::Generated,
        _ => FileStatus::Active,
    }
}

#[async_trait]
impl DatabaseAdapter for SqliteAdapter {
    async fn get_file(&self, project: ProjectId, path: &str) -> DbResult<Option<FileRow>> {
        let row = sqlx::query("SELECT * FROM files WHERE project_id = ? AND path = ?")
            .bind(project)
            .bind(path)
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::db_err("get_file"))?;
        row.as_ref().map(Self::file_from_row).transpose()
    }

    async fn upsert_file(&self, file: &FileRow) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO files (project_id, path, file_type, purpose, fragility, fragility_reason,
                fragility_signals, content_hash, last_analyzed, dependencies, dependents,
                velocity_score, change_count, temperature, last_referenced_at, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(project_id, path) DO UPDATE SET
                fragility = excluded.fragility,
                fragility_reason = excluded.fragility_reason,
                fragility_signals = excluded.fragility_signals,
                content_hash = excluded.content_hash,
                last_analyzed = excluded.last_analyzed,
                dependencies = excluded.dependencies,
                dependents = excluded.dependents,
                velocity_score = excluded.velocity_score,
                change_count = excluded.change_count,
                temperature = excluded.temperature,
                last_referenced_at = excluded.last_referenced_at,
                status = excluded.status
            "#,
        )
        .bind(file.project_id)
        .bind(&file.path)
        .bind(format!("{:?}", file.file_type).to_lowercase())
        .bind(&file.purpose)
        .bind(file.fragility as i64)
        .bind(&file.fragility_reason)
        .bind(serde_json::to_string(&file.fragility_signals).unwrap_or_default())
        .bind(&file.content_hash)
        .bind(file.last_analyzed)
        .bind(serde_json::to_string(&file.dependencies).unwrap_or_default())
        .bind(serde_json::to_string(&file.dependents).unwrap_or_default())
        .bind(file.velocity_score)
        .bind(file.change_count as i64)
        .bind(file.temperature.as_str())
        .bind(file.last_referenced_at)
        .bind(format!("{:?}", file.status).to_lowercase())
        .execute(&self.pool)
        .await
        .map_err(Self::write_err("upsert_file"))?;
        Ok(())
    }

    async fn fragile_and_hot_files(&self, project: ProjectId, limit: u32) -> DbResult<Vec<FileRow>> {
        let rows = sqlx::query(
            "SELECT * FROM files WHERE project_id = ? AND fragility >= 7 AND temperature = 'hot' \
             ORDER BY fragility DESC LIMIT ?",
        )
        .bind(project)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::db_err("fragile_and_hot_files"))?;
        rows.iter().map(Self::file_from_row).collect()
    }

    async fn all_fragile_files(&self, project: ProjectId, threshold: u8) -> DbResult<Vec<FileRow>> {
        let rows = sqlx::query("SELECT * FROM files WHERE project_id = ? AND fragility >= ? ORDER BY fragility DESC")
            .bind(project)
            .bind(threshold as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(Self::db_err("all_fragile_files"))?;
        rows.iter().map(Self::file_from_row).collect()
    }

    async fn stale_file_count(&self, project: ProjectId, days: f64) -> DbResult<u32> {
        let row = sqlx::query(
            "SELECT COUNT(*) as c FROM files WHERE project_id = ? \
             AND julianday('now') - julianday(last_referenced_at) > ?",
        )
        .bind(project)
        .bind(days)
        .fetch_one(&self.pool)
        .await
        .map_err(Self::db_err("stale_file_count"))?;
        Ok(row.try_get::<i64, _>("c").unwrap_or(0) as u32)
    }

    async fn decay_file_temperatures(&self, project: ProjectId, at: DateTime<Utc>) -> DbResult<u32> {
        let result = sqlx::query(
            r#"
            UPDATE files SET temperature = CASE
                WHEN julianday(?) - julianday(last_referenced_at) > 30 THEN 'cold'
                WHEN julianday(?) - julianday(last_referenced_at) > 7 THEN 'warm'
                ELSE 'hot'
            END
            WHERE project_id = ?
            "#,
        )
        .bind(at)
        .bind(at)
        .bind(project)
        .execute(&self.pool)
        .await
        .map_err(Self::write_err("decay_file_temperatures"))?;
        Ok(result.rows_affected() as u32)
    }

    async fn active_decisions_affecting(
        &self,
        project: ProjectId,
        files: &[String],
    ) -> DbResult<Vec<DecisionRow>> {
        let affects_json = serde_json::to_string(files).unwrap_or_default();
        let rows = sqlx::query(
            r#"
            SELECT d.* FROM decisions d, json_each(?) f
            WHERE d.project_id = ? AND d.status = 'active'
              AND EXISTS (SELECT 1 FROM json_each(d.affects) a WHERE a.value = f.value)
            "#,
        )
        .bind(affects_json)
        .bind(project)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::db_err("active_decisions_affecting"))?;
        rows.iter().map(decision_from_row).collect()
    }

    async fn decisions_due_for_review(&self, project: ProjectId) -> DbResult<Vec<DecisionRow>> {
        let rows = sqlx::query(
            "SELECT * FROM decisions WHERE project_id = ? AND status = 'active' \
             AND sessions_since >= check_after_sessions",
        )
        .bind(project)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::db_err("decisions_due_for_review"))?;
        rows.iter().map(decision_from_row).collect()
    }

    async fn get_decision(&self, id: i64) -> DbResult<Option<DecisionRow>> {
        let row = sqlx::query("SELECT * FROM decisions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::db_err("get_decision"))?;
        row.as_ref().map(decision_from_row).transpose()
    }

    async fn insert_decision(&self, row: &DecisionRow) -> DbResult<i64> {
        let res = sqlx::query(
            "INSERT INTO decisions (project_id, title, decision, reasoning, affects, status, \
             outcome_status, outcome_notes, check_after_sessions, sessions_since, temperature, \
             decided_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(row.project_id)
        .bind(&row.title)
        .bind(&row.decision)
        .bind(&row.reasoning)
        .bind(serde_json::to_string(&row.affects).unwrap_or_default())
        .bind("active")
        .bind("pending")
        .bind(serde_json::to_string(&OutcomeNotes::default()).unwrap_or_default())
        .bind(row.check_after_sessions as i64)
        .bind(0i64)
        .bind(row.temperature.as_str())
        .bind(row.decided_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await
        .map_err(Self::write_err("insert_decision"))?;
        Ok(res.last_insert_rowid())
    }

    async fn update_decision_outcome(
        &self,
        id: i64,
        outcome_status: OutcomeStatus,
        positive_delta: i32,
        negative_delta: i32,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE decisions SET outcome_status = ?,
                outcome_notes = json_set(
                    coalesce(outcome_notes, '{"positive":0,"negative":0}'),
                    '$.positive', json_extract(coalesce(outcome_notes, '{"positive":0,"negative":0}'), '$.positive') + ?,
                    '$.negative', json_extract(coalesce(outcome_notes, '{"positive":0,"negative":0}'), '$.negative') + ?
                )
            WHERE id = ?
            "#,
        )
        .bind(outcome_status_str(outcome_status))
        .bind(positive_delta)
        .bind(negative_delta)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Self::write_err("update_decision_outcome"))?;
        Ok(())
    }

    async fn decay_decision_temperatures(&self, project: ProjectId, at: DateTime<Utc>) -> DbResult<u32> {
        let result = sqlx::query(
            "UPDATE decisions SET temperature = CASE \
                WHEN julianday(?) - julianday(last_referenced_at) > 30 THEN 'cold' \
                WHEN julianday(?) - julianday(last_referenced_at) > 7 THEN 'warm' \
                ELSE 'hot' END \
             WHERE project_id = ?",
        )
        .bind(at)
        .bind(at)
        .bind(project)
        .execute(&self.pool)
        .await
        .map_err(Self::write_err("decay_decision_temperatures"))?;
        Ok(result.rows_affected() as u32)
    }

    async fn increment_pending_decision_sessions_since(&self, project: ProjectId) -> DbResult<u32> {
        let result = sqlx::query("UPDATE decisions SET sessions_since = sessions_since + 1 WHERE project_id = ? AND status = 'active'")
            .bind(project)
            .execute(&self.pool)
            .await
            .map_err(Self::write_err("increment_pending_decision_sessions_since"))?;
        Ok(result.rows_affected() as u32)
    }

    async fn open_issues_for_files(
        &self,
        project: ProjectId,
        files: &[String],
        limit: u32,
    ) -> DbResult<Vec<IssueRow>> {
        let files_json = serde_json::to_string(files).unwrap_or_default();
        let rows = sqlx::query(
            r#"
            SELECT i.* FROM issues i, json_each(?) f
            WHERE i.project_id = ? AND i.status = 'open'
              AND EXISTS (SELECT 1 FROM json_each(i.affected_files) a WHERE a.value = f.value)
            ORDER BY i.severity DESC LIMIT ?
            "#,
        )
        .bind(files_json)
        .bind(project)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::db_err("open_issues_for_files"))?;
        rows.iter().map(issue_from_row).collect()
    }

    async fn critical_open_issues(&self, project: ProjectId) -> DbResult<Vec<IssueRow>> {
        let rows = sqlx::query(
            "SELECT * FROM issues WHERE project_id = ? AND status = 'open' AND severity >= 80 \
             ORDER BY severity DESC",
        )
        .bind(project)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::db_err("critical_open_issues"))?;
        rows.iter().map(issue_from_row).collect()
    }

    async fn open_issue_count(&self, project: ProjectId) -> DbResult<u32> {
        let row = sqlx::query("SELECT COUNT(*) as c FROM issues WHERE project_id = ? AND status = 'open'")
            .bind(project)
            .fetch_one(&self.pool)
            .await
            .map_err(Self::db_err("open_issue_count"))?;
        Ok(row.try_get::<i64, _>("c").unwrap_or(0) as u32)
    }

    async fn insert_issue(&self, row: &IssueRow) -> DbResult<i64> {
        let res = sqlx::query(
            "INSERT INTO issues (project_id, issue_type, title, severity, status, affected_files, \
             related_symbols, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(row.project_id)
        .bind(format!("{:?}", row.issue_type).to_lowercase())
        .bind(&row.title)
        .bind(row.severity as i64)
        .bind("open")
        .bind(serde_json::to_string(&row.affected_files).unwrap_or_default())
        .bind(serde_json::to_string(&row.related_symbols).unwrap_or_default())
        .bind(row.updated_at)
        .execute(&self.pool)
        .await
        .map_err(Self::write_err("insert_issue"))?;
        Ok(res.last_insert_rowid())
    }

    async fn resolve_issue(&self, id: i64, at: DateTime<Utc>) -> DbResult<()> {
        sqlx::query("UPDATE issues SET status = 'resolved', resolved_at = ? WHERE id = ?")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Self::write_err("resolve_issue"))?;
        Ok(())
    }

    async fn tech_debt_issues(&self, project: ProjectId, limit: u32) -> DbResult<Vec<IssueRow>> {
        let rows = sqlx::query(
            "SELECT * FROM issues WHERE project_id = ? AND issue_type = 'tech_debt' \
             AND status = 'open' ORDER BY severity DESC LIMIT ?",
        )
        .bind(project)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::db_err("tech_debt_issues"))?;
        rows.iter().map(issue_from_row).collect()
    }

    async fn search_learnings_fts(
        &self,
        project: Option<ProjectId>,
        terms: &str,
        limit: u32,
    ) -> DbResult<Vec<LearningRow>> {
        let rows = sqlx::query(
            r#"
            SELECT l.* FROM learnings l
            JOIN fts_learnings fts ON fts.rowid = l.id
            WHERE fts_learnings MATCH ? AND (l.project_id IS NULL OR l.project_id = ?)
              AND l.archived_at IS NULL
            ORDER BY rank LIMIT ?
            "#,
        )
        .bind(terms)
        .bind(project)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::db_err("search_learnings_fts"))?;
        rows.iter().map(learning_from_row).collect()
    }

    async fn search_learnings_like(
        &self,
        project: Option<ProjectId>,
        terms: &str,
        limit: u32,
    ) -> DbResult<Vec<LearningRow>> {
        let pattern = format!("%{terms}%");
        let rows = sqlx::query(
            "SELECT * FROM learnings WHERE (content LIKE ? OR title LIKE ?) \
             AND (project_id IS NULL OR project_id = ?) AND archived_at IS NULL \
             ORDER BY confidence DESC LIMIT ?",
        )
        .bind(&pattern)
        .bind(&pattern)
        .bind(project)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::db_err("search_learnings_like"))?;
        rows.iter().map(learning_from_row).collect()
    }

    async fn gotcha_learnings(&self, project: Option<ProjectId>, limit: u32) -> DbResult<Vec<LearningRow>> {
        let rows = sqlx::query(
            "SELECT * FROM learnings WHERE category = 'gotcha' \
             AND (project_id IS NULL OR project_id = ?) AND archived_at IS NULL \
             ORDER BY confidence DESC LIMIT ?",
        )
        .bind(project)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::db_err("gotcha_learnings"))?;
        rows.iter().map(learning_from_row).collect()
    }

    async fn get_learning(&self, id: i64) -> DbResult<Option<LearningRow>> {
        let row = sqlx::query("SELECT * FROM learnings WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::db_err("get_learning"))?;
        row.as_ref().map(learning_from_row).transpose()
    }

    async fn insert_learning(&self, row: &LearningRow) -> DbResult<i64> {
        let res = sqlx::query(
            "INSERT INTO learnings (project_id, category, title, content, context, confidence, \
             decay_rate, temperature, review_status, review_after_sessions, foundational, \
             promotion_status, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(row.project_id)
        .bind(format!("{:?}", row.category).to_lowercase())
        .bind(&row.title)
        .bind(&row.content)
        .bind(&row.context)
        .bind(row.confidence)
        .bind(row.decay_rate)
        .bind(row.temperature.as_str())
        .bind("pending")
        .bind(row.review_after_sessions as i64)
        .bind(row.foundational)
        .bind("not_ready")
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await
        .map_err(Self::write_err("insert_learning"))?;
        Ok(res.last_insert_rowid())
    }

    async fn reinforce_learning(&self, id: i64, at: DateTime<Utc>) -> DbResult<()> {
        sqlx::query(
            "UPDATE learnings SET times_applied = times_applied + 1, \
             times_confirmed = times_confirmed + 1, last_reinforced_at = ?, \
             auto_reinforcement_count = auto_reinforcement_count + 1, \
             confidence = MIN(10.0, confidence + 0.5) WHERE id = ?",
        )
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Self::write_err("reinforce_learning"))?;
        Ok(())
    }

    async fn reduce_learning_confidence(&self, id: i64, new_confidence: f64) -> DbResult<()> {
        sqlx::query("UPDATE learnings SET confidence = ? WHERE id = ?")
            .bind(new_confidence)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Self::write_err("reduce_learning_confidence"))?;
        Ok(())
    }

    async fn set_learning_temperature(&self, id: i64, temperature: muninn_core::Temperature) -> DbResult<()> {
        sqlx::query("UPDATE learnings SET temperature = ? WHERE id = ?")
            .bind(temperature.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Self::write_err("set_learning_temperature"))?;
        Ok(())
    }

    async fn flag_learning_for_review(&self, id: i64) -> DbResult<()> {
        sqlx::query("UPDATE learnings SET review_status = 'pending', sessions_since_review = 0 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Self::write_err("flag_learning_for_review"))?;
        Ok(())
    }

    async fn foundational_learnings_due(&self, project: Option<ProjectId>) -> DbResult<Vec<LearningRow>> {
        let rows = sqlx::query(
            "SELECT * FROM learnings WHERE foundational = 1 \
             AND sessions_since_review >= review_after_sessions \
             AND (project_id IS NULL OR project_id = ?) AND archived_at IS NULL",
        )
        .bind(project)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::db_err("foundational_learnings_due"))?;
        rows.iter().map(learning_from_row).collect()
    }

    async fn increment_foundational_learning_sessions_since_review(&self, project: Option<ProjectId>) -> DbResult<u32> {
        let result = sqlx::query(
            "UPDATE learnings SET sessions_since_review = sessions_since_review + 1 \
             WHERE foundational = 1 AND archived_at IS NULL AND (project_id IS NULL OR project_id = ?)",
        )
        .bind(project)
        .execute(&self.pool)
        .await
        .map_err(Self::write_err("increment_foundational_learning_sessions_since_review"))?;
        Ok(result.rows_affected() as u32)
    }

    async fn mark_learning_candidate(&self, id: i64) -> DbResult<()> {
        sqlx::query("UPDATE learnings SET promotion_status = 'candidate' WHERE id = ? AND promotion_status = 'not_ready'")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Self::write_err("mark_learning_candidate"))?;
        Ok(())
    }

    async fn promote_learning(&self, id: i64) -> DbResult<()> {
        sqlx::query("UPDATE learnings SET promotion_status = 'promoted' WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Self::write_err("promote_learning"))?;
        Ok(())
    }

    async fn demote_learning(&self, id: i64) -> DbResult<()> {
        sqlx::query(
            "UPDATE learnings SET \
             promotion_status = CASE WHEN promotion_status = 'promoted' THEN 'demoted' ELSE 'not_ready' END, \
             review_after_sessions = 30, times_confirmed = 0 WHERE id = ?",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Self::write_err("demote_learning"))?;
        Ok(())
    }

    async fn archive_stale_learnings(
        &self,
        project: ProjectId,
        confidence_threshold: f64,
        age_days: i64,
        at: DateTime<Utc>,
    ) -> DbResult<u32> {
        let rows = sqlx::query(
            "SELECT id, title, content FROM learnings WHERE project_id = ? AND archived_at IS NULL \
             AND confidence < ? AND julianday(?) - julianday(created_at) > ?",
        )
        .bind(project)
        .bind(confidence_threshold)
        .bind(at)
        .bind(age_days as f64)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::db_err("archive_stale_learnings"))?;
        self.archive_learning_rows(&rows, at, "stale: low confidence, aged out").await
    }

    async fn archive_unreinforced_learnings(
        &self,
        project: ProjectId,
        confidence_threshold: f64,
        age_days: i64,
        at: DateTime<Utc>,
    ) -> DbResult<u32> {
        let rows = sqlx::query(
            "SELECT id, title, content FROM learnings WHERE project_id = ? AND archived_at IS NULL \
             AND confidence < ? AND auto_reinforcement_count = 0 \
             AND julianday(?) - julianday(updated_at) > ?",
        )
        .bind(project)
        .bind(confidence_threshold)
        .bind(at)
        .bind(age_days as f64)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::db_err("archive_unreinforced_learnings"))?;
        self.archive_learning_rows(&rows, at, "never reinforced, low confidence").await
    }

    async fn archive_failed_decisions(&self, project: ProjectId, age_days: i64, at: DateTime<Utc>) -> DbResult<u32> {
        let rows = sqlx::query(
            "SELECT id, title, decision FROM decisions WHERE project_id = ? AND archived_at IS NULL \
             AND outcome_status = 'failed' AND julianday(?) - julianday(updated_at) > ?",
        )
        .bind(project)
        .bind(at)
        .bind(age_days as f64)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::db_err("archive_failed_decisions"))?;
        let mut n = 0;
        for row in &rows {
            let id: i64 = row.try_get("id").unwrap_or_default();
            let title: String = row.try_get("title").unwrap_or_default();
            let content: String = row.try_get("decision").unwrap_or_default();
            sqlx::query("UPDATE decisions SET archived_at = ? WHERE id = ?")
                .bind(at)
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(Self::write_err("archive_failed_decisions:update"))?;
            self.insert_archived_row("decisions", id, &title, &content, "failed outcome, aged out", at).await?;
            n += 1;
        }
        Ok(n)
    }

    async fn archive_resolved_issues(&self, project: ProjectId, age_days: i64, at: DateTime<Utc>) -> DbResult<u32> {
        let rows = sqlx::query(
            "SELECT id, title FROM issues WHERE project_id = ? AND status = 'resolved' \
             AND resolved_at IS NOT NULL AND julianday(?) - julianday(resolved_at) > ?",
        )
        .bind(project)
        .bind(at)
        .bind(age_days as f64)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::db_err("archive_resolved_issues"))?;
        let mut n = 0;
        for row in &rows {
            let id: i64 = row.try_get("id").unwrap_or_default();
            let title: String = row.try_get("title").unwrap_or_default();
            self.insert_archived_row("issues", id, &title, "", "resolved, aged out", at).await?;
            n += 1;
        }
        Ok(n)
    }

    async fn restore_from_archive(&self, table: &str, id: i64) -> DbResult<()> {
        if table != "learnings" && table != "decisions" {
            return Err(MuninnError::RestoreNotPermitted(table.to_string()));
        }
        let query = format!("UPDATE {table} SET archived_at = NULL WHERE id = ?");
        sqlx::query(&query)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Self::write_err("restore_from_archive"))?;
        Ok(())
    }

    async fn create_pending_approval(
        &self,
        project: ProjectId,
        operation_id: &str,
        tool: &str,
        file_path: &str,
        reason: &str,
        block_level: BlockLevelDb,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO pending_approvals (operation_id, project_id, tool, file_path, reason, \
             block_level, created_at, expires_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(operation_id)
        .bind(project)
        .bind(tool)
        .bind(file_path)
        .bind(reason)
        .bind(format!("{block_level:?}").to_lowercase())
        .bind(created_at)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(Self::write_err("create_pending_approval"))?;
        Ok(())
    }

    async fn get_pending_approval(&self, operation_id: &str) -> DbResult<Option<PendingApprovalRow>> {
        let row = sqlx::query("SELECT * FROM pending_approvals WHERE operation_id = ?")
            .bind(operation_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::db_err("get_pending_approval"))?;
        row.as_ref().map(approval_from_row).transpose()
    }

    async fn approve(&self, operation_id: &str, at: DateTime<Utc>) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE pending_approvals SET approved_at = ? \
             WHERE operation_id = ? AND approved_at IS NULL AND expires_at > ?",
        )
        .bind(at)
        .bind(operation_id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(Self::write_err("approve"))?;
        Ok(result.rows_affected() == 1)
    }

    async fn get_blast_summary(&self, project: ProjectId, file: &str) -> DbResult<Option<BlastSummary>> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE distance = 1) as direct,
                COUNT(*) FILTER (WHERE distance > 1) as transitive,
                COUNT(*) FILTER (WHERE is_test) as tests
            FROM blast_radius WHERE project_id = ? AND source_file = ?
            "#,
        )
        .bind(project)
        .bind(file)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::db_err("get_blast_summary"))?;
        Ok(row.map(|r| {
            let direct = r.try_get::<i64, _>("direct").unwrap_or(0) as u32;
            let transitive = r.try_get::<i64, _>("transitive").unwrap_or(0) as u32;
            let tests = r.try_get::<i64, _>("tests").unwrap_or(0) as u32;
            BlastSummary {
                blast_score: (4 * direct + 2 * transitive + 5 * tests).min(100),
                direct_dependents: direct,
                transitive_dependents: transitive,
                affected_tests: tests,
                affected_routes: 0,
            }
        }))
    }

    async fn get_symbols(&self, project: ProjectId, file: &str) -> DbResult<Vec<SymbolRow>> {
        let rows = sqlx::query("SELECT * FROM symbols WHERE project_id = ? AND file_path = ?")
            .bind(project)
            .bind(file)
            .fetch_all(&self.pool)
            .await
            .map_err(Self::db_err("get_symbols"))?;
        Ok(rows
            .iter()
            .map(|r| SymbolRow {
                file_path: r.try_get("file_path").unwrap_or_default(),
                name: r.try_get("name").unwrap_or_default(),
                exported: r.try_get("exported").unwrap_or(false),
            })
            .collect())
    }

    async fn get_callers(&self, project: ProjectId, file: &str) -> DbResult<Vec<CallGraphRow>> {
        let rows = sqlx::query("SELECT * FROM call_graph WHERE project_id = ? AND callee_file = ?")
            .bind(project)
            .bind(file)
            .fetch_all(&self.pool)
            .await
            .map_err(Self::db_err("get_callers"))?;
        Ok(rows
            .iter()
            .map(|r| CallGraphRow {
                callee_file: r.try_get("callee_file").unwrap_or_default(),
                caller_file: r.try_get("caller_file").unwrap_or_default(),
            })
            .collect())
    }

    async fn get_test_source_map(
        &self,
        project: ProjectId,
        file: &str,
    ) -> DbResult<Vec<TestSourceMapRow>> {
        let rows = sqlx::query(
            "SELECT * FROM test_source_map WHERE project_id = ? AND source_file = ?",
        )
        .bind(project)
        .bind(file)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::db_err("get_test_source_map"))?;
        Ok(rows
            .iter()
            .map(|r| TestSourceMapRow {
                source_file: r.try_get("source_file").unwrap_or_default(),
                test_file: r.try_get("test_file").unwrap_or_default(),
            })
            .collect())
    }

    async fn file_dependents(&self, project: ProjectId, file: &str) -> DbResult<Vec<String>> {
        let row = sqlx::query("SELECT dependents FROM files WHERE project_id = ? AND path = ?")
            .bind(project)
            .bind(file)
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::db_err("file_dependents"))?;
        Ok(row
            .and_then(|r| r.try_get::<String, _>("dependents").ok())
            .and_then(|s| serde_json::from_str::<Vec<String>>(&s).ok())
            .unwrap_or_default())
    }

    async fn upsert_file_correlation(
        &self,
        project: ProjectId,
        file_a: &str,
        file_b: &str,
        at: DateTime<Utc>,
    ) -> DbResult<()> {
        let (a, b) = if file_a < file_b { (file_a, file_b) } else { (file_b, file_a) };
        sqlx::query(
            r#"
            INSERT INTO file_correlations (project_id, file_a, file_b, cochange_count, last_cochange, created_at)
            VALUES (?, ?, ?, 1, ?, ?)
            ON CONFLICT(project_id, file_a, file_b) DO UPDATE SET
                cochange_count = cochange_count + 1,
                last_cochange = excluded.last_cochange
            "#,
        )
        .bind(project)
        .bind(a)
        .bind(b)
        .bind(at)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(Self::write_err("upsert_file_correlation"))?;
        Ok(())
    }

    async fn top_cochangers(
        &self,
        project: ProjectId,
        files: &[String],
        excluding: &[String],
        limit: u32,
    ) -> DbResult<Vec<FileCorrelationRow>> {
        let files_json = serde_json::to_string(files).unwrap_or_default();
        let excl_json = serde_json::to_string(excluding).unwrap_or_default();
        let rows = sqlx::query(
            r#"
            SELECT * FROM file_correlations
            WHERE project_id = ?
              AND (file_a IN (SELECT value FROM json_each(?)) OR file_b IN (SELECT value FROM json_each(?)))
              AND file_a NOT IN (SELECT value FROM json_each(?))
              AND file_b NOT IN (SELECT value FROM json_each(?))
            ORDER BY cochange_count DESC LIMIT ?
            "#,
        )
        .bind(project)
        .bind(&files_json)
        .bind(&files_json)
        .bind(&excl_json)
        .bind(&excl_json)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::db_err("top_cochangers"))?;
        Ok(rows
            .iter()
            .map(|r| FileCorrelationRow {
                project_id: r.try_get("project_id").unwrap_or_default(),
                file_a: r.try_get("file_a").unwrap_or_default(),
                file_b: r.try_get("file_b").unwrap_or_default(),
                cochange_count: r.try_get::<i64, _>("cochange_count").unwrap_or(0) as u32,
                last_cochange: r.try_get("last_cochange").unwrap_or_default(),
                correlation_strength: r.try_get("correlation_strength").unwrap_or(0.0),
                created_at: r.try_get("created_at").unwrap_or_default(),
            })
            .collect())
    }

    async fn correlation_count(&self, project: ProjectId, min_strength: f64) -> DbResult<u32> {
        let row = sqlx::query(
            "SELECT COUNT(*) as c FROM file_correlations WHERE project_id = ? AND correlation_strength >= ?",
        )
        .bind(project)
        .bind(min_strength)
        .fetch_one(&self.pool)
        .await
        .map_err(Self::db_err("correlation_count"))?;
        Ok(row.try_get::<i64, _>("c").unwrap_or(0) as u32)
    }

    async fn insert_relationship(
        &self,
        project: ProjectId,
        source_type: EntityKind,
        source_id: &str,
        relationship: RelationshipKind,
        target_type: EntityKind,
        target_id: &str,
    ) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO relationships (project_id, source_type, source_id, relationship, \
             target_type, target_id, strength) VALUES (?, ?, ?, ?, ?, ?, 1.0)",
        )
        .bind(project)
        .bind(format!("{source_type:?}").to_lowercase())
        .bind(source_id)
        .bind(format!("{relationship:?}").to_lowercase())
        .bind(format!("{target_type:?}").to_lowercase())
        .bind(target_id)
        .execute(&self.pool)
        .await
        .map_err(Self::write_err("insert_relationship"))?;
        Ok(())
    }

    async fn create_session(&self, project: ProjectId, goal: Option<&str>, started_at: DateTime<Utc>) -> DbResult<SessionRow> {
        let next_num = sqlx::query(
            "SELECT COALESCE(MAX(session_number), 0) + 1 as n FROM sessions WHERE project_id = ?",
        )
        .bind(project)
        .fetch_one(&self.pool)
        .await
        .map_err(Self::db_err("create_session:number"))?
        .try_get::<i64, _>("n")
        .unwrap_or(1);

        let res = sqlx::query(
            "INSERT INTO sessions (project_id, session_number, goal, started_at, files_read, \
             queries_made, files_touched, decisions_made, issues_found, issues_resolved) \
             VALUES (?, ?, ?, ?, '[]', '[]', '[]', '[]', '[]', '[]')",
        )
        .bind(project)
        .bind(next_num)
        .bind(goal)
        .bind(started_at)
        .execute(&self.pool)
        .await
        .map_err(Self::write_err("create_session"))?;

        Ok(SessionRow {
            id: res.last_insert_rowid(),
            project_id: project,
            session_number: next_num as u32,
            goal: goal.map(ToString::to_string),
            outcome: None,
            started_at,
            ended_at: None,
            success: None,
            next_steps: None,
            files_read: vec![],
            queries_made: vec![],
            files_touched: vec![],
            decisions_made: vec![],
            issues_found: vec![],
            issues_resolved: vec![],
            learnings: None,
        })
    }

    async fn get_active_session(&self, project: ProjectId) -> DbResult<Option<SessionRow>> {
        let row = sqlx::query(
            "SELECT * FROM sessions WHERE project_id = ? AND ended_at IS NULL \
             ORDER BY started_at DESC LIMIT 1",
        )
        .bind(project)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::db_err("get_active_session"))?;
        row.as_ref().map(session_from_row).transpose()
    }

    async fn get_last_ended_session(&self, project: ProjectId) -> DbResult<Option<SessionRow>> {
        let row = sqlx::query(
            "SELECT * FROM sessions WHERE project_id = ? AND ended_at IS NOT NULL \
             ORDER BY ended_at DESC LIMIT 1",
        )
        .bind(project)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::db_err("get_last_ended_session"))?;
        row.as_ref().map(session_from_row).transpose()
    }

    async fn append_session_tracking(
        &self,
        session_id: i64,
        field: SessionTrackingField,
        value: &str,
    ) -> DbResult<()> {
        let column = field.column();
        let query = format!(
            "UPDATE sessions SET {column} = (
                SELECT json_group_array(v) FROM (
                    SELECT DISTINCT value as v FROM json_each({column})
                    UNION
                    SELECT ?
                )
            ) WHERE id = ?"
        );
        sqlx::query(&query)
            .bind(value)
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(Self::write_err("append_session_tracking"))?;
        Ok(())
    }

    async fn end_session(
        &self,
        session_id: i64,
        outcome: Option<&str>,
        success: Option<SessionSuccess>,
        next_steps: Option<&str>,
        ended_at: DateTime<Utc>,
    ) -> DbResult<()> {
        sqlx::query(
            "UPDATE sessions SET ended_at = ?, outcome = ?, success = ?, next_steps = ? WHERE id = ?",
        )
        .bind(ended_at)
        .bind(outcome)
        .bind(success.map(|s| s as i64))
        .bind(next_steps)
        .bind(session_id)
        .execute(&self.pool)
        .await
        .map_err(Self::write_err("end_session"))?;
        Ok(())
    }

    async fn recent_sessions(&self, project: ProjectId, limit: u32) -> DbResult<Vec<SessionRow>> {
        let rows = sqlx::query(
            "SELECT * FROM sessions WHERE project_id = ? ORDER BY started_at DESC LIMIT ?",
        )
        .bind(project)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::db_err("recent_sessions"))?;
        rows.iter().map(session_from_row).collect()
    }

    async fn insert_context_injection(
        &self,
        session_id: i64,
        file_path: Option<&str>,
    ) -> DbResult<i64> {
        let res = sqlx::query(
            "INSERT INTO context_injections (session_id, file_path, was_used) VALUES (?, ?, 0)",
        )
        .bind(session_id)
        .bind(file_path)
        .execute(&self.pool)
        .await
        .map_err(Self::write_err("insert_context_injection"))?;
        Ok(res.last_insert_rowid())
    }

    async fn mark_injection_used(&self, injection_id: i64) -> DbResult<()> {
        sqlx::query("UPDATE context_injections SET was_used = 1 WHERE id = ?")
            .bind(injection_id)
            .execute(&self.pool)
            .await
            .map_err(Self::write_err("mark_injection_used"))?;
        Ok(())
    }

    async fn classify_injection_impact(
        &self,
        injection_id: i64,
        classification: ImpactClassification,
    ) -> DbResult<()> {
        sqlx::query("UPDATE context_injections SET relevance = ? WHERE id = ?")
            .bind(match classification {
                ImpactClassification::Helped => 1.0,
                ImpactClassification::Harmful => -1.0,
                ImpactClassification::Irrelevant => 0.0,
                ImpactClassification::Unknown => 0.0,
            })
            .bind(injection_id)
            .execute(&self.pool)
            .await
            .map_err(Self::write_err("classify_injection_impact"))?;
        Ok(())
    }

    async fn unclassified_injections(&self, project: ProjectId) -> DbResult<Vec<ContextInjectionRow>> {
        let rows = sqlx::query(
            r#"
            SELECT ci.* FROM context_injections ci
            JOIN sessions s ON s.id = ci.session_id
            WHERE s.project_id = ? AND ci.relevance IS NULL
            "#,
        )
        .bind(project)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::db_err("unclassified_injections"))?;
        Ok(rows
            .iter()
            .map(|r| ContextInjectionRow {
                id: r.try_get("id").unwrap_or_default(),
                session_id: r.try_get("session_id").unwrap_or_default(),
                file_path: r.try_get("file_path").ok(),
                was_used: r.try_get("was_used").unwrap_or(false),
                relevance: r.try_get("relevance").ok(),
            })
            .collect())
    }

    async fn upsert_insight(&self, row: &InsightRow) -> DbResult<i64> {
        let existing = sqlx::query("SELECT id FROM insights WHERE project_id = ? AND title = ?")
            .bind(row.project_id)
            .bind(&row.title)
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::db_err("upsert_insight:lookup"))?;

        if let Some(existing) = existing {
            let id: i64 = existing.try_get("id").unwrap_or(0);
            sqlx::query(
                "UPDATE insights SET content = ?, evidence = ?, confidence = ?, insight_type = ? WHERE id = ?",
            )
            .bind(&row.content)
            .bind(serde_json::to_string(&row.evidence).unwrap_or_default())
            .bind(row.confidence)
            .bind(format!("{:?}", row.insight_type).to_lowercase())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Self::write_err("upsert_insight:update"))?;
            return Ok(id);
        }

        let res = sqlx::query(
            "INSERT INTO insights (project_id, title, insight_type, content, evidence, \
             confidence, status, shown_count, created_at) VALUES (?, ?, ?, ?, ?, ?, 'new', 0, ?)",
        )
        .bind(row.project_id)
        .bind(&row.title)
        .bind(format!("{:?}", row.insight_type).to_lowercase())
        .bind(&row.content)
        .bind(serde_json::to_string(&row.evidence).unwrap_or_default())
        .bind(row.confidence)
        .bind(row.created_at)
        .execute(&self.pool)
        .await
        .map_err(Self::write_err("upsert_insight:insert"))?;
        Ok(res.last_insert_rowid())
    }

    async fn new_insights(&self, project: ProjectId, limit: u32) -> DbResult<Vec<InsightRow>> {
        let rows = sqlx::query(
            "SELECT * FROM insights WHERE project_id = ? AND status = 'new' \
             ORDER BY confidence DESC LIMIT ?",
        )
        .bind(project)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::db_err("new_insights"))?;
        rows.iter().map(insight_from_row).collect()
    }

    async fn mark_insight_shown(&self, id: i64) -> DbResult<()> {
        sqlx::query("UPDATE insights SET shown_count = shown_count + 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Self::write_err("mark_insight_shown"))?;
        Ok(())
    }

    async fn auto_dismiss_stale_insights(&self, project: ProjectId, threshold: u32) -> DbResult<u32> {
        let res = sqlx::query(
            "UPDATE insights SET status = 'dismissed' WHERE project_id = ? AND status = 'new' AND shown_count >= ?",
        )
        .bind(project)
        .bind(threshold)
        .execute(&self.pool)
        .await
        .map_err(Self::write_err("auto_dismiss_stale_insights"))?;
        Ok(res.rows_affected() as u32)
    }

    async fn last_insight_generated_at(&self, project: ProjectId) -> DbResult<Option<DateTime<Utc>>> {
        let row = sqlx::query("SELECT MAX(created_at) as c FROM insights WHERE project_id = ?")
            .bind(project)
            .fetch_one(&self.pool)
            .await
            .map_err(Self::db_err("last_insight_generated_at"))?;
        Ok(row.try_get("c").ok())
    }

    async fn sessions_ended_since(&self, project: ProjectId, since: DateTime<Utc>) -> DbResult<u32> {
        let row = sqlx::query(
            "SELECT COUNT(*) as c FROM sessions WHERE project_id = ? AND ended_at IS NOT NULL AND ended_at > ?",
        )
        .bind(project)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(Self::db_err("sessions_ended_since"))?;
        Ok(row.try_get::<i64, _>("c").unwrap_or(0) as u32)
    }

    async fn correlations_updated_since(&self, project: ProjectId, since: DateTime<Utc>) -> DbResult<u32> {
        let row = sqlx::query("SELECT COUNT(*) as c FROM file_correlations WHERE project_id = ? AND last_cochange > ?")
            .bind(project)
            .bind(since)
            .fetch_one(&self.pool)
            .await
            .map_err(Self::db_err("correlations_updated_since"))?;
        Ok(row.try_get::<i64, _>("c").unwrap_or(0) as u32)
    }

    async fn decisions_made_since(&self, project: ProjectId, since: DateTime<Utc>) -> DbResult<u32> {
        let row = sqlx::query("SELECT COUNT(*) as c FROM decisions WHERE project_id = ? AND decided_at > ?")
            .bind(project)
            .bind(since)
            .fetch_one(&self.pool)
            .await
            .map_err(Self::db_err("decisions_made_since"))?;
        Ok(row.try_get::<i64, _>("c").unwrap_or(0) as u32)
    }

    async fn workflow_patterns(&self, project: ProjectId) -> DbResult<Vec<WorkflowPatternRow>> {
        let rows = sqlx::query("SELECT * FROM workflow_patterns WHERE project_id = ? ORDER BY times_used DESC")
            .bind(project)
            .fetch_all(&self.pool)
            .await
            .map_err(Self::db_err("workflow_patterns"))?;
        Ok(rows
            .iter()
            .map(|r| WorkflowPatternRow {
                project_id: r.try_get("project_id").unwrap_or_default(),
                name: r.try_get("name").unwrap_or_default(),
                times_used: r.try_get::<i64, _>("times_used").unwrap_or(0) as u32,
                last_used_at: r.try_get("last_used_at").ok(),
            })
            .collect())
    }

    async fn record_observation(&self, project: ProjectId, content: &str, at: DateTime<Utc>) -> DbResult<()> {
        sqlx::query("INSERT INTO observations (project_id, content, created_at) VALUES (?, ?, ?)")
            .bind(project)
            .bind(content)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(Self::write_err("record_observation"))?;
        Ok(())
    }

    async fn recent_observations(&self, project: ProjectId, limit: u32) -> DbResult<Vec<ObservationRow>> {
        let rows = sqlx::query(
            "SELECT * FROM observations WHERE project_id = ? ORDER BY created_at DESC LIMIT ?",
        )
        .bind(project)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::db_err("recent_observations"))?;
        Ok(rows
            .iter()
            .map(|r| ObservationRow {
                project_id: r.try_get("project_id").unwrap_or_default(),
                content: r.try_get("content").unwrap_or_default(),
                created_at: r.try_get("created_at").unwrap_or_default(),
            })
            .collect())
    }

    async fn high_fragility_file_count(&self, project: ProjectId, threshold: u8) -> DbResult<u32> {
        let row = sqlx::query("SELECT COUNT(*) as c FROM files WHERE project_id = ? AND fragility >= ?")
            .bind(project)
            .bind(threshold as i64)
            .fetch_one(&self.pool)
            .await
            .map_err(Self::db_err("high_fragility_file_count"))?;
        Ok(row.try_get::<i64, _>("c").unwrap_or(0) as u32)
    }

    async fn record_enrichment_metric(&self, row: &EnrichmentMetricRow) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO enrichment_metrics (project_id, tool, file_path, latency_ms, \
             enrichers_used, tokens_injected, blocked, cache_hits, cache_misses, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(row.project_id)
        .bind(&row.tool)
        .bind(&row.file_path)
        .bind(row.latency_ms as i64)
        .bind(serde_json::to_string(&row.enrichers_used).unwrap_or_default())
        .bind(row.tokens_injected as i64)
        .bind(row.blocked)
        .bind(row.cache_hits as i64)
        .bind(row.cache_misses as i64)
        .bind(row.created_at)
        .execute(&self.pool)
        .await
        .map_err(Self::write_err("record_enrichment_metric"))?;
        Ok(())
    }

    async fn prune_metrics_older_than(&self, project: ProjectId, before: DateTime<Utc>) -> DbResult<u32> {
        let result = sqlx::query("DELETE FROM enrichment_metrics WHERE project_id = ? AND created_at < ?")
            .bind(project)
            .bind(before)
            .execute(&self.pool)
            .await
            .map_err(Self::write_err("prune_metrics_older_than"))?;
        Ok(result.rows_affected() as u32)
    }
}

fn outcome_status_str(s: OutcomeStatus) -> &'static str {
    match s {
        OutcomeStatus::Pending => "pending",
        OutcomeStatus::Succeeded => "succeeded",
        OutcomeStatus::Failed => "failed",
        OutcomeStatus::Revised => "revised",
        OutcomeStatus::NeedsReview => "needs_review",
        OutcomeStatus::Unknown => "unknown",
    }
}

fn decision_from_row(row: &sqlx::sqlite::SqliteRow) -> DbResult<DecisionRow> {
    let status: String = row.try_get("status").unwrap_or_default();
    let outcome_status: String = row.try_get("outcome_status").unwrap_or_default();
    let temperature: String = row.try_get("temperature").unwrap_or_default();
    Ok(DecisionRow {
        id: row.try_get("id").unwrap_or_default(),
        project_id: row.try_get("project_id").unwrap_or_default(),
        title: row.try_get("title").unwrap_or_default(),
        decision: row.try_get("decision").unwrap_or_default(),
        reasoning: row.try_get("reasoning").ok(),
        affects: row
            .try_get::<String, _>("affects")
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default(),
        status: match status.as_str() {
            "superseded" => DecisionStatus::Superseded,
            "reconsidering" => DecisionStatus::Reconsidering,
            _ => DecisionStatus::Active,
        },
        outcome_status: match outcome_status.as_str() {
            "succeeded" => OutcomeStatus::Succeeded,
            "failed" => OutcomeStatus::Failed,
            "revised" => OutcomeStatus::Revised,
            "needs_review" => OutcomeStatus::NeedsReview,
            "unknown" => OutcomeStatus::Unknown,
            _ => OutcomeStatus::Pending,
        },
        outcome_notes: row
            .try_get::<String, _>("outcome_notes")
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default(),
        check_after_sessions: row.try_get::<i64, _>("check_after_sessions").unwrap_or(0) as u32,
        sessions_since: row.try_get::<i64, _>("sessions_since").unwrap_or(0) as u32,
        temperature: temperature.parse().unwrap_or(muninn_core::Temperature::Warm),
        last_referenced_at: row.try_get("last_referenced_at").ok(),
        archived_at: row.try_get("archived_at").ok(),
        decided_at: row.try_get("decided_at").unwrap_or_default(),
        updated_at: row.try_get("updated_at").unwrap_or_default(),
    })
}

fn issue_from_row(row: &sqlx::sqlite::SqliteRow) -> DbResult<IssueRow> {
    let issue_type: String = row.try_get("issue_type").unwrap_or_default();
    let status: String = row.try_get("status").unwrap_or_default();
    Ok(IssueRow {
        id: row.try_get("id").unwrap_or_default(),
        project_id: row.try_get("project_id").unwrap_or_default(),
        issue_type: match issue_type.as_str() {
            "bug" => IssueType::Bug,
            "enhancement" => IssueType::Enhancement,
            "question" => IssueType::Question,
            "potential" => IssueType::Potential,
            _ => IssueType::TechDebt,
        },
        title: row.try_get("title").unwrap_or_default(),
        severity: row.try_get::<i64, _>("severity").unwrap_or(0) as u8,
        status: match status.as_str() {
            "in_progress" => IssueStatus::InProgress,
            "resolved" => IssueStatus::Resolved,
            "wont_fix" => IssueStatus::WontFix,
            _ => IssueStatus::Open,
        },
        affected_files: row
            .try_get::<String, _>("affected_files")
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default(),
        related_symbols: row
            .try_get::<String, _>("related_symbols")
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default(),
        resolved_at: row.try_get("resolved_at").ok(),
        updated_at: row.try_get("updated_at").unwrap_or_default(),
    })
}

fn learning_from_row(row: &sqlx::sqlite::SqliteRow) -> DbResult<LearningRow> {
    let category: String = row.try_get("category").unwrap_or_default();
    let review_status: String = row.try_get("review_status").unwrap_or_default();
    let promotion_status: String = row.try_get("promotion_status").unwrap_or_default();
    let temperature: String = row.try_get("temperature").unwrap_or_default();
    Ok(LearningRow {
        id: row.try_get("id").unwrap_or_default(),
        project_id: row.try_get("project_id").ok(),
        category: match category.as_str() {
            "gotcha" => LearningCategory::Gotcha,
            "preference" => LearningCategory::Preference,
            "convention" => LearningCategory::Convention,
            "architecture" => LearningCategory::Architecture,
            _ => LearningCategory::Pattern,
        },
        title: row.try_get("title").unwrap_or_default(),
        content: row.try_get("content").unwrap_or_default(),
        context: row.try_get("context").ok(),
        confidence: row.try_get("confidence").unwrap_or(0.0),
        times_applied: row.try_get::<i64, _>("times_applied").unwrap_or(0) as u32,
        times_confirmed: row.try_get::<i64, _>("times_confirmed").unwrap_or(0) as u32,
        last_reinforced_at: row.try_get("last_reinforced_at").ok(),
        last_applied: row.try_get("last_applied").ok(),
        decay_rate: row.try_get("decay_rate").unwrap_or(0.02),
        temperature: temperature.parse().unwrap_or(muninn_core::Temperature::Warm),
        review_status: match review_status.as_str() {
            "confirmed" => ReviewStatus::Confirmed,
            "revised" => ReviewStatus::Revised,
            _ => ReviewStatus::Pending,
        },
        sessions_since_review: row.try_get::<i64, _>("sessions_since_review").unwrap_or(0) as u32,
        review_after_sessions: row.try_get::<i64, _>("review_after_sessions").unwrap_or(0) as u32,
        foundational: row.try_get("foundational").unwrap_or(false),
        promotion_status: match promotion_status.as_str() {
            "candidate" => PromotionStatus::Candidate,
            "promoted" => PromotionStatus::Promoted,
            "demoted" => PromotionStatus::Demoted,
            _ => PromotionStatus::NotReady,
        },
        archived_at: row.try_get("archived_at").ok(),
        auto_reinforcement_count: row.try_get::<i64, _>("auto_reinforcement_count").unwrap_or(0) as u32,
        created_at: row.try_get("created_at").unwrap_or_default(),
        updated_at: row.try_get("updated_at").unwrap_or_default(),
        last_referenced_at: row.try_get("last_referenced_at").ok(),
    })
}

fn approval_from_row(row: &sqlx::sqlite::SqliteRow) -> DbResult<PendingApprovalRow> {
    let block_level: String = row.try_get("block_level").unwrap_or_default();
    Ok(PendingApprovalRow {
        operation_id: row.try_get("operation_id").unwrap_or_default(),
        project_id: row.try_get("project_id").unwrap_or_default(),
        tool: row.try_get("tool").unwrap_or_default(),
        file_path: row.try_get("file_path").unwrap_or_default(),
        reason: row.try_get("reason").unwrap_or_default(),
        block_level: match block_level.as_str() {
            "soft" => BlockLevelDb::Soft,
            "hard" => BlockLevelDb::Hard,
            _ => BlockLevelDb::Warn,
        },
        created_at: row.try_get("created_at").unwrap_or_default(),
        expires_at: row.try_get("expires_at").unwrap_or_default(),
        approved_at: row.try_get("approved_at").ok(),
    })
}

fn session_from_row(row: &sqlx::sqlite::SqliteRow) -> DbResult<SessionRow> {
    let success: Option<i64> = row.try_get("success").ok();
    let json_list = |col: &str| -> Vec<String> {
        row.try_get::<String, _>(col)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    };
    let json_list_i64 = |col: &str| -> Vec<i64> {
        row.try_get::<String, _>(col)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    };
    Ok(SessionRow {
        id: row.try_get("id").unwrap_or_default(),
        project_id: row.try_get("project_id").unwrap_or_default(),
        session_number: row.try_get::<i64, _>("session_number").unwrap_or(0) as u32,
        goal: row.try_get("goal").ok(),
        outcome: row.try_get("outcome").ok(),
        started_at: row.try_get("started_at").unwrap_or_default(),
        ended_at: row.try_get("ended_at").ok(),
        success: success.map(|s| match s {
            0 => SessionSuccess::Failure,
            1 => SessionSuccess::Partial,
            _ => SessionSuccess::Success,
        }),
        next_steps: row.try_get("next_steps").ok(),
        files_read: json_list("files_read"),
        queries_made: json_list("queries_made"),
        files_touched: json_list("files_touched"),
        decisions_made: json_list_i64("decisions_made"),
        issues_found: json_list_i64("issues_found"),
        issues_resolved: json_list_i64("issues_resolved"),
        learnings: row.try_get("learnings").ok(),
    })
}

fn insight_from_row(row: &sqlx::sqlite::SqliteRow) -> DbResult<InsightRow> {
    let insight_type: String = row.try_get("insight_type").unwrap_or_default();
    let status: String = row.try_get("status").unwrap_or_default();
    Ok(InsightRow {
        id: row.try_get("id").unwrap_or_default(),
        project_id: row.try_get("project_id").unwrap_or_default(),
        title: row.try_get("title").unwrap_or_default(),
        insight_type: match insight_type.as_str() {
            "anomaly" => InsightType::Anomaly,
            "pattern" => InsightType::Pattern,
            "recommendation" => InsightType::Recommendation,
            _ => InsightType::Correlation,
        },
        content: row.try_get("content").unwrap_or_default(),
        evidence: row
            .try_get::<String, _>("evidence")
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default(),
        confidence: row.try_get("confidence").unwrap_or(0.0),
        status: match status.as_str() {
            "acknowledged" => InsightStatus::Acknowledged,
            "dismissed" => InsightStatus::Dismissed,
            "applied" => InsightStatus::Applied,
            _ => InsightStatus::New,
        },
        shown_count: row.try_get::<i64, _>("shown_count").unwrap_or(0) as u32,
        created_at: row.try_get("created_at").unwrap_or_default(),
    })
}
