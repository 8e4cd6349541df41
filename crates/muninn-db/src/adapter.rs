//! The storage seam. Every method here is named for the question a consumer
//! asks, not for the table it happens to touch — `open_issues_for_files`
//! rather than `select_issues`, mirroring how the teacher's
//! `MemoryStore` exposes `quick_search`/`list` rather than raw file reads.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use muninn_core::{MuninnError, ProjectId};

use crate::rows::{
    BlastSummary, BlockLevelDb, CallGraphRow, ContextInjectionRow, DecisionRow,
    EnrichmentMetricRow, FileCorrelationRow, FileRow, ImpactClassification, InsightRow, IssueRow,
    LearningRow, ObservationRow, PendingApprovalRow, RelationshipKind, SessionRow, SymbolRow,
    TestSourceMapRow, WorkflowPatternRow,
};

/// A table `heat()` can warm (spec.md §4.7: "`heat(table, id)` sets `hot` and
/// `last_referenced_at=now`").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeatableTable {
    File,
    Decision,
    Learning,
    Issue,
}

pub type DbResult<T> = Result<T, MuninnError>;

#[async_trait]
pub trait DatabaseAdapter: Send + Sync {
    // -- files / fragility (C4, C5, C7) --------------------------------

    async fn get_file(&self, project: ProjectId, path: &str) -> DbResult<Option<FileRow>>;

    async fn upsert_file(&self, row: &FileRow) -> DbResult<()>;

    async fn fragile_and_hot_files(&self, project: ProjectId, limit: u32) -> DbResult<Vec<FileRow>>;

    async fn all_fragile_files(&self, project: ProjectId, threshold: u8) -> DbResult<Vec<FileRow>>;

    async fn stale_file_count(&self, project: ProjectId, days: f64) -> DbResult<u32>;

    /// Apply spec.md §4.7's session-count-based decay rule: cold when
    /// `last_referenced_at` is null or more than 10 sessions have started
    /// since; warm when currently hot and that count falls in `[3,10]`.
    async fn decay_file_temperatures(&self, project: ProjectId, at: DateTime<Utc>) -> DbResult<u32>;

    /// `heat(table, id)`: sets `hot` and `last_referenced_at = at` (spec.md
    /// §4.7). Implementations dispatch on `table` to the matching entity.
    async fn heat(&self, table: HeatableTable, id: i64, at: DateTime<Utc>) -> DbResult<()>;

    // -- decisions (C7, C9) --------------------------------------------

    async fn active_decisions_affecting(
        &self,
        project: ProjectId,
        files: &[String],
    ) -> DbResult<Vec<DecisionRow>>;

    async fn decisions_due_for_review(&self, project: ProjectId) -> DbResult<Vec<DecisionRow>>;

    async fn get_decision(&self, id: i64) -> DbResult<Option<DecisionRow>>;

    async fn insert_decision(&self, row: &DecisionRow) -> DbResult<i64>;

    async fn update_decision_outcome(
        &self,
        id: i64,
        outcome_status: crate::rows::OutcomeStatus,
        positive_delta: i32,
        negative_delta: i32,
    ) -> DbResult<()>;

    async fn decay_decision_temperatures(
        &self,
        project: ProjectId,
        at: DateTime<Utc>,
    ) -> DbResult<u32>;

    /// Bump `sessions_since` on every active decision with a pending-like
    /// outcome (spec.md §4.9 "Start": "increment `sessions_since` on all
    /// pending decisions").
    async fn increment_pending_decision_sessions_since(&self, project: ProjectId) -> DbResult<u32>;

    /// For each `decision_learnings` link with `contribution='influenced'`
    /// on `decision_id`, the linked learning id (spec.md §4.7 "Confidence
    /// reinforcement").
    async fn decision_learnings_influenced(&self, decision_id: i64) -> DbResult<Vec<i64>>;

    // -- issues (C5, C9) -------------------------------------------------

    async fn open_issues_for_files(
        &self,
        project: ProjectId,
        files: &[String],
        limit: u32,
    ) -> DbResult<Vec<IssueRow>>;

    async fn critical_open_issues(&self, project: ProjectId) -> DbResult<Vec<IssueRow>>;

    async fn open_issue_count(&self, project: ProjectId) -> DbResult<u32>;

    async fn insert_issue(&self, row: &IssueRow) -> DbResult<i64>;

    async fn resolve_issue(&self, id: i64, at: DateTime<Utc>) -> DbResult<()>;

    async fn tech_debt_issues(&self, project: ProjectId, limit: u32) -> DbResult<Vec<IssueRow>>;

    async fn decay_issue_temperatures(&self, project: ProjectId, at: DateTime<Utc>) -> DbResult<u32>;

    // -- learnings (C5, C7, C9, C10) -------------------------------------

    async fn search_learnings_fts(
        &self,
        project: Option<ProjectId>,
        terms: &str,
        limit: u32,
    ) -> DbResult<Vec<LearningRow>>;

    async fn search_learnings_like(
        &self,
        project: Option<ProjectId>,
        terms: &str,
        limit: u32,
    ) -> DbResult<Vec<LearningRow>>;

    async fn gotcha_learnings(&self, project: Option<ProjectId>, limit: u32) -> DbResult<Vec<LearningRow>>;

    async fn get_learning(&self, id: i64) -> DbResult<Option<LearningRow>>;

    async fn insert_learning(&self, row: &LearningRow) -> DbResult<i64>;

    async fn reinforce_learning(&self, id: i64, at: DateTime<Utc>) -> DbResult<()>;

    async fn reduce_learning_confidence(&self, id: i64, new_confidence: f64) -> DbResult<()>;

    /// Set a learning's temperature directly, bypassing the session-count
    /// decay rule (spec.md §4.7 "Confidence reduction": `failed` sets
    /// `temperature='cold'` immediately, not on the next decay pass).
    async fn set_learning_temperature(&self, id: i64, temperature: muninn_core::Temperature) -> DbResult<()>;

    async fn flag_learning_for_review(&self, id: i64) -> DbResult<()>;

    async fn decay_learning_temperatures(&self, project: ProjectId, at: DateTime<Utc>) -> DbResult<u32>;

    async fn foundational_learnings_due(&self, project: Option<ProjectId>) -> DbResult<Vec<LearningRow>>;

    /// Bump `sessions_since_review` on every non-archived foundational
    /// learning (spec.md §4.9 "Start": "increment ... `sessions_since_review`
    /// on all foundational learnings").
    async fn increment_foundational_learning_sessions_since_review(&self, project: Option<ProjectId>) -> DbResult<u32>;

    /// Promotion-cycle confirm (spec.md §4.7 "Promotion"): distinct from
    /// [`Self::reinforce_learning`] — `confidence=min(10,+1)`,
    /// `times_confirmed++`, `review_after_sessions=min(120,+10)`,
    /// `review_status='pending'`.
    async fn confirm_learning(&self, id: i64) -> DbResult<()>;

    /// Mark a not-yet-promoted learning `candidate` (spec.md §4.7
    /// "Promotion": the eligibility test is evaluated by the caller, this
    /// just records the transition).
    async fn mark_learning_candidate(&self, id: i64) -> DbResult<()>;

    async fn promote_learning(&self, id: i64) -> DbResult<()>;

    /// Demote a promoted/candidate learning, resetting
    /// `review_after_sessions=30` and `times_confirmed=0` (spec.md §4.7).
    async fn demote_learning(&self, id: i64) -> DbResult<()>;

    /// Append a pre-mutation snapshot to `learning_versions` (spec.md §4.7:
    /// "snapshot the learning as a version row" before reinforcement,
    /// reduction, or review-flagging).
    async fn snapshot_learning_version(&self, learning_id: i64, at: DateTime<Utc>) -> DbResult<()>;

    async fn insert_session_learning(
        &self,
        session_id: i64,
        learning_id: i64,
        auto_applied: bool,
    ) -> DbResult<()>;

    /// `learning_id`s a session's `session_learnings` joins resolve to
    /// (spec.md §4.8 "session →learned→ learning").
    async fn session_learning_ids(&self, session_id: i64) -> DbResult<Vec<i64>>;

    async fn archive_stale_learnings(
        &self,
        project: ProjectId,
        confidence_threshold: f64,
        age_days: i64,
        at: DateTime<Utc>,
    ) -> DbResult<u32>;

    async fn archive_unreinforced_learnings(
        &self,
        project: ProjectId,
        confidence_threshold: f64,
        age_days: i64,
        at: DateTime<Utc>,
    ) -> DbResult<u32>;

    async fn archive_failed_decisions(&self, project: ProjectId, age_days: i64, at: DateTime<Utc>) -> DbResult<u32>;

    async fn archive_resolved_issues(&self, project: ProjectId, age_days: i64, at: DateTime<Utc>) -> DbResult<u32>;

    async fn restore_from_archive(&self, table: &str, id: i64) -> DbResult<()>;

    // -- approvals / blocker (C5 blocker enricher) -----------------------

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
    ) -> DbResult<()>;

    async fn get_pending_approval(&self, operation_id: &str) -> DbResult<Option<PendingApprovalRow>>;

    /// Idempotent approve: only the first caller flips `approved_at`.
    /// Returns `true` if this call performed the transition.
    async fn approve(&self, operation_id: &str, at: DateTime<Utc>) -> DbResult<bool>;

    // -- code intel (C5 blast-radius / code-intel enrichers) -------------

    async fn get_blast_summary(&self, project: ProjectId, file: &str) -> DbResult<Option<BlastSummary>>;

    async fn get_symbols(&self, project: ProjectId, file: &str) -> DbResult<Vec<SymbolRow>>;

    async fn get_callers(&self, project: ProjectId, file: &str) -> DbResult<Vec<CallGraphRow>>;

    async fn get_test_source_map(
        &self,
        project: ProjectId,
        file: &str,
    ) -> DbResult<Vec<TestSourceMapRow>>;

    async fn file_dependents(&self, project: ProjectId, file: &str) -> DbResult<Vec<String>>;

    /// Test files linked to `file` via a stored `file →tests→ file`
    /// `relationships` edge (spec.md §4.5 tests enricher, option (a)).
    async fn test_relationship_targets(&self, project: ProjectId, file: &str) -> DbResult<Vec<String>>;

    // -- correlations (C8) -----------------------------------------------

    async fn upsert_file_correlation(
        &self,
        project: ProjectId,
        file_a: &str,
        file_b: &str,
        at: DateTime<Utc>,
    ) -> DbResult<()>;

    async fn top_cochangers(
        &self,
        project: ProjectId,
        files: &[String],
        excluding: &[String],
        limit: u32,
    ) -> DbResult<Vec<FileCorrelationRow>>;

    async fn correlation_count(&self, project: ProjectId, min_strength: f64) -> DbResult<u32>;

    /// All correlation rows at or above `min_count` co-changes, for C10's
    /// co-change detector (spec.md §4.10).
    async fn correlations_above(&self, project: ProjectId, min_count: u32) -> DbResult<Vec<FileCorrelationRow>>;

    // -- relationships (edges shared by C7/C8/C9) ------------------------

    async fn insert_relationship(
        &self,
        project: ProjectId,
        source_type: crate::rows::EntityKind,
        source_id: &str,
        relationship: RelationshipKind,
        target_type: crate::rows::EntityKind,
        target_id: &str,
    ) -> DbResult<()>;

    // -- sessions (C9) ----------------------------------------------------

    async fn create_session(&self, project: ProjectId, goal: Option<&str>, started_at: DateTime<Utc>) -> DbResult<SessionRow>;

    async fn get_active_session(&self, project: ProjectId) -> DbResult<Option<SessionRow>>;

    async fn get_last_ended_session(&self, project: ProjectId) -> DbResult<Option<SessionRow>>;

    async fn append_session_tracking(
        &self,
        session_id: i64,
        field: SessionTrackingField,
        value: &str,
    ) -> DbResult<()>;

    async fn end_session(
        &self,
        session_id: i64,
        outcome: Option<&str>,
        success: Option<crate::rows::SessionSuccess>,
        next_steps: Option<&str>,
        ended_at: DateTime<Utc>,
    ) -> DbResult<()>;

    async fn recent_sessions(&self, project: ProjectId, limit: u32) -> DbResult<Vec<SessionRow>>;

    async fn insert_context_injection(
        &self,
        session_id: i64,
        file_path: Option<&str>,
    ) -> DbResult<i64>;

    async fn mark_injection_used(&self, injection_id: i64) -> DbResult<()>;

    async fn classify_injection_impact(
        &self,
        injection_id: i64,
        classification: ImpactClassification,
    ) -> DbResult<()>;

    async fn unclassified_injections(&self, project: ProjectId) -> DbResult<Vec<ContextInjectionRow>>;

    // -- insights (C10) -----------------------------------------------------

    /// Upsert by `(project, title)` (spec.md §4.10: "each upserts
    /// `(project, title)`"): an existing row's `content`/`evidence`/
    /// `confidence` are refreshed in place, its `status`/`shown_count` are
    /// left untouched (re-detecting a dismissed insight must not resurrect
    /// it); otherwise a fresh `new` row is inserted.
    async fn upsert_insight(&self, row: &InsightRow) -> DbResult<i64>;

    async fn new_insights(&self, project: ProjectId, limit: u32) -> DbResult<Vec<InsightRow>>;

    /// Bump `shown_count` on a surfaced insight (incremented each time
    /// [`Self::new_insights`] hands a row to a caller, e.g. the startup
    /// planner's resume markdown).
    async fn mark_insight_shown(&self, id: i64) -> DbResult<()>;

    /// Flip every `new` insight with `shown_count >= threshold` to
    /// `dismissed` (spec.md §4.10 "Auto-dismiss any `new` insight whose
    /// `shown_count≥5`"). Returns the count dismissed.
    async fn auto_dismiss_stale_insights(&self, project: ProjectId, threshold: u32) -> DbResult<u32>;

    /// `created_at` of the most recently generated insight, or `None` if
    /// none exist yet (spec.md §4.10 "never generated" due-check branch).
    async fn last_insight_generated_at(&self, project: ProjectId) -> DbResult<Option<DateTime<Utc>>>;

    /// Count of sessions with `ended_at > since` (spec.md §4.10 "≥3 sessions
    /// ended since last").
    async fn sessions_ended_since(&self, project: ProjectId, since: DateTime<Utc>) -> DbResult<u32>;

    /// Count of file-correlation rows whose `last_cochange > since` (spec.md
    /// §4.10 "≥5 correlation updates since").
    async fn correlations_updated_since(&self, project: ProjectId, since: DateTime<Utc>) -> DbResult<u32>;

    /// Count of decisions with `decided_at > since` (spec.md §4.10 "≥2 new
    /// decisions since").
    async fn decisions_made_since(&self, project: ProjectId, since: DateTime<Utc>) -> DbResult<u32>;

    async fn workflow_patterns(&self, project: ProjectId) -> DbResult<Vec<WorkflowPatternRow>>;

    async fn record_observation(&self, project: ProjectId, content: &str, at: DateTime<Utc>) -> DbResult<()>;

    async fn recent_observations(&self, project: ProjectId, limit: u32) -> DbResult<Vec<ObservationRow>>;

    /// Files with `velocity_score` above `threshold`, for C10's fragility
    /// trend detector (spec.md §4.10).
    async fn files_with_velocity_above(&self, project: ProjectId, threshold: f64) -> DbResult<Vec<FileRow>>;

    /// Decisions with a non-`pending` `outcome_status`, for C10's decision
    /// outcome detector (spec.md §4.10).
    async fn reviewed_decisions(&self, project: ProjectId) -> DbResult<Vec<DecisionRow>>;

    // -- startup planner (C11) ----------------------------------------------

    async fn high_fragility_file_count(&self, project: ProjectId, threshold: u8) -> DbResult<u32>;

    // -- enrichment metrics (C6 step 6, best-effort) -------------------------

    /// Append an `EnrichmentMetric` row. Best-effort: callers (§4.6 step 6,
    /// §7) must never fail the enrichment call on a write error here.
    async fn record_enrichment_metric(&self, row: &EnrichmentMetricRow) -> DbResult<()>;

    /// Delete metric rows older than `before`, returning the count removed.
    /// Not wired to a scheduler — an operator-invoked sweep (spec.md §5
    /// "Backpressure": "pruning is the operator's responsibility").
    async fn prune_metrics_older_than(&self, project: ProjectId, before: DateTime<Utc>) -> DbResult<u32>;
}

/// Which tracking list on a session an enricher/session-engine call appends
/// to (spec.md §4.9 "append-without-duplicate").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionTrackingField {
    FilesRead,
    QueriesMade,
    FilesTouched,
    DecisionsMade,
    IssuesFound,
    IssuesResolved,
}

impl SessionTrackingField {
    pub fn column(&self) -> &'static str {
        match self {
            Self::FilesRead => "files_read",
            Self::QueriesMade => "queries_made",
            Self::FilesTouched => "files_touched",
            Self::DecisionsMade => "decisions_made",
            Self::IssuesFound => "issues_found",
            Self::IssuesResolved => "issues_resolved",
        }
    }
}
