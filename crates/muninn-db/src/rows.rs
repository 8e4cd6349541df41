//! Row/DTO types for every table the core reads or writes (spec.md §3/§6).
//!
//! Blob columns are modeled as explicit JSON sub-types rather than raw
//! strings, per spec.md §9 "Dynamic duck-typed DB rows": the source reads
//! untyped rows and `JSON.parse`s blob columns at the call site; here that
//! parsing happens once, at the adapter boundary, and every downstream crate
//! works with typed Rust values.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use muninn_core::{ProjectId, Temperature};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileType {
    Component,
    Route,
    Util,
    Config,
    Schema,
    Service,
    Hook,
    Middleware,
    Test,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileStatus {
    Active,
    Deprecated,
    DoNotTouch,
    Generated,
}

/// `fragility_signals` JSON column (spec.md §3 File).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FragilitySignals {
    #[serde(default)]
    pub dependent_count: u32,
    #[serde(default)]
    pub test_coverage: f64,
    #[serde(default)]
    pub error_count: u32,
    #[serde(default)]
    pub export_count: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileRow {
    pub id: i64,
    pub project_id: ProjectId,
    pub path: String,
    pub file_type: FileType,
    pub purpose: Option<String>,
    pub fragility: u8,
    pub fragility_reason: Option<String>,
    pub fragility_signals: FragilitySignals,
    pub content_hash: Option<String>,
    pub last_analyzed: Option<DateTime<Utc>>,
    pub dependencies: BTreeSet<String>,
    pub dependents: BTreeSet<String>,
    pub velocity_score: f64,
    pub change_count: u32,
    pub temperature: Temperature,
    pub last_referenced_at: Option<DateTime<Utc>>,
    pub status: FileStatus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionStatus {
    Active,
    Superseded,
    Reconsidering,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeStatus {
    Pending,
    Succeeded,
    Failed,
    Revised,
    NeedsReview,
    Unknown,
}

/// `outcome_notes` JSON column (spec.md §3 Decision).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OutcomeNotes {
    #[serde(default)]
    pub positive: u32,
    #[serde(default)]
    pub negative: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecisionRow {
    pub id: i64,
    pub project_id: ProjectId,
    pub title: String,
    pub decision: String,
    pub reasoning: Option<String>,
    pub affects: Vec<String>,
    pub status: DecisionStatus,
    pub outcome_status: OutcomeStatus,
    pub outcome_notes: OutcomeNotes,
    pub check_after_sessions: u32,
    pub sessions_since: u32,
    pub temperature: Temperature,
    pub last_referenced_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
    pub decided_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LearningCategory {
    Pattern,
    Gotcha,
    Preference,
    Convention,
    Architecture,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewStatus {
    Pending,
    Confirmed,
    Revised,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromotionStatus {
    NotReady,
    Candidate,
    Promoted,
    Demoted,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LearningRow {
    pub id: i64,
    pub project_id: Option<ProjectId>,
    pub category: LearningCategory,
    pub title: String,
    pub content: String,
    pub context: Option<String>,
    pub confidence: f64,
    pub times_applied: u32,
    pub times_confirmed: u32,
    pub last_reinforced_at: Option<DateTime<Utc>>,
    pub last_applied: Option<DateTime<Utc>>,
    pub decay_rate: f64,
    pub temperature: Temperature,
    pub review_status: ReviewStatus,
    pub sessions_since_review: u32,
    pub review_after_sessions: u32,
    pub foundational: bool,
    pub promotion_status: PromotionStatus,
    pub archived_at: Option<DateTime<Utc>>,
    pub auto_reinforcement_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_referenced_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueType {
    Bug,
    TechDebt,
    Enhancement,
    Question,
    Potential,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueStatus {
    Open,
    InProgress,
    Resolved,
    WontFix,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IssueRow {
    pub id: i64,
    pub project_id: ProjectId,
    pub issue_type: IssueType,
    pub title: String,
    pub severity: u8,
    pub status: IssueStatus,
    pub affected_files: Vec<String>,
    pub related_symbols: Vec<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    /// Not listed among Issue's own attributes in spec.md §3, but spec.md
    /// §4.7 runs temperature decay "for each of {files, decisions, issues,
    /// learnings}" — carried here so that decay has something to act on.
    pub temperature: Temperature,
    pub last_referenced_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionSuccess {
    Failure = 0,
    Partial = 1,
    Success = 2,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionRow {
    pub id: i64,
    pub project_id: ProjectId,
    pub session_number: u32,
    pub goal: Option<String>,
    pub outcome: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub success: Option<SessionSuccess>,
    pub next_steps: Option<String>,
    pub files_read: Vec<String>,
    pub queries_made: Vec<String>,
    pub files_touched: Vec<String>,
    pub decisions_made: Vec<i64>,
    pub issues_found: Vec<i64>,
    pub issues_resolved: Vec<i64>,
    pub learnings: Option<String>,
}

impl SessionRow {
    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationshipKind {
    Made,
    Found,
    Resolved,
    Learned,
    Tests,
    Cochanges,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Session,
    Decision,
    Issue,
    Learning,
    File,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelationshipRow {
    pub id: i64,
    pub project_id: ProjectId,
    pub source_type: EntityKind,
    pub source_id: String,
    pub relationship: RelationshipKind,
    pub target_type: EntityKind,
    pub target_id: String,
    pub strength: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileCorrelationRow {
    pub project_id: ProjectId,
    pub file_a: String,
    pub file_b: String,
    pub cochange_count: u32,
    pub last_cochange: DateTime<Utc>,
    pub correlation_strength: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlastRadiusRow {
    pub project_id: ProjectId,
    pub source_file: String,
    pub affected_file: String,
    pub distance: u32,
    pub is_test: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BlastSummary {
    pub blast_score: u32,
    pub direct_dependents: u32,
    pub transitive_dependents: u32,
    pub affected_tests: u32,
    pub affected_routes: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockLevelDb {
    Warn,
    Soft,
    Hard,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PendingApprovalRow {
    pub operation_id: String,
    pub project_id: ProjectId,
    pub tool: String,
    pub file_path: String,
    pub reason: String,
    pub block_level: BlockLevelDb,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnrichmentMetricRow {
    pub project_id: ProjectId,
    pub tool: String,
    pub file_path: Option<String>,
    pub latency_ms: u64,
    pub enrichers_used: Vec<String>,
    pub tokens_injected: u32,
    pub blocked: bool,
    pub cache_hits: u32,
    pub cache_misses: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsightType {
    Correlation,
    Anomaly,
    Pattern,
    Recommendation,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsightStatus {
    New,
    Acknowledged,
    Dismissed,
    Applied,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InsightRow {
    pub id: i64,
    pub project_id: ProjectId,
    pub title: String,
    pub insight_type: InsightType,
    pub content: String,
    pub evidence: Vec<String>,
    pub confidence: f64,
    pub status: InsightStatus,
    pub shown_count: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SymbolRow {
    pub file_path: String,
    pub name: String,
    pub exported: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CallGraphRow {
    pub callee_file: String,
    pub caller_file: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestSourceMapRow {
    pub source_file: String,
    pub test_file: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ObservationRow {
    pub project_id: ProjectId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkflowPatternRow {
    pub project_id: ProjectId,
    pub name: String,
    pub times_used: u32,
    pub last_used_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ImpactRecord {
    pub injection_id: i64,
    pub classification: ImpactClassification,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImpactClassification {
    #[default]
    Unknown,
    Irrelevant,
    Helped,
    Harmful,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContextInjectionRow {
    pub id: i64,
    pub session_id: i64,
    pub file_path: Option<String>,
    pub was_used: bool,
    pub relevance: Option<f64>,
}

/// `decision_learnings` join row, spec.md §4.7 confidence reinforcement.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecisionLearningLink {
    pub decision_id: i64,
    pub learning_id: i64,
    pub contribution: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionLearningLink {
    pub session_id: i64,
    pub learning_id: i64,
    pub auto_applied: bool,
}

/// Candidate learning extracted from a transcript-analysis LLM response
/// (spec.md §4.9, §6 "Transcript-analysis prompt").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtractedLearning {
    pub title: String,
    pub content: String,
    pub category: LearningCategory,
    pub confidence: f64,
}

/// A lightweight key/value bag wrapping arbitrary JSON, used by code-intel's
/// `top caller files` computation and similar ad hoc groupings.
pub type CounterMap = BTreeMap<String, u32>;

/// `archived_knowledge` row (spec.md §4.7 "Archival").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArchivedKnowledgeRow {
    pub source_table: String,
    pub source_id: i64,
    pub title: String,
    pub content: String,
    pub reason: String,
    pub archived_at: DateTime<Utc>,
}
