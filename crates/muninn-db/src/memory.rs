//! `InMemoryAdapter`: a second, trivial `DatabaseAdapter` implementation
//! over process memory, exposed as a normal module (not `cfg(test)`-gated)
//! so every other `muninn-*` crate can depend on it under `[dev-dependencies]`
//! the way the teacher's `csa-memory` keeps a `noop_client` next to its real
//! `llm_client` — same trait, zero I/O, for tests that don't want SQLite.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use muninn_core::{MuninnError, ProjectId};
use tokio::sync::Mutex;

use crate::adapter::{DatabaseAdapter, DbResult, SessionTrackingField};
use crate::rows::*;

#[derive(Default)]
struct State {
    files: Vec<FileRow>,
    decisions: Vec<DecisionRow>,
    issues: Vec<IssueRow>,
    learnings: Vec<LearningRow>,
    approvals: HashMap<String, PendingApprovalRow>,
    symbols: Vec<SymbolRow>,
    call_graph: Vec<CallGraphRow>,
    test_source_map: Vec<TestSourceMapRow>,
    blast_radius: Vec<BlastRadiusRow>,
    correlations: Vec<FileCorrelationRow>,
    sessions: Vec<SessionRow>,
    context_injections: Vec<ContextInjectionRow>,
    insights: Vec<InsightRow>,
    workflow_patterns: Vec<WorkflowPatternRow>,
    observations: Vec<ObservationRow>,
    relationships: Vec<RelationshipRow>,
    decision_learnings: Vec<DecisionLearningLink>,
    session_learnings: Vec<SessionLearningLink>,
    learning_versions: Vec<(i64, DateTime<Utc>)>,
    archived: Vec<ArchivedKnowledgeRow>,
    metrics: Vec<EnrichmentMetricRow>,
    next_id: i64,
}

impl State {
    fn alloc(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Shared decay rule for files/decisions/issues/learnings (spec.md §4.7):
/// cold if `last_referenced_at` is null or more than 10 sessions have
/// started since; warm if currently hot and that count is in `[3,10]`;
/// otherwise unchanged. Never promotes — only `heat()` does that.
fn decay_one(
    temperature: &mut muninn_core::Temperature,
    last_referenced_at: Option<DateTime<Utc>>,
    session_starts: &[DateTime<Utc>],
) {
    use muninn_core::Temperature;
    let Some(reference) = last_referenced_at else {
        *temperature = Temperature::Cold;
        return;
    };
    let count = session_starts.iter().filter(|s| **s > reference).count();
    if count > 10 {
        *temperature = Temperature::Cold;
    } else if *temperature == Temperature::Hot && (3..=10).contains(&count) {
        *temperature = Temperature::Warm;
    }
}

pub struct InMemoryAdapter {
    state: Mutex<State>,
}

impl InMemoryAdapter {
    pub fn new() -> Self {
        Self { state: Mutex::new(State::default()) }
    }

    /// Seed a file row directly; used by other crates' unit tests to set up
    /// fixtures without going through the full enrichment pipeline.
    pub async fn seed_file(&self, row: FileRow) {
        self.state.lock().await.files.push(row);
    }

    pub async fn seed_learning(&self, row: LearningRow) {
        self.state.lock().await.learnings.push(row);
    }

    pub async fn seed_blast_radius(&self, row: BlastRadiusRow) {
        self.state.lock().await.blast_radius.push(row);
    }

    pub async fn seed_issue(&self, row: IssueRow) {
        self.state.lock().await.issues.push(row);
    }

    pub async fn seed_decision(&self, row: DecisionRow) {
        self.state.lock().await.decisions.push(row);
    }

    pub async fn seed_workflow_pattern(&self, row: WorkflowPatternRow) {
        self.state.lock().await.workflow_patterns.push(row);
    }

    /// Link a learning as having `contribution` on a decision, used by
    /// spec.md §4.7's confidence reinforcement walk. Populated by an
    /// external collaborator in production (decision-learning linking is
    /// not itself a core operation); tests seed it directly.
    pub async fn seed_decision_learning(&self, decision_id: i64, learning_id: i64, contribution: &str) {
        self.state.lock().await.decision_learnings.push(DecisionLearningLink {
            decision_id,
            learning_id,
            contribution: contribution.to_string(),
        });
    }

    /// All recorded metric rows for `project`, in insertion order. Test-only
    /// accessor; production callers only ever write metrics, never read them
    /// back (spec.md §5 "append-only").
    pub async fn metrics_for(&self, project: ProjectId) -> Vec<EnrichmentMetricRow> {
        self.state.lock().await.metrics.iter().filter(|m| m.project_id == project).cloned().collect()
    }
}

impl Default for InMemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseAdapter for InMemoryAdapter {
    async fn get_file(&self, project: ProjectId, path: &str) -> DbResult<Option<FileRow>> {
        let state = self.state.lock().await;
        Ok(state.files.iter().find(|f| f.project_id == project && f.path == path).cloned())
    }

    async fn upsert_file(&self, file: &FileRow) -> DbResult<()> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state
            .files
            .iter_mut()
            .find(|f| f.project_id == file.project_id && f.path == file.path)
        {
            *existing = file.clone();
        } else {
            let mut row = file.clone();
            row.id = state.alloc();
            state.files.push(row);
        }
        Ok(())
    }

    async fn fragile_and_hot_files(&self, project: ProjectId, limit: u32) -> DbResult<Vec<FileRow>> {
        let state = self.state.lock().await;
        let mut rows: Vec<FileRow> = state
            .files
            .iter()
            .filter(|f| f.project_id == project && f.fragility >= 7 && f.temperature == muninn_core::Temperature::Hot)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.fragility.cmp(&a.fragility));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn all_fragile_files(&self, project: ProjectId, threshold: u8) -> DbResult<Vec<FileRow>> {
        let state = self.state.lock().await;
        let mut rows: Vec<FileRow> = state
            .files
            .iter()
            .filter(|f| f.project_id == project && f.fragility >= threshold)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.fragility.cmp(&a.fragility));
        Ok(rows)
    }

    async fn stale_file_count(&self, project: ProjectId, days: f64) -> DbResult<u32> {
        let state = self.state.lock().await;
        let now = muninn_core::now();
        Ok(state
            .files
            .iter()
            .filter(|f| {
                f.project_id == project
                    && f.last_referenced_at
                        .map(|t| muninn_core::days_since(t, now) > days)
                        .unwrap_or(true)
            })
            .count() as u32)
    }

    async fn decay_file_temperatures(&self, project: ProjectId, at: DateTime<Utc>) -> DbResult<u32> {
        let mut state = self.state.lock().await;
        let sessions_since: Vec<DateTime<Utc>> =
            state.sessions.iter().filter(|s| s.project_id == project).map(|s| s.started_at).collect();
        let mut n = 0;
        for f in state.files.iter_mut().filter(|f| f.project_id == project) {
            decay_one(&mut f.temperature, f.last_referenced_at, &sessions_since);
            n += 1;
        }
        Ok(n)
    }

    async fn heat(&self, table: HeatableTable, id: i64, at: DateTime<Utc>) -> DbResult<()> {
        let mut state = self.state.lock().await;
        match table {
            HeatableTable::File => {
                if let Some(f) = state.files.iter_mut().find(|f| f.id == id) {
                    f.temperature = muninn_core::Temperature::Hot;
                    f.last_referenced_at = Some(at);
                }
            }
            HeatableTable::Decision => {
                if let Some(d) = state.decisions.iter_mut().find(|d| d.id == id) {
                    d.temperature = muninn_core::Temperature::Hot;
                    d.last_referenced_at = Some(at);
                }
            }
            HeatableTable::Learning => {
                if let Some(l) = state.learnings.iter_mut().find(|l| l.id == id) {
                    l.temperature = muninn_core::Temperature::Hot;
                    l.last_referenced_at = Some(at);
                }
            }
            HeatableTable::Issue => {
                if let Some(i) = state.issues.iter_mut().find(|i| i.id == id) {
                    i.temperature = muninn_core::Temperature::Hot;
                    i.last_referenced_at = Some(at);
                }
            }
        }
        Ok(())
    }

    async fn active_decisions_affecting(
        &self,
        project: ProjectId,
        files: &[String],
    ) -> DbResult<Vec<DecisionRow>> {
        let state = self.state.lock().await;
        Ok(state
            .decisions
            .iter()
            .filter(|d| {
                d.project_id == project
                    && d.status == DecisionStatus::Active
                    && d.affects.iter().any(|a| files.contains(a))
            })
            .cloned()
            .collect())
    }

    async fn decisions_due_for_review(&self, project: ProjectId) -> DbResult<Vec<DecisionRow>> {
        let state = self.state.lock().await;
        Ok(state
            .decisions
            .iter()
            .filter(|d| d.project_id == project && d.status == DecisionStatus::Active && d.sessions_since >= d.check_after_sessions)
            .cloned()
            .collect())
    }

    async fn get_decision(&self, id: i64) -> DbResult<Option<DecisionRow>> {
        let state = self.state.lock().await;
        Ok(state.decisions.iter().find(|d| d.id == id).cloned())
    }

    async fn insert_decision(&self, row: &DecisionRow) -> DbResult<i64> {
        let mut state = self.state.lock().await;
        let id = state.alloc();
        let mut row = row.clone();
        row.id = id;
        state.decisions.push(row);
        Ok(id)
    }

    async fn update_decision_outcome(
        &self,
        id: i64,
        outcome_status: OutcomeStatus,
        positive_delta: i32,
        negative_delta: i32,
    ) -> DbResult<()> {
        let mut state = self.state.lock().await;
        if let Some(d) = state.decisions.iter_mut().find(|d| d.id == id) {
            d.outcome_status = outcome_status;
            d.outcome_notes.positive = (d.outcome_notes.positive as i32 + positive_delta).max(0) as u32;
            d.outcome_notes.negative = (d.outcome_notes.negative as i32 + negative_delta).max(0) as u32;
        }
        Ok(())
    }

    async fn decay_decision_temperatures(&self, project: ProjectId, at: DateTime<Utc>) -> DbResult<u32> {
        let mut state = self.state.lock().await;
        let sessions_since: Vec<DateTime<Utc>> =
            state.sessions.iter().filter(|s| s.project_id == project).map(|s| s.started_at).collect();
        let mut n = 0;
        for d in state.decisions.iter_mut().filter(|d| d.project_id == project) {
            decay_one(&mut d.temperature, d.last_referenced_at, &sessions_since);
            n += 1;
        }
        Ok(n)
    }

    async fn increment_pending_decision_sessions_since(&self, project: ProjectId) -> DbResult<u32> {
        let mut state = self.state.lock().await;
        let mut n = 0;
        for d in state.decisions.iter_mut().filter(|d| d.project_id == project && d.status == DecisionStatus::Active) {
            d.sessions_since += 1;
            n += 1;
        }
        Ok(n)
    }

    async fn decision_learnings_influenced(&self, decision_id: i64) -> DbResult<Vec<i64>> {
        let state = self.state.lock().await;
        Ok(state
            .decision_learnings
            .iter()
            .filter(|l| l.decision_id == decision_id && l.contribution == "influenced")
            .map(|l| l.learning_id)
            .collect())
    }

    async fn open_issues_for_files(
        &self,
        project: ProjectId,
        files: &[String],
        limit: u32,
    ) -> DbResult<Vec<IssueRow>> {
        let state = self.state.lock().await;
        let mut rows: Vec<IssueRow> = state
            .issues
            .iter()
            .filter(|i| {
                i.project_id == project
                    && i.status == IssueStatus::Open
                    && i.affected_files.iter().any(|f| files.contains(f))
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.severity.cmp(&a.severity));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn critical_open_issues(&self, project: ProjectId) -> DbResult<Vec<IssueRow>> {
        let state = self.state.lock().await;
        Ok(state
            .issues
            .iter()
            .filter(|i| i.project_id == project && i.status == IssueStatus::Open && i.severity >= 80)
            .cloned()
            .collect())
    }

    async fn open_issue_count(&self, project: ProjectId) -> DbResult<u32> {
        let state = self.state.lock().await;
        Ok(state.issues.iter().filter(|i| i.project_id == project && i.status == IssueStatus::Open).count() as u32)
    }

    async fn insert_issue(&self, row: &IssueRow) -> DbResult<i64> {
        let mut state = self.state.lock().await;
        let id = state.alloc();
        let mut row = row.clone();
        row.id = id;
        state.issues.push(row);
        Ok(id)
    }

    async fn resolve_issue(&self, id: i64, at: DateTime<Utc>) -> DbResult<()> {
        let mut state = self.state.lock().await;
        if let Some(i) = state.issues.iter_mut().find(|i| i.id == id) {
            i.status = IssueStatus::Resolved;
            i.resolved_at = Some(at);
        }
        Ok(())
    }

    async fn tech_debt_issues(&self, project: ProjectId, limit: u32) -> DbResult<Vec<IssueRow>> {
        let state = self.state.lock().await;
        let mut rows: Vec<IssueRow> = state
            .issues
            .iter()
            .filter(|i| i.project_id == project && i.issue_type == IssueType::TechDebt && i.status == IssueStatus::Open)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.severity.cmp(&a.severity));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn decay_issue_temperatures(&self, project: ProjectId, at: DateTime<Utc>) -> DbResult<u32> {
        let mut state = self.state.lock().await;
        let sessions_since: Vec<DateTime<Utc>> =
            state.sessions.iter().filter(|s| s.project_id == project).map(|s| s.started_at).collect();
        let mut n = 0;
        for i in state.issues.iter_mut().filter(|i| i.project_id == project) {
            decay_one(&mut i.temperature, i.last_referenced_at, &sessions_since);
            n += 1;
        }
        Ok(n)
    }

    async fn search_learnings_fts(
        &self,
        project: Option<ProjectId>,
        terms: &str,
        limit: u32,
    ) -> DbResult<Vec<LearningRow>> {
        self.search_learnings_like(project, terms, limit).await
    }

    async fn search_learnings_like(
        &self,
        project: Option<ProjectId>,
        terms: &str,
        limit: u32,
    ) -> DbResult<Vec<LearningRow>> {
        let state = self.state.lock().await;
        let needle = terms.to_lowercase();
        let mut rows: Vec<LearningRow> = state
            .learnings
            .iter()
            .filter(|l| {
                l.archived_at.is_none()
                    && (l.project_id.is_none() || l.project_id == project)
                    && (l.content.to_lowercase().contains(&needle) || l.title.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn gotcha_learnings(&self, project: Option<ProjectId>, limit: u32) -> DbResult<Vec<LearningRow>> {
        let state = self.state.lock().await;
        let mut rows: Vec<LearningRow> = state
            .learnings
            .iter()
            .filter(|l| l.archived_at.is_none() && l.category == LearningCategory::Gotcha && (l.project_id.is_none() || l.project_id == project))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn get_learning(&self, id: i64) -> DbResult<Option<LearningRow>> {
        let state = self.state.lock().await;
        Ok(state.learnings.iter().find(|l| l.id == id).cloned())
    }

    async fn insert_learning(&self, row: &LearningRow) -> DbResult<i64> {
        let mut state = self.state.lock().await;
        let id = state.alloc();
        let mut row = row.clone();
        row.id = id;
        state.learnings.push(row);
        Ok(id)
    }

    async fn reinforce_learning(&self, id: i64, at: DateTime<Utc>) -> DbResult<()> {
        let mut state = self.state.lock().await;
        if let Some(l) = state.learnings.iter_mut().find(|l| l.id == id) {
            l.times_applied += 1;
            l.times_confirmed += 1;
            l.last_reinforced_at = Some(at);
            l.auto_reinforcement_count += 1;
            l.confidence = (l.confidence + 0.5).min(10.0);
        }
        Ok(())
    }

    async fn reduce_learning_confidence(&self, id: i64, new_confidence: f64) -> DbResult<()> {
        let mut state = self.state.lock().await;
        if let Some(l) = state.learnings.iter_mut().find(|l| l.id == id) {
            l.confidence = new_confidence;
        }
        Ok(())
    }

    async fn set_learning_temperature(&self, id: i64, temperature: muninn_core::Temperature) -> DbResult<()> {
        let mut state = self.state.lock().await;
        if let Some(l) = state.learnings.iter_mut().find(|l| l.id == id) {
            l.temperature = temperature;
        }
        Ok(())
    }

    async fn flag_learning_for_review(&self, id: i64) -> DbResult<()> {
        let mut state = self.state.lock().await;
        if let Some(l) = state.learnings.iter_mut().find(|l| l.id == id) {
            l.review_status = ReviewStatus::Pending;
            l.sessions_since_review = 0;
        }
        Ok(())
    }

    async fn decay_learning_temperatures(&self, project: ProjectId, at: DateTime<Utc>) -> DbResult<u32> {
        let mut state = self.state.lock().await;
        let sessions_since: Vec<DateTime<Utc>> =
            state.sessions.iter().filter(|s| s.project_id == project).map(|s| s.started_at).collect();
        let mut n = 0;
        for l in state
            .learnings
            .iter_mut()
            .filter(|l| l.project_id.is_none() || l.project_id == Some(project))
        {
            decay_one(&mut l.temperature, l.last_referenced_at, &sessions_since);
            n += 1;
        }
        Ok(n)
    }

    async fn foundational_learnings_due(&self, project: Option<ProjectId>) -> DbResult<Vec<LearningRow>> {
        let state = self.state.lock().await;
        Ok(state
            .learnings
            .iter()
            .filter(|l| {
                l.foundational
                    && l.archived_at.is_none()
                    && l.sessions_since_review >= l.review_after_sessions
                    && (l.project_id.is_none() || l.project_id == project)
            })
            .cloned()
            .collect())
    }

    async fn increment_foundational_learning_sessions_since_review(&self, project: Option<ProjectId>) -> DbResult<u32> {
        let mut state = self.state.lock().await;
        let mut n = 0;
        for l in state
            .learnings
            .iter_mut()
            .filter(|l| l.foundational && l.archived_at.is_none() && (l.project_id.is_none() || l.project_id == project))
        {
            l.sessions_since_review += 1;
            n += 1;
        }
        Ok(n)
    }

    async fn confirm_learning(&self, id: i64) -> DbResult<()> {
        let mut state = self.state.lock().await;
        if let Some(l) = state.learnings.iter_mut().find(|l| l.id == id) {
            l.confidence = (l.confidence + 1.0).min(10.0);
            l.times_confirmed += 1;
            l.review_after_sessions = (l.review_after_sessions + 10).min(120);
            l.review_status = ReviewStatus::Pending;
        }
        Ok(())
    }

    async fn mark_learning_candidate(&self, id: i64) -> DbResult<()> {
        let mut state = self.state.lock().await;
        if let Some(l) = state.learnings.iter_mut().find(|l| l.id == id) {
            if l.promotion_status == PromotionStatus::NotReady {
                l.promotion_status = PromotionStatus::Candidate;
            }
        }
        Ok(())
    }

    async fn promote_learning(&self, id: i64) -> DbResult<()> {
        let mut state = self.state.lock().await;
        if let Some(l) = state.learnings.iter_mut().find(|l| l.id == id) {
            l.promotion_status = PromotionStatus::Promoted;
        }
        Ok(())
    }

    async fn demote_learning(&self, id: i64) -> DbResult<()> {
        let mut state = self.state.lock().await;
        if let Some(l) = state.learnings.iter_mut().find(|l| l.id == id) {
            l.promotion_status = if l.promotion_status == PromotionStatus::Promoted {
                PromotionStatus::Demoted
            } else {
                PromotionStatus::NotReady
            };
            l.review_after_sessions = 30;
            l.times_confirmed = 0;
        }
        Ok(())
    }

    async fn snapshot_learning_version(&self, learning_id: i64, at: DateTime<Utc>) -> DbResult<()> {
        let mut state = self.state.lock().await;
        state.learning_versions.push((learning_id, at));
        Ok(())
    }

    async fn insert_session_learning(&self, session_id: i64, learning_id: i64, auto_applied: bool) -> DbResult<()> {
        let mut state = self.state.lock().await;
        state.session_learnings.push(SessionLearningLink { session_id, learning_id, auto_applied });
        Ok(())
    }

    async fn session_learning_ids(&self, session_id: i64) -> DbResult<Vec<i64>> {
        let state = self.state.lock().await;
        Ok(state
            .session_learnings
            .iter()
            .filter(|l| l.session_id == session_id)
            .map(|l| l.learning_id)
            .collect())
    }

    async fn archive_stale_learnings(
        &self,
        project: ProjectId,
        confidence_threshold: f64,
        age_days: i64,
        at: DateTime<Utc>,
    ) -> DbResult<u32> {
        let mut state = self.state.lock().await;
        let mut archived = Vec::new();
        let mut n = 0;
        for l in state.learnings.iter_mut().filter(|l| {
            l.project_id == Some(project)
                && l.archived_at.is_none()
                && l.confidence < confidence_threshold
                && muninn_core::days_since(l.created_at, at) > age_days as f64
        }) {
            l.archived_at = Some(at);
            archived.push(ArchivedKnowledgeRow {
                source_table: "learnings".to_string(),
                source_id: l.id,
                title: l.title.clone(),
                content: l.content.clone(),
                reason: "stale: low confidence, aged out".to_string(),
                archived_at: at,
            });
            n += 1;
        }
        state.archived.extend(archived);
        Ok(n)
    }

    async fn archive_unreinforced_learnings(
        &self,
        project: ProjectId,
        confidence_threshold: f64,
        age_days: i64,
        at: DateTime<Utc>,
    ) -> DbResult<u32> {
        let mut state = self.state.lock().await;
        let mut archived = Vec::new();
        let mut n = 0;
        for l in state.learnings.iter_mut().filter(|l| {
            l.project_id == Some(project)
                && l.archived_at.is_none()
                && l.confidence < confidence_threshold
                && l.auto_reinforcement_count == 0
                && muninn_core::days_since(l.updated_at, at) > age_days as f64
        }) {
            l.archived_at = Some(at);
            archived.push(ArchivedKnowledgeRow {
                source_table: "learnings".to_string(),
                source_id: l.id,
                title: l.title.clone(),
                content: l.content.clone(),
                reason: "never reinforced, low confidence".to_string(),
                archived_at: at,
            });
            n += 1;
        }
        state.archived.extend(archived);
        Ok(n)
    }

    async fn archive_failed_decisions(&self, project: ProjectId, age_days: i64, at: DateTime<Utc>) -> DbResult<u32> {
        let mut state = self.state.lock().await;
        let mut archived = Vec::new();
        let mut n = 0;
        for d in state.decisions.iter_mut().filter(|d| {
            d.project_id == project
                && d.archived_at.is_none()
                && d.outcome_status == OutcomeStatus::Failed
                && muninn_core::days_since(d.updated_at, at) > age_days as f64
        }) {
            d.archived_at = Some(at);
            archived.push(ArchivedKnowledgeRow {
                source_table: "decisions".to_string(),
                source_id: d.id,
                title: d.title.clone(),
                content: d.decision.clone(),
                reason: "failed outcome, aged out".to_string(),
                archived_at: at,
            });
            n += 1;
        }
        state.archived.extend(archived);
        Ok(n)
    }

    async fn archive_resolved_issues(&self, project: ProjectId, age_days: i64, at: DateTime<Utc>) -> DbResult<u32> {
        let mut state = self.state.lock().await;
        let mut n = 0;
        let mut archived = Vec::new();
        for i in state.issues.iter_mut().filter(|i| {
            i.project_id == project
                && i.status == IssueStatus::Resolved
                && i.resolved_at.is_some_and(|r| muninn_core::days_since(r, at) > age_days as f64)
        }) {
            archived.push(ArchivedKnowledgeRow {
                source_table: "issues".to_string(),
                source_id: i.id,
                title: i.title.clone(),
                content: String::new(),
                reason: "resolved, aged out".to_string(),
                archived_at: at,
            });
            n += 1;
        }
        state.archived.extend(archived);
        Ok(n)
    }

    async fn restore_from_archive(&self, table: &str, id: i64) -> DbResult<()> {
        if table != "learnings" && table != "decisions" {
            return Err(MuninnError::RestoreNotPermitted(table.to_string()));
        }
        let mut state = self.state.lock().await;
        match table {
            "learnings" => {
                if let Some(l) = state.learnings.iter_mut().find(|l| l.id == id) {
                    l.archived_at = None;
                }
            }
            "decisions" => {
                if let Some(d) = state.decisions.iter_mut().find(|d| d.id == id) {
                    d.archived_at = None;
                }
            }
            _ => unreachable!(),
        }
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
        let mut state = self.state.lock().await;
        state.approvals.insert(
            operation_id.to_string(),
            PendingApprovalRow {
                operation_id: operation_id.to_string(),
                project_id: project,
                tool: tool.to_string(),
                file_path: file_path.to_string(),
                reason: reason.to_string(),
                block_level,
                created_at,
                expires_at,
                approved_at: None,
            },
        );
        Ok(())
    }

    async fn get_pending_approval(&self, operation_id: &str) -> DbResult<Option<PendingApprovalRow>> {
        let state = self.state.lock().await;
        Ok(state.approvals.get(operation_id).cloned())
    }

    async fn approve(&self, operation_id: &str, at: DateTime<Utc>) -> DbResult<bool> {
        let mut state = self.state.lock().await;
        if let Some(row) = state.approvals.get_mut(operation_id) {
            if row.approved_at.is_none() && row.expires_at > at {
                row.approved_at = Some(at);
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn get_blast_summary(&self, project: ProjectId, file: &str) -> DbResult<Option<BlastSummary>> {
        let state = self.state.lock().await;
        let rows: Vec<&BlastRadiusRow> = state
            .blast_radius
            .iter()
            .filter(|r| r.project_id == project && r.source_file == file)
            .collect();
        if rows.is_empty() {
            return Ok(None);
        }
        let direct = rows.iter().filter(|r| r.distance == 1).count() as u32;
        let transitive = rows.iter().filter(|r| r.distance > 1).count() as u32;
        let tests = rows.iter().filter(|r| r.is_test).count() as u32;
        Ok(Some(BlastSummary {
            blast_score: (4 * direct + 2 * transitive + 5 * tests).min(100),
            direct_dependents: direct,
            transitive_dependents: transitive,
            affected_tests: tests,
            affected_routes: 0,
        }))
    }

    async fn get_symbols(&self, project: ProjectId, file: &str) -> DbResult<Vec<SymbolRow>> {
        let _ = project;
        let state = self.state.lock().await;
        Ok(state.symbols.iter().filter(|s| s.file_path == file).cloned().collect())
    }

    async fn get_callers(&self, project: ProjectId, file: &str) -> DbResult<Vec<CallGraphRow>> {
        let _ = project;
        let state = self.state.lock().await;
        Ok(state.call_graph.iter().filter(|c| c.callee_file == file).cloned().collect())
    }

    async fn get_test_source_map(&self, project: ProjectId, file: &str) -> DbResult<Vec<TestSourceMapRow>> {
        let _ = project;
        let state = self.state.lock().await;
        Ok(state.test_source_map.iter().filter(|m| m.source_file == file).cloned().collect())
    }

    async fn file_dependents(&self, project: ProjectId, file: &str) -> DbResult<Vec<String>> {
        let state = self.state.lock().await;
        Ok(state
            .files
            .iter()
            .find(|f| f.project_id == project && f.path == file)
            .map(|f| f.dependents.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn test_relationship_targets(&self, project: ProjectId, file: &str) -> DbResult<Vec<String>> {
        let state = self.state.lock().await;
        Ok(state
            .relationships
            .iter()
            .filter(|r| {
                r.project_id == project
                    && r.relationship == RelationshipKind::Tests
                    && r.source_type == EntityKind::File
                    && r.source_id == file
                    && r.target_type == EntityKind::File
            })
            .map(|r| r.target_id.clone())
            .collect())
    }

    async fn upsert_file_correlation(
        &self,
        project: ProjectId,
        file_a: &str,
        file_b: &str,
        at: DateTime<Utc>,
    ) -> DbResult<()> {
        let (a, b) = if file_a < file_b { (file_a, file_b) } else { (file_b, file_a) };
        let mut state = self.state.lock().await;
        if let Some(row) = state
            .correlations
            .iter_mut()
            .find(|r| r.project_id == project && r.file_a == a && r.file_b == b)
        {
            row.cochange_count += 1;
            row.last_cochange = at;
        } else {
            state.correlations.push(FileCorrelationRow {
                project_id: project,
                file_a: a.to_string(),
                file_b: b.to_string(),
                cochange_count: 1,
                last_cochange: at,
                correlation_strength: 0.0,
                created_at: at,
            });
        }
        Ok(())
    }

    async fn top_cochangers(
        &self,
        project: ProjectId,
        files: &[String],
        excluding: &[String],
        limit: u32,
    ) -> DbResult<Vec<FileCorrelationRow>> {
        let state = self.state.lock().await;
        let mut rows: Vec<FileCorrelationRow> = state
            .correlations
            .iter()
            .filter(|r| {
                r.project_id == project
                    && (files.contains(&r.file_a) || files.contains(&r.file_b))
                    && !excluding.contains(&r.file_a)
                    && !excluding.contains(&r.file_b)
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.cochange_count.cmp(&a.cochange_count));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn correlation_count(&self, project: ProjectId, min_strength: f64) -> DbResult<u32> {
        let state = self.state.lock().await;
        Ok(state
            .correlations
            .iter()
            .filter(|r| r.project_id == project && r.correlation_strength >= min_strength)
            .count() as u32)
    }

    async fn correlations_above(&self, project: ProjectId, min_count: u32) -> DbResult<Vec<FileCorrelationRow>> {
        let state = self.state.lock().await;
        Ok(state
            .correlations
            .iter()
            .filter(|r| r.project_id == project && r.cochange_count >= min_count)
            .cloned()
            .collect())
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
        let mut state = self.state.lock().await;
        let id = state.alloc();
        state.relationships.push(RelationshipRow {
            id,
            project_id: project,
            source_type,
            source_id: source_id.to_string(),
            relationship,
            target_type,
            target_id: target_id.to_string(),
            strength: 1.0,
        });
        Ok(())
    }

    async fn create_session(&self, project: ProjectId, goal: Option<&str>, started_at: DateTime<Utc>) -> DbResult<SessionRow> {
        let mut state = self.state.lock().await;
        let id = state.alloc();
        let session_number = state.sessions.iter().filter(|s| s.project_id == project).count() as u32 + 1;
        let row = SessionRow {
            id,
            project_id: project,
            session_number,
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
        };
        state.sessions.push(row.clone());
        Ok(row)
    }

    async fn get_active_session(&self, project: ProjectId) -> DbResult<Option<SessionRow>> {
        let state = self.state.lock().await;
        Ok(state
            .sessions
            .iter()
            .filter(|s| s.project_id == project && s.is_active())
            .max_by_key(|s| s.started_at)
            .cloned())
    }

    async fn get_last_ended_session(&self, project: ProjectId) -> DbResult<Option<SessionRow>> {
        let state = self.state.lock().await;
        Ok(state
            .sessions
            .iter()
            .filter(|s| s.project_id == project && s.ended_at.is_some())
            .max_by_key(|s| s.ended_at)
            .cloned())
    }

    async fn append_session_tracking(
        &self,
        session_id: i64,
        field: SessionTrackingField,
        value: &str,
    ) -> DbResult<()> {
        let mut state = self.state.lock().await;
        if let Some(s) = state.sessions.iter_mut().find(|s| s.id == session_id) {
            let list = match field {
                SessionTrackingField::FilesRead => &mut s.files_read,
                SessionTrackingField::QueriesMade => &mut s.queries_made,
                SessionTrackingField::FilesTouched => &mut s.files_touched,
                _ => {
                    let list_i64 = match field {
                        SessionTrackingField::DecisionsMade => &mut s.decisions_made,
                        SessionTrackingField::IssuesFound => &mut s.issues_found,
                        SessionTrackingField::IssuesResolved => &mut s.issues_resolved,
                        _ => unreachable!(),
                    };
                    if let Ok(v) = value.parse::<i64>() {
                        if !list_i64.contains(&v) {
                            if field == SessionTrackingField::QueriesMade && list_i64.len() >= 50 {
                                list_i64.remove(0);
                            }
                            list_i64.push(v);
                        }
                    }
                    return Ok(());
                }
            };
            if !list.contains(&value.to_string()) {
                if field == SessionTrackingField::QueriesMade && list.len() >= 50 {
                    list.remove(0);
                }
                list.push(value.to_string());
            }
        }
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
        let mut state = self.state.lock().await;
        if let Some(s) = state.sessions.iter_mut().find(|s| s.id == session_id) {
            s.ended_at = Some(ended_at);
            s.outcome = outcome.map(String::from);
            s.success = success;
            s.next_steps = next_steps.map(String::from);
        }
        Ok(())
    }

    async fn recent_sessions(&self, project: ProjectId, limit: u32) -> DbResult<Vec<SessionRow>> {
        let state = self.state.lock().await;
        let mut rows: Vec<SessionRow> = state.sessions.iter().filter(|s| s.project_id == project).cloned().collect();
        rows.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn insert_context_injection(&self, session_id: i64, file_path: Option<&str>) -> DbResult<i64> {
        let mut state = self.state.lock().await;
        let id = state.alloc();
        state.context_injections.push(ContextInjectionRow {
            id,
            session_id,
            file_path: file_path.map(String::from),
            was_used: false,
            relevance: None,
        });
        Ok(id)
    }

    async fn mark_injection_used(&self, injection_id: i64) -> DbResult<()> {
        let mut state = self.state.lock().await;
        if let Some(row) = state.context_injections.iter_mut().find(|c| c.id == injection_id) {
            row.was_used = true;
        }
        Ok(())
    }

    async fn classify_injection_impact(
        &self,
        injection_id: i64,
        classification: ImpactClassification,
    ) -> DbResult<()> {
        let mut state = self.state.lock().await;
        if let Some(row) = state.context_injections.iter_mut().find(|c| c.id == injection_id) {
            row.relevance = Some(match classification {
                ImpactClassification::Helped => 1.0,
                ImpactClassification::Harmful => -1.0,
                _ => 0.0,
            });
        }
        Ok(())
    }

    async fn unclassified_injections(&self, project: ProjectId) -> DbResult<Vec<ContextInjectionRow>> {
        let state = self.state.lock().await;
        let session_ids: Vec<i64> = state.sessions.iter().filter(|s| s.project_id == project).map(|s| s.id).collect();
        Ok(state
            .context_injections
            .iter()
            .filter(|c| session_ids.contains(&c.session_id) && c.relevance.is_none())
            .cloned()
            .collect())
    }

    async fn upsert_insight(&self, row: &InsightRow) -> DbResult<i64> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state
            .insights
            .iter_mut()
            .find(|i| i.project_id == row.project_id && i.title == row.title)
        {
            existing.content = row.content.clone();
            existing.evidence = row.evidence.clone();
            existing.confidence = row.confidence;
            existing.insight_type = row.insight_type;
            return Ok(existing.id);
        }
        let id = state.alloc();
        let mut row = row.clone();
        row.id = id;
        state.insights.push(row);
        Ok(id)
    }

    async fn new_insights(&self, project: ProjectId, limit: u32) -> DbResult<Vec<InsightRow>> {
        let state = self.state.lock().await;
        let mut rows: Vec<InsightRow> = state
            .insights
            .iter()
            .filter(|i| i.project_id == project && i.status == InsightStatus::New)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn mark_insight_shown(&self, id: i64) -> DbResult<()> {
        let mut state = self.state.lock().await;
        if let Some(i) = state.insights.iter_mut().find(|i| i.id == id) {
            i.shown_count += 1;
        }
        Ok(())
    }

    async fn auto_dismiss_stale_insights(&self, project: ProjectId, threshold: u32) -> DbResult<u32> {
        let mut state = self.state.lock().await;
        let mut n = 0;
        for i in state
            .insights
            .iter_mut()
            .filter(|i| i.project_id == project && i.status == InsightStatus::New && i.shown_count >= threshold)
        {
            i.status = InsightStatus::Dismissed;
            n += 1;
        }
        Ok(n)
    }

    async fn last_insight_generated_at(&self, project: ProjectId) -> DbResult<Option<DateTime<Utc>>> {
        let state = self.state.lock().await;
        Ok(state.insights.iter().filter(|i| i.project_id == project).map(|i| i.created_at).max())
    }

    async fn sessions_ended_since(&self, project: ProjectId, since: DateTime<Utc>) -> DbResult<u32> {
        let state = self.state.lock().await;
        Ok(state
            .sessions
            .iter()
            .filter(|s| s.project_id == project && s.ended_at.is_some_and(|ended| ended > since))
            .count() as u32)
    }

    async fn correlations_updated_since(&self, project: ProjectId, since: DateTime<Utc>) -> DbResult<u32> {
        let state = self.state.lock().await;
        Ok(state
            .correlations
            .iter()
            .filter(|c| c.project_id == project && c.last_cochange > since)
            .count() as u32)
    }

    async fn decisions_made_since(&self, project: ProjectId, since: DateTime<Utc>) -> DbResult<u32> {
        let state = self.state.lock().await;
        Ok(state.decisions.iter().filter(|d| d.project_id == project && d.decided_at > since).count() as u32)
    }

    async fn workflow_patterns(&self, project: ProjectId) -> DbResult<Vec<WorkflowPatternRow>> {
        let state = self.state.lock().await;
        Ok(state.workflow_patterns.iter().filter(|w| w.project_id == project).cloned().collect())
    }

    async fn record_observation(&self, project: ProjectId, content: &str, at: DateTime<Utc>) -> DbResult<()> {
        let mut state = self.state.lock().await;
        state.observations.push(ObservationRow { project_id: project, content: content.to_string(), created_at: at });
        Ok(())
    }

    async fn recent_observations(&self, project: ProjectId, limit: u32) -> DbResult<Vec<ObservationRow>> {
        let state = self.state.lock().await;
        let mut rows: Vec<ObservationRow> = state.observations.iter().filter(|o| o.project_id == project).cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn high_fragility_file_count(&self, project: ProjectId, threshold: u8) -> DbResult<u32> {
        let state = self.state.lock().await;
        Ok(state.files.iter().filter(|f| f.project_id == project && f.fragility >= threshold).count() as u32)
    }

    async fn files_with_velocity_above(&self, project: ProjectId, threshold: f64) -> DbResult<Vec<FileRow>> {
        let state = self.state.lock().await;
        Ok(state
            .files
            .iter()
            .filter(|f| f.project_id == project && f.velocity_score > threshold)
            .cloned()
            .collect())
    }

    async fn reviewed_decisions(&self, project: ProjectId) -> DbResult<Vec<DecisionRow>> {
        let state = self.state.lock().await;
        Ok(state
            .decisions
            .iter()
            .filter(|d| d.project_id == project && d.outcome_status != OutcomeStatus::Pending)
            .cloned()
            .collect())
    }

    async fn record_enrichment_metric(&self, row: &EnrichmentMetricRow) -> DbResult<()> {
        self.state.lock().await.metrics.push(row.clone());
        Ok(())
    }

    async fn prune_metrics_older_than(&self, project: ProjectId, before: DateTime<Utc>) -> DbResult<u32> {
        let mut state = self.state.lock().await;
        let before_len = state.metrics.len();
        state.metrics.retain(|m| !(m.project_id == project && m.created_at < before));
        Ok((before_len - state.metrics.len()) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use muninn_core::Temperature;

    fn sample_file(project: ProjectId, path: &str) -> FileRow {
        FileRow {
            id: 0,
            project_id: project,
            path: path.to_string(),
            file_type: FileType::Component,
            purpose: None,
            fragility: 7,
            fragility_reason: None,
            fragility_signals: FragilitySignals::default(),
            content_hash: None,
            last_analyzed: None,
            dependencies: Default::default(),
            dependents: Default::default(),
            velocity_score: 0.0,
            change_count: 0,
            temperature: Temperature::Hot,
            last_referenced_at: Some(muninn_core::now()),
            status: FileStatus::Active,
        }
    }

    #[tokio::test]
    async fn test_upsert_then_get_file() {
        let db = InMemoryAdapter::new();
        db.upsert_file(&sample_file(1, "src/lib.rs")).await.unwrap();
        let found = db.get_file(1, "src/lib.rs").await.unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().fragility, 7);
    }

    #[tokio::test]
    async fn test_fragile_and_hot_files_filters() {
        let db = InMemoryAdapter::new();
        db.upsert_file(&sample_file(1, "a.rs")).await.unwrap();
        let mut cold = sample_file(1, "b.rs");
        cold.temperature = Temperature::Cold;
        db.upsert_file(&cold).await.unwrap();
        let hot = db.fragile_and_hot_files(1, 10).await.unwrap();
        assert_eq!(hot.len(), 1);
        assert_eq!(hot[0].path, "a.rs");
    }

    #[tokio::test]
    async fn test_approval_idempotent() {
        let db = InMemoryAdapter::new();
        let now = muninn_core::now();
        db.create_pending_approval(1, "op_1", "Edit", "a.rs", "fragile", BlockLevelDb::Soft, now, now + chrono::Duration::minutes(30))
            .await
            .unwrap();
        assert!(db.approve("op_1", now).await.unwrap());
        assert!(!db.approve("op_1", now).await.unwrap());
    }

    #[tokio::test]
    async fn test_session_tracking_append_without_duplicate() {
        let db = InMemoryAdapter::new();
        let session = db.create_session(1, None, muninn_core::now()).await.unwrap();
        db.append_session_tracking(session.id, SessionTrackingField::FilesRead, "a.rs").await.unwrap();
        db.append_session_tracking(session.id, SessionTrackingField::FilesRead, "a.rs").await.unwrap();
        let active = db.get_active_session(1).await.unwrap().unwrap();
        assert_eq!(active.files_read, vec!["a.rs".to_string()]);
    }

    #[tokio::test]
    async fn test_restore_from_archive_rejects_unknown_table() {
        let db = InMemoryAdapter::new();
        let err = db.restore_from_archive("files", 1).await.unwrap_err();
        assert!(matches!(err, MuninnError::RestoreNotPermitted(_)));
    }
}
