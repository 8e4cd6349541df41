//! muninn-knowledge: C7 of the pipeline (spec.md §4.7) — the knowledge
//! lifecycle that runs between tool-call enrichment and session tracking:
//! temperature decay, confidence reinforcement/reduction, the confirm ->
//! candidate -> promote cycle, and archival/restore. Thin orchestration over
//! [`muninn_db::adapter::DatabaseAdapter`], which already owns each
//! individual row mutation; this crate sequences them and applies the
//! cross-cutting rules (eligibility checks, demote-only-if-promoted) the
//! adapter doesn't know about on its own.

pub mod archival;
pub mod decay;
pub mod promotion;
pub mod reinforcement;

pub use archival::{prune_metrics, restore, sweep, ArchivalCounts};
pub use decay::{decay_all, DecayCounts};
pub use promotion::{confirm, is_candidate_eligible};
pub use reinforcement::apply_decision_outcome;
