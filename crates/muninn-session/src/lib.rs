//! muninn-session: C9 (spec.md §4.9) — session lifecycle, tracking-list
//! appends, the decision outcome auto-tracker, learning extraction, and
//! context-injection impact classification.

pub mod decision_tracker;
pub mod end;
pub mod impact;
pub mod learning_extraction;
pub mod lifecycle;
pub mod transcript;
pub mod tracking;

pub use decision_tracker::track_decision_outcomes;
pub use end::{end, EndSessionCounts, EndSessionRequest};
pub use impact::classify_injections;
pub use learning_extraction::apply_extracted_learnings;
pub use lifecycle::start;
pub use transcript::{ApiAnalyzer, ExtractedLearning, NoopAnalyzer, TranscriptAnalysis, TranscriptAnalyzer};
pub use tracking::{
    track_decision_made, track_file_read, track_file_touched, track_issue_found, track_issue_resolved, track_query,
};
