//! muninn-insights: C10 (spec.md §4.10) — the five insight detectors, the
//! due-check gating when they run, and the auto-dismiss sweep for insights
//! nobody is acting on.

pub mod detectors;
pub mod due;
pub mod generate;

pub use due::should_generate;
pub use generate::{generate_if_due, GenerationCounts};
