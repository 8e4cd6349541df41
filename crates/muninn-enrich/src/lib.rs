//! muninn-enrich: C4-C6 of the pipeline (spec.md §4.4-§4.6) — the enricher
//! registry, the nine pure enrichers, the pending-approval workflow they
//! share with the blocker, and the engine that runs them all for one tool
//! call.

pub mod approval;
pub mod engine;
pub mod enrichers;
pub mod registry;

pub use engine::{enrich, EnrichCaches, EnrichmentResult};
pub use enrichers::{BlockOutcome, CodeIntelSnapshot};
pub use registry::{EnricherDef, EnricherName, EnricherOverride, EnricherRegistry};
