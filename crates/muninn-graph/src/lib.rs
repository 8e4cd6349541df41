//! Relationship & correlation engine (spec.md §4.8): file-pair co-change
//! tracking, session-derived relationship edges, and bounded BFS blast
//! radius over the dependency graph stored on file rows.
//!
//! Grounded on `oldnordic-odincode`'s `large_codebase_mapper::dependencies`
//! module — a thin analyzer type wrapping graph traversal over stored
//! entities, here adapted to a `DatabaseAdapter`-backed file graph.

pub mod blast;
pub mod correlation;
pub mod relationships;

pub use blast::{compute_blast_radius, risk_bucket, score_blast_radius, BlastClosure};
pub use correlation::record_session_correlations;
pub use relationships::{derive_session_relationships, DEFAULT_COCHANGE_EDGE_THRESHOLD};
