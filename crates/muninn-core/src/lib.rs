//! muninn-core: shared identifiers, enums and error types used by every other
//! `muninn-*` crate.
//!
//! Nothing in this crate talks to a database or the filesystem; it exists so
//! that `muninn-db`, `muninn-enrich`, `muninn-session`, etc. all agree on the
//! vocabulary of the system (what a `Tool` is, what `Temperature` means, how
//! errors are reported) without depending on each other.

pub mod error;
pub mod time;
pub mod types;

pub use error::MuninnError;
pub use time::{days_since, now};
pub use types::{BlockLevel, ProjectId, RiskLevel, Temperature, Tool};
