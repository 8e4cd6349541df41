//! muninn-db: the `DatabaseAdapter` trait and its two implementations.
//!
//! Every other `muninn-*` crate talks to storage exclusively through
//! `DatabaseAdapter` — never through `sqlx` directly — so that enrichers,
//! the session engine, and the startup planner can be exercised in unit
//! tests against `InMemoryAdapter` without a SQLite file on disk. Schema
//! creation and migrations are out of scope here: both adapters assume the
//! tables named in `rows` already exist.

pub mod adapter;
pub mod memory;
pub mod rows;
pub mod sqlite;

pub use adapter::DatabaseAdapter;
pub use memory::InMemoryAdapter;
pub use sqlite::SqliteAdapter;
