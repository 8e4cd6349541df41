//! Opens the project's SQLite database. Schema creation is out of scope for
//! `muninn-db` (its `SqliteAdapter` "never issues `CREATE TABLE`") — this
//! binary refuses to create a fresh file and instead reports
//! [`MuninnError::NotInitialized`], matching the exit-code contract (spec.md
//! §6: `NotInitialized` maps to exit code 3).

use std::path::Path;

use muninn_core::MuninnError;
use muninn_db::SqliteAdapter;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

pub async fn open(db_path: &Path) -> Result<SqliteAdapter, MuninnError> {
    let options = SqliteConnectOptions::new().filename(db_path).create_if_missing(false);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .map_err(|_| MuninnError::NotInitialized)?;
    Ok(SqliteAdapter::new(pool))
}
