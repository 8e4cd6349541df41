//! Cache-then-fallback helpers shared by more than one enricher (spec.md
//! §4.5: "cache by path, fall back to the adapter on a miss").

use muninn_cache::{key, Cache};
use muninn_core::{MuninnError, ProjectId};
use muninn_db::adapter::DatabaseAdapter;
use muninn_db::rows::FileRow;

/// `file:{project}:{path}` lookup, caching adapter hits for `ttl`.
pub async fn fetch_file(
    db: &dyn DatabaseAdapter,
    cache: &Cache<FileRow>,
    ttl: Option<std::time::Duration>,
    project: ProjectId,
    path: &str,
) -> Result<Option<FileRow>, MuninnError> {
    let cache_key = key::file(project, path);
    if let Some(row) = cache.get(&cache_key) {
        return Ok(Some(row));
    }
    let fetched = db.get_file(project, path).await?;
    if let Some(ref row) = fetched {
        cache.set(&cache_key, row.clone(), ttl);
    }
    Ok(fetched)
}
