use chrono::{DateTime, Utc};
use muninn_core::{MuninnError, ProjectId};
use muninn_db::DatabaseAdapter;

/// Upsert a co-change edge for every unordered pair in `files_touched`
/// (spec.md §4.8 "require ≥2 files to produce any edge"). Pairs are emitted
/// `file_a < file_b` lexicographically regardless of input order, matching
/// the `FileCorrelation` invariant (spec.md §3).
pub async fn record_session_correlations(
    db: &dyn DatabaseAdapter,
    project: ProjectId,
    files_touched: &[String],
    at: DateTime<Utc>,
) -> Result<u32, MuninnError> {
    let mut files: Vec<&String> = files_touched.iter().collect();
    files.sort();
    files.dedup();

    if files.len() < 2 {
        return Ok(0);
    }

    let mut pairs = 0u32;
    for i in 0..files.len() {
        for j in (i + 1)..files.len() {
            let (file_a, file_b) = if files[i] <= files[j] {
                (files[i], files[j])
            } else {
                (files[j], files[i])
            };
            db.upsert_file_correlation(project, file_a, file_b, at).await?;
            pairs += 1;
        }
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use muninn_db::InMemoryAdapter;

    #[tokio::test]
    async fn test_requires_at_least_two_files() {
        let db = InMemoryAdapter::new();
        let pairs = record_session_correlations(&db, 1, &["x.ts".to_string()], Utc::now())
            .await
            .unwrap();
        assert_eq!(pairs, 0);
    }

    #[tokio::test]
    async fn test_three_files_yield_three_pairs_sorted() {
        let db = InMemoryAdapter::new();
        let files = vec!["z.ts".to_string(), "x.ts".to_string(), "y.ts".to_string()];
        let pairs = record_session_correlations(&db, 1, &files, Utc::now()).await.unwrap();
        assert_eq!(pairs, 3);
        let top = db.top_cochangers(1, &["x.ts".to_string()], &[], 10).await.unwrap();
        assert_eq!(top.len(), 2);
        for row in &top {
            assert!(row.file_a < row.file_b);
        }
    }

    #[tokio::test]
    async fn test_duplicate_files_deduped_before_pairing() {
        let db = InMemoryAdapter::new();
        let files = vec!["a.ts".to_string(), "a.ts".to_string(), "b.ts".to_string()];
        let pairs = record_session_correlations(&db, 1, &files, Utc::now()).await.unwrap();
        assert_eq!(pairs, 1);
    }
}
