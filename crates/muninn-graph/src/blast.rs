//! Bounded BFS blast radius over the `dependents` graph stored on file rows
//! (spec.md §4.8, §9 "Blast radius"). The graph isn't a separate table: each
//! `FileRow.dependents` entry is itself traversed through
//! [`DatabaseAdapter::file_dependents`], so the closure walks live file rows
//! rather than a cached `blast_radius` snapshot.

use std::collections::{HashSet, VecDeque};

use muninn_core::{ProjectId, RiskLevel};
use muninn_db::adapter::{DatabaseAdapter, DbResult};

/// Max BFS depth (spec.md §9 "Cycle risk in relationships": "max depth
/// (default 4)").
pub const DEFAULT_MAX_DEPTH: u32 = 4;

/// The reachable-set result of a blast-radius BFS, before scoring.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlastClosure {
    /// Neighbors at distance 1.
    pub direct_dependents: Vec<String>,
    /// Neighbors at distance 2..=max_depth.
    pub transitive_dependents: Vec<String>,
    /// Closure members whose path matches a test heuristic, or that carry a
    /// stored `file →tests→ file` relationship edge back to the source.
    pub affected_tests: Vec<String>,
    /// Closure members of `FileType::Route`.
    pub affected_routes: Vec<String>,
}

impl BlastClosure {
    pub fn direct_count(&self) -> u32 {
        self.direct_dependents.len() as u32
    }

    pub fn transitive_count(&self) -> u32 {
        self.transitive_dependents.len() as u32
    }

    pub fn test_count(&self) -> u32 {
        self.affected_tests.len() as u32
    }

    pub fn route_count(&self) -> u32 {
        self.affected_routes.len() as u32
    }
}

/// Path heuristics for "looks like a test file" (spec.md §4.5 tests
/// enricher, option (c)).
pub fn looks_like_test_path(path: &str) -> bool {
    path.ends_with(".test.ts")
        || path.ends_with(".test.tsx")
        || path.ends_with(".spec.ts")
        || path.ends_with(".spec.tsx")
        || path.contains("/tests/")
        || path.starts_with("tests/")
        || path.contains("/__tests__/")
        || path.starts_with("__tests__/")
}

/// Walk the `dependents` graph outward from `file` up to `max_depth` hops,
/// classifying the closure into direct/transitive/test/route buckets.
pub async fn compute_blast_radius(
    db: &dyn DatabaseAdapter,
    project: ProjectId,
    file: &str,
    max_depth: u32,
) -> DbResult<BlastClosure> {
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(file.to_string());

    let mut closure = BlastClosure::default();
    let mut queue: VecDeque<(String, u32)> = VecDeque::new();
    queue.push_back((file.to_string(), 0));

    while let Some((current, depth)) = queue.pop_front() {
        if depth >= max_depth {
            continue;
        }
        for dependent in db.file_dependents(project, &current).await? {
            if !visited.insert(dependent.clone()) {
                continue;
            }
            if depth == 0 {
                closure.direct_dependents.push(dependent.clone());
            } else {
                closure.transitive_dependents.push(dependent.clone());
            }
            if looks_like_test_path(&dependent) {
                closure.affected_tests.push(dependent.clone());
            }
            if let Some(row) = db.get_file(project, &dependent).await? {
                if row.file_type == muninn_db::rows::FileType::Route {
                    closure.affected_routes.push(dependent.clone());
                }
            }
            queue.push_back((dependent, depth + 1));
        }
    }

    for target in db.test_relationship_targets(project, file).await? {
        if visited.insert(target.clone()) {
            closure.transitive_dependents.push(target.clone());
        }
        if !closure.affected_tests.contains(&target) {
            closure.affected_tests.push(target);
        }
    }

    Ok(closure)
}

/// `score = 4·direct + 2·transitive + 5·tests + 3·routes`, clamped to
/// `[0,100]` (spec.md §9 "Open question: blast scoring constants" — the
/// suggested formula, chosen here since the source doesn't publish weights;
/// see DESIGN.md).
pub fn score_blast_radius(direct: u32, transitive: u32, tests: u32, routes: u32) -> u32 {
    let raw = 4 * direct + 2 * transitive + 5 * tests + 3 * routes;
    raw.min(100)
}

/// Risk buckets are monotonic in score, transitioning at equality (spec.md
/// §8): `>=80` critical, `>=50` high, `>=20` medium, else low.
pub fn risk_bucket(score: u32) -> RiskLevel {
    if score >= 80 {
        RiskLevel::Critical
    } else if score >= 50 {
        RiskLevel::High
    } else if score >= 20 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use muninn_db::rows::{FileRow, FileStatus, FileType, FragilitySignals};
    use muninn_db::InMemoryAdapter;
    use muninn_core::Temperature;
    use std::collections::BTreeSet;

    fn file(path: &str, file_type: FileType, dependents: &[&str]) -> FileRow {
        FileRow {
            id: 0,
            project_id: 1,
            path: path.to_string(),
            file_type,
            purpose: None,
            fragility: 0,
            fragility_reason: None,
            fragility_signals: FragilitySignals::default(),
            content_hash: None,
            last_analyzed: None,
            dependencies: BTreeSet::new(),
            dependents: dependents.iter().map(|s| s.to_string()).collect(),
            velocity_score: 0.0,
            change_count: 0,
            temperature: Temperature::Warm,
            last_referenced_at: None,
            status: FileStatus::Active,
        }
    }

    #[tokio::test]
    async fn test_direct_vs_transitive_split() {
        let db = InMemoryAdapter::new();
        db.upsert_file(&file("a.ts", FileType::Util, &["b.ts"])).await.unwrap();
        db.upsert_file(&file("b.ts", FileType::Util, &["c.ts"])).await.unwrap();
        db.upsert_file(&file("c.ts", FileType::Util, &[])).await.unwrap();

        let closure = compute_blast_radius(&db, 1, "a.ts", DEFAULT_MAX_DEPTH).await.unwrap();
        assert_eq!(closure.direct_dependents, vec!["b.ts".to_string()]);
        assert_eq!(closure.transitive_dependents, vec!["c.ts".to_string()]);
    }

    #[tokio::test]
    async fn test_max_depth_bounds_traversal() {
        let db = InMemoryAdapter::new();
        db.upsert_file(&file("a.ts", FileType::Util, &["b.ts"])).await.unwrap();
        db.upsert_file(&file("b.ts", FileType::Util, &["c.ts"])).await.unwrap();
        db.upsert_file(&file("c.ts", FileType::Util, &["d.ts"])).await.unwrap();
        db.upsert_file(&file("d.ts", FileType::Util, &[])).await.unwrap();

        let closure = compute_blast_radius(&db, 1, "a.ts", 2).await.unwrap();
        assert!(closure.direct_dependents.contains(&"b.ts".to_string()));
        assert!(closure.transitive_dependents.contains(&"c.ts".to_string()));
        assert!(!closure.transitive_dependents.contains(&"d.ts".to_string()));
    }

    #[tokio::test]
    async fn test_cycle_does_not_loop() {
        let db = InMemoryAdapter::new();
        db.upsert_file(&file("a.ts", FileType::Util, &["b.ts"])).await.unwrap();
        db.upsert_file(&file("b.ts", FileType::Util, &["a.ts"])).await.unwrap();

        let closure = compute_blast_radius(&db, 1, "a.ts", DEFAULT_MAX_DEPTH).await.unwrap();
        assert_eq!(closure.direct_dependents, vec!["b.ts".to_string()]);
        assert!(closure.transitive_dependents.is_empty());
    }

    #[tokio::test]
    async fn test_route_file_detected() {
        let db = InMemoryAdapter::new();
        db.upsert_file(&file("a.ts", FileType::Util, &["routes/index.ts"])).await.unwrap();
        db.upsert_file(&file("routes/index.ts", FileType::Route, &[])).await.unwrap();

        let closure = compute_blast_radius(&db, 1, "a.ts", DEFAULT_MAX_DEPTH).await.unwrap();
        assert_eq!(closure.affected_routes, vec!["routes/index.ts".to_string()]);
    }

    #[test]
    fn test_looks_like_test_path_heuristics() {
        assert!(looks_like_test_path("src/foo.test.ts"));
        assert!(looks_like_test_path("src/foo.spec.tsx"));
        assert!(looks_like_test_path("src/__tests__/foo.ts"));
        assert!(!looks_like_test_path("src/foo.ts"));
    }

    #[test]
    fn test_score_clamped_to_100() {
        assert_eq!(score_blast_radius(50, 50, 50, 50), 100);
        assert_eq!(score_blast_radius(0, 0, 0, 0), 0);
    }

    #[test]
    fn test_risk_buckets_monotonic_at_equality() {
        assert_eq!(risk_bucket(80), RiskLevel::Critical);
        assert_eq!(risk_bucket(50), RiskLevel::High);
        assert_eq!(risk_bucket(20), RiskLevel::Medium);
        assert_eq!(risk_bucket(19), RiskLevel::Low);
    }
}
