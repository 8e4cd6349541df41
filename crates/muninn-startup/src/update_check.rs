//! Update check with a 6h cache, fail-open (spec.md §4.11). Grounded on the
//! teacher's `self_update::fetch_latest_release`, swapped from a blocking
//! `curl` subprocess for a cached, timeout-bounded `reqwest` call so it can
//! sit alongside the rest of the startup planner's concurrent reads.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
struct CachedCheck {
    checked_at: DateTime<Utc>,
    latest_version: Option<String>,
}

fn read_cache(cache_path: &Path, now: DateTime<Utc>, cache_hours: u64) -> Option<CachedCheck> {
    let raw = std::fs::read_to_string(cache_path).ok()?;
    let cached: CachedCheck = serde_json::from_str(&raw).ok()?;
    let age = now.signed_duration_since(cached.checked_at);
    if age.num_hours() >= 0 && (age.num_hours() as u64) < cache_hours {
        Some(cached)
    } else {
        None
    }
}

fn write_cache(cache_path: &Path, entry: &CachedCheck) {
    if let Some(parent) = cache_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Ok(raw) = serde_json::to_string(entry) {
        let _ = std::fs::write(cache_path, raw);
    }
}

async fn fetch_latest_version(client: &reqwest::Client, release_url: &str) -> Option<String> {
    let response = client.get(release_url).header("User-Agent", "muninn").send().await.ok()?;
    if !response.status().is_success() {
        return None;
    }
    let body: serde_json::Value = response.json().await.ok()?;
    body["tag_name"].as_str().map(|tag| tag.trim_start_matches('v').to_string())
}

/// Returns `Some(latest_version)` only when it differs from `current_version`.
/// Any network, parse, or cache-file failure degrades to `None` — an update
/// check must never block or fail startup.
pub async fn check_for_update(
    client: &reqwest::Client,
    release_url: &str,
    current_version: &str,
    cache_path: &Path,
    cache_hours: u64,
    now: DateTime<Utc>,
) -> Option<String> {
    if let Some(cached) = read_cache(cache_path, now, cache_hours) {
        return cached.latest_version.filter(|v| v != current_version);
    }

    let latest = fetch_latest_version(client, release_url).await;
    write_cache(cache_path, &CachedCheck { checked_at: now, latest_version: latest.clone() });
    latest.filter(|v| v != current_version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_expired_past_window_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("update-check.json");
        let checked_at = Utc::now() - chrono::Duration::hours(7);
        write_cache(&path, &CachedCheck { checked_at, latest_version: Some("9.9.9".to_string()) });
        assert!(read_cache(&path, Utc::now(), 6).is_none());
    }

    #[test]
    fn test_cache_within_window_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("update-check.json");
        let checked_at = Utc::now() - chrono::Duration::hours(1);
        write_cache(&path, &CachedCheck { checked_at, latest_version: Some("9.9.9".to_string()) });
        let cached = read_cache(&path, Utc::now(), 6).unwrap();
        assert_eq!(cached.latest_version.as_deref(), Some("9.9.9"));
    }

    #[tokio::test]
    async fn test_missing_cache_and_unreachable_url_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("update-check.json");
        let client = reqwest::Client::new();
        let result = check_for_update(&client, "http://127.0.0.1:1/nope", "0.1.0", &path, 6, Utc::now()).await;
        assert!(result.is_none());
    }
}
