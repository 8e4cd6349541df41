//! Working-tree diff with a hard timeout (spec.md §4.11 "git diff (5s
//! timeout)"; §7 "SubprocessFailure/Timeout — external process failure
//! yields an empty field").

use std::path::Path;
use std::time::Duration;

use tokio::process::Command;

/// Returns `None` on any failure (git missing, not a repo, non-zero exit,
/// or the timeout elapsing) rather than surfacing an error — a startup
/// planner field, not a user-facing command.
pub async fn working_tree_diff(project_path: &Path, timeout: Duration) -> Option<String> {
    let run = Command::new("git").arg("diff").current_dir(project_path).output();

    let output = match tokio::time::timeout(timeout, run).await {
        Ok(Ok(output)) => output,
        Ok(Err(_)) | Err(_) => return None,
    };

    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_non_repo_path_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let diff = working_tree_diff(dir.path(), Duration::from_secs(5)).await;
        assert!(diff.is_none());
    }
}
