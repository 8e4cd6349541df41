use std::path::PathBuf;

pub const APP_NAME: &str = "muninn";

/// Resolve the project-level config directory using XDG conventions
/// (mirrors the teacher's `csa-config::paths::config_dir`).
pub fn project_config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// The project-level override file, `muninn.toml`, at the project root
/// (spec.md §3 "an optional `muninn.toml`").
pub fn project_override_path(project_root: &std::path::Path) -> PathBuf {
    project_root.join("muninn.toml")
}

/// Where the project's SQLite database lives: `<project_root>/.muninn/muninn.db`.
/// Schema creation is out of scope for this crate (spec.md §1) — callers that
/// need a fresh database still have to run migrations themselves before
/// opening a pool against this path.
pub fn project_db_path(project_root: &std::path::Path) -> PathBuf {
    project_root.join(".muninn").join("muninn.db")
}

/// Where the update-check cache file lives, alongside the database.
pub fn update_check_cache_path(project_root: &std::path::Path) -> PathBuf {
    project_root.join(".muninn").join("update-check.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_override_path_joins_project_root() {
        let root = std::path::Path::new("/tmp/my-project");
        assert_eq!(project_override_path(root), PathBuf::from("/tmp/my-project/muninn.toml"));
    }

    #[test]
    fn test_project_db_path_lives_under_dot_muninn() {
        let root = std::path::Path::new("/tmp/my-project");
        assert_eq!(project_db_path(root), PathBuf::from("/tmp/my-project/.muninn/muninn.db"));
    }
}
