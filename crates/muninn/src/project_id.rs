//! Deterministic project identity from a filesystem path.
//!
//! There is no registration step: the same project root always maps to the
//! same [`ProjectId`], so a fresh checkout picks its history back up without
//! an explicit `muninn init`. Grounded on the teacher's `csa-session::finding_id`
//! stable-identifier pattern (hash the normalized input, truncate).

use std::path::Path;

use muninn_core::ProjectId;
use sha2::{Digest, Sha256};

pub fn resolve(project_root: &Path) -> ProjectId {
    let canonical = project_root
        .canonicalize()
        .unwrap_or_else(|_| project_root.to_path_buf());
    let digest = Sha256::digest(canonical.to_string_lossy().as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    (i64::from_be_bytes(bytes)).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_path_resolves_to_same_id() {
        let a = resolve(Path::new("/tmp/does-not-exist-a"));
        let b = resolve(Path::new("/tmp/does-not-exist-a"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_paths_resolve_to_different_ids() {
        let a = resolve(Path::new("/tmp/does-not-exist-a"));
        let b = resolve(Path::new("/tmp/does-not-exist-b"));
        assert_ne!(a, b);
    }
}
