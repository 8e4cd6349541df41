//! Pending-approval workflow for hard blocks (spec.md §4.6 "Approval flow").

use chrono::{DateTime, Duration, Utc};
use muninn_core::{MuninnError, ProjectId};
use muninn_db::adapter::DatabaseAdapter;
use muninn_db::rows::BlockLevelDb;
use rand::RngCore;

/// Approval expiry (spec.md §3 PendingApproval: "≈+30 min").
pub const APPROVAL_TTL: Duration = Duration::minutes(30);

/// `op_{base36(ms_since_epoch)}_{24 hex of CSPRNG}` (spec.md §6).
pub fn generate_operation_id(at: DateTime<Utc>) -> String {
    let millis = at.timestamp_millis().max(0) as u128;
    let base36 = to_base36(millis);
    let mut random_bytes = [0u8; 12];
    rand::thread_rng().fill_bytes(&mut random_bytes);
    let hex: String = random_bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!("op_{base36}_{hex}")
}

fn to_base36(mut value: u128) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).expect("base36 digits are ASCII")
}

/// Create a hard-block pending approval and return its operation id
/// (spec.md §4.6).
pub async fn create_hard_block(
    db: &dyn DatabaseAdapter,
    project: ProjectId,
    tool: &str,
    file_path: &str,
    reason: &str,
    at: DateTime<Utc>,
) -> Result<String, MuninnError> {
    let operation_id = generate_operation_id(at);
    db.create_pending_approval(
        project,
        &operation_id,
        tool,
        file_path,
        reason,
        BlockLevelDb::Hard,
        at,
        at + APPROVAL_TTL,
    )
    .await?;
    Ok(operation_id)
}

/// Atomic approve: `UPDATE … WHERE approved_at IS NULL` (spec.md §4.6, §7
/// `ApprovalRace`). Returns `false` on a second call for the same id.
pub async fn approve(
    db: &dyn DatabaseAdapter,
    operation_id: &str,
    at: DateTime<Utc>,
) -> Result<bool, MuninnError> {
    db.approve(operation_id, at).await
}

/// Pure read (spec.md §4.6 `is_approved`).
pub async fn is_approved(db: &dyn DatabaseAdapter, operation_id: &str) -> Result<bool, MuninnError> {
    Ok(db.get_pending_approval(operation_id).await?.is_some_and(|row| row.approved_at.is_some()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use muninn_db::InMemoryAdapter;

    #[test]
    fn test_operation_id_shape() {
        let id = generate_operation_id(Utc::now());
        assert!(id.starts_with("op_"));
        let parts: Vec<&str> = id.trim_start_matches("op_").split('_').collect();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1].len(), 24);
        assert!(parts[1].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_operation_ids_are_distinct() {
        let at = Utc::now();
        assert_ne!(generate_operation_id(at), generate_operation_id(at));
    }

    #[tokio::test]
    async fn test_create_hard_block_and_approve() {
        let db = InMemoryAdapter::new();
        let now = Utc::now();
        let op_id = create_hard_block(&db, 1, "Edit", "src/db.ts", "fragility 9/10", now).await.unwrap();
        assert!(!is_approved(&db, &op_id).await.unwrap());
        assert!(approve(&db, &op_id, now).await.unwrap());
        assert!(is_approved(&db, &op_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_approve_idempotent() {
        let db = InMemoryAdapter::new();
        let now = Utc::now();
        let op_id = create_hard_block(&db, 1, "Edit", "src/db.ts", "fragility", now).await.unwrap();
        assert!(approve(&db, &op_id, now).await.unwrap());
        assert!(!approve(&db, &op_id, now).await.unwrap());
    }

    #[tokio::test]
    async fn test_approve_unknown_operation_returns_false() {
        let db = InMemoryAdapter::new();
        assert!(!approve(&db, "op_doesnotexist_deadbeef", Utc::now()).await.unwrap());
    }
}
