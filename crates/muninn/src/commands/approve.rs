use chrono::Utc;
use muninn_core::MuninnError;
use muninn_db::adapter::DatabaseAdapter;
use muninn_db::SqliteAdapter;

pub async fn run(db: &SqliteAdapter, operation_id: &str) -> Result<(), MuninnError> {
    let pending = db
        .get_pending_approval(operation_id)
        .await?
        .ok_or_else(|| MuninnError::ApprovalNotFound(operation_id.to_string()))?;

    let now = Utc::now();
    if pending.expires_at < now {
        return Err(MuninnError::ApprovalExpired(operation_id.to_string()));
    }

    let approved = db.approve(operation_id, now).await?;
    if approved {
        println!("approved {operation_id}");
    } else {
        println!("{operation_id} was already approved");
    }
    Ok(())
}
