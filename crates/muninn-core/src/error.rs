/// Crate-wide error type. Variants map 1:1 onto the error kinds spec.md §7
/// names; the external CLI maps `OversizedInput` / `NotInitialized` /
/// `DbWriteFailed` to exit codes 2/3/4 (spec.md §6) — that mapping lives in
/// the `muninn` binary, not here.
#[derive(thiserror::Error, Debug)]
pub enum MuninnError {
    #[error("input exceeds 1 MiB limit ({size} bytes)")]
    OversizedInput { size: usize },

    #[error("muninn has not been initialized for this project")]
    NotInitialized,

    #[error("database write failed: {0}")]
    DbWriteFailed(String),

    #[error("database read failed: {0}")]
    DbReadFailed(String),

    #[error("no active session for this project")]
    NoActiveSession,

    #[error("pending approval '{0}' not found")]
    ApprovalNotFound(String),

    #[error("pending approval '{0}' has expired")]
    ApprovalExpired(String),

    #[error("restoring from archive is not permitted for table '{0}'")]
    RestoreNotPermitted(String),

    #[error("invalid regex pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_oversized_input() {
        let err = MuninnError::OversizedInput {
            size: 1_048_577,
        };
        assert_eq!(err.to_string(), "input exceeds 1 MiB limit (1048577 bytes)");
    }

    #[test]
    fn test_display_not_initialized() {
        assert_eq!(
            MuninnError::NotInitialized.to_string(),
            "muninn has not been initialized for this project"
        );
    }

    #[test]
    fn test_display_db_write_failed() {
        let err = MuninnError::DbWriteFailed("disk full".into());
        assert_eq!(err.to_string(), "database write failed: disk full");
    }

    #[test]
    fn test_display_no_active_session() {
        assert_eq!(
            MuninnError::NoActiveSession.to_string(),
            "no active session for this project"
        );
    }

    #[test]
    fn test_display_approval_not_found() {
        let err = MuninnError::ApprovalNotFound("op_123".into());
        assert_eq!(err.to_string(), "pending approval 'op_123' not found");
    }

    #[test]
    fn test_display_approval_expired() {
        let err = MuninnError::ApprovalExpired("op_123".into());
        assert_eq!(err.to_string(), "pending approval 'op_123' has expired");
    }

    #[test]
    fn test_display_restore_not_permitted() {
        let err = MuninnError::RestoreNotPermitted("files".into());
        assert_eq!(
            err.to_string(),
            "restoring from archive is not permitted for table 'files'"
        );
    }

    #[test]
    fn test_display_invalid_pattern() {
        let err = MuninnError::InvalidPattern {
            pattern: "(".into(),
            reason: "unclosed group".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid regex pattern '(': unclosed group"
        );
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MuninnError>();
    }
}
