//! Append-only audit trail for PAN access and permanent processing
//! failures. Lifecycle is decoupled from processing; rows are never
//! updated or deleted by the pipeline.

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::StoreResult;

/// Audited operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditOperation {
    Encrypt,
    Decrypt,
    Mask,
    /// A consumer advanced past a message that failed permanently.
    PermanentFailure,
}

impl AuditOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditOperation::Encrypt => "ENCRYPT",
            AuditOperation::Decrypt => "DECRYPT",
            AuditOperation::Mask => "MASK",
            AuditOperation::PermanentFailure => "PERMANENT_FAILURE",
        }
    }
}

/// Append an audit entry.
pub async fn append_audit<'e, E>(
    executor: E,
    application_id: Uuid,
    service_name: &str,
    operation: AuditOperation,
) -> StoreResult<()>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO audit_log (application_id, service_name, operation, accessed_at)
        VALUES ($1, $2, $3, NOW())
        "#,
    )
    .bind(application_id)
    .bind(service_name)
    .bind(operation.as_str())
    .execute(executor)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_names() {
        assert_eq!(AuditOperation::Encrypt.as_str(), "ENCRYPT");
        assert_eq!(AuditOperation::Decrypt.as_str(), "DECRYPT");
        assert_eq!(AuditOperation::Mask.as_str(), "MASK");
        assert_eq!(AuditOperation::PermanentFailure.as_str(), "PERMANENT_FAILURE");
    }
}
