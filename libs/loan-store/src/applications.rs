//! Application rows: insert, select, and the optimistic-locking update
//! protocol used by the decision worker.

use sqlx::{PgExecutor, Postgres, Transaction};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::model::{ApplicationRecord, DecisionApplied, DecisionUpdate, NewApplication};
use crate::{StoreError, StoreResult};

const SELECT_COLUMNS: &str = r#"
    application_id,
    pan_number_encrypted,
    pan_number_hash,
    first_name,
    last_name,
    date_of_birth,
    email,
    phone_number,
    requested_amount,
    status,
    credit_score,
    annual_income,
    existing_loans_count,
    decision_reason,
    max_approved_amount,
    version,
    created_at,
    updated_at
"#;

/// Insert a new application in PENDING at version 1.
///
/// Must run inside the same transaction as the outbox row it produces.
/// A unique violation on the PAN hash maps to [`StoreError::DuplicatePan`].
pub async fn insert_application(
    tx: &mut Transaction<'_, Postgres>,
    app: &NewApplication,
) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO applications (
            application_id,
            pan_number_encrypted,
            pan_number_hash,
            first_name,
            last_name,
            date_of_birth,
            email,
            phone_number,
            requested_amount,
            annual_income,
            existing_loans_count,
            status,
            version,
            created_at,
            updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'PENDING', 1, NOW(), NOW())
        "#,
    )
    .bind(app.application_id)
    .bind(&app.pan_number_encrypted)
    .bind(&app.pan_number_hash)
    .bind(&app.first_name)
    .bind(&app.last_name)
    .bind(app.date_of_birth)
    .bind(&app.email)
    .bind(&app.phone_number)
    .bind(app.requested_amount)
    .bind(app.annual_income)
    .bind(app.existing_loans_count)
    .execute(&mut **tx)
    .await
    .map_err(|e| {
        if StoreError::unique_violation(&e) {
            StoreError::DuplicatePan {
                pan_hash: app.pan_number_hash.clone(),
            }
        } else {
            StoreError::Database(e)
        }
    })?;

    debug!(application_id = %app.application_id, "Application row inserted");
    Ok(())
}

/// Fetch an application by id.
pub async fn select_application<'e, E>(
    executor: E,
    application_id: Uuid,
) -> StoreResult<Option<ApplicationRecord>>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, ApplicationRecord>(&format!(
        "SELECT {SELECT_COLUMNS} FROM applications WHERE application_id = $1"
    ))
    .bind(application_id)
    .fetch_optional(executor)
    .await?;

    Ok(row)
}

/// Fetch an application by PAN fingerprint (duplicate detection).
pub async fn select_application_by_pan_hash<'e, E>(
    executor: E,
    pan_hash: &str,
) -> StoreResult<Option<ApplicationRecord>>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, ApplicationRecord>(&format!(
        "SELECT {SELECT_COLUMNS} FROM applications WHERE pan_number_hash = $1"
    ))
    .bind(pan_hash)
    .fetch_optional(executor)
    .await?;

    Ok(row)
}

/// One optimistic-locking attempt: `UPDATE ... WHERE id = $1 AND version = $n`.
///
/// Returns `true` when exactly one row was updated, `false` when a
/// concurrent writer advanced the version first.
pub async fn try_update_decision(
    tx: &mut Transaction<'_, Postgres>,
    application_id: Uuid,
    update: &DecisionUpdate,
    expected_version: i32,
) -> StoreResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE applications
        SET
            status = $2,
            credit_score = $3,
            decision_reason = $4,
            max_approved_amount = $5,
            version = version + 1,
            updated_at = NOW()
        WHERE
            application_id = $1
            AND version = $6
        "#,
    )
    .bind(application_id)
    .bind(update.status.as_str())
    .bind(update.credit_score)
    .bind(&update.decision_reason)
    .bind(update.max_approved_amount)
    .bind(expected_version)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Apply a decision with bounded optimistic-lock retries.
///
/// Each attempt re-reads the row and issues a versioned update. A row that
/// turns out to be terminal already is left untouched
/// ([`DecisionApplied::AlreadyDecided`]); a missing row is
/// [`StoreError::ApplicationNotFound`]; conflict on every attempt is
/// [`StoreError::RetryExhausted`], which consumers treat as transient so
/// the message is redelivered.
pub async fn update_decision_with_retry(
    tx: &mut Transaction<'_, Postgres>,
    application_id: Uuid,
    update: &DecisionUpdate,
    max_retries: u32,
) -> StoreResult<DecisionApplied> {
    for attempt in 1..=max_retries {
        let app = select_application(&mut **tx, application_id)
            .await?
            .ok_or(StoreError::ApplicationNotFound(application_id))?;

        if app.status.is_terminal() {
            debug!(
                application_id = %application_id,
                status = %app.status,
                "Application already decided, leaving row untouched"
            );
            return Ok(DecisionApplied::AlreadyDecided);
        }

        if try_update_decision(tx, application_id, update, app.version).await? {
            debug!(
                application_id = %application_id,
                status = %update.status,
                old_version = app.version,
                new_version = app.version + 1,
                "Application decision applied"
            );
            return Ok(DecisionApplied::Updated {
                new_version: app.version + 1,
            });
        }

        warn!(
            application_id = %application_id,
            expected_version = app.version,
            attempt,
            max_retries,
            "Optimistic lock conflict, retrying"
        );
    }

    Err(StoreError::RetryExhausted {
        application_id,
        attempts: max_retries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_schema::ApplicationStatus;

    #[test]
    fn test_select_columns_cover_record_fields() {
        // The column list must stay in sync with ApplicationRecord.
        for field in [
            "application_id",
            "pan_number_encrypted",
            "status",
            "version",
            "max_approved_amount",
            "updated_at",
        ] {
            assert!(SELECT_COLUMNS.contains(field), "missing column {field}");
        }
    }

    #[test]
    fn test_terminal_status_guard() {
        assert!(ApplicationStatus::PreApproved.is_terminal());
        assert!(ApplicationStatus::Rejected.is_terminal());
        assert!(ApplicationStatus::ManualReview.is_terminal());
        assert!(!ApplicationStatus::Pending.is_terminal());
    }
}
