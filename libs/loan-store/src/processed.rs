//! Processed-message ledger: the idempotency source of truth.
//!
//! A row here means "this consumer group has already observed this offset
//! on this partition for this aggregate". The check and the insert both run
//! inside the consumer's transaction, so "processed" is only ever true if
//! the side-effects committed with it.

use sqlx::{PgExecutor, Postgres, Transaction};
use tracing::debug;

use crate::model::NewProcessedMessage;
use crate::{StoreError, StoreResult};

/// Whether this fingerprint has already been processed.
pub async fn is_processed<'e, E>(executor: E, message_id: &str) -> StoreResult<bool>
where
    E: PgExecutor<'e>,
{
    let row: Option<(i32,)> =
        sqlx::query_as("SELECT 1 FROM processed_messages WHERE message_id = $1")
            .bind(message_id)
            .fetch_optional(executor)
            .await?;

    Ok(row.is_some())
}

/// Insert the ledger row within the consumer's transaction.
///
/// The unique index on `message_id` is the authoritative guard: a
/// concurrent consumer that lost the race gets
/// [`StoreError::DuplicateMessage`] and must roll back.
pub async fn record_processed(
    tx: &mut Transaction<'_, Postgres>,
    message: &NewProcessedMessage,
) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO processed_messages (
            message_id,
            topic_name,
            partition_num,
            offset_num,
            consumer_group,
            processed_at
        ) VALUES ($1, $2, $3, $4, $5, NOW())
        "#,
    )
    .bind(&message.message_id)
    .bind(&message.topic_name)
    .bind(message.partition_num)
    .bind(message.offset_num)
    .bind(&message.consumer_group)
    .execute(&mut **tx)
    .await
    .map_err(|e| {
        if StoreError::unique_violation(&e) {
            StoreError::DuplicateMessage {
                message_id: message.message_id.clone(),
            }
        } else {
            StoreError::Database(e)
        }
    })?;

    debug!(message_id = %message.message_id, "Message recorded as processed");
    Ok(())
}
