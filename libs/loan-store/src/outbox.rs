//! Outbox rows: co-committed event intents and the publisher's drain
//! operations.
//!
//! All mutations run inside the caller's transaction so a batch cycle
//! commits its updates atomically. `fetch_unpublished_batch` locks the
//! selected rows (`FOR UPDATE SKIP LOCKED`) so a redundant publisher
//! instance skips rows another instance is draining instead of blocking.

use sqlx::{Postgres, Transaction};
use tracing::debug;

use crate::model::{NewOutboxEvent, OutboxEventRow};
use crate::StoreResult;

/// Error text stored on a failed row is capped at 500 characters.
const MAX_ERROR_LEN: usize = 500;

/// Insert an event intent in the same transaction as the domain write
/// that produced it.
pub async fn insert_outbox_event(
    tx: &mut Transaction<'_, Postgres>,
    event: &NewOutboxEvent,
) -> StoreResult<i64> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO outbox_events (
            aggregate_id,
            event_type,
            payload,
            topic_name,
            partition_key,
            published,
            retry_count,
            created_at
        ) VALUES ($1, $2, $3, $4, $5, FALSE, 0, NOW())
        RETURNING id
        "#,
    )
    .bind(event.aggregate_id)
    .bind(&event.event_type)
    .bind(&event.payload)
    .bind(&event.topic_name)
    .bind(&event.partition_key)
    .fetch_one(&mut **tx)
    .await?;

    debug!(
        outbox_id = id,
        aggregate_id = %event.aggregate_id,
        event_type = %event.event_type,
        topic = %event.topic_name,
        "Event inserted into outbox"
    );

    Ok(id)
}

/// Select the oldest unpublished rows still under the retry ceiling.
///
/// Rows at `retry_count >= max_retries` are parked in place and never
/// re-selected; resetting them is an operator workflow.
pub async fn fetch_unpublished_batch(
    tx: &mut Transaction<'_, Postgres>,
    batch_size: i64,
    max_retries: i32,
) -> StoreResult<Vec<OutboxEventRow>> {
    let rows = sqlx::query_as::<_, OutboxEventRow>(
        r#"
        SELECT
            id,
            aggregate_id,
            event_type,
            payload,
            topic_name,
            partition_key,
            published,
            published_at,
            error_message,
            retry_count,
            created_at
        FROM outbox_events
        WHERE published = FALSE
          AND retry_count < $2
        ORDER BY created_at ASC, id ASC
        LIMIT $1
        FOR UPDATE SKIP LOCKED
        "#,
    )
    .bind(batch_size)
    .bind(max_retries)
    .fetch_all(&mut **tx)
    .await?;

    Ok(rows)
}

/// Mark a row delivered. Once published a row is never rewritten.
pub async fn mark_published(tx: &mut Transaction<'_, Postgres>, id: i64) -> StoreResult<()> {
    sqlx::query(
        r#"
        UPDATE outbox_events
        SET published = TRUE,
            published_at = NOW(),
            error_message = NULL
        WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Record a failed publish attempt: bump the retry count and keep the
/// (truncated) error text for operators.
pub async fn mark_failed(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
    error: &str,
) -> StoreResult<()> {
    sqlx::query(
        r#"
        UPDATE outbox_events
        SET retry_count = retry_count + 1,
            error_message = $2
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(truncate_error(error))
    .execute(&mut **tx)
    .await?;

    Ok(())
}

fn truncate_error(error: &str) -> String {
    error.chars().take(MAX_ERROR_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_error_caps_at_500_chars() {
        let long = "x".repeat(1200);
        assert_eq!(truncate_error(&long).chars().count(), 500);

        let short = "broker unreachable";
        assert_eq!(truncate_error(short), short);

        // Multi-byte characters count as characters, not bytes
        let wide = "β".repeat(600);
        assert_eq!(truncate_error(&wide).chars().count(), 500);
    }
}
