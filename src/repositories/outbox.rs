//! Durable notification outbox.
//!
//! Writes happen in the same request that triggers the alert; delivery is the
//! notification worker's job. Nothing here blocks or fails the triggering
//! operation beyond the single row insert.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::notification::{NotificationKind, OutboxNotification};
use crate::types::SubjectId;

pub async fn enqueue(
    pool: &PgPool,
    subject_id: SubjectId,
    kind: NotificationKind,
    payload: Value,
) -> Result<OutboxNotification, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    sqlx::query_as::<_, OutboxNotification>(
        r#"
        INSERT INTO notification_outbox (id, subject_id, kind, payload, created_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, subject_id, kind, payload, attempts, created_at, delivered_at
        "#,
    )
    .bind(&id)
    .bind(subject_id)
    .bind(kind)
    .bind(payload)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
}

/// Oldest undelivered rows first, bounded so a slow SMTP host cannot stall
/// the worker indefinitely.
pub async fn fetch_undelivered(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<OutboxNotification>, sqlx::Error> {
    sqlx::query_as::<_, OutboxNotification>(
        r#"
        SELECT id, subject_id, kind, payload, attempts, created_at, delivered_at
        FROM notification_outbox
        WHERE delivered_at IS NULL
        ORDER BY created_at ASC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn mark_delivered(
    pool: &PgPool,
    notification_id: &str,
    delivered_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE notification_outbox SET delivered_at = $1 WHERE id = $2 AND delivered_at IS NULL",
    )
    .bind(delivered_at)
    .bind(notification_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Failed delivery: bump the attempt counter and leave the row for the next
/// worker run.
pub async fn record_failure(pool: &PgPool, notification_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE notification_outbox SET attempts = attempts + 1 WHERE id = $1")
        .bind(notification_id)
        .execute(pool)
        .await
        .map(|_| ())
}

/// Removes delivered rows older than the cutoff; run by the periodic sweep.
pub async fn prune_delivered(
    pool: &PgPool,
    before: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM notification_outbox WHERE delivered_at IS NOT NULL AND delivered_at < $1",
    )
    .bind(before)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
