//! Session registry: one row per (subject, device fingerprint).
//!
//! All operations are single-row read-modify-writes; nothing here requires a
//! multi-statement transaction. Revocation marks rows inactive and leaves
//! physical deletion to the periodic sweep.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::session::Session;
use crate::types::SubjectId;

/// Fields written when creating or refreshing a session row.
#[derive(Debug, Clone)]
pub struct NewSession<'a> {
    pub subject_id: SubjectId,
    pub fingerprint: &'a str,
    pub device_label: Option<&'a str>,
    pub browser: &'a str,
    pub os: &'a str,
    pub ip_address: Option<&'a str>,
    pub location: Option<&'a str>,
    /// False when the trust engine classified the device as new.
    pub is_confirmed: bool,
    pub expires_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct UpsertedSession {
    #[sqlx(flatten)]
    session: Session,
    inserted: bool,
    was_live: bool,
}

/// Idempotent upsert keyed on `(subject_id, fingerprint)`. A second login
/// from the same device extends `expires_at` and refreshes metadata instead
/// of duplicating the row. Returns the session and whether the device
/// arrived without a live row: a genuine insert, or the revival of a
/// revoked/expired one. Only such arrivals may trigger a new-device
/// notification; a refresh of a live session never does. Reviving a dead
/// row also re-applies the caller's confirmation verdict, while a live
/// refresh keeps the confirmation recorded at first sight.
pub async fn create_or_refresh(
    pool: &PgPool,
    new: NewSession<'_>,
) -> Result<(Session, bool), sqlx::Error> {
    let session_id = Uuid::new_v4().to_string();
    let now = Utc::now();

    // The CTE reads the pre-statement snapshot, so it sees the prior row's
    // liveness even though the upsert rewrites it.
    let row = sqlx::query_as::<_, UpsertedSession>(
        r#"
        WITH prior AS (
            SELECT (is_active AND expires_at > $10) AS live
            FROM sessions
            WHERE subject_id = $2 AND fingerprint = $3
        )
        INSERT INTO sessions
            (id, subject_id, fingerprint, device_label, browser, os, ip_address,
             location, is_confirmed, is_active, created_at, last_active, expires_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, TRUE, $10, $10, $11)
        ON CONFLICT (subject_id, fingerprint) DO UPDATE SET
            device_label = COALESCE(EXCLUDED.device_label, sessions.device_label),
            browser = EXCLUDED.browser,
            os = EXCLUDED.os,
            ip_address = EXCLUDED.ip_address,
            location = COALESCE(EXCLUDED.location, sessions.location),
            is_confirmed = CASE WHEN sessions.is_active AND sessions.expires_at > $10
                                THEN sessions.is_confirmed
                                ELSE EXCLUDED.is_confirmed END,
            is_active = TRUE,
            logged_out_at = NULL,
            last_active = EXCLUDED.last_active,
            expires_at = EXCLUDED.expires_at
        RETURNING id, subject_id, fingerprint, device_label, browser, os, ip_address,
                  location, is_current, is_confirmed, is_active, logged_out_at,
                  created_at, last_active, expires_at,
                  (xmax = 0) AS inserted,
                  COALESCE((SELECT prior.live FROM prior), FALSE) AS was_live
        "#,
    )
    .bind(&session_id)
    .bind(new.subject_id)
    .bind(new.fingerprint)
    .bind(new.device_label)
    .bind(new.browser)
    .bind(new.os)
    .bind(new.ip_address)
    .bind(new.location)
    .bind(new.is_confirmed)
    .bind(now)
    .bind(new.expires_at)
    .fetch_one(pool)
    .await?;

    let registered = row.inserted || !row.was_live;
    Ok((row.session, registered))
}

/// Updates `last_active` only; `created_at` is never touched. Returns false
/// when the session no longer exists.
pub async fn heartbeat(
    pool: &PgPool,
    session_id: &str,
    last_active: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE sessions
        SET last_active = $1
        WHERE id = $2 AND is_active
        "#,
    )
    .bind(last_active)
    .bind(session_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Clears `is_current` on the subject's other sessions and sets it on the
/// given one. Two statements without a transaction: the flag is advisory UI
/// state, and the race window between simultaneous logins is accepted.
pub async fn mark_current(
    pool: &PgPool,
    subject_id: SubjectId,
    session_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE sessions SET is_current = FALSE WHERE subject_id = $1 AND id <> $2")
        .bind(subject_id)
        .bind(session_id)
        .execute(pool)
        .await?;
    sqlx::query("UPDATE sessions SET is_current = TRUE WHERE id = $1 AND subject_id = $2")
        .bind(session_id)
        .bind(subject_id)
        .execute(pool)
        .await
        .map(|_| ())
}

pub async fn find_by_id(
    pool: &PgPool,
    session_id: &str,
) -> Result<Option<Session>, sqlx::Error> {
    sqlx::query_as::<_, Session>(
        r#"
        SELECT id, subject_id, fingerprint, device_label, browser, os, ip_address,
               location, is_current, is_confirmed, is_active, logged_out_at,
               created_at, last_active, expires_at
        FROM sessions
        WHERE id = $1
        "#,
    )
    .bind(session_id)
    .fetch_optional(pool)
    .await
}

/// Looks up a session that is still usable for authorization: active and not
/// past its expiry. A valid token whose session misses this check must be
/// rejected by the caller.
pub async fn find_live_by_id(
    pool: &PgPool,
    session_id: &str,
    now: DateTime<Utc>,
) -> Result<Option<Session>, sqlx::Error> {
    sqlx::query_as::<_, Session>(
        r#"
        SELECT id, subject_id, fingerprint, device_label, browser, os, ip_address,
               location, is_current, is_confirmed, is_active, logged_out_at,
               created_at, last_active, expires_at
        FROM sessions
        WHERE id = $1 AND is_active AND expires_at > $2
        "#,
    )
    .bind(session_id)
    .bind(now)
    .fetch_optional(pool)
    .await
}

/// Active, unexpired sessions for a subject, most recently used first.
pub async fn list_active(
    pool: &PgPool,
    subject_id: SubjectId,
    now: DateTime<Utc>,
) -> Result<Vec<Session>, sqlx::Error> {
    sqlx::query_as::<_, Session>(
        r#"
        SELECT id, subject_id, fingerprint, device_label, browser, os, ip_address,
               location, is_current, is_confirmed, is_active, logged_out_at,
               created_at, last_active, expires_at
        FROM sessions
        WHERE subject_id = $1 AND is_active AND expires_at > $2
        ORDER BY last_active DESC, created_at DESC, id DESC
        "#,
    )
    .bind(subject_id)
    .bind(now)
    .fetch_all(pool)
    .await
}

/// Active sessions seen within the trust engine's rolling window; input to
/// device classification.
pub async fn list_active_since(
    pool: &PgPool,
    subject_id: SubjectId,
    since: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<Vec<Session>, sqlx::Error> {
    sqlx::query_as::<_, Session>(
        r#"
        SELECT id, subject_id, fingerprint, device_label, browser, os, ip_address,
               location, is_current, is_confirmed, is_active, logged_out_at,
               created_at, last_active, expires_at
        FROM sessions
        WHERE subject_id = $1 AND is_active AND expires_at > $2 AND last_active >= $3
        "#,
    )
    .bind(subject_id)
    .bind(now)
    .bind(since)
    .fetch_all(pool)
    .await
}

/// Marks a session inactive. A missing or already-revoked session is treated
/// as success, not an error.
pub async fn revoke(
    pool: &PgPool,
    session_id: &str,
    logged_out_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE sessions
        SET is_active = FALSE, is_current = FALSE, logged_out_at = $1
        WHERE id = $2 AND is_active
        "#,
    )
    .bind(logged_out_at)
    .bind(session_id)
    .execute(pool)
    .await
    .map(|_| ())
}

/// Revokes every active session for a subject (admin-forced logout).
pub async fn revoke_all(
    pool: &PgPool,
    subject_id: SubjectId,
    logged_out_at: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE sessions
        SET is_active = FALSE, is_current = FALSE, logged_out_at = $1
        WHERE subject_id = $2 AND is_active
        "#,
    )
    .bind(logged_out_at)
    .bind(subject_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Revokes the subject's other sessions, keeping the caller's own alive.
pub async fn revoke_all_except(
    pool: &PgPool,
    subject_id: SubjectId,
    keep_session_id: &str,
    logged_out_at: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE sessions
        SET is_active = FALSE, is_current = FALSE, logged_out_at = $1
        WHERE subject_id = $2 AND id <> $3 AND is_active
        "#,
    )
    .bind(logged_out_at)
    .bind(subject_id)
    .bind(keep_session_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Records the subject's "this was me" acknowledgement for a pending device.
pub async fn confirm(
    pool: &PgPool,
    session_id: &str,
    subject_id: SubjectId,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE sessions SET is_confirmed = TRUE WHERE id = $1 AND subject_id = $2",
    )
    .bind(session_id)
    .bind(subject_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Deletes sessions past their expiry. Idempotent and safe to run
/// concurrently; a second run with no new expirations deletes nothing.
pub async fn sweep_expired(pool: &PgPool, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
        .bind(now)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
