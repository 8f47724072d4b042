//! Identity-store access. The core owns the punitive-status and reactivation
//! fields; profile data belongs to the rest of the application.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::subject::Subject;
use crate::types::SubjectId;

const SUBJECT_COLUMNS: &str = "id, email, password_hash, display_name, role, plan, status, \
     suspended_at, reactivation_requested_at, reactivation_reason, \
     reactivation_explanation, reactivation_status, created_at, updated_at";

pub async fn find_by_id(
    pool: &PgPool,
    subject_id: SubjectId,
) -> Result<Option<Subject>, sqlx::Error> {
    let query = format!("SELECT {} FROM subjects WHERE id = $1", SUBJECT_COLUMNS);
    sqlx::query_as::<_, Subject>(&query)
        .bind(subject_id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Subject>, sqlx::Error> {
    let query = format!(
        "SELECT {} FROM subjects WHERE LOWER(email) = LOWER($1)",
        SUBJECT_COLUMNS
    );
    sqlx::query_as::<_, Subject>(&query)
        .bind(email)
        .fetch_optional(pool)
        .await
}

/// Writes `status = suspended` with the given start time. Re-suspending an
/// already-suspended subject keeps the original timestamp (idempotent).
pub async fn mark_suspended(
    pool: &PgPool,
    subject_id: SubjectId,
    suspended_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE subjects
        SET status = 'suspended',
            suspended_at = COALESCE(suspended_at, $1),
            updated_at = $1
        WHERE id = $2
        "#,
    )
    .bind(suspended_at)
    .bind(subject_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn mark_deactivated(
    pool: &PgPool,
    subject_id: SubjectId,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE subjects
        SET status = 'deactivated', suspended_at = NULL, updated_at = $1
        WHERE id = $2
        "#,
    )
    .bind(now)
    .bind(subject_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Opportunistic write-back once a suspension window has lapsed. Guarded so
/// it only rewrites rows still marked suspended.
pub async fn clear_lapsed_suspension(
    pool: &PgPool,
    subject_id: SubjectId,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE subjects
        SET status = 'active', suspended_at = NULL, updated_at = $1
        WHERE id = $2 AND status = 'suspended'
        "#,
    )
    .bind(now)
    .bind(subject_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Stores a pending reactivation request. The uniqueness rule (one pending
/// request at a time) is enforced by the service layer before this write.
pub async fn store_reactivation_request(
    pool: &PgPool,
    subject_id: SubjectId,
    reason: &str,
    explanation: &str,
    requested_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE subjects
        SET reactivation_requested_at = $1,
            reactivation_reason = $2,
            reactivation_explanation = $3,
            reactivation_status = 'pending',
            updated_at = $1
        WHERE id = $4 AND status = 'deactivated'
        "#,
    )
    .bind(requested_at)
    .bind(reason)
    .bind(explanation)
    .bind(subject_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Approval clears all punitive state; the subject is active again.
pub async fn apply_reactivation_approval(
    pool: &PgPool,
    subject_id: SubjectId,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE subjects
        SET status = 'active',
            suspended_at = NULL,
            reactivation_requested_at = NULL,
            reactivation_reason = NULL,
            reactivation_explanation = NULL,
            reactivation_status = 'approved',
            updated_at = $1
        WHERE id = $2 AND reactivation_status = 'pending'
        "#,
    )
    .bind(now)
    .bind(subject_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Rejection keeps the subject deactivated but resolves the request, so a
/// fresh one may be submitted.
pub async fn apply_reactivation_rejection(
    pool: &PgPool,
    subject_id: SubjectId,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE subjects
        SET reactivation_status = 'rejected', updated_at = $1
        WHERE id = $2 AND reactivation_status = 'pending'
        "#,
    )
    .bind(now)
    .bind(subject_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
