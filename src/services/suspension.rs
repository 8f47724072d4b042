//! Suspension / reactivation state machine.
//!
//! `evaluate` is a pure function of `(status, suspended_at, now)`: a stored
//! `suspended` status reads as not-suspended the instant its window lapses,
//! with no write required. Mutating operations perform the write-back
//! opportunistically.

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use sqlx::PgPool;

use crate::config::Config;
use crate::error::AppError;
use crate::models::notification::NotificationKind;
use crate::models::subject::{ReactivationStatus, Subject, SubjectStatus};
use crate::repositories::{outbox, subject as subject_repo};
use crate::types::SubjectId;

/// Read-time view of a subject's punitive state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuspensionView {
    pub is_suspended: bool,
    pub is_deactivated: bool,
    /// Remaining cooldown; `None` unless currently suspended.
    pub time_remaining: Option<Duration>,
}

impl SuspensionView {
    pub fn clear() -> Self {
        Self {
            is_suspended: false,
            is_deactivated: false,
            time_remaining: None,
        }
    }

    pub fn blocks_access(&self) -> bool {
        self.is_suspended || self.is_deactivated
    }
}

/// Lazily evaluates suspension state. The stored status field is never
/// trusted on its own: once `now >= suspended_at + window` the subject reads
/// as active even before any write happens.
pub fn evaluate(
    status: SubjectStatus,
    suspended_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    window: Duration,
) -> SuspensionView {
    match status {
        SubjectStatus::Deactivated => SuspensionView {
            is_suspended: false,
            is_deactivated: true,
            time_remaining: None,
        },
        SubjectStatus::Suspended => {
            let Some(started) = suspended_at else {
                // Suspended without a start time is unreadable as a countdown;
                // treat the window as already lapsed.
                return SuspensionView::clear();
            };
            let elapsed = now - started;
            if elapsed < window {
                SuspensionView {
                    is_suspended: true,
                    is_deactivated: false,
                    time_remaining: Some(window - elapsed),
                }
            } else {
                SuspensionView::clear()
            }
        }
        SubjectStatus::Active => SuspensionView::clear(),
    }
}

pub fn suspension_window(config: &Config) -> Duration {
    Duration::hours(config.suspension_hours as i64)
}

/// Evaluates a subject and, when its suspension has lapsed, writes the stored
/// status back to `active`. The write-back is best-effort; the returned view
/// is correct either way.
pub async fn check_with_writeback(
    pool: &PgPool,
    config: &Config,
    subject: &Subject,
    now: DateTime<Utc>,
) -> SuspensionView {
    let view = evaluate(subject.status, subject.suspended_at, now, suspension_window(config));
    if subject.status == SubjectStatus::Suspended && !view.is_suspended {
        if let Err(err) = subject_repo::clear_lapsed_suspension(pool, subject.id, now).await {
            tracing::warn!(
                error = ?err,
                subject_id = %subject.id,
                "Failed to write back lapsed suspension"
            );
        }
    }
    view
}

/// Suspends a subject. Idempotent: re-suspending keeps the original start
/// time and returns the current view rather than an error.
pub async fn suspend(
    pool: &PgPool,
    config: &Config,
    subject_id: SubjectId,
    now: DateTime<Utc>,
) -> Result<SuspensionView, AppError> {
    let subject = require_subject(pool, subject_id).await?;

    let already = evaluate(
        subject.status,
        subject.suspended_at,
        now,
        suspension_window(config),
    );
    if already.is_suspended {
        return Ok(already);
    }

    subject_repo::mark_suspended(pool, subject_id, now)
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))?;

    enqueue_best_effort(
        pool,
        subject_id,
        NotificationKind::Suspended,
        json!({ "suspended_at": now, "duration_hours": config.suspension_hours }),
    )
    .await;

    Ok(SuspensionView {
        is_suspended: true,
        is_deactivated: false,
        time_remaining: Some(suspension_window(config)),
    })
}

/// Deactivation is indefinite; only an approved reactivation request ends it.
pub async fn deactivate(
    pool: &PgPool,
    subject_id: SubjectId,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let subject = require_subject(pool, subject_id).await?;
    if subject.status == SubjectStatus::Deactivated {
        return Ok(());
    }

    subject_repo::mark_deactivated(pool, subject_id, now)
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))?;

    enqueue_best_effort(
        pool,
        subject_id,
        NotificationKind::Deactivated,
        json!({ "deactivated_at": now }),
    )
    .await;

    Ok(())
}

/// Files a reactivation request for a deactivated subject. A pending request
/// is a conflict; a rejected or approved one is not.
pub async fn submit_reactivation_request(
    pool: &PgPool,
    subject_id: SubjectId,
    reason: &str,
    explanation: &str,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let subject = require_subject(pool, subject_id).await?;

    if subject.status != SubjectStatus::Deactivated {
        return Err(AppError::BadRequest(
            "Account is not deactivated".to_string(),
        ));
    }
    if subject.has_pending_reactivation() {
        return Err(AppError::Conflict(
            "A reactivation request is already pending".to_string(),
        ));
    }

    let stored =
        subject_repo::store_reactivation_request(pool, subject_id, reason, explanation, now)
            .await
            .map_err(|e| AppError::InternalServerError(e.into()))?;
    if !stored {
        // Status changed between the read and the write; surface as conflict.
        return Err(AppError::Conflict(
            "Account state changed; please retry".to_string(),
        ));
    }

    Ok(())
}

/// Administrator decision on a pending reactivation request.
pub async fn resolve_reactivation(
    pool: &PgPool,
    subject_id: SubjectId,
    decision: ReactivationStatus,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let subject = require_subject(pool, subject_id).await?;
    if !subject.has_pending_reactivation() {
        return Err(AppError::NotFound(
            "No pending reactivation request".to_string(),
        ));
    }

    match decision {
        ReactivationStatus::Approved => {
            subject_repo::apply_reactivation_approval(pool, subject_id, now)
                .await
                .map_err(|e| AppError::InternalServerError(e.into()))?;
            enqueue_best_effort(
                pool,
                subject_id,
                NotificationKind::ReactivationApproved,
                json!({ "resolved_at": now }),
            )
            .await;
        }
        ReactivationStatus::Rejected => {
            subject_repo::apply_reactivation_rejection(pool, subject_id, now)
                .await
                .map_err(|e| AppError::InternalServerError(e.into()))?;
            enqueue_best_effort(
                pool,
                subject_id,
                NotificationKind::ReactivationRejected,
                json!({ "resolved_at": now }),
            )
            .await;
        }
        ReactivationStatus::Pending => {
            return Err(AppError::BadRequest(
                "Decision must be approved or rejected".to_string(),
            ));
        }
    }

    Ok(())
}

async fn require_subject(pool: &PgPool, subject_id: SubjectId) -> Result<Subject, AppError> {
    subject_repo::find_by_id(pool, subject_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))?
        .ok_or_else(|| AppError::NotFound("Subject not found".to_string()))
}

/// Dispatcher-facing writes never fail the parent operation.
async fn enqueue_best_effort(
    pool: &PgPool,
    subject_id: SubjectId,
    kind: NotificationKind,
    payload: serde_json::Value,
) {
    if let Err(err) = outbox::enqueue(pool, subject_id, kind, payload).await {
        tracing::warn!(
            error = ?err,
            subject_id = %subject_id,
            kind = kind.as_str(),
            "Failed to enqueue notification"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: i64 = 24;

    fn window() -> Duration {
        Duration::hours(WINDOW)
    }

    #[test]
    fn active_subject_reads_clear() {
        let view = evaluate(SubjectStatus::Active, None, Utc::now(), window());
        assert!(!view.blocks_access());
        assert_eq!(view.time_remaining, None);
    }

    #[test]
    fn suspension_counts_down_within_window() {
        let start = Utc::now();
        let now = start + Duration::hours(23) + Duration::minutes(59);
        let view = evaluate(SubjectStatus::Suspended, Some(start), now, window());
        assert!(view.is_suspended);
        let remaining = view.time_remaining.expect("remaining");
        assert_eq!(remaining.num_milliseconds(), 60_000);
    }

    #[test]
    fn suspension_lapses_without_any_write() {
        let start = Utc::now();
        let now = start + Duration::hours(24) + Duration::minutes(1);
        let view = evaluate(SubjectStatus::Suspended, Some(start), now, window());
        assert!(!view.is_suspended);
        assert_eq!(view.time_remaining, None);
    }

    #[test]
    fn suspension_boundary_is_exclusive() {
        let start = Utc::now();
        let view = evaluate(
            SubjectStatus::Suspended,
            Some(start),
            start + window(),
            window(),
        );
        assert!(!view.is_suspended);
    }

    #[test]
    fn suspended_without_timestamp_reads_clear() {
        let view = evaluate(SubjectStatus::Suspended, None, Utc::now(), window());
        assert!(!view.is_suspended);
    }

    #[test]
    fn deactivation_has_no_countdown() {
        let view = evaluate(
            SubjectStatus::Deactivated,
            Some(Utc::now() - Duration::days(365)),
            Utc::now(),
            window(),
        );
        assert!(view.is_deactivated);
        assert!(!view.is_suspended);
        assert_eq!(view.time_remaining, None);
        assert!(view.blocks_access());
    }
}
