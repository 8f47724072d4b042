//! Suspension surface: status with remaining cooldown, and the reactivation
//! request workflow.

use axum::{
    extract::{Extension, State},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppError,
    models::subject::{ReactivationRequestPayload, ReactivationStatus, Subject, SubjectStatus},
    repositories::subject as subject_repo,
    services::suspension,
    state::AppState,
    utils::password::verify_password,
    utils::time::format_remaining,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct AccountStatusResponse {
    pub status: SubjectStatus,
    pub is_suspended: bool,
    /// Remaining cooldown in milliseconds; absent unless suspended.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_remaining_ms: Option<i64>,
    /// Human-readable remaining cooldown ("23h 59m 1s").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_remaining: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reactivation_status: Option<ReactivationStatus>,
}

/// Current punitive state, computed at read time. The stored status is never
/// returned raw: a lapsed suspension reads as active here even before any
/// write-back happened.
pub async fn account_status(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
) -> Result<Json<AccountStatusResponse>, AppError> {
    let now = Utc::now();

    // Re-read rather than trusting the middleware's snapshot; admin actions
    // may have landed mid-session.
    let subject = subject_repo::find_by_id(&state.pool, subject.id)
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))?
        .ok_or_else(|| AppError::NotFound("Subject not found".to_string()))?;

    let view = suspension::evaluate(
        subject.status,
        subject.suspended_at,
        now,
        suspension::suspension_window(&state.config),
    );

    let effective_status = if view.is_suspended {
        SubjectStatus::Suspended
    } else if view.is_deactivated {
        SubjectStatus::Deactivated
    } else {
        SubjectStatus::Active
    };

    Ok(Json(AccountStatusResponse {
        status: effective_status,
        is_suspended: view.is_suspended,
        time_remaining_ms: view.time_remaining.map(|d| d.num_milliseconds()),
        time_remaining: view.time_remaining.map(format_remaining),
        reactivation_status: subject.reactivation_status,
    }))
}

#[derive(Debug, serde::Deserialize, Validate, ToSchema)]
/// Reactivation is submitted with credentials: a deactivated subject holds no
/// live session, so this route cannot sit behind the bearer-token middleware.
pub struct SubmitReactivationRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
    #[validate(nested)]
    #[serde(flatten)]
    pub request: ReactivationRequestPayload,
}

pub async fn submit_reactivation(
    State(state): State<AppState>,
    Json(payload): Json<SubmitReactivationRequest>,
) -> Result<Json<Value>, AppError> {
    payload.validate()?;

    let subject = subject_repo::find_by_email(&state.pool, &payload.email)
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))?
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;
    let matches = verify_password(&payload.password, &subject.password_hash)
        .map_err(AppError::InternalServerError)?;
    if !matches {
        return Err(AppError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    suspension::submit_reactivation_request(
        &state.pool,
        subject.id,
        &payload.request.reason,
        &payload.request.explanation,
        Utc::now(),
    )
    .await?;
    Ok(Json(json!({ "message": "Reactivation request submitted" })))
}
