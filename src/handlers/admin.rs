//! Admin moderation surface: suspend, deactivate, resolve reactivation
//! requests, inspect sessions, and force remote logout.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use utoipa::ToSchema;

use crate::{
    error::AppError,
    models::{session::SessionResponse, subject::ReactivationStatus},
    repositories::session as session_repo,
    services::suspension,
    state::AppState,
    types::SubjectId,
};

/// Suspending an already-suspended subject is a no-op returning the current
/// view, not an error.
pub async fn suspend_subject(
    State(state): State<AppState>,
    Path(subject_id): Path<SubjectId>,
) -> Result<Json<Value>, AppError> {
    let view = suspension::suspend(&state.pool, &state.config, subject_id, Utc::now()).await?;
    Ok(Json(json!({
        "message": "Subject suspended",
        "subject_id": subject_id,
        "time_remaining_ms": view.time_remaining.map(|d| d.num_milliseconds()),
    })))
}

pub async fn deactivate_subject(
    State(state): State<AppState>,
    Path(subject_id): Path<SubjectId>,
) -> Result<Json<Value>, AppError> {
    let now = Utc::now();
    suspension::deactivate(&state.pool, subject_id, now).await?;

    // A deactivated account keeps no live sessions.
    let revoked = session_repo::revoke_all(&state.pool, subject_id, now)
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))?;

    Ok(Json(json!({
        "message": "Subject deactivated",
        "subject_id": subject_id,
        "sessions_revoked": revoked,
    })))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResolveReactivationPayload {
    pub decision: ReactivationDecision,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReactivationDecision {
    Approved,
    Rejected,
}

pub async fn resolve_reactivation(
    State(state): State<AppState>,
    Path(subject_id): Path<SubjectId>,
    Json(payload): Json<ResolveReactivationPayload>,
) -> Result<Json<Value>, AppError> {
    let decision = match payload.decision {
        ReactivationDecision::Approved => ReactivationStatus::Approved,
        ReactivationDecision::Rejected => ReactivationStatus::Rejected,
    };
    suspension::resolve_reactivation(&state.pool, subject_id, decision, Utc::now()).await?;
    Ok(Json(json!({
        "message": "Reactivation request resolved",
        "subject_id": subject_id,
        "decision": match payload.decision {
            ReactivationDecision::Approved => "approved",
            ReactivationDecision::Rejected => "rejected",
        },
    })))
}

pub async fn list_subject_sessions(
    State(state): State<AppState>,
    Path(subject_id): Path<SubjectId>,
) -> Result<Json<Vec<SessionResponse>>, AppError> {
    let sessions = session_repo::list_active(&state.pool, subject_id, Utc::now())
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))?;
    // No admin token maps to one of these sessions; none reads as current.
    let responses = sessions
        .into_iter()
        .map(|session| SessionResponse::from_session(session, ""))
        .collect();
    Ok(Json(responses))
}

/// Forced remote logout: every device the subject is signed in on loses its
/// session; their tokens keep verifying but fail the registry check.
pub async fn force_logout_subject(
    State(state): State<AppState>,
    Path(subject_id): Path<SubjectId>,
) -> Result<Json<Value>, AppError> {
    let revoked = session_repo::revoke_all(&state.pool, subject_id, Utc::now())
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))?;
    Ok(Json(json!({
        "message": "All sessions revoked",
        "subject_id": subject_id,
        "revoked": revoked,
    })))
}
