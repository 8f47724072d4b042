//! Session query surface consumed by the account-settings UI: list active
//! sessions, heartbeat, confirm a new device, revoke one or all others.

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use crate::{
    error::AppError,
    models::{session::SessionResponse, subject::Subject},
    repositories::session as session_repo,
    services::token::Claims,
    state::AppState,
};

pub async fn list_sessions(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<SessionResponse>>, AppError> {
    let sessions = session_repo::list_active(&state.pool, subject.id, Utc::now())
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))?;
    let responses = sessions
        .into_iter()
        .map(|session| SessionResponse::from_session(session, &claims.sid))
        .collect();
    Ok(Json(responses))
}

/// Bumps `last_active` on the caller's session. Clients are expected to
/// throttle; the server happily accepts whatever cadence arrives.
pub async fn heartbeat(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Value>, AppError> {
    let touched = session_repo::heartbeat(&state.pool, &claims.sid, Utc::now())
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))?;
    if !touched {
        return Err(AppError::SessionRevoked);
    }
    Ok(Json(json!({ "message": "ok" })))
}

/// "This was me": acknowledges a new-device alert. Confirming an already
/// confirmed session is a no-op success.
pub async fn confirm_session(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    if session_id.trim().is_empty() {
        return Err(AppError::BadRequest("Session ID is required".into()));
    }

    let found = session_repo::confirm(&state.pool, &session_id, subject.id)
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))?;
    if !found {
        return Err(AppError::NotFound("Session not found".into()));
    }
    Ok(Json(json!({ "message": "Device confirmed", "session_id": session_id })))
}

pub async fn revoke_session(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    if session_id.trim().is_empty() {
        return Err(AppError::BadRequest("Session ID is required".into()));
    }
    if session_id == claims.sid {
        return Err(AppError::BadRequest(
            "Cannot revoke current session; use logout instead".into(),
        ));
    }

    let session = session_repo::find_by_id(&state.pool, &session_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))?;

    match session {
        Some(session) if session.subject_id != subject.id => {
            Err(AppError::Forbidden("Forbidden".into()))
        }
        Some(_) => {
            session_repo::revoke(&state.pool, &session_id, Utc::now())
                .await
                .map_err(|e| AppError::InternalServerError(e.into()))?;
            Ok(Json(json!({
                "message": "Session revoked",
                "session_id": session_id
            })))
        }
        // Already gone: revoking is idempotent success, not an error.
        None => Ok(Json(json!({
            "message": "Session already revoked",
            "session_id": session_id
        }))),
    }
}

/// Revokes every session except the caller's own.
pub async fn revoke_other_sessions(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Value>, AppError> {
    let revoked =
        session_repo::revoke_all_except(&state.pool, subject.id, &claims.sid, Utc::now())
            .await
            .map_err(|e| AppError::InternalServerError(e.into()))?;
    Ok(Json(json!({
        "message": "Other sessions revoked",
        "revoked": revoked
    })))
}
