//! Login and logout: the entry point where the token codec, session
//! registry, trust engine, and suspension gate meet.

use axum::{
    extract::{Extension, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        session::{DeviceMetadata, SessionResponse},
        subject::SubjectResponse,
    },
    repositories::{session as session_repo, subject as subject_repo},
    services::{
        suspension,
        token::{self, Claims},
        trust::{self, DeviceClass},
    },
    state::AppState,
    utils::password::verify_password,
    utils::time::format_remaining,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
    #[validate(nested)]
    pub device: DeviceMetadata,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub subject: SubjectResponse,
    pub session: SessionResponse,
    /// Classification of the connecting device.
    pub device_class: DeviceClass,
    /// True when a new-device alert was raised for this login.
    pub new_device: bool,
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    payload.validate()?;
    let now = Utc::now();

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

    // The punitive gate runs before any session is created or refreshed.
    let view = suspension::check_with_writeback(&state.pool, &state.config, &subject, now).await;
    if view.is_deactivated {
        return Err(AppError::Forbidden("Account is deactivated".to_string()));
    }
    if view.is_suspended {
        let remaining = view.time_remaining.unwrap_or_else(chrono::Duration::zero);
        return Err(AppError::Forbidden(format!(
            "Account is suspended; try again in {}",
            format_remaining(remaining)
        )));
    }

    let ip_address = extract_ip(&headers);
    let location = extract_location(&headers);
    let registration = trust::register_login(
        &state.pool,
        &state.config,
        subject.id,
        &payload.device,
        ip_address.as_deref(),
        location.as_deref(),
        now,
    )
    .await?;

    if let Err(err) =
        session_repo::mark_current(&state.pool, subject.id, &registration.session.id).await
    {
        // Advisory flag only; a failed write here must not fail the login.
        tracing::warn!(error = ?err, "Failed to mark session current");
    }

    let claims = Claims::new(
        &subject,
        registration.session.id.clone(),
        state.config.token_expiration_hours,
    );
    let token = token::issue(&claims, &state.config.token_secret)
        .map_err(AppError::InternalServerError)?;

    let session_id = registration.session.id.clone();
    Ok(Json(LoginResponse {
        token,
        subject: SubjectResponse::from(subject),
        session: SessionResponse::from_session(registration.session, &session_id),
        device_class: registration.class,
        new_device: registration.new_device,
    }))
}

/// Revokes the caller's own session. Idempotent; logging out twice is fine.
pub async fn logout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Value>, AppError> {
    session_repo::revoke(&state.pool, &claims.sid, Utc::now())
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))?;
    Ok(Json(json!({ "message": "Logged out" })))
}

pub fn extract_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        return value
            .split(',')
            .next()
            .map(|ip| ip.trim().to_string())
            .filter(|ip| !ip.is_empty());
    }
    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
}

/// Best-effort geo hint from edge headers (a CDN country code, or a full
/// city string when a geo proxy supplies one). Advisory only; absent when
/// no proxy fills it in.
pub fn extract_location(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-geo-location")
        .or_else(|| headers.get("cf-ipcountry"))
        .and_then(|v| v.to_str().ok())
        .map(|loc| loc.trim().to_string())
        .filter(|loc| !loc.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extract_ip_prefers_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        assert_eq!(extract_ip(&headers).as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn extract_ip_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.4"));
        assert_eq!(extract_ip(&headers).as_deref(), Some("198.51.100.4"));
    }

    #[test]
    fn extract_ip_handles_missing_headers() {
        let headers = HeaderMap::new();
        assert_eq!(extract_ip(&headers), None);
    }

    #[test]
    fn extract_location_prefers_geo_header_over_country_code() {
        let mut headers = HeaderMap::new();
        headers.insert("cf-ipcountry", HeaderValue::from_static("DE"));
        assert_eq!(extract_location(&headers).as_deref(), Some("DE"));

        headers.insert("x-geo-location", HeaderValue::from_static("Berlin, DE"));
        assert_eq!(extract_location(&headers).as_deref(), Some("Berlin, DE"));
    }

    #[test]
    fn extract_location_ignores_blank_values() {
        let mut headers = HeaderMap::new();
        headers.insert("x-geo-location", HeaderValue::from_static("  "));
        assert_eq!(extract_location(&headers), None);
    }
}
