use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use crate::{
    error::AppError,
    models::subject::{Subject, SubjectStatus},
    repositories::{session as session_repo, subject as subject_repo},
    services::{suspension, token},
    state::AppState,
};

/// Authenticates a protected request: verifies the bearer token, confirms the
/// referenced session is still live in the registry (a valid-but-revoked
/// token is rejected with a distinct forced-logout code), loads the subject,
/// and applies the suspension gate.
pub async fn auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (claims, subject) = authenticate_request(&state, request.headers()).await?;
    request.extensions_mut().insert(claims);
    request.extensions_mut().insert(subject);
    Ok(next.run(request).await)
}

/// Token + live-session check without the suspension veto. Used by the
/// suspension surface itself, so a suspended subject can still read their
/// remaining cooldown.
pub async fn auth_ungated(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (claims, subject) = authenticate_token_and_session(&state, request.headers()).await?;
    request.extensions_mut().insert(claims);
    request.extensions_mut().insert(subject);
    Ok(next.run(request).await)
}

// Auth + require admin role for admin-only routes
pub async fn auth_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (claims, subject) = authenticate_request(&state, request.headers()).await?;
    if !subject.is_admin() {
        return Err(AppError::Forbidden("Forbidden".to_string()));
    }
    request.extensions_mut().insert(claims);
    request.extensions_mut().insert(subject);
    Ok(next.run(request).await)
}

async fn authenticate_request(
    state: &AppState,
    headers: &axum::http::HeaderMap,
) -> Result<(token::Claims, Subject), AppError> {
    let (claims, subject) = authenticate_token_and_session(state, headers).await?;

    let now = Utc::now();
    let view = suspension::check_with_writeback(&state.pool, &state.config, &subject, now).await;
    if view.is_deactivated {
        return Err(AppError::Forbidden("Account is deactivated".to_string()));
    }
    if view.is_suspended {
        return Err(AppError::Forbidden("Account is suspended".to_string()));
    }

    Ok((claims, subject))
}

async fn authenticate_token_and_session(
    state: &AppState,
    headers: &axum::http::HeaderMap,
) -> Result<(token::Claims, Subject), AppError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let raw_token = auth_header
        .and_then(parse_bearer_token)
        .ok_or(AppError::InvalidToken)?;

    let claims = token::verify(raw_token, &state.config.token_secret)?;
    let now = Utc::now();

    // Token validity alone never authorizes: the backing session must still
    // exist, be active, and be unexpired.
    let session = session_repo::find_live_by_id(&state.pool, &claims.sid, now)
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))?
        .ok_or(AppError::SessionRevoked)?;
    if session.subject_id != claims.sub {
        return Err(AppError::SessionRevoked);
    }

    // Suspension-check read failures fail open: the verified token is
    // preferred over locking the subject out on a transient database error.
    let subject = match subject_repo::find_by_id(&state.pool, claims.sub).await {
        Ok(Some(subject)) => subject,
        Ok(None) => return Err(AppError::Unauthorized("Account not found".to_string())),
        Err(err) => {
            tracing::warn!(
                error = ?err,
                subject_id = %claims.sub,
                "Subject lookup failed; proceeding on token claims without suspension gate"
            );
            subject_from_claims(&claims, now)
        }
    };

    Ok((claims, subject))
}

/// Minimal subject reconstructed from verified token claims, used only on the
/// fail-open path. Carries no credential material.
fn subject_from_claims(claims: &token::Claims, now: chrono::DateTime<chrono::Utc>) -> Subject {
    Subject {
        id: claims.sub,
        email: claims.email.clone(),
        password_hash: String::new(),
        display_name: String::new(),
        role: claims.role,
        plan: claims.plan,
        status: SubjectStatus::Active,
        suspended_at: None,
        reactivation_requested_at: None,
        reactivation_reason: None,
        reactivation_explanation: None,
        reactivation_status: None,
        created_at: now,
        updated_at: now,
    }
}

fn parse_bearer_token(header: &str) -> Option<&str> {
    if let Some(rest) = header.strip_prefix("Bearer ") {
        return Some(rest);
    }
    if let Some(rest) = header.strip_prefix("bearer ") {
        return Some(rest);
    }
    if let Some(space_idx) = header.find(' ') {
        let (scheme, rest) = header.split_at(space_idx);
        if scheme.eq_ignore_ascii_case("bearer") {
            return Some(rest.trim_start());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bearer_token_accepts_case_variants() {
        assert_eq!(parse_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(parse_bearer_token("bearer abc"), Some("abc"));
        assert_eq!(parse_bearer_token("BEARER abc"), Some("abc"));
    }

    #[test]
    fn parse_bearer_token_rejects_other_schemes() {
        assert_eq!(parse_bearer_token("Basic abc"), None);
        assert_eq!(parse_bearer_token("abc"), None);
    }
}
