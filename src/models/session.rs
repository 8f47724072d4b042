//! Models for tracking device sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::types::SubjectId;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
/// Database representation of one logged-in device/browser instance.
pub struct Session {
    /// Opaque unique identifier, independent of the signed token.
    pub id: String,
    /// Subject owning the session; many sessions per subject.
    pub subject_id: SubjectId,
    /// Derived stable device identity (never the raw IP).
    pub fingerprint: String,
    /// Optional label identifying the client/device.
    pub device_label: Option<String>,
    /// Browser family reported at login.
    pub browser: String,
    /// Operating system reported at login.
    pub os: String,
    /// Best-effort source address, advisory only.
    pub ip_address: Option<String>,
    /// Best-effort geo hint, advisory only.
    pub location: Option<String>,
    /// Advisory "latest login wins" marker; never used for authorization.
    pub is_current: bool,
    /// False until the subject acknowledges a new-device alert.
    pub is_confirmed: bool,
    /// Cleared on explicit logout.
    pub is_active: bool,
    /// When the session was explicitly logged out, if ever.
    pub logged_out_at: Option<DateTime<Utc>>,
    /// Timestamp when the session was created.
    pub created_at: DateTime<Utc>,
    /// Timestamp when the session last saw a heartbeat.
    pub last_active: DateTime<Utc>,
    /// Timestamp when the session expires.
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
/// Device metadata carried in the login request body.
pub struct DeviceMetadata {
    #[validate(length(min = 1, max = 100))]
    pub browser: String,
    #[validate(length(min = 1, max = 100))]
    pub os: String,
    #[validate(length(max = 200))]
    pub device_label: Option<String>,
    /// Optional client-generated identifier folded into the fingerprint.
    #[validate(length(max = 200))]
    pub device_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Public view of a session as returned by the session query surface.
pub struct SessionResponse {
    pub id: String,
    pub device_label: Option<String>,
    pub browser: String,
    pub os: String,
    pub location: Option<String>,
    pub is_confirmed: bool,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_current: bool,
}

impl SessionResponse {
    /// Builds the response, deriving `is_current` from the caller's token
    /// rather than the stored advisory flag.
    pub fn from_session(session: Session, current_session_id: &str) -> Self {
        let is_current = session.id == current_session_id;
        Self {
            id: session.id,
            device_label: session.device_label,
            browser: session.browser,
            os: session.os,
            location: session.location,
            is_confirmed: session.is_confirmed,
            created_at: session.created_at,
            last_active: session.last_active,
            expires_at: session.expires_at,
            is_current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_session(id: &str) -> Session {
        Session {
            id: id.to_string(),
            subject_id: SubjectId::new(),
            fingerprint: "fp".into(),
            device_label: Some("macbook-pro".into()),
            browser: "Chrome".into(),
            os: "macOS".into(),
            ip_address: Some("203.0.113.9".into()),
            location: None,
            is_current: false,
            is_confirmed: true,
            is_active: true,
            logged_out_at: None,
            created_at: Utc::now(),
            last_active: Utc::now(),
            expires_at: Utc::now(),
        }
    }

    #[test]
    fn is_current_comes_from_token_not_stored_flag() {
        let session = sample_session("abc");
        let response = SessionResponse::from_session(session.clone(), "abc");
        assert!(response.is_current);

        let response = SessionResponse::from_session(session, "other");
        assert!(!response.is_current);
    }

    #[test]
    fn response_omits_ip_address() {
        let session = sample_session("abc");
        let response = SessionResponse::from_session(session, "abc");
        let json = serde_json::to_value(&response).expect("serialize");
        assert!(json.get("ip_address").is_none());
    }
}
