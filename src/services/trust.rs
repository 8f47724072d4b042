//! Device fingerprint derivation and trust classification.
//!
//! Classification is a pure function over the subject's recent active
//! sessions; `register_login` is the one place a `New` verdict creates a
//! pending session and enqueues the alert, so heartbeats and retries can
//! never re-trigger a notification.

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use sha2::{Digest, Sha256};
use sqlx::PgPool;

use crate::config::Config;
use crate::error::AppError;
use crate::models::notification::NotificationKind;
use crate::models::session::{DeviceMetadata, Session};
use crate::repositories::{outbox, session as session_repo};
use crate::types::SubjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    /// Exact fingerprint match, or the subject's first recent login.
    Known,
    /// Same browser+OS pair as an existing active session; treated as known
    /// for alerting, but the original session's fingerprint is untouched.
    Similar,
    /// No match; triggers a pending, unconfirmed session and one alert.
    New,
}

/// Stable device identity from request metadata. Deliberately excludes the
/// IP address, which may change per request.
pub fn derive_fingerprint(browser: &str, os: &str, device_id: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(browser.trim().to_lowercase().as_bytes());
    hasher.update(b"|");
    hasher.update(os.trim().to_lowercase().as_bytes());
    if let Some(device_id) = device_id.map(str::trim).filter(|id| !id.is_empty()) {
        hasher.update(b"|");
        hasher.update(device_id.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Classifies a connecting device against the subject's active sessions
/// within the leniency window.
pub fn classify(recent: &[Session], fingerprint: &str, browser: &str, os: &str) -> DeviceClass {
    if recent.iter().any(|s| s.fingerprint == fingerprint) {
        return DeviceClass::Known;
    }
    // A brand-new account (or one idle past the window) gets no alarm on its
    // first login.
    if recent.is_empty() {
        return DeviceClass::Known;
    }
    let same_family = recent.iter().any(|s| {
        s.browser.eq_ignore_ascii_case(browser.trim()) && s.os.eq_ignore_ascii_case(os.trim())
    });
    if same_family {
        return DeviceClass::Similar;
    }
    DeviceClass::New
}

/// Outcome of a login-time registration pass.
#[derive(Debug)]
pub struct LoginRegistration {
    pub session: Session,
    pub class: DeviceClass,
    /// True when the caller should surface a new-device alert to the client.
    pub new_device: bool,
}

/// Registers a login: classifies the device, upserts the session row, and on
/// a genuinely new device enqueues exactly one outbox notification. The
/// notification fires only on the transition from "no live session" to
/// "session live" — a fresh row, or the revival of one the subject (or an
/// admin) had revoked — never on refresh of a live session.
pub async fn register_login(
    pool: &PgPool,
    config: &Config,
    subject_id: SubjectId,
    metadata: &DeviceMetadata,
    ip_address: Option<&str>,
    location: Option<&str>,
    now: DateTime<Utc>,
) -> Result<LoginRegistration, AppError> {
    let fingerprint = derive_fingerprint(
        &metadata.browser,
        &metadata.os,
        metadata.device_id.as_deref(),
    );

    let window_start = now - Duration::days(config.similar_device_window_days as i64);
    let recent = session_repo::list_active_since(pool, subject_id, window_start, now)
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))?;

    let class = classify(&recent, &fingerprint, &metadata.browser, &metadata.os);

    let expires_at = now + Duration::days(config.session_ttl_days as i64);
    let (session, registered) = session_repo::create_or_refresh(
        pool,
        session_repo::NewSession {
            subject_id,
            fingerprint: &fingerprint,
            device_label: metadata.device_label.as_deref(),
            browser: &metadata.browser,
            os: &metadata.os,
            ip_address,
            location,
            is_confirmed: class != DeviceClass::New,
            expires_at,
        },
    )
    .await
    .map_err(|e| AppError::InternalServerError(e.into()))?;

    let new_device = class == DeviceClass::New && registered;
    if new_device {
        let payload = json!({
            "session_id": session.id,
            "browser": metadata.browser,
            "os": metadata.os,
            "device_label": metadata.device_label,
            "location": location,
            "detected_at": now,
        });
        // Best-effort durable enqueue. Losing the alert is preferable to
        // failing the login that triggered it.
        if let Err(err) =
            outbox::enqueue(pool, subject_id, NotificationKind::NewDevice, payload).await
        {
            tracing::warn!(
                error = ?err,
                subject_id = %subject_id,
                "Failed to enqueue new-device notification"
            );
        }
    }

    Ok(LoginRegistration {
        session,
        class,
        new_device,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with(fingerprint: &str, browser: &str, os: &str) -> Session {
        Session {
            id: uuid::Uuid::new_v4().to_string(),
            subject_id: SubjectId::new(),
            fingerprint: fingerprint.into(),
            device_label: None,
            browser: browser.into(),
            os: os.into(),
            ip_address: None,
            location: None,
            is_current: false,
            is_confirmed: true,
            is_active: true,
            logged_out_at: None,
            created_at: Utc::now(),
            last_active: Utc::now(),
            expires_at: Utc::now() + Duration::days(7),
        }
    }

    #[test]
    fn fingerprint_is_stable_and_case_insensitive() {
        let a = derive_fingerprint("Chrome", "Windows", None);
        let b = derive_fingerprint("chrome", "windows", None);
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_excludes_blank_device_id() {
        let a = derive_fingerprint("Chrome", "Windows", None);
        let b = derive_fingerprint("Chrome", "Windows", Some("  "));
        assert_eq!(a, b);
        let c = derive_fingerprint("Chrome", "Windows", Some("device-1"));
        assert_ne!(a, c);
    }

    #[test]
    fn first_login_is_never_new() {
        let class = classify(&[], "fp-1", "Chrome", "Windows");
        assert_eq!(class, DeviceClass::Known);
    }

    #[test]
    fn exact_fingerprint_match_is_known() {
        let recent = vec![session_with("fp-1", "Chrome", "Windows")];
        let class = classify(&recent, "fp-1", "Firefox", "Linux");
        assert_eq!(class, DeviceClass::Known);
    }

    #[test]
    fn same_browser_os_pair_is_similar() {
        let recent = vec![session_with("fp-1", "Chrome", "Windows")];
        let class = classify(&recent, "fp-2", "Chrome", "Windows");
        assert_eq!(class, DeviceClass::Similar);
    }

    #[test]
    fn similar_match_ignores_case() {
        let recent = vec![session_with("fp-1", "Chrome", "Windows")];
        let class = classify(&recent, "fp-2", "chrome", "WINDOWS");
        assert_eq!(class, DeviceClass::Similar);
    }

    #[test]
    fn unmatched_device_is_new() {
        let recent = vec![session_with("fp-1", "Chrome", "Windows")];
        let class = classify(&recent, "fp-2", "Safari", "macOS");
        assert_eq!(class, DeviceClass::New);
    }

    #[test]
    fn device_class_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&DeviceClass::New).expect("serialize"),
            "\"new\""
        );
        assert_eq!(
            serde_json::to_string(&DeviceClass::Similar).expect("serialize"),
            "\"similar\""
        );
    }
}
