//! Token codec: stateless issue/verify of signed session tokens.
//!
//! A verified token is never sufficient for authorization on its own; the
//! auth middleware must also confirm the referenced session is still live in
//! the registry.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::subject::{Subject, SubjectPlan, SubjectRole};
use crate::types::SubjectId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject id.
    pub sub: SubjectId,
    pub email: String,
    pub role: SubjectRole,
    pub plan: SubjectPlan,
    /// Session id: lets the registry resolve the session without a second
    /// lookup by fingerprint.
    pub sid: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(subject: &Subject, session_id: String, expiration_hours: u64) -> Self {
        let now = Utc::now();
        let exp = now + Duration::hours(expiration_hours as i64);

        Self {
            sub: subject.id,
            email: subject.email.clone(),
            role: subject.role,
            plan: subject.plan,
            sid: session_id,
            exp: exp.timestamp(),
            iat: now.timestamp(),
        }
    }
}

pub fn issue(claims: &Claims, secret: &str) -> anyhow::Result<String> {
    let token = encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?;
    Ok(token)
}

/// Fails closed: malformed, expired, and mis-signed tokens all surface the
/// same `InvalidToken`, with no hint about which check failed.
pub fn verify(token: &str, secret: &str) -> Result<Claims, AppError> {
    let validation = Validation::default();
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_ref()), &validation)
        .map(|data| data.claims)
        .map_err(|_| AppError::InvalidToken)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::subject::SubjectStatus;

    fn sample_subject() -> Subject {
        Subject {
            id: SubjectId::new(),
            email: "creator@example.com".into(),
            password_hash: "hash".into(),
            display_name: "Creator".into(),
            role: SubjectRole::Creator,
            plan: SubjectPlan::Pro,
            status: SubjectStatus::Active,
            suspended_at: None,
            reactivation_requested_at: None,
            reactivation_reason: None,
            reactivation_explanation: None,
            reactivation_status: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn issue_and_verify_roundtrip() {
        let subject = sample_subject();
        let claims = Claims::new(&subject, "session-1".into(), 1);
        let token = issue(&claims, "secret").expect("issue");
        let verified = verify(&token, "secret").expect("verify");
        assert_eq!(verified.sub, subject.id);
        assert_eq!(verified.email, subject.email);
        assert_eq!(verified.sid, "session-1");
        assert_eq!(verified.plan, SubjectPlan::Pro);
    }

    #[test]
    fn wrong_secret_is_uniform_invalid_token() {
        let subject = sample_subject();
        let claims = Claims::new(&subject, "session-1".into(), 1);
        let token = issue(&claims, "secret").expect("issue");
        assert!(matches!(
            verify(&token, "other-secret"),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn garbage_is_uniform_invalid_token() {
        assert!(matches!(
            verify("not.a.token", "secret"),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn expired_token_is_uniform_invalid_token() {
        let subject = sample_subject();
        let mut claims = Claims::new(&subject, "session-1".into(), 1);
        claims.exp = (Utc::now() - Duration::hours(2)).timestamp();
        claims.iat = (Utc::now() - Duration::hours(3)).timestamp();
        let token = issue(&claims, "secret").expect("issue");
        assert!(matches!(
            verify(&token, "secret"),
            Err(AppError::InvalidToken)
        ));
    }
}
