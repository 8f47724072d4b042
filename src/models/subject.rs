//! Models representing subjects (account owners), their punitive status, and
//! the reactivation workflow payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::types::SubjectId;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
/// Database representation of a subject account.
pub struct Subject {
    /// Unique identifier for the subject.
    pub id: SubjectId,
    /// Email used for login and notifications.
    pub email: String,
    /// Argon2 hash of the subject's password.
    pub password_hash: String,
    /// Human-readable display name.
    pub display_name: String,
    /// Role describing the subject's privileges.
    pub role: SubjectRole,
    /// Billing plan the subject is on.
    pub plan: SubjectPlan,
    /// Stored punitive status. May be stale for `Suspended`; readers must go
    /// through `services::suspension::evaluate` instead of trusting it.
    pub status: SubjectStatus,
    /// When the current suspension began, if any.
    pub suspended_at: Option<DateTime<Utc>>,
    /// When the pending/last reactivation request was submitted.
    pub reactivation_requested_at: Option<DateTime<Utc>>,
    /// Short reason chosen by the subject.
    pub reactivation_reason: Option<String>,
    /// Free-form explanation accompanying the request.
    pub reactivation_explanation: Option<String>,
    /// Resolution state of the reactivation request.
    pub reactivation_status: Option<ReactivationStatus>,
    /// Creation timestamp for auditing.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp for auditing.
    pub updated_at: DateTime<Utc>,
}

impl Subject {
    pub fn is_admin(&self) -> bool {
        matches!(self.role, SubjectRole::Admin)
    }

    pub fn has_pending_reactivation(&self) -> bool {
        matches!(self.reactivation_status, Some(ReactivationStatus::Pending))
    }
}

macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? } $doc:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, ToSchema, Default)]
        #[sqlx(type_name = "TEXT", rename_all = "snake_case")]
        #[doc = $doc]
        pub enum $name {
            #[default]
            $($variant),+
        }

        impl $name {
            /// Returns the canonical snake_case representation.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                match s.as_str() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(serde::de::Error::unknown_variant(
                        other,
                        &[$($text),+],
                    )),
                }
            }
        }
    };
}

text_enum!(SubjectRole {
    Creator => "creator",
    Admin => "admin",
} "Supported subject roles stored in the database.");

text_enum!(SubjectPlan {
    Free => "free",
    Pro => "pro",
} "Billing plan tiers carried in issued tokens.");

text_enum!(SubjectStatus {
    Active => "active",
    Suspended => "suspended",
    Deactivated => "deactivated",
} "Stored punitive status of a subject account.");

text_enum!(ReactivationStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
} "Resolution state of a reactivation request.");

#[derive(Debug, Deserialize, Validate, ToSchema)]
/// Payload for submitting a reactivation request while deactivated.
pub struct ReactivationRequestPayload {
    #[validate(length(min = 1, max = 100))]
    pub reason: String,
    #[validate(length(min = 1, max = 2000))]
    pub explanation: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// Public view of a subject, stripped of credential material.
pub struct SubjectResponse {
    pub id: SubjectId,
    pub email: String,
    pub display_name: String,
    pub role: SubjectRole,
    pub plan: SubjectPlan,
    pub status: SubjectStatus,
}

impl From<Subject> for SubjectResponse {
    fn from(subject: Subject) -> Self {
        Self {
            id: subject.id,
            email: subject.email,
            display_name: subject.display_name,
            role: subject.role,
            plan: subject.plan,
            status: subject.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_as_snake_case() {
        let json = serde_json::to_string(&SubjectStatus::Deactivated).expect("serialize");
        assert_eq!(json, "\"deactivated\"");
    }

    #[test]
    fn status_deserializes_canonical_values() {
        let status: SubjectStatus = serde_json::from_str("\"suspended\"").expect("deserialize");
        assert_eq!(status, SubjectStatus::Suspended);
        assert!(serde_json::from_str::<SubjectStatus>("\"SUSPENDED\"").is_err());
    }

    #[test]
    fn pending_reactivation_is_detected() {
        let mut subject = sample_subject();
        assert!(!subject.has_pending_reactivation());
        subject.reactivation_status = Some(ReactivationStatus::Pending);
        assert!(subject.has_pending_reactivation());
        subject.reactivation_status = Some(ReactivationStatus::Rejected);
        assert!(!subject.has_pending_reactivation());
    }

    fn sample_subject() -> Subject {
        Subject {
            id: SubjectId::new(),
            email: "creator@example.com".into(),
            password_hash: "hash".into(),
            display_name: "Creator".into(),
            role: SubjectRole::Creator,
            plan: SubjectPlan::Free,
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
}
