//! Models for the durable notification outbox.
//!
//! The outbox replaces an in-process mailbox: alert rows survive restarts and
//! are shared across server instances, drained by the notification worker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::types::SubjectId;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
/// One undelivered (or recently delivered) alert.
pub struct OutboxNotification {
    pub id: String,
    pub subject_id: SubjectId,
    pub kind: NotificationKind,
    pub payload: Value,
    /// Delivery attempts so far; bumped on each failed send.
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, ToSchema)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
/// Alert categories the core emits.
pub enum NotificationKind {
    NewDevice,
    Suspended,
    Deactivated,
    ReactivationApproved,
    ReactivationRejected,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::NewDevice => "new_device",
            NotificationKind::Suspended => "suspended",
            NotificationKind::Deactivated => "deactivated",
            NotificationKind::ReactivationApproved => "reactivation_approved",
            NotificationKind::ReactivationRejected => "reactivation_rejected",
        }
    }

    /// Subject line used by the SMTP dispatcher.
    pub fn subject_line(&self) -> &'static str {
        match self {
            NotificationKind::NewDevice => "New device signed in to your account",
            NotificationKind::Suspended => "Your account has been suspended",
            NotificationKind::Deactivated => "Your account has been deactivated",
            NotificationKind::ReactivationApproved => "Your account has been reactivated",
            NotificationKind::ReactivationRejected => "Your reactivation request was declined",
        }
    }
}

impl Serialize for NotificationKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NotificationKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "new_device" => Ok(NotificationKind::NewDevice),
            "suspended" => Ok(NotificationKind::Suspended),
            "deactivated" => Ok(NotificationKind::Deactivated),
            "reactivation_approved" => Ok(NotificationKind::ReactivationApproved),
            "reactivation_rejected" => Ok(NotificationKind::ReactivationRejected),
            other => Err(serde::de::Error::unknown_variant(
                other,
                &[
                    "new_device",
                    "suspended",
                    "deactivated",
                    "reactivation_approved",
                    "reactivation_rejected",
                ],
            )),
        }
    }
}
