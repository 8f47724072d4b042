//! Notification dispatcher: delivers outbox rows to the subject.
//!
//! Fire-and-forget from the core's perspective: a failed send is logged and
//! retried on the next worker run, never propagated to the operation that
//! enqueued the alert.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::env;

use crate::models::notification::OutboxNotification;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Delivers one notification to the given address. An `Err` leaves the
    /// outbox row undelivered for a later retry.
    async fn dispatch(
        &self,
        recipient_email: &str,
        notification: &OutboxNotification,
    ) -> anyhow::Result<()>;
}

pub struct SmtpDispatcher {
    mailer: SmtpTransport,
    from_address: String,
}

impl SmtpDispatcher {
    pub fn from_env() -> anyhow::Result<Self> {
        let smtp_host = env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".to_string());
        let smtp_port = env::var("SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse::<u16>()
            .unwrap_or(587);
        let smtp_username = env::var("SMTP_USERNAME").unwrap_or_default();
        let smtp_password = env::var("SMTP_PASSWORD").unwrap_or_default();
        let from_address = env::var("SMTP_FROM_ADDRESS")
            .unwrap_or_else(|_| "alerts@creatorshield.local".to_string());

        let mailer = if smtp_username.is_empty() {
            SmtpTransport::builder_dangerous(&smtp_host)
                .port(smtp_port)
                .build()
        } else {
            let creds = Credentials::new(smtp_username, smtp_password);
            SmtpTransport::relay(&smtp_host)?
                .port(smtp_port)
                .credentials(creds)
                .build()
        };

        Ok(Self {
            mailer,
            from_address,
        })
    }

    fn render_body(notification: &OutboxNotification) -> String {
        let detail = serde_json::to_string_pretty(&notification.payload)
            .unwrap_or_else(|_| "{}".to_string());
        format!(
            "Security notice from CreatorShield\n\n{}\n\nDetails:\n{}\n\nIf this was not you, revoke the session from your account settings.\n",
            notification.kind.subject_line(),
            detail
        )
    }
}

#[async_trait]
impl NotificationDispatcher for SmtpDispatcher {
    async fn dispatch(
        &self,
        recipient_email: &str,
        notification: &OutboxNotification,
    ) -> anyhow::Result<()> {
        if env::var("SMTP_SKIP_SEND").unwrap_or_default() == "true" {
            return Ok(());
        }

        let email = Message::builder()
            .from(self.from_address.parse()?)
            .to(recipient_email.parse()?)
            .subject(notification.kind.subject_line())
            .header(ContentType::TEXT_PLAIN)
            .body(Self::render_body(notification))?;

        self.mailer.send(&email)?;
        Ok(())
    }
}

/// Attempts a single delivery. Returns whether the outbox row may be marked
/// delivered; a failure is logged and left for the next worker run.
pub async fn attempt_delivery(
    dispatcher: &dyn NotificationDispatcher,
    recipient_email: &str,
    notification: &OutboxNotification,
) -> bool {
    match dispatcher.dispatch(recipient_email, notification).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                notification_id = %notification.id,
                kind = notification.kind.as_str(),
                error = %e,
                "Notification delivery failed"
            );
            false
        }
    }
}

/// Dispatcher that only logs; used when SMTP is not configured.
pub struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn dispatch(
        &self,
        recipient_email: &str,
        notification: &OutboxNotification,
    ) -> anyhow::Result<()> {
        tracing::info!(
            recipient = recipient_email,
            kind = notification.kind.as_str(),
            notification_id = %notification.id,
            "Dispatching notification (log only)"
        );
        Ok(())
    }
}
