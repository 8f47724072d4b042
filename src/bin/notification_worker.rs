//! Outbox drain, invoked by an external scheduler. Fetches undelivered
//! notifications, resolves each subject's email, and dispatches via SMTP.
//! A failed send bumps the attempt counter and leaves the row for the next
//! run; one bad row never blocks the rest of the batch.

use chrono::Utc;
use creatorshield_backend::{
    config::Config,
    db::connection::create_pool,
    repositories::{outbox, subject as subject_repo},
    services::dispatcher::{attempt_delivery, SmtpDispatcher},
};

const BATCH_SIZE: i64 = 100;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::load()?;
    let pool = create_pool(&config.database_url).await?;
    let dispatcher = SmtpDispatcher::from_env()?;

    let pending = outbox::fetch_undelivered(&pool, BATCH_SIZE).await?;
    if pending.is_empty() {
        return Ok(());
    }
    tracing::info!("Dispatching {} pending notifications", pending.len());

    let mut delivered = 0u64;
    for notification in pending {
        let recipient = match subject_repo::find_by_id(&pool, notification.subject_id).await {
            Ok(Some(subject)) => subject.email,
            Ok(None) => {
                // Subject deleted since the alert was queued; drop the row.
                tracing::warn!(
                    notification_id = %notification.id,
                    "Subject gone; marking notification delivered"
                );
                let _ = outbox::mark_delivered(&pool, &notification.id, Utc::now()).await;
                continue;
            }
            Err(err) => {
                tracing::warn!(error = ?err, "Subject lookup failed; will retry");
                continue;
            }
        };

        if attempt_delivery(&dispatcher, &recipient, &notification).await {
            outbox::mark_delivered(&pool, &notification.id, Utc::now()).await?;
            delivered += 1;
        } else {
            outbox::record_failure(&pool, &notification.id).await?;
        }
    }

    tracing::info!("Delivered {} notifications", delivered);
    Ok(())
}
