//! Periodic sweep, invoked by an external scheduler (cron). Deletes sessions
//! past their expiry and prunes delivered outbox rows. Safe to run
//! concurrently with itself; both deletes are idempotent.

use chrono::{Duration, Utc};
use creatorshield_backend::{
    config::Config,
    db::connection::create_pool,
    repositories::{outbox, session as session_repo},
};

const DELIVERED_RETENTION_DAYS: i64 = 30;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::load()?;
    let pool = create_pool(&config.database_url).await?;
    let now = Utc::now();

    let deleted_sessions = session_repo::sweep_expired(&pool, now).await?;
    if deleted_sessions > 0 {
        tracing::info!("Deleted {} expired sessions", deleted_sessions);
    }

    let pruned = outbox::prune_delivered(&pool, now - Duration::days(DELIVERED_RETENTION_DAYS))
        .await?;
    if pruned > 0 {
        tracing::info!("Pruned {} delivered notifications", pruned);
    }

    Ok(())
}
