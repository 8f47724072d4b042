//! Postgres-backed tests for login-time device registration and alerting.
//! Skipped unless `TEST_DATABASE_URL` is set.

use chrono::Utc;
use creatorshield_backend::config::Config;
use creatorshield_backend::models::notification::NotificationKind;
use creatorshield_backend::models::session::DeviceMetadata;
use creatorshield_backend::models::subject::SubjectRole;
use creatorshield_backend::repositories::{outbox, session as session_repo};
use creatorshield_backend::services::trust::{self, DeviceClass};

#[path = "support/mod.rs"]
mod support;

fn test_config() -> Config {
    Config {
        database_url: String::new(),
        token_secret: "test-secret".into(),
        token_expiration_hours: 24,
        session_ttl_days: 7,
        suspension_hours: 24,
        similar_device_window_days: 30,
    }
}

fn device(browser: &str, os: &str, device_id: Option<&str>) -> DeviceMetadata {
    DeviceMetadata {
        browser: browser.into(),
        os: os.into(),
        device_label: None,
        device_id: device_id.map(str::to_string),
    }
}

async fn undelivered_new_device_count(pool: &sqlx::PgPool) -> usize {
    outbox::fetch_undelivered(pool, 50)
        .await
        .expect("fetch outbox")
        .iter()
        .filter(|n| n.kind == NotificationKind::NewDevice)
        .count()
}

#[tokio::test]
async fn first_login_is_known_and_silent() {
    let _guard = support::integration_guard().await;
    let Some(pool) = support::test_pool().await else {
        return;
    };
    support::truncate_all(&pool).await;

    let subject = support::seed_subject(&pool, SubjectRole::Creator).await;
    let config = test_config();

    let registration = trust::register_login(
        &pool,
        &config,
        subject.id,
        &device("Chrome", "Windows", None),
        None,
        None,
        Utc::now(),
    )
    .await
    .expect("register first login");

    assert_eq!(registration.class, DeviceClass::Known);
    assert!(!registration.new_device);
    assert!(registration.session.is_confirmed);
    assert_eq!(undelivered_new_device_count(&pool).await, 0);
}

#[tokio::test]
async fn similar_family_device_raises_no_alert() {
    let _guard = support::integration_guard().await;
    let Some(pool) = support::test_pool().await else {
        return;
    };
    support::truncate_all(&pool).await;

    let subject = support::seed_subject(&pool, SubjectRole::Creator).await;
    let config = test_config();

    trust::register_login(
        &pool,
        &config,
        subject.id,
        &device("Chrome", "Windows", Some("desktop")),
        None,
        None,
        Utc::now(),
    )
    .await
    .expect("register first device");

    let registration = trust::register_login(
        &pool,
        &config,
        subject.id,
        &device("Chrome", "Windows", Some("laptop")),
        None,
        None,
        Utc::now(),
    )
    .await
    .expect("register similar device");

    assert_eq!(registration.class, DeviceClass::Similar);
    assert!(!registration.new_device);
    assert!(registration.session.is_confirmed);
    assert_eq!(undelivered_new_device_count(&pool).await, 0);
}

#[tokio::test]
async fn relogin_from_revoked_device_alerts_again() {
    let _guard = support::integration_guard().await;
    let Some(pool) = support::test_pool().await else {
        return;
    };
    support::truncate_all(&pool).await;

    let subject = support::seed_subject(&pool, SubjectRole::Creator).await;
    let config = test_config();
    let now = Utc::now();

    trust::register_login(
        &pool,
        &config,
        subject.id,
        &device("Chrome", "Windows", None),
        None,
        None,
        now,
    )
    .await
    .expect("register trusted device");

    let suspicious = trust::register_login(
        &pool,
        &config,
        subject.id,
        &device("Safari", "macOS", None),
        None,
        None,
        now,
    )
    .await
    .expect("register suspicious device");
    assert_eq!(suspicious.class, DeviceClass::New);
    assert!(suspicious.new_device);
    assert!(!suspicious.session.is_confirmed);
    assert_eq!(undelivered_new_device_count(&pool).await, 1);

    // "This wasn't me": the subject kills the session from their settings.
    session_repo::revoke(&pool, &suspicious.session.id, now)
        .await
        .expect("revoke suspicious session");

    // The same device coming back must alert again, not slip through by
    // reviving its revoked row.
    let returned = trust::register_login(
        &pool,
        &config,
        subject.id,
        &device("Safari", "macOS", None),
        None,
        None,
        Utc::now(),
    )
    .await
    .expect("re-register revoked device");
    assert_eq!(returned.class, DeviceClass::New);
    assert!(returned.new_device);
    assert!(!returned.session.is_confirmed);
    assert_eq!(undelivered_new_device_count(&pool).await, 2);
}
