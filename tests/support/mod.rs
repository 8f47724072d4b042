#![allow(dead_code)]
//! Shared helpers for Postgres-backed integration tests.
//!
//! These tests need a real database. Set `TEST_DATABASE_URL` to run them;
//! without it every test returns early so `cargo test` stays green on
//! machines with no Postgres available.

use std::env;
use std::sync::OnceLock;

use creatorshield_backend::models::subject::{Subject, SubjectRole};
use creatorshield_backend::utils::password::hash_password;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Serializes integration tests so truncates from one test never race
/// another test's assertions.
pub async fn integration_guard() -> tokio::sync::MutexGuard<'static, ()> {
    static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
    GUARD.get_or_init(|| Mutex::new(())).lock().await
}

/// Connects to `TEST_DATABASE_URL` and runs migrations, or returns `None`
/// when the variable is unset (test should skip).
pub async fn test_pool() -> Option<PgPool> {
    let url = env::var("TEST_DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect(&url)
        .await
        .expect("connect to TEST_DATABASE_URL");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");
    Some(pool)
}

pub async fn truncate_all(pool: &PgPool) {
    sqlx::query("TRUNCATE notification_outbox, sessions, subjects CASCADE")
        .execute(pool)
        .await
        .expect("truncate tables");
}

/// Inserts a subject with a unique email and returns the stored row.
pub async fn seed_subject(pool: &PgPool, role: SubjectRole) -> Subject {
    let id = Uuid::new_v4();
    let email = format!("subject-{}@example.com", id.simple());
    let password_hash = hash_password("correct horse battery staple").expect("hash password");
    let role_text = match role {
        SubjectRole::Admin => "admin",
        SubjectRole::Creator => "creator",
    };
    sqlx::query_as::<_, Subject>(
        r#"
        INSERT INTO subjects (id, email, password_hash, display_name, role)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&email)
    .bind(&password_hash)
    .bind("Test Subject")
    .bind(role_text)
    .fetch_one(pool)
    .await
    .expect("seed subject")
}
