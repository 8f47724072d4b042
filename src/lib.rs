//! CreatorShield session & device-trust backend.
//!
//! Library target shared by the server binary, the cron jobs under
//! `src/bin/`, and the integration tests.

pub mod config;
pub mod db;
pub mod docs;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod services;
pub mod state;
pub mod types;
pub mod utils;
