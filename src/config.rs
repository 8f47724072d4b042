use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub token_secret: String,
    pub token_expiration_hours: u64,
    /// Fixed TTL applied to session rows at creation/refresh.
    pub session_ttl_days: u64,
    /// How long a suspension lasts before it lazily expires.
    pub suspension_hours: u64,
    /// Rolling window for the similar-device leniency heuristic.
    pub similar_device_window_days: u64,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/creatorshield".to_string());

        let token_secret = env::var("TOKEN_SECRET")
            .unwrap_or_else(|_| "your-secret-key-change-this-in-production".to_string());

        let token_expiration_hours = env::var("TOKEN_EXPIRATION_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse()
            .unwrap_or(24);

        let session_ttl_days = env::var("SESSION_TTL_DAYS")
            .unwrap_or_else(|_| "7".to_string())
            .parse()
            .unwrap_or(7);

        let suspension_hours = env::var("SUSPENSION_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse()
            .unwrap_or(24);

        let similar_device_window_days = env::var("SIMILAR_DEVICE_WINDOW_DAYS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);

        Ok(Config {
            database_url,
            token_secret,
            token_expiration_hours,
            session_ttl_days,
            suspension_hours,
            similar_device_window_days,
        })
    }
}
