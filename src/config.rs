use std::env;
use std::net::SocketAddr;

use anyhow::{bail, Context};
use chrono::Duration;

/// Runtime configuration, read from the environment exactly once at startup.
/// Nothing else in the crate touches `std::env`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub token_validity_minutes: i64,
    pub storage_dir: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<AppConfig> {
        let database_url =
            env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        if jwt_secret.is_empty() {
            bail!("JWT_SECRET must not be empty");
        }

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse::<SocketAddr>()
            .context("BIND_ADDR must be a valid socket address")?;

        // Tokens are short-lived on purpose; a non-positive validity is a
        // configuration error, not a request for "no expiry".
        let token_validity_minutes = env::var("TOKEN_VALIDITY_MINUTES")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<i64>()
            .context("TOKEN_VALIDITY_MINUTES must be an integer")?;
        if token_validity_minutes <= 0 {
            bail!("TOKEN_VALIDITY_MINUTES must be positive");
        }

        let storage_dir = env::var("STORAGE_DIR").unwrap_or_else(|_| "storage".to_string());

        Ok(AppConfig {
            database_url,
            bind_addr,
            jwt_secret,
            token_validity_minutes,
            storage_dir,
        })
    }

    pub fn token_validity(&self) -> Duration {
        Duration::minutes(self.token_validity_minutes)
    }
}
