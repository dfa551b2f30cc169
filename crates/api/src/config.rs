//! Process-wide configuration
//!
//! Read once at startup from the environment. The signing secret is treated
//! as immutable for the process lifetime; a missing secret aborts startup
//! rather than serving degraded traffic.

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string.
    pub database_url: String,
    /// Symmetric key for session token signing (HS256).
    pub jwt_secret: String,
    /// Session token lifetime in minutes.
    pub session_expiry_minutes: i64,
    /// Password-reset token lifetime in minutes.
    pub reset_token_expiry_minutes: i64,
    /// Secret for signing time-limited download links.
    pub download_signing_secret: String,
    /// Directory where uploaded objects are stored.
    pub object_store_root: String,
    /// Externally reachable base URL, used in presigned links and reset mail.
    pub public_base_url: String,
    /// Listen address, e.g. "0.0.0.0:8007".
    pub bind_address: String,
    /// Requests per minute per client; 0 disables the limiter.
    pub rate_limit_per_minute: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let jwt_secret = std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 bytes");
        }

        // Download links fall back to the session secret when no dedicated
        // secret is configured.
        let download_signing_secret =
            std::env::var("DOWNLOAD_SIGNING_SECRET").unwrap_or_else(|_| jwt_secret.clone());

        let session_expiry_minutes = env_i64("SESSION_EXPIRY_MINUTES", 60)?;
        let reset_token_expiry_minutes = env_i64("RESET_TOKEN_EXPIRY", 15)?;

        let object_store_root =
            std::env::var("OBJECT_STORE_ROOT").unwrap_or_else(|_| "data/objects".to_string());
        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8007".to_string());
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8007".to_string());

        let rate_limit_per_minute = std::env::var("RATE_LIMIT_PER_MINUTE")
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .context("RATE_LIMIT_PER_MINUTE must be an integer")?
            .unwrap_or(0);

        Ok(Self {
            database_url,
            jwt_secret,
            session_expiry_minutes,
            reset_token_expiry_minutes,
            download_signing_secret,
            object_store_root,
            public_base_url,
            bind_address,
            rate_limit_per_minute,
        })
    }
}

fn env_i64(key: &str, default: i64) -> anyhow::Result<i64> {
    match std::env::var(key) {
        Ok(v) => v
            .parse::<i64>()
            .with_context(|| format!("{key} must be an integer")),
        Err(_) => Ok(default),
    }
}
