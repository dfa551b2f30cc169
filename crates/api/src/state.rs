//! Application state

use sqlx::PgPool;

use crate::{
    auth::{AuthState, ResetTokenManager, SessionTokenIssuer},
    config::Config,
    email::MailService,
    objects::ObjectStore,
};

use imagestore_shared::RateLimiter;

/// Shared application state, built once at startup and cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub session_issuer: SessionTokenIssuer,
    pub reset_tokens: ResetTokenManager,
    pub objects: ObjectStore,
    pub mail: MailService,
    /// Optional fixed-window throttle; None when RATE_LIMIT_PER_MINUTE is 0.
    pub rate_limiter: Option<RateLimiter>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        let session_issuer =
            SessionTokenIssuer::new(&config.jwt_secret, config.session_expiry_minutes);

        let reset_tokens = ResetTokenManager::new(pool.clone(), config.reset_token_expiry_minutes);

        let objects = ObjectStore::new(
            config.object_store_root.clone(),
            &config.public_base_url,
            &config.download_signing_secret,
        );

        let mail = MailService::from_env();
        if mail.is_enabled() {
            tracing::info!("Mail transport enabled");
        } else {
            tracing::warn!("Mail transport not configured (missing MAIL_API_URL or MAIL_API_KEY)");
        }

        let rate_limiter = if config.rate_limit_per_minute > 0 {
            tracing::info!(
                limit = config.rate_limit_per_minute,
                "Rate limiter initialized"
            );
            Some(RateLimiter::new(
                config.rate_limit_per_minute,
                std::time::Duration::from_secs(60),
            ))
        } else {
            None
        };

        Self {
            pool,
            config,
            session_issuer,
            reset_tokens,
            objects,
            mail,
            rate_limiter,
        }
    }

    /// Get auth state for the middleware layer.
    pub fn auth_state(&self) -> AuthState {
        AuthState {
            issuer: self.session_issuer.clone(),
        }
    }
}
