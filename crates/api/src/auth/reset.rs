//! Password-reset token lifecycle
//!
//! A reset ticket is a sha256 digest of a random 16-byte token plus an
//! expiry, stored on the user row. The plaintext token travels exactly once,
//! in the reset mail; only its digest is persisted, so a leaked store cannot
//! be replayed into a reset. Consumption is a single UPDATE matching digest
//! and expiry, which both enforces single use and settles the concurrent
//! consume race: of two simultaneous attempts with the same token, exactly
//! one matches a row.

use sha2::{Digest, Sha256};
use sqlx::PgPool;
use time::{Duration, OffsetDateTime};

const TOKEN_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum ResetError {
    #[error("randomness source unavailable")]
    Randomness,
    #[error("no account for that identity")]
    UnknownIdentity,
    #[error("invalid or expired reset token")]
    InvalidOrExpiredToken,
    #[error(transparent)]
    Store(#[from] sqlx::Error),
}

/// Manages issue and single-use consumption of reset tickets.
#[derive(Clone)]
pub struct ResetTokenManager {
    pool: PgPool,
    ttl_minutes: i64,
}

impl ResetTokenManager {
    pub fn new(pool: PgPool, ttl_minutes: i64) -> Self {
        Self { pool, ttl_minutes }
    }

    /// Generate a fresh token for `email`, replacing any prior ticket, and
    /// return the plaintext for out-of-band delivery.
    pub async fn issue(&self, email: &str) -> Result<String, ResetError> {
        use rand::TryRngCore;

        let mut raw = [0u8; TOKEN_LEN];
        rand::rngs::OsRng
            .try_fill_bytes(&mut raw)
            .map_err(|_| ResetError::Randomness)?;

        let plaintext = hex::encode(raw);
        let digest = token_digest(&raw);
        let expires_at = OffsetDateTime::now_utc() + Duration::minutes(self.ttl_minutes);

        let updated = sqlx::query(
            r#"
            UPDATE users
            SET password_reset_token = $2,
                password_reset_expires_at = $3,
                updated_at = NOW()
            WHERE email = $1
            "#,
        )
        .bind(email)
        .bind(&digest)
        .bind(expires_at)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(ResetError::UnknownIdentity);
        }

        tracing::info!(email = %email, "Reset ticket issued");
        Ok(plaintext)
    }

    /// Consume `plaintext_token`, atomically swapping in the new password
    /// digest and clearing the ticket. Lookup is by token digest, never by
    /// identity, so a known email alone cannot be exploited.
    pub async fn consume(
        &self,
        plaintext_token: &str,
        new_password_hash: &str,
    ) -> Result<(), ResetError> {
        let raw = hex::decode(plaintext_token).map_err(|_| ResetError::InvalidOrExpiredToken)?;
        let digest = token_digest(&raw);

        let updated = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2,
                password_reset_token = '',
                password_reset_expires_at = 'epoch',
                updated_at = NOW()
            WHERE password_reset_token = $1
              AND password_reset_token <> ''
              AND password_reset_expires_at > NOW()
            "#,
        )
        .bind(&digest)
        .bind(new_password_hash)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(ResetError::InvalidOrExpiredToken);
        }

        tracing::info!("Reset ticket consumed");
        Ok(())
    }
}

/// One-way digest of the raw token bytes. No salt: the token itself is
/// high-entropy.
fn token_digest(raw: &[u8]) -> String {
    hex::encode(Sha256::digest(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic_sha256_hex() {
        let raw = [0u8; 16];
        let a = token_digest(&raw);
        let b = token_digest(&raw);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        // sha256 of 16 zero bytes, fixed test vector
        assert_eq!(
            a,
            "374708fff7719dd5979ec875d56cd2286f6d3cf7ec317a3b25632aab28ec37bb"
        );
    }

    #[test]
    fn different_tokens_have_different_digests() {
        assert_ne!(token_digest(&[0u8; 16]), token_digest(&[1u8; 16]));
    }

    #[test]
    fn plaintext_token_is_hex_of_16_bytes() {
        // issue() encodes 16 random bytes as hex; consume() must round-trip
        // that encoding before hashing.
        let raw = [7u8; TOKEN_LEN];
        let plaintext = hex::encode(raw);
        assert_eq!(plaintext.len(), 32);
        assert_eq!(hex::decode(&plaintext).unwrap(), raw);
    }

    // Lifecycle tests below need a live Postgres. Run them with
    // DATABASE_URL set and `cargo test -- --ignored`.

    async fn test_pool() -> PgPool {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = imagestore_shared::create_pool(&url).await.expect("pool");
        imagestore_shared::run_migrations(&pool)
            .await
            .expect("migrations");
        pool
    }

    async fn insert_user(pool: &PgPool) -> String {
        let email = format!("reset-{}@example.com", uuid::Uuid::new_v4());
        sqlx::query(
            r#"
            INSERT INTO users (first_name, last_name, email, password_hash)
            VALUES ('Alice', 'Doe', $1, 'old-digest')
            "#,
        )
        .bind(&email)
        .execute(pool)
        .await
        .expect("insert user");
        email
    }

    async fn stored_password_hash(pool: &PgPool, email: &str) -> String {
        sqlx::query_scalar("SELECT password_hash FROM users WHERE email = $1")
            .bind(email)
            .fetch_one(pool)
            .await
            .expect("user row")
    }

    #[tokio::test]
    #[ignore]
    async fn consumed_token_cannot_be_reused() {
        let pool = test_pool().await;
        let manager = ResetTokenManager::new(pool.clone(), 15);
        let email = insert_user(&pool).await;

        let token = manager.issue(&email).await.expect("issue");
        manager
            .consume(&token, "new-digest")
            .await
            .expect("first consume wins");

        assert!(matches!(
            manager.consume(&token, "other-digest").await,
            Err(ResetError::InvalidOrExpiredToken)
        ));
        // The second attempt must not have touched the password.
        assert_eq!(stored_password_hash(&pool, &email).await, "new-digest");
    }

    #[tokio::test]
    #[ignore]
    async fn expired_token_is_rejected_and_changes_nothing() {
        let pool = test_pool().await;
        // Negative ttl puts the expiry in the past at issue time.
        let manager = ResetTokenManager::new(pool.clone(), -1);
        let email = insert_user(&pool).await;

        let token = manager.issue(&email).await.expect("issue");

        assert!(matches!(
            manager.consume(&token, "new-digest").await,
            Err(ResetError::InvalidOrExpiredToken)
        ));
        assert_eq!(stored_password_hash(&pool, &email).await, "old-digest");
    }

    #[tokio::test]
    #[ignore]
    async fn concurrent_consumes_have_exactly_one_winner() {
        let pool = test_pool().await;
        let manager = ResetTokenManager::new(pool.clone(), 15);
        let email = insert_user(&pool).await;

        let token = manager.issue(&email).await.expect("issue");

        let (a, b) = tokio::join!(
            manager.consume(&token, "digest-a"),
            manager.consume(&token, "digest-b"),
        );

        let winners = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1, "exactly one concurrent consume may succeed");

        let stored = stored_password_hash(&pool, &email).await;
        let expected = if a.is_ok() { "digest-a" } else { "digest-b" };
        assert_eq!(stored, expected);
    }
}
