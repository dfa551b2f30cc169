//! Session token issuance and verification
//!
//! Tokens are stateless: validity is determined purely by signature and
//! expiry, nothing is persisted server-side. The verifier pins the signing
//! algorithm to HS256, so a token whose header names any other algorithm is
//! rejected before the signature is checked (algorithm-confusion defense).

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Fixed issuer name embedded in every token.
const ISSUER: &str = "imagestore";

/// Claims bundle inside a signed session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Identity (email).
    pub sub: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub iss: String,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token could not be encoded")]
    Encoding,
}

/// Issues and verifies signed session tokens with a process-wide symmetric
/// key.
#[derive(Clone)]
pub struct SessionTokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_minutes: i64,
}

impl SessionTokenIssuer {
    pub fn new(secret: &str, expiry_minutes: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry_minutes,
        }
    }

    /// Issue a token for the given identity and role.
    pub fn issue(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
        role: &str,
    ) -> Result<String, TokenError> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = SessionClaims {
            sub: email.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            role: role.to_string(),
            iss: ISSUER.to_string(),
            iat: now,
            exp: now + self.expiry_minutes * 60,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|_| TokenError::Encoding)
    }

    /// Verify signature, algorithm, issuer and expiry, returning the claims.
    pub fn parse_and_verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.leeway = 0;

        match decode::<SessionClaims>(token, &self.decoding_key, &validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => match e.kind() {
                ErrorKind::ExpiredSignature => Err(TokenError::Expired),
                _ => Err(TokenError::InvalidSignature),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> SessionTokenIssuer {
        SessionTokenIssuer::new("test-session-secret-at-least-32-bytes!!", 60)
    }

    #[test]
    fn issue_then_verify_returns_claims() {
        let token = issuer().issue("alice@example.com", "Alice", "Doe", "user").unwrap();
        let claims = issuer().parse_and_verify(&token).unwrap();

        assert_eq!(claims.sub, "alice@example.com");
        assert_eq!(claims.first_name, "Alice");
        assert_eq!(claims.role, "user");
        assert_eq!(claims.iss, "imagestore");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn foreign_key_signature_is_rejected() {
        let token = issuer().issue("alice@example.com", "Alice", "Doe", "user").unwrap();
        let other = SessionTokenIssuer::new("a-completely-different-signing-key!!!!!!", 60);

        assert!(matches!(
            other.parse_and_verify(&token),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        // Negative expiry puts exp in the past at issue time.
        let expired = SessionTokenIssuer::new("test-session-secret-at-least-32-bytes!!", -5);
        let token = expired.issue("alice@example.com", "Alice", "Doe", "user").unwrap();

        assert!(matches!(
            issuer().parse_and_verify(&token),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn non_hs256_algorithm_header_is_rejected() {
        // Same secret, different HMAC variant: the verifier pins HS256.
        let claims = SessionClaims {
            sub: "alice@example.com".into(),
            first_name: "Alice".into(),
            last_name: "Doe".into(),
            role: "user".into(),
            iss: ISSUER.into(),
            iat: OffsetDateTime::now_utc().unix_timestamp(),
            exp: OffsetDateTime::now_utc().unix_timestamp() + 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret(b"test-session-secret-at-least-32-bytes!!"),
        )
        .unwrap();

        assert!(matches!(
            issuer().parse_and_verify(&token),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(issuer().parse_and_verify("not.a.token").is_err());
    }

    #[test]
    fn wrong_issuer_is_rejected() {
        let claims = SessionClaims {
            sub: "alice@example.com".into(),
            first_name: "Alice".into(),
            last_name: "Doe".into(),
            role: "user".into(),
            iss: "someone-else".into(),
            iat: OffsetDateTime::now_utc().unix_timestamp(),
            exp: OffsetDateTime::now_utc().unix_timestamp() + 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-session-secret-at-least-32-bytes!!"),
        )
        .unwrap();

        assert!(issuer().parse_and_verify(&token).is_err());
    }
}
