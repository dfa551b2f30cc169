//! Authentication middleware for Axum
//!
//! Per-request gate: EXTRACT_TOKEN -> VERIFY -> BIND_ROLE -> CONTINUE, with
//! any failure short-circuiting into an unauthorized response. The verified
//! role travels in request extensions as [`AuthUser`]; it lives only for the
//! duration of one request.

use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, COOKIE},
        StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use super::jwt::{SessionTokenIssuer, TokenError};

/// Cookie carrying the session token for browser clients.
pub const TOKEN_COOKIE: &str = "Bearer";

/// Authenticated identity extracted from a verified session token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
}

/// State needed for authentication.
#[derive(Clone)]
pub struct AuthState {
    pub issuer: SessionTokenIssuer,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing credential")]
    MissingCredential,
    #[error("Invalid credential")]
    InvalidCredential,
    #[error("Expired credential")]
    ExpiredCredential,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        // All three variants share one public message; the distinction is
        // for logs only.
        let body = Json(json!({
            "error": "Invalid credential",
            "code": StatusCode::UNAUTHORIZED.as_u16()
        }));
        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

/// Extract the session token from the `Bearer` cookie.
fn extract_token_from_cookie(request: &Request) -> Option<String> {
    request
        .headers()
        .get(COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(|cookies| {
            for cookie in cookies.split(';') {
                let cookie = cookie.trim();
                if let Some(token) = cookie.strip_prefix("Bearer=") {
                    return Some(token.to_string());
                }
            }
            None
        })
}

/// Extract the session token from the Authorization header, falling back to
/// the HttpOnly cookie for browser clients.
pub(crate) fn extract_bearer_token(request: &Request) -> Option<String> {
    if let Some(header) = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        if let Some(token) = header.strip_prefix("Bearer ") {
            return Some(token.to_string());
        }
    }

    extract_token_from_cookie(request)
}

/// Middleware that requires a verified session token.
pub async fn require_auth(
    State(auth_state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    let Some(token) = extract_bearer_token(&request) else {
        tracing::warn!(path = %path, "require_auth: no credential in header or cookie");
        return AuthError::MissingCredential.into_response();
    };

    match auth_state.issuer.parse_and_verify(&token) {
        Ok(claims) => {
            tracing::debug!(path = %path, email = %claims.sub, role = %claims.role, "require_auth: ok");
            request.extensions_mut().insert(AuthUser {
                email: claims.sub,
                first_name: claims.first_name,
                last_name: claims.last_name,
                role: claims.role,
            });
            next.run(request).await
        }
        Err(TokenError::Expired) => {
            tracing::warn!(path = %path, "require_auth: expired credential");
            AuthError::ExpiredCredential.into_response()
        }
        Err(_) => {
            tracing::warn!(path = %path, "require_auth: invalid credential");
            AuthError::InvalidCredential.into_response()
        }
    }
}
