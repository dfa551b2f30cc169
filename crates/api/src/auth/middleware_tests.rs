//! Unit tests for the authentication middleware
//!
//! Tests cover:
//! - Token extraction (header, cookie, precedence)
//! - Rejection responses for missing/invalid/expired credentials
//! - Role binding into request extensions

#[cfg(test)]
mod tests {
    use super::super::jwt::SessionTokenIssuer;
    use super::super::middleware::*;
    use axum::{
        body::Body,
        extract::Request,
        http::{header, StatusCode},
        middleware,
        routing::get,
        Extension, Router,
    };
    use tower::ServiceExt;

    const SECRET: &str = "test-session-secret-at-least-32-bytes!!";

    fn auth_state(expiry_minutes: i64) -> AuthState {
        AuthState {
            issuer: SessionTokenIssuer::new(SECRET, expiry_minutes),
        }
    }

    /// Echoes the bound role so tests can observe BIND_ROLE.
    async fn whoami(Extension(user): Extension<AuthUser>) -> String {
        format!("{}:{}", user.email, user.role)
    }

    fn app(state: AuthState) -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .layer(middleware::from_fn_with_state(state, require_auth))
    }

    #[tokio::test]
    async fn bearer_header_is_accepted_and_role_is_bound() {
        let state = auth_state(60);
        let token = state
            .issuer
            .issue("alice@example.com", "Alice", "Doe", "user")
            .unwrap();

        let request = Request::builder()
            .uri("/whoami")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();

        let response = app(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"alice@example.com:user");
    }

    #[tokio::test]
    async fn cookie_fallback_is_accepted() {
        let state = auth_state(60);
        let token = state
            .issuer
            .issue("alice@example.com", "Alice", "Doe", "admin")
            .unwrap();

        let request = Request::builder()
            .uri("/whoami")
            .header(header::COOKIE, format!("other=1; Bearer={token}"))
            .body(Body::empty())
            .unwrap();

        let response = app(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn header_takes_precedence_over_cookie() {
        let state = auth_state(60);
        let good = state
            .issuer
            .issue("alice@example.com", "Alice", "Doe", "user")
            .unwrap();

        // Valid header, garbage cookie: the header must win.
        let request = Request::builder()
            .uri("/whoami")
            .header(header::AUTHORIZATION, format!("Bearer {good}"))
            .header(header::COOKIE, "Bearer=garbage")
            .body(Body::empty())
            .unwrap();

        let response = app(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_credential_is_rejected() {
        let request = Request::builder()
            .uri("/whoami")
            .body(Body::empty())
            .unwrap();

        let response = app(auth_state(60)).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_authorization_header_without_cookie_is_rejected() {
        let request = Request::builder()
            .uri("/whoami")
            .header(header::AUTHORIZATION, "Token abc")
            .body(Body::empty())
            .unwrap();

        let response = app(auth_state(60)).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let issuing = auth_state(-5);
        let token = issuing
            .issuer
            .issue("alice@example.com", "Alice", "Doe", "user")
            .unwrap();

        let request = Request::builder()
            .uri("/whoami")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();

        let response = app(auth_state(60)).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn token_signed_with_other_key_is_rejected() {
        let other = SessionTokenIssuer::new("another-secret-that-is-32-bytes-long!!!!", 60);
        let token = other.issue("alice@example.com", "Alice", "Doe", "user").unwrap();

        let request = Request::builder()
            .uri("/whoami")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();

        let response = app(auth_state(60)).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
