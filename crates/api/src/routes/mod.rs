//! HTTP routes for the imagestore API

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::{auth::require_auth, state::AppState};

pub mod files;
pub mod images;
pub mod users;

const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Builds the full application router.
///
/// Catalog routes sit behind the session gate; account and download-link
/// routes are public. The per-client rate limit, when configured, wraps
/// everything.
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/upload/{category}",
            post(images::upload_image).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/images", get(images::list_images))
        .route("/images/search", get(images::search_images))
        .route("/images/{category}", get(images::images_by_category))
        .route(
            "/category",
            get(images::list_categories).post(images::create_category),
        )
        .layer(middleware::from_fn_with_state(
            state.auth_state(),
            require_auth,
        ));

    let public = Router::new()
        .route("/registration", post(users::register))
        .route("/login", post(users::login))
        .route("/logout", post(users::logout))
        .route("/forgetpassword", post(users::forget_password))
        .route(
            "/users/resetpassword/reset/{resetcode}",
            post(users::reset_password),
        )
        .route("/users/{user_id}", post(users::update_password))
        .route("/files/{*key}", get(files::download))
        .route("/health", get(health_check));

    let mut router = public.merge(protected);
    if state.rate_limiter.is_some() {
        router = router.layer(middleware::from_fn_with_state(state.clone(), rate_limit));
    }
    router.with_state(state)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Fixed-window per-client throttle. The client key is the forwarded IP
/// when a proxy supplies one, otherwise a single shared bucket.
async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(limiter) = &state.rate_limiter {
        let client = extract_client_ip(request.headers()).unwrap_or_else(|| "unknown".to_string());
        if !limiter.check(&client).await {
            tracing::warn!(client = %client, "Rate limit exceeded");
            return (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({
                    "error": "Too many requests",
                    "code": StatusCode::TOO_MANY_REQUESTS.as_u16(),
                })),
            )
                .into_response();
        }
    }
    next.run(request).await
}

fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(value) = forwarded.to_str() {
            if let Some(first) = value.split(',').next() {
                let candidate = first.trim();
                if !candidate.is_empty() {
                    return Some(candidate.to_string());
                }
            }
        }
    }
    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
