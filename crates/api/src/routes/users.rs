//! Account routes: registration, login/logout, password reset and update

use axum::{
    extract::{Path, State},
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    auth::{self, PasswordError, ResetError, TOKEN_COOKIE},
    error::{ApiError, ApiResult},
    state::AppState,
};

const PASSWORD_MIN: usize = 6;
const PASSWORD_MAX: usize = 16;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub status: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgetPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, FromRow)]
struct CredentialRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    password_hash: String,
    role: String,
}

// =============================================================================
// Validation helpers
// =============================================================================

fn validate_email(email: &str) -> ApiResult<()> {
    let trimmed = email.trim();
    if trimmed.is_empty() || !trimmed.contains('@') || trimmed.contains(char::is_whitespace) {
        return Err(ApiError::Validation("Invalid email address".into()));
    }
    Ok(())
}

fn validate_password(password: &str) -> ApiResult<()> {
    if password.len() < PASSWORD_MIN || password.len() > PASSWORD_MAX {
        return Err(ApiError::Validation(format!(
            "Password must be between {PASSWORD_MIN} and {PASSWORD_MAX} characters"
        )));
    }
    Ok(())
}

fn hash_or_500(password: &str) -> ApiResult<String> {
    auth::hash_password(password).map_err(|e| {
        tracing::error!(error = %e, "Password hashing failed");
        ApiError::Internal
    })
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /registration
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<RegisterResponse>> {
    validate_email(&req.email)?;
    validate_password(&req.password)?;
    if req.first_name.trim().is_empty() || req.last_name.trim().is_empty() {
        return Err(ApiError::Validation("First and last name are required".into()));
    }

    let email = req.email.trim().to_lowercase();

    let exists: (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
        .bind(&email)
        .fetch_one(&state.pool)
        .await?;
    if exists.0 {
        return Err(ApiError::Validation("User already exists".into()));
    }

    let password_hash = hash_or_500(&req.password)?;

    // Every self-registered account starts as a plain user.
    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO users (first_name, last_name, email, password_hash, role)
        VALUES ($1, $2, $3, $4, 'user')
        RETURNING id
        "#,
    )
    .bind(req.first_name.trim())
    .bind(req.last_name.trim())
    .bind(&email)
    .bind(&password_hash)
    .fetch_one(&state.pool)
    .await?;

    tracing::info!(user_id = %id, "User registered");
    Ok(Json(RegisterResponse { id }))
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation("Email and password are required".into()));
    }

    let email = req.email.trim().to_lowercase();

    // Unknown email and wrong password take the same path out so the
    // response does not reveal which check failed.
    let user: CredentialRow = sqlx::query_as(
        "SELECT id, first_name, last_name, email, password_hash, role FROM users WHERE email = $1",
    )
    .bind(&email)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(ApiError::Unauthorized)?;

    auth::verify_password(&req.password, &user.password_hash).map_err(|e| {
        if !matches!(e, PasswordError::Mismatch) {
            tracing::error!(user_id = %user.id, error = %e, "Stored password digest is unusable");
        }
        ApiError::Unauthorized
    })?;

    let token = state
        .session_issuer
        .issue(&user.email, &user.first_name, &user.last_name, &user.role)
        .map_err(|e| {
            tracing::error!(error = %e, "Session token issuance failed");
            ApiError::Internal
        })?;

    let max_age = state.config.session_expiry_minutes * 60;
    let cookie =
        format!("{TOKEN_COOKIE}={token}; Path=/; Max-Age={max_age}; HttpOnly; SameSite=Lax");

    tracing::info!(user_id = %user.id, "Login successful");
    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(LoginResponse {
            status: "Login successful".to_string(),
            token,
        }),
    ))
}

/// POST /logout
pub async fn logout() -> impl IntoResponse {
    let cookie = format!("{TOKEN_COOKIE}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax");
    (
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(json!({ "status": "Logout successful" })),
    )
}

/// POST /forgetpassword
///
/// Issues a reset ticket and mails the plaintext token. The token appears in
/// the mail body only; the store keeps its digest.
pub async fn forget_password(
    State(state): State<AppState>,
    Json(req): Json<ForgetPasswordRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    validate_email(&req.email)?;
    let email = req.email.trim().to_lowercase();

    let token = state.reset_tokens.issue(&email).await.map_err(|e| match e {
        ResetError::UnknownIdentity => ApiError::Validation("User not found".into()),
        other => {
            tracing::error!(error = %other, "Reset ticket issue failed");
            ApiError::Internal
        }
    })?;

    let reset_url = format!(
        "{}/users/resetpassword/reset/{}",
        state.config.public_base_url, token
    );
    let body = format!(
        "Forgot your password? Reset it using the following link:\n{reset_url}\n\
         If you didn't request a password reset, ignore this message."
    );

    match state.mail.send(&email, "Password Reset Request", &body).await {
        Ok(()) => {}
        Err(crate::email::MailError::NotConfigured) => {
            tracing::warn!("Mail transport not configured; reset link not delivered");
        }
        Err(e) => {
            tracing::error!(error = %e, "Reset mail delivery failed");
            return Err(ApiError::Internal);
        }
    }

    Ok(Json(json!({ "message": "Mail has been sent" })))
}

/// POST /users/resetpassword/reset/{resetcode}
pub async fn reset_password(
    State(state): State<AppState>,
    Path(resetcode): Path<String>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    validate_password(&req.new_password)?;
    validate_password(&req.confirm_password)?;
    if req.new_password != req.confirm_password {
        return Err(ApiError::Validation("Passwords do not match".into()));
    }

    let password_hash = hash_or_500(&req.new_password)?;

    state
        .reset_tokens
        .consume(&resetcode, &password_hash)
        .await
        .map_err(|e| match e {
            ResetError::InvalidOrExpiredToken => {
                ApiError::Validation("Invalid or expired reset token".into())
            }
            other => {
                tracing::error!(error = %other, "Reset ticket consume failed");
                ApiError::Internal
            }
        })?;

    Ok(Json(json!({ "message": "Password updated successfully" })))
}

/// POST /users/{user_id}
pub async fn update_password(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UpdatePasswordRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    if req.current_password.is_empty() {
        return Err(ApiError::Validation("Current password is required".into()));
    }
    validate_password(&req.new_password)?;

    let user: CredentialRow = sqlx::query_as(
        "SELECT id, first_name, last_name, email, password_hash, role FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(ApiError::NotFound)?;

    auth::verify_password(&req.current_password, &user.password_hash)
        .map_err(|_| ApiError::Unauthorized)?;

    let password_hash = hash_or_500(&req.new_password)?;

    sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
        .bind(user_id)
        .bind(&password_hash)
        .execute(&state.pool)
        .await?;

    tracing::info!(user_id = %user_id, "Password updated");
    Ok(Json(json!({ "message": "Password updated successfully" })))
}
