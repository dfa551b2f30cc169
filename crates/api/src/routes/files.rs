//! Presigned download link redemption

use axum::{
    extract::{Path, Query, State},
    http::header::CONTENT_TYPE,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::{
    error::{ApiError, ApiResult},
    objects::ObjectStoreError,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub expires: i64,
    pub sig: String,
}

/// GET /files/{*key}?expires=...&sig=...
///
/// No session required; the signature in the query string is the credential.
pub async fn download(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<DownloadQuery>,
) -> ApiResult<impl IntoResponse> {
    state
        .objects
        .verify(&key, query.expires, &query.sig)
        .map_err(|e| match e {
            ObjectStoreError::BadSignature => ApiError::Forbidden,
            other => {
                tracing::warn!(key = %key, error = %other, "Download link rejected");
                ApiError::Forbidden
            }
        })?;

    let bytes = state.objects.get(&key).await.map_err(|e| match e {
        ObjectStoreError::NotFound => ApiError::NotFound,
        other => {
            tracing::error!(key = %key, error = %other, "Object read failed");
            ApiError::Internal
        }
    })?;

    Ok(([(CONTENT_TYPE, content_type_for(&key))], bytes))
}

fn content_type_for(key: &str) -> &'static str {
    let ext = key.rsplit('.').next().unwrap_or_default();
    match ext.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}
