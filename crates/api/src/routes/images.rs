//! Image catalog routes: upload, browse, search, categories

use axum::{
    extract::{Multipart, Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::FromRow;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{
    auth::{authorize, AuthUser, ROLE_ADMIN},
    error::{ApiError, ApiResult},
    state::AppState,
};

const DEFAULT_PAGE_SIZE: i64 = 6;
const MAX_PAGE_SIZE: i64 = 100;

/// Browse and search links are short-lived; the full-catalog listing gets a
/// longer window since clients page through it slowly.
const LINK_TTL_BROWSE: Duration = Duration::minutes(10);
const LINK_TTL_CATALOG: Duration = Duration::hours(1);

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub name: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, FromRow)]
struct ImageRow {
    id: Uuid,
    category: String,
    file_name: String,
    object_key: String,
    uploaded_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct ImageResponse {
    pub id: Uuid,
    pub category: String,
    pub file_name: String,
    pub url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub uploaded_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct ImagePage {
    pub images: Vec<ImageResponse>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub category: String,
}

#[derive(Debug, FromRow, Serialize)]
pub struct CategoryRow {
    pub id: Uuid,
    pub name: String,
}

// =============================================================================
// Pagination helpers
// =============================================================================

fn page_params(page: Option<i64>, limit: Option<i64>) -> (i64, i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    // Client-supplied page numbers can be absurd; saturate instead of
    // overflowing. A saturated offset is past any real catalog and simply
    // selects nothing.
    let offset = page.saturating_sub(1).saturating_mul(limit);
    (page, limit, offset)
}

fn total_pages(total: i64, limit: i64) -> i64 {
    (total + limit - 1) / limit
}

/// Collapses whitespace in the query into a separator class so
/// "summer beach" also matches "summer_beach" and "summer-beach".
/// Everything else is escaped so user input cannot smuggle regex syntax.
fn build_search_pattern(name: &str) -> String {
    name.split_whitespace()
        .map(escape_regex)
        .collect::<Vec<_>>()
        .join("[-_ ]*")
}

fn escape_regex(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    for c in word.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else {
            out.push('\\');
            out.push(c);
        }
    }
    out
}

fn render_page(
    state: &AppState,
    rows: Vec<ImageRow>,
    page: i64,
    limit: i64,
    total: i64,
    link_ttl: Duration,
) -> Json<ImagePage> {
    let images = rows
        .into_iter()
        .map(|row| {
            let url = state.objects.presign_get(&row.object_key, link_ttl);
            ImageResponse {
                id: row.id,
                category: row.category,
                file_name: row.file_name,
                url,
                uploaded_at: row.uploaded_at,
            }
        })
        .collect();
    Json(ImagePage {
        images,
        page,
        limit,
        total,
        total_pages: total_pages(total, limit),
    })
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /upload/{category} - admin only
pub async fn upload_image(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(category): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<Json<serde_json::Value>> {
    authorize(&auth_user.role, &[ROLE_ADMIN])?;

    let category = category.trim().to_string();
    if category.is_empty() {
        return Err(ApiError::Validation("Category is required".into()));
    }

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!(error = %e, "Malformed multipart body");
        ApiError::Validation("Malformed multipart body".into())
    })? {
        if field.name() != Some("image") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ApiError::Validation("Image file name is required".into()))?;
        let data = field.bytes().await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to read upload body");
            ApiError::Validation("Failed to read upload body".into())
        })?;
        upload = Some((file_name, data.to_vec()));
        break;
    }

    let (file_name, data) =
        upload.ok_or_else(|| ApiError::Validation("Missing 'image' form field".into()))?;
    if data.is_empty() {
        return Err(ApiError::Validation("Uploaded file is empty".into()));
    }

    let object_key = format!("{category}/{file_name}");
    let object_url = state.objects.put(&object_key, &data).await.map_err(|e| {
        tracing::error!(object_key = %object_key, error = %e, "Object store write failed");
        ApiError::Internal
    })?;

    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO images (category, file_name, object_key, object_url)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(&category)
    .bind(&file_name)
    .bind(&object_key)
    .bind(&object_url)
    .fetch_one(&state.pool)
    .await?;

    tracing::info!(image_id = %id, category = %category, uploaded_by = %auth_user.email, "Image uploaded");
    Ok(Json(json!({ "id": id, "category": category, "file_name": file_name })))
}

/// GET /images
pub async fn list_images(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<ImagePage>> {
    let (page, limit, offset) = page_params(query.page, query.limit);

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM images")
        .fetch_one(&state.pool)
        .await?;

    let rows: Vec<ImageRow> = sqlx::query_as(
        r#"
        SELECT id, category, file_name, object_key, uploaded_at
        FROM images
        ORDER BY uploaded_at DESC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    Ok(render_page(&state, rows, page, limit, total, LINK_TTL_CATALOG))
}

/// GET /images/{category}
pub async fn images_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<ImagePage>> {
    let (page, limit, offset) = page_params(query.page, query.limit);

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM images WHERE category = $1")
        .bind(&category)
        .fetch_one(&state.pool)
        .await?;

    let rows: Vec<ImageRow> = sqlx::query_as(
        r#"
        SELECT id, category, file_name, object_key, uploaded_at
        FROM images
        WHERE category = $1
        ORDER BY uploaded_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(&category)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    Ok(render_page(&state, rows, page, limit, total, LINK_TTL_BROWSE))
}

/// GET /images/search?name=...
pub async fn search_images(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<ImagePage>> {
    let name = query
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::Validation("Search term 'name' is required".into()))?;

    let (page, limit, offset) = page_params(query.page, query.limit);
    let pattern = build_search_pattern(name);

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM images WHERE file_name ~* $1")
        .bind(&pattern)
        .fetch_one(&state.pool)
        .await?;

    let rows: Vec<ImageRow> = sqlx::query_as(
        r#"
        SELECT id, category, file_name, object_key, uploaded_at
        FROM images
        WHERE file_name ~* $1
        ORDER BY uploaded_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(&pattern)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    Ok(render_page(&state, rows, page, limit, total, LINK_TTL_BROWSE))
}

/// GET /category
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    let categories: Vec<CategoryRow> = sqlx::query_as("SELECT id, name FROM categories ORDER BY name")
        .fetch_all(&state.pool)
        .await?;

    Ok(Json(json!({
        "total": categories.len(),
        "categories": categories,
    })))
}

/// POST /category - admin only
pub async fn create_category(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(req): Json<CreateCategoryRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    authorize(&auth_user.role, &[ROLE_ADMIN])?;

    let name = req.category.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::Validation("Category name is required".into()));
    }

    let inserted = sqlx::query("INSERT INTO categories (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
        .bind(&name)
        .execute(&state.pool)
        .await?;
    if inserted.rows_affected() == 0 {
        return Err(ApiError::Validation("Category already exists".into()));
    }

    tracing::info!(category = %name, created_by = %auth_user.email, "Category created");
    Ok(Json(json!({ "status": true, "category": name })))
}
