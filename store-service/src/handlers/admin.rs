use crate::handlers::auth::UserResponse;
use crate::middleware::AdminUser;
use crate::models::{Discount, DiscountKind, OrderStatus, User};
use crate::services::dashboard::Bucketing;
use crate::startup::AppState;
use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, NaiveDate, Utc};
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::FindOptions;
use serde::{Deserialize, Serialize};
use serde_json::json;
use service_core::error::AppError;
use validator::Validate;

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

pub async fn dashboard_simple(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    let totals = state.dashboard.simple().await?;
    Ok(Json(totals))
}

#[derive(Debug, Deserialize)]
pub struct AdvancedParams {
    #[serde(rename = "type")]
    pub bucketing: Bucketing,
    pub start: Option<String>,
    pub end: Option<String>,
}

pub async fn dashboard_advanced(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(params): Query<AdvancedParams>,
) -> Result<impl IntoResponse, AppError> {
    let start = params.start.as_deref().map(parse_date_start).transpose()?;
    let end = params.end.as_deref().map(parse_date_end).transpose()?;

    let buckets = state
        .dashboard
        .advanced(params.bucketing, start, end)
        .await?;
    Ok(Json(buckets))
}

#[derive(Debug, Deserialize)]
pub struct TopProductsParams {
    pub limit: Option<i64>,
}

pub async fn dashboard_top_products(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(params): Query<TopProductsParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(10).clamp(1, 100);
    let top = state.dashboard.top_products(limit).await?;
    Ok(Json(top))
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp.
fn parse_date_start(raw: &str) -> Result<DateTime<Utc>, AppError> {
    parse_date(raw, false)
}

fn parse_date_end(raw: &str) -> Result<DateTime<Utc>, AppError> {
    parse_date(raw, true)
}

fn parse_date(raw: &str, end_of_day: bool) -> Result<DateTime<Utc>, AppError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::validation(format!("invalid date: {}", raw)))?;
    let time = if end_of_day {
        date.and_hms_opt(23, 59, 59).unwrap_or_default()
    } else {
        date.and_hms_opt(0, 0, 0).unwrap_or_default()
    };
    Ok(DateTime::from_naive_utc_and_offset(time, Utc))
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = params.page.unwrap_or(1).max(1);
    let page_size = params.page_size.unwrap_or(20).clamp(1, 100);

    let find_options = FindOptions::builder()
        .sort(doc! { "created_utc": -1 })
        .skip((page - 1) * page_size)
        .limit(page_size as i64)
        .build();

    let cursor = state.db.users().find(doc! {}, find_options).await?;
    let users: Vec<User> = cursor.try_collect().await?;
    let users: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();
    Ok(Json(users))
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct OrderListParams {
    pub status: Option<OrderStatus>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

pub async fn list_orders(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(params): Query<OrderListParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = params.page.unwrap_or(1).max(1);
    let page_size = params.page_size.unwrap_or(20).clamp(1, 100);

    let orders = state
        .orders
        .admin_list(params.status, page_size as i64, (page - 1) * page_size)
        .await?;
    Ok(Json(orders))
}

pub async fn get_order(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(order_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.orders.admin_get(&order_id).await?;
    Ok(Json(order))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

pub async fn update_order_status(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(order_id): Path<String>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.orders.update_status(&order_id, request.status).await?;
    Ok(Json(order))
}

// ---------------------------------------------------------------------------
// Discounts
// ---------------------------------------------------------------------------

pub async fn list_discounts(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    let cursor = state
        .db
        .discounts()
        .find(doc! {}, FindOptions::builder().sort(doc! { "code": 1 }).build())
        .await?;
    let discounts: Vec<Discount> = cursor.try_collect().await?;
    Ok(Json(discounts))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDiscountRequest {
    #[validate(length(min = 3, max = 32))]
    pub code: String,
    pub kind: DiscountKind,
    #[validate(range(min = 1))]
    pub value: i64,
    #[validate(range(min = 1))]
    pub max_usage: i64,
}

pub async fn create_discount(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(request): Json<CreateDiscountRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    if request.kind == DiscountKind::Percent && request.value > 100 {
        return Err(AppError::validation("percent discount cannot exceed 100"));
    }

    let duplicate = state
        .db
        .discounts()
        .find_one(doc! { "code": &request.code }, None)
        .await?
        .is_some();
    if duplicate {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "discount code already exists"
        )));
    }

    let discount = Discount::new(request.code, request.kind, request.value, request.max_usage);
    state.db.discounts().insert_one(&discount, None).await?;
    Ok((StatusCode::CREATED, Json(discount)))
}

pub async fn delete_discount(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(discount_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let result = state
        .db
        .discounts()
        .delete_one(doc! { "_id": &discount_id }, None)
        .await?;
    if result.deleted_count == 0 {
        return Err(AppError::NotFound(anyhow::anyhow!("discount not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Image uploads
// ---------------------------------------------------------------------------

const ALLOWED_IMAGE_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
];

const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Relative path, served under /uploads.
    pub path: String,
}

/// Accept a product/variant image as multipart form data, validated by MIME
/// type and stored under the uploads dir with a generated filename.
pub async fn upload_image(
    State(state): State<AppState>,
    _admin: AdminUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("failed to read multipart field: {}", e)))?
        .ok_or_else(|| AppError::validation("no file uploaded"))?;

    let mime_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();

    let extension = ALLOWED_IMAGE_TYPES
        .iter()
        .find(|(mime, _)| *mime == mime_type)
        .map(|(_, ext)| *ext)
        .ok_or_else(|| {
            AppError::validation_with(
                format!("unsupported image type: {}", mime_type),
                json!({ "allowed": ALLOWED_IMAGE_TYPES.iter().map(|(m, _)| *m).collect::<Vec<_>>() }),
            )
        })?;

    let data = field
        .bytes()
        .await
        .map_err(|e| AppError::validation(format!("failed to read file bytes: {}", e)))?;

    if data.len() > MAX_IMAGE_BYTES {
        return Err(AppError::validation("image too large (max 5MB)"));
    }

    let filename = format!("{}.{}", uuid::Uuid::new_v4(), extension);
    let dir = std::path::Path::new(&state.config.uploads.dir);
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(dir.join(&filename), &data).await?;

    tracing::info!(filename = %filename, size = data.len(), "Image uploaded");
    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            path: format!("/uploads/{}", filename),
        }),
    ))
}
