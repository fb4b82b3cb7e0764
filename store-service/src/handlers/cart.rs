use crate::middleware::Shopper;
use crate::startup::AppState;
use axum::{Json, extract::State, response::IntoResponse};
use serde::Deserialize;
use service_core::error::AppError;
use validator::Validate;

/// Cart with its summary, recomputed from live variant prices on every read.
pub async fn get_cart(
    State(state): State<AppState>,
    Shopper(owner): Shopper,
) -> Result<impl IntoResponse, AppError> {
    let view = state.carts.summary(&owner).await?;
    Ok(Json(view))
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddItemRequest {
    #[validate(length(min = 1))]
    pub product_id: String,
    #[validate(length(min = 1))]
    pub variant_id: String,
    #[validate(range(min = 1))]
    pub quantity: i64,
}

pub async fn add_item(
    State(state): State<AppState>,
    Shopper(owner): Shopper,
    Json(request): Json<AddItemRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;
    state
        .carts
        .add_item(&owner, &request.product_id, &request.variant_id, request.quantity)
        .await?;
    let view = state.carts.summary(&owner).await?;
    Ok(Json(view))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateItemRequest {
    #[validate(length(min = 1))]
    pub product_id: String,
    #[validate(length(min = 1))]
    pub variant_id: String,
    #[validate(range(min = 1))]
    pub quantity: i64,
}

pub async fn update_item(
    State(state): State<AppState>,
    Shopper(owner): Shopper,
    Json(request): Json<UpdateItemRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;
    state
        .carts
        .update_item(&owner, &request.product_id, &request.variant_id, request.quantity)
        .await?;
    let view = state.carts.summary(&owner).await?;
    Ok(Json(view))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RemoveItemRequest {
    #[validate(length(min = 1))]
    pub product_id: String,
    #[validate(length(min = 1))]
    pub variant_id: String,
}

pub async fn remove_item(
    State(state): State<AppState>,
    Shopper(owner): Shopper,
    Json(request): Json<RemoveItemRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;
    state
        .carts
        .remove_item(&owner, &request.product_id, &request.variant_id)
        .await?;
    let view = state.carts.summary(&owner).await?;
    Ok(Json(view))
}

pub async fn clear_cart(
    State(state): State<AppState>,
    Shopper(owner): Shopper,
) -> Result<impl IntoResponse, AppError> {
    state.carts.clear(&owner).await?;
    let view = state.carts.summary(&owner).await?;
    Ok(Json(view))
}
