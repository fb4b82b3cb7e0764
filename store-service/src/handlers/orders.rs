use crate::middleware::Shopper;
use crate::models::CustomerInfo;
use crate::services::order::{CreateOrder, SelectedLine};
use crate::startup::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use service_core::error::AppError;
use validator::Validate;

#[derive(Debug, Deserialize, serde::Serialize, Validate)]
pub struct SelectedItemInput {
    #[validate(length(min = 1))]
    pub product_id: String,
    #[validate(length(min = 1))]
    pub variant_id: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ShippingInput {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub phone: String,
    #[validate(length(min = 1))]
    pub address: String,
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1))]
    #[validate(nested)]
    pub items: Vec<SelectedItemInput>,
    #[validate(nested)]
    pub shipping: ShippingInput,
    pub discount_code: Option<String>,
    #[validate(range(min = 0))]
    pub loyalty_points: Option<i64>,
}

pub async fn create_order(
    State(state): State<AppState>,
    Shopper(owner): Shopper,
    Json(request): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    let order = state
        .orders
        .create_order(
            &owner,
            CreateOrder {
                items: request
                    .items
                    .into_iter()
                    .map(|i| SelectedLine {
                        product_id: i.product_id,
                        variant_id: i.variant_id,
                    })
                    .collect(),
                customer: CustomerInfo {
                    name: request.shipping.name,
                    phone: request.shipping.phone,
                    address: request.shipping.address,
                    email: request.shipping.email,
                },
                discount_code: request.discount_code,
                loyalty_points: request.loyalty_points,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list_orders(
    State(state): State<AppState>,
    Shopper(owner): Shopper,
) -> Result<impl IntoResponse, AppError> {
    let orders = state.orders.list_for_owner(&owner).await?;
    Ok(Json(orders))
}

pub async fn get_order(
    State(state): State<AppState>,
    Shopper(owner): Shopper,
    Path(order_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.orders.get_for_owner(&owner, &order_id).await?;
    Ok(Json(order))
}
