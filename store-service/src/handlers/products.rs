use crate::middleware::AdminUser;
use crate::models::{Product, Variant};
use crate::startup::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use futures::TryStreamExt;
use mongodb::bson::{DateTime as BsonDateTime, doc};
use mongodb::options::FindOptions;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use validator::Validate;

#[derive(Debug, Deserialize)]
pub struct ProductListParams {
    pub category: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    pub products: Vec<Product>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ProductListParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = params.page.unwrap_or(1).max(1);
    let page_size = params.page_size.unwrap_or(20).clamp(1, 100);

    let mut filter = doc! {};
    if let Some(category) = params.category {
        filter.insert("category_id", category);
    }

    let total = state
        .db
        .products()
        .count_documents(filter.clone(), None)
        .await?;

    let find_options = FindOptions::builder()
        .sort(doc! { "created_utc": -1 })
        .skip((page - 1) * page_size)
        .limit(page_size as i64)
        .build();

    let cursor = state.db.products().find(filter, find_options).await?;
    let products: Vec<Product> = cursor.try_collect().await?;

    Ok(Json(ProductListResponse {
        products,
        total,
        page,
        page_size,
    }))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let product = state
        .db
        .products()
        .find_one(doc! { "_id": &product_id }, None)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("product not found")))?;
    Ok(Json(product))
}

#[derive(Debug, Deserialize, serde::Serialize, Validate)]
pub struct VariantInput {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub sku: String,
    #[validate(range(min = 0))]
    pub price: i64,
    #[validate(range(min = 0))]
    pub stock: i64,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub category_id: String,
    #[serde(default)]
    pub description: String,
    pub image: Option<String>,
    #[validate(length(min = 1))]
    #[validate(nested)]
    pub variants: Vec<VariantInput>,
}

pub async fn create_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(request): Json<CreateProductRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    let category_exists = state
        .db
        .categories()
        .find_one(doc! { "_id": &request.category_id }, None)
        .await?
        .is_some();
    if !category_exists {
        return Err(AppError::validation("category does not exist"));
    }

    let variants = request
        .variants
        .into_iter()
        .map(|v| Variant::new(v.name, v.sku, v.price, v.stock, v.image))
        .collect();

    let product = Product::new(
        request.name,
        request.category_id,
        request.description,
        request.image,
        variants,
    );
    state.db.products().insert_one(&product, None).await?;

    tracing::info!(product_id = %product.id, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub category_id: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    /// Full replacement of the variant list when present.
    #[validate(nested)]
    pub variants: Option<Vec<VariantInput>>,
}

pub async fn update_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(product_id): Path<String>,
    Json(request): Json<UpdateProductRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    let mut set = doc! { "updated_utc": BsonDateTime::now() };
    if let Some(name) = request.name {
        set.insert("name", name);
    }
    if let Some(category_id) = request.category_id {
        let exists = state
            .db
            .categories()
            .find_one(doc! { "_id": &category_id }, None)
            .await?
            .is_some();
        if !exists {
            return Err(AppError::validation("category does not exist"));
        }
        set.insert("category_id", category_id);
    }
    if let Some(description) = request.description {
        set.insert("description", description);
    }
    if let Some(image) = request.image {
        set.insert("image", image);
    }
    if let Some(variants) = request.variants {
        let variants: Vec<Variant> = variants
            .into_iter()
            .map(|v| Variant::new(v.name, v.sku, v.price, v.stock, v.image))
            .collect();
        set.insert("variants", mongodb::bson::to_bson(&variants)?);
    }

    let result = state
        .db
        .products()
        .update_one(doc! { "_id": &product_id }, doc! { "$set": set }, None)
        .await?;
    if result.matched_count == 0 {
        return Err(AppError::NotFound(anyhow::anyhow!("product not found")));
    }

    let product = state
        .db
        .products()
        .find_one(doc! { "_id": &product_id }, None)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("product not found")))?;
    Ok(Json(product))
}

pub async fn delete_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(product_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let result = state
        .db
        .products()
        .delete_one(doc! { "_id": &product_id }, None)
        .await?;
    if result.deleted_count == 0 {
        return Err(AppError::NotFound(anyhow::anyhow!("product not found")));
    }
    tracing::info!(product_id = %product_id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}
