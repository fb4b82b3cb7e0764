use crate::middleware::AdminUser;
use crate::models::Category;
use crate::startup::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use futures::TryStreamExt;
use mongodb::bson::doc;
use serde::Deserialize;
use serde_json::json;
use service_core::error::AppError;
use validator::Validate;

pub async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let cursor = state
        .db
        .categories()
        .find(doc! {}, mongodb::options::FindOptions::builder().sort(doc! { "name": 1 }).build())
        .await?;
    let categories: Vec<Category> = cursor.try_collect().await?;
    Ok(Json(categories))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

pub async fn create_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(request): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    let duplicate = state
        .db
        .categories()
        .find_one(doc! { "name": &request.name }, None)
        .await?
        .is_some();
    if duplicate {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "category name already exists"
        )));
    }

    let category = Category::new(request.name, request.description);
    state.db.categories().insert_one(&category, None).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

pub async fn update_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(category_id): Path<String>,
    Json(request): Json<UpdateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    let mut set = doc! {};
    if let Some(name) = request.name {
        set.insert("name", name);
    }
    if let Some(description) = request.description {
        set.insert("description", description);
    }
    if set.is_empty() {
        return Err(AppError::validation("nothing to update"));
    }

    let result = state
        .db
        .categories()
        .update_one(doc! { "_id": &category_id }, doc! { "$set": set }, None)
        .await?;
    if result.matched_count == 0 {
        return Err(AppError::NotFound(anyhow::anyhow!("category not found")));
    }

    let category = state
        .db
        .categories()
        .find_one(doc! { "_id": &category_id }, None)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("category not found")))?;
    Ok(Json(category))
}

/// Deleting a category is blocked while products reference it. The check is an
/// explicit count here at the call site, and the failure reports how many
/// products are in the way.
pub async fn delete_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(category_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let product_count = state
        .db
        .products()
        .count_documents(doc! { "category_id": &category_id }, None)
        .await?;

    if product_count > 0 {
        return Err(AppError::validation_with(
            format!(
                "category is referenced by {} product(s) and cannot be deleted",
                product_count
            ),
            json!({ "productCount": product_count }),
        ));
    }

    let result = state
        .db
        .categories()
        .delete_one(doc! { "_id": &category_id }, None)
        .await?;
    if result.deleted_count == 0 {
        return Err(AppError::NotFound(anyhow::anyhow!("category not found")));
    }

    tracing::info!(category_id = %category_id, "Category deleted");
    Ok(StatusCode::NO_CONTENT)
}
