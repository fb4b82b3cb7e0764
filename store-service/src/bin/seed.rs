//! Seed the store database from the JSON fixtures bundled with the crate.
//!
//! Drops the catalog, user and discount collections and reloads them, so it
//! is only meant for local development and demos.

use serde::Deserialize;
use service_core::error::AppError;
use service_core::observability::init_tracing;
use std::collections::HashMap;
use store_service::config::StoreConfig;
use store_service::models::{Category, Discount, DiscountKind, Product, Role, User, Variant};
use store_service::services::StoreDb;
use store_service::utils::password::hash_password;

#[derive(Debug, Deserialize)]
struct UserFixture {
    name: String,
    email: String,
    password: String,
    role: Role,
}

#[derive(Debug, Deserialize)]
struct CategoryFixture {
    name: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct VariantFixture {
    name: String,
    sku: String,
    price: i64,
    stock: i64,
    image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProductFixture {
    name: String,
    category: String,
    description: String,
    image: Option<String>,
    variants: Vec<VariantFixture>,
}

#[derive(Debug, Deserialize)]
struct DiscountFixture {
    code: String,
    kind: DiscountKind,
    value: i64,
    max_usage: i64,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    init_tracing("seed", "info");

    let config = StoreConfig::load()?;
    let db = StoreDb::connect(&config.mongodb.uri, &config.mongodb.database).await?;
    db.initialize_indexes().await?;

    seed_users(&db).await?;
    let category_ids = seed_categories(&db).await?;
    seed_products(&db, &category_ids).await?;
    seed_discounts(&db).await?;

    tracing::info!("Seed complete");
    Ok(())
}

async fn seed_users(db: &StoreDb) -> Result<(), AppError> {
    let fixtures: Vec<UserFixture> = serde_json::from_str(include_str!("../../fixtures/users.json"))?;

    db.users().drop(None).await?;
    let users: Vec<User> = fixtures
        .into_iter()
        .map(|f| {
            let hash = hash_password(&f.password)?;
            Ok(User::new(f.name, f.email, hash, f.role))
        })
        .collect::<Result<_, AppError>>()?;
    db.users().insert_many(&users, None).await?;

    tracing::info!(count = users.len(), "Seeded users");
    Ok(())
}

async fn seed_categories(db: &StoreDb) -> Result<HashMap<String, String>, AppError> {
    let fixtures: Vec<CategoryFixture> =
        serde_json::from_str(include_str!("../../fixtures/categories.json"))?;

    db.categories().drop(None).await?;
    let categories: Vec<Category> = fixtures
        .into_iter()
        .map(|f| Category::new(f.name, f.description))
        .collect();
    db.categories().insert_many(&categories, None).await?;

    tracing::info!(count = categories.len(), "Seeded categories");
    Ok(categories
        .into_iter()
        .map(|c| (c.name, c.id))
        .collect())
}

async fn seed_products(
    db: &StoreDb,
    category_ids: &HashMap<String, String>,
) -> Result<(), AppError> {
    let fixtures: Vec<ProductFixture> =
        serde_json::from_str(include_str!("../../fixtures/products.json"))?;

    db.products().drop(None).await?;
    let products: Vec<Product> = fixtures
        .into_iter()
        .map(|f| {
            let category_id = category_ids.get(&f.category).cloned().ok_or_else(|| {
                AppError::Config(anyhow::anyhow!("unknown category in fixture: {}", f.category))
            })?;
            let variants = f
                .variants
                .into_iter()
                .map(|v| Variant::new(v.name, v.sku, v.price, v.stock, v.image))
                .collect();
            Ok(Product::new(
                f.name,
                category_id,
                f.description,
                f.image,
                variants,
            ))
        })
        .collect::<Result<_, AppError>>()?;
    db.products().insert_many(&products, None).await?;

    tracing::info!(count = products.len(), "Seeded products");
    Ok(())
}

async fn seed_discounts(db: &StoreDb) -> Result<(), AppError> {
    let fixtures: Vec<DiscountFixture> =
        serde_json::from_str(include_str!("../../fixtures/discounts.json"))?;

    db.discounts().drop(None).await?;
    let discounts: Vec<Discount> = fixtures
        .into_iter()
        .map(|f| Discount::new(f.code, f.kind, f.value, f.max_usage))
        .collect();
    db.discounts().insert_many(&discounts, None).await?;

    tracing::info!(count = discounts.len(), "Seeded discounts");
    Ok(())
}
