use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A purchasable SKU-level option of a product, carrying its own price and
/// stock. Stock is decremented only at order confirmation, by an atomic
/// conditional update against the owning product document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
    pub variant_id: String,
    pub name: String,
    pub sku: String,
    /// Integer currency units.
    pub price: i64,
    /// Never negative.
    pub stock: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub category_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub variants: Vec<Variant>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_utc: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_utc: DateTime<Utc>,
}

impl Product {
    pub fn new(
        name: String,
        category_id: String,
        description: String,
        image: Option<String>,
        variants: Vec<Variant>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            category_id,
            description,
            image,
            variants,
            created_utc: now,
            updated_utc: now,
        }
    }

    pub fn variant(&self, variant_id: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.variant_id == variant_id)
    }
}

impl Variant {
    pub fn new(name: String, sku: String, price: i64, stock: i64, image: Option<String>) -> Self {
        Self {
            variant_id: uuid::Uuid::new_v4().to_string(),
            name,
            sku,
            price,
            stock,
            image,
        }
    }
}
