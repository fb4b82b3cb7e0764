use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A line in a cart. The variant id is looked up within the product's variant
/// list at read time; no price is stored here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    pub variant_id: String,
    pub quantity: i64,
}

/// One cart per owner: either a registered user id or an anonymous session id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_utc: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_utc: DateTime<Utc>,
}

impl Cart {
    pub fn for_user(user_id: String) -> Self {
        Self::new(Some(user_id), None)
    }

    pub fn for_session(session_id: String) -> Self {
        Self::new(None, Some(session_id))
    }

    fn new(user_id: Option<String>, session_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            session_id,
            items: Vec::new(),
            created_utc: now,
            updated_utc: now,
        }
    }

    pub fn item(&self, product_id: &str, variant_id: &str) -> Option<&CartItem> {
        self.items
            .iter()
            .find(|i| i.product_id == product_id && i.variant_id == variant_id)
    }
}

/// A cart line joined against live catalog data. Prices are never cached on
/// the cart; they come from the current variant on every read.
#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub product_id: String,
    pub product_name: String,
    pub variant_id: String,
    pub variant_name: String,
    pub unit_price: i64,
    pub quantity: i64,
    pub line_total: i64,
    /// False when the product or variant no longer exists; such lines are
    /// excluded from the totals.
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub cart_id: String,
    pub items: Vec<CartLineView>,
    pub subtotal: i64,
    pub tax: i64,
    pub shipping_fee: i64,
    pub total: i64,
}
