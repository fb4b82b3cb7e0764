use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Order lifecycle. Variant order matters: transitions are only legal strictly
/// forward (pending < confirmed < shipping < delivered).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipping,
    Delivered,
}

impl OrderStatus {
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        next > self
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipping => "shipping",
            OrderStatus::Delivered => "delivered",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only audit entry; status updates push one of these, never rewrite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEntry {
    pub status: OrderStatus,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub at: DateTime<Utc>,
}

/// Customer snapshot captured at checkout, decoupled from later profile edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub email: String,
}

/// An ordered line. The variant name and unit price are stored as-of purchase
/// time; only the product id is a live reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: String,
    pub variant_name: String,
    pub quantity: i64,
    pub unit_price: i64,
}

/// Immutable except for status transitions.
///
/// Invariant: `total == subtotal + shipping_fee + tax - discount_amount -
/// loyalty_discount_amount`, computed once at write time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub customer: CustomerInfo,
    pub items: Vec<OrderItem>,
    pub subtotal: i64,
    pub shipping_fee: i64,
    pub tax: i64,
    pub discount_amount: i64,
    pub loyalty_discount_amount: i64,
    pub total: i64,
    pub loyalty_points_earned: i64,
    pub loyalty_points_used: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_code: Option<String>,
    pub status: OrderStatus,
    pub status_history: Vec<StatusEntry>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_utc: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_are_forward_only() {
        use OrderStatus::*;

        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Delivered));
        assert!(Confirmed.can_transition_to(Shipping));
        assert!(Shipping.can_transition_to(Delivered));

        assert!(!Delivered.can_transition_to(Pending));
        assert!(!Shipping.can_transition_to(Confirmed));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Shipping).unwrap(),
            "\"shipping\""
        );
        assert_eq!(OrderStatus::Delivered.to_string(), "delivered");
    }
}
