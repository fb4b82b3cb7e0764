pub mod cart;
pub mod category;
pub mod discount;
pub mod order;
pub mod product;
pub mod user;

pub use cart::{Cart, CartItem};
pub use category::Category;
pub use discount::{Discount, DiscountKind};
pub use order::{CustomerInfo, Order, OrderItem, OrderStatus, StatusEntry};
pub use product::{Product, Variant};
pub use user::{Address, Role, User};

/// Helper module for optional `DateTime<Utc>` fields stored as BSON datetimes.
pub mod opt_chrono_datetime_as_bson_datetime {
    use chrono::{DateTime, Utc};
    use mongodb::bson;
    use serde::{self, Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(dt) => bson::DateTime::from_chrono(*dt).serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt: Option<bson::DateTime> = Option::deserialize(deserializer)?;
        Ok(opt.map(|dt| dt.to_chrono()))
    }
}
