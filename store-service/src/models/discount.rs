use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountKind {
    Percent,
    Fixed,
}

impl std::fmt::Display for DiscountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscountKind::Percent => write!(f, "percent"),
            DiscountKind::Fixed => write!(f, "fixed"),
        }
    }
}

/// Limited-use discount code. `used_count` never exceeds `max_usage`; the
/// increment is a conditional update guarded by `used_count < max_usage`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discount {
    #[serde(rename = "_id")]
    pub id: String,
    pub code: String,
    pub kind: DiscountKind,
    pub value: i64,
    pub max_usage: i64,
    #[serde(default)]
    pub used_count: i64,
}

impl Discount {
    pub fn new(code: String, kind: DiscountKind, value: i64, max_usage: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            code,
            kind,
            value,
            max_usage,
            used_count: 0,
        }
    }
}
