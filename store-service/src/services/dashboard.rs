use crate::services::database::StoreDb;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{Bson, DateTime as BsonDateTime, Document, doc};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;

/// Time bucketing for the advanced dashboard query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucketing {
    Year,
    Quarter,
    Month,
    Week,
    Range,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SalesTotals {
    pub total_revenue: i64,
    pub total_orders: i64,
    pub total_units: i64,
    /// Fixed 30%-of-revenue estimate.
    pub profit: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RevenueBucket {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quarter: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week: Option<i64>,
    pub total_revenue: i64,
    pub total_orders: i64,
    pub total_units: i64,
    pub profit: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopProduct {
    pub product_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub total_quantity: i64,
}

const PROFIT_RATE: f64 = 0.3;

/// Read-only analytical queries over the orders collection. All revenue
/// numbers count delivered orders only.
#[derive(Clone)]
pub struct DashboardService {
    db: StoreDb,
}

impl DashboardService {
    pub fn new(db: StoreDb) -> Self {
        Self { db }
    }

    pub async fn simple(&self) -> Result<SalesTotals, AppError> {
        let pipeline = vec![
            doc! { "$match": { "status": "delivered" } },
            doc! { "$group": {
                "_id": null,
                "total_revenue": { "$sum": "$total" },
                "total_orders": { "$sum": 1 },
                "total_units": { "$sum": { "$sum": "$items.quantity" } },
            }},
        ];

        let rows = self.run(pipeline).await?;
        let totals = match rows.first() {
            Some(row) => {
                let revenue = get_int(row, "total_revenue");
                SalesTotals {
                    total_revenue: revenue,
                    total_orders: get_int(row, "total_orders"),
                    total_units: get_int(row, "total_units"),
                    profit: revenue as f64 * PROFIT_RATE,
                }
            }
            None => SalesTotals {
                total_revenue: 0,
                total_orders: 0,
                total_units: 0,
                profit: 0.0,
            },
        };
        Ok(totals)
    }

    /// Revenue/orders/units grouped by the requested time bucket. `range`
    /// produces a single bucket over `[start, end]`.
    pub async fn advanced(
        &self,
        bucketing: Bucketing,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<RevenueBucket>, AppError> {
        let mut match_stage = doc! { "status": "delivered" };
        if bucketing == Bucketing::Range {
            let start = start
                .ok_or_else(|| AppError::validation("range queries require a start date"))?;
            let end =
                end.ok_or_else(|| AppError::validation("range queries require an end date"))?;
            if end < start {
                return Err(AppError::validation("end date is before start date"));
            }
            match_stage.insert(
                "created_utc",
                doc! {
                    "$gte": BsonDateTime::from_chrono(start),
                    "$lte": BsonDateTime::from_chrono(end),
                },
            );
        }

        let group_key: Bson = match bucketing {
            Bucketing::Year => doc! { "year": { "$year": "$created_utc" } }.into(),
            Bucketing::Quarter => doc! {
                "year": { "$year": "$created_utc" },
                "quarter": { "$toInt": { "$ceil": { "$divide": [ { "$month": "$created_utc" }, 3 ] } } },
            }
            .into(),
            Bucketing::Month => doc! {
                "year": { "$year": "$created_utc" },
                "month": { "$month": "$created_utc" },
            }
            .into(),
            Bucketing::Week => doc! {
                "year": { "$isoWeekYear": "$created_utc" },
                "week": { "$isoWeek": "$created_utc" },
            }
            .into(),
            Bucketing::Range => Bson::Null,
        };

        let pipeline = vec![
            doc! { "$match": match_stage },
            doc! { "$group": {
                "_id": group_key,
                "total_revenue": { "$sum": "$total" },
                "total_orders": { "$sum": 1 },
                "total_units": { "$sum": { "$sum": "$items.quantity" } },
            }},
            doc! { "$sort": { "_id": 1 } },
        ];

        let rows = self.run(pipeline).await?;
        let buckets = rows
            .iter()
            .map(|row| {
                let key = row.get_document("_id").ok();
                let revenue = get_int(row, "total_revenue");
                RevenueBucket {
                    year: key.and_then(|k| opt_int(k, "year")),
                    quarter: key.and_then(|k| opt_int(k, "quarter")),
                    month: key.and_then(|k| opt_int(k, "month")),
                    week: key.and_then(|k| opt_int(k, "week")),
                    total_revenue: revenue,
                    total_orders: get_int(row, "total_orders"),
                    total_units: get_int(row, "total_units"),
                    profit: revenue as f64 * PROFIT_RATE,
                }
            })
            .collect();
        Ok(buckets)
    }

    /// Best sellers by summed quantity across all orders, joined against the
    /// product collection for display fields.
    pub async fn top_products(&self, limit: i64) -> Result<Vec<TopProduct>, AppError> {
        let pipeline = vec![
            doc! { "$unwind": "$items" },
            doc! { "$group": {
                "_id": "$items.product_id",
                "total_quantity": { "$sum": "$items.quantity" },
            }},
            doc! { "$sort": { "total_quantity": -1, "_id": 1 } },
            doc! { "$limit": limit },
            doc! { "$lookup": {
                "from": "products",
                "localField": "_id",
                "foreignField": "_id",
                "as": "product",
            }},
            doc! { "$unwind": "$product" },
        ];

        let rows = self.run(pipeline).await?;
        let top = rows
            .iter()
            .map(|row| {
                let product = row.get_document("product").ok();
                TopProduct {
                    product_id: row.get_str("_id").unwrap_or_default().to_string(),
                    name: product
                        .and_then(|p| p.get_str("name").ok())
                        .unwrap_or_default()
                        .to_string(),
                    image: product
                        .and_then(|p| p.get_str("image").ok())
                        .map(str::to_string),
                    total_quantity: get_int(row, "total_quantity"),
                }
            })
            .collect();
        Ok(top)
    }

    async fn run(&self, pipeline: Vec<Document>) -> Result<Vec<Document>, AppError> {
        let cursor = self.db.orders().aggregate(pipeline, None).await?;
        Ok(cursor.try_collect().await?)
    }
}

/// Aggregation accumulators come back as int32, int64, or double depending on
/// input width; normalize to i64.
fn get_int(doc: &Document, key: &str) -> i64 {
    opt_int(doc, key).unwrap_or(0)
}

fn opt_int(doc: &Document, key: &str) -> Option<i64> {
    match doc.get(key) {
        Some(Bson::Int32(v)) => Some(*v as i64),
        Some(Bson::Int64(v)) => Some(*v),
        Some(Bson::Double(v)) => Some(*v as i64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_normalization_handles_all_widths() {
        let doc = doc! { "a": 3_i32, "b": 5_i64, "c": 7.0_f64 };
        assert_eq!(get_int(&doc, "a"), 3);
        assert_eq!(get_int(&doc, "b"), 5);
        assert_eq!(get_int(&doc, "c"), 7);
        assert_eq!(get_int(&doc, "missing"), 0);
        assert_eq!(opt_int(&doc, "missing"), None);
    }
}
