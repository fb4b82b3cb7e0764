//! Email job payloads shared between the web process (producer) and the
//! notification worker (consumer).
//!
//! Payloads are fully denormalized: the worker renders and sends from the job
//! alone, without further database reads.

use serde::{Deserialize, Serialize};

/// Redis list the web process pushes jobs onto and the worker pops from.
pub const EMAIL_QUEUE_KEY: &str = "store:email_jobs";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "job_type", content = "payload", rename_all = "snake_case")]
pub enum EmailJob {
    OrderConfirmation(OrderConfirmationPayload),
    PasswordReset(PasswordResetPayload),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfirmationPayload {
    pub email: String,
    pub name: String,
    pub phone: String,
    pub address: String,
    pub order_id: String,
    pub status: String,
    pub subtotal: i64,
    pub shipping_fee: i64,
    pub tax: i64,
    pub discount_amount: i64,
    pub loyalty_discount_amount: i64,
    pub total: i64,
    pub loyalty_points_earned: i64,
    pub items: Vec<OrderConfirmationItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfirmationItem {
    pub variant_name: String,
    pub quantity: i64,
    pub line_total: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetPayload {
    pub email: String,
    pub name: String,
    pub code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_round_trips() {
        let job = EmailJob::OrderConfirmation(OrderConfirmationPayload {
            email: "buyer@example.com".to_string(),
            name: "Buyer".to_string(),
            phone: "0123456789".to_string(),
            address: "1 Main St".to_string(),
            order_id: "ord-1".to_string(),
            status: "pending".to_string(),
            subtotal: 2000,
            shipping_fee: 30000,
            tax: 0,
            discount_amount: 0,
            loyalty_discount_amount: 0,
            total: 32000,
            loyalty_points_earned: 320,
            items: vec![OrderConfirmationItem {
                variant_name: "Blue / L".to_string(),
                quantity: 2,
                line_total: 2000,
            }],
        });

        let json = serde_json::to_string(&job).unwrap();
        assert!(json.contains("\"job_type\":\"order_confirmation\""));
        assert!(json.contains("\"shippingFee\":30000"));

        let back: EmailJob = serde_json::from_str(&json).unwrap();
        assert_eq!(back, job);
    }

    #[test]
    fn password_reset_envelope_is_tagged() {
        let job = EmailJob::PasswordReset(PasswordResetPayload {
            email: "buyer@example.com".to_string(),
            name: "Buyer".to_string(),
            code: "483920".to_string(),
        });

        let json = serde_json::to_string(&job).unwrap();
        assert!(json.contains("\"job_type\":\"password_reset\""));
    }
}
