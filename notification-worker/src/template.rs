//! Email rendering. Jobs carry everything needed, so rendering is pure.

use crate::sender::OutgoingEmail;
use service_core::jobs::{OrderConfirmationPayload, PasswordResetPayload};

pub fn order_confirmation(payload: &OrderConfirmationPayload) -> OutgoingEmail {
    let mut text = String::new();
    text.push_str(&format!("Hi {},\n\n", payload.name));
    text.push_str(&format!(
        "Thanks for your order! Order {} is now {}.\n\n",
        payload.order_id, payload.status
    ));
    for item in &payload.items {
        text.push_str(&format!(
            "  {} x{} - {}\n",
            item.variant_name, item.quantity, item.line_total
        ));
    }
    text.push_str(&format!("\nSubtotal: {}\n", payload.subtotal));
    text.push_str(&format!("Shipping: {}\n", payload.shipping_fee));
    if payload.tax > 0 {
        text.push_str(&format!("Tax: {}\n", payload.tax));
    }
    if payload.discount_amount > 0 {
        text.push_str(&format!("Discount: -{}\n", payload.discount_amount));
    }
    if payload.loyalty_discount_amount > 0 {
        text.push_str(&format!(
            "Loyalty points: -{}\n",
            payload.loyalty_discount_amount
        ));
    }
    text.push_str(&format!("Total: {}\n", payload.total));
    if payload.loyalty_points_earned > 0 {
        text.push_str(&format!(
            "\nYou earned {} loyalty points.\n",
            payload.loyalty_points_earned
        ));
    }
    text.push_str(&format!(
        "\nDelivery to: {}, {}\n",
        payload.address, payload.phone
    ));

    let mut rows = String::new();
    for item in &payload.items {
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&item.variant_name),
            item.quantity,
            item.line_total
        ));
    }
    let html = format!(
        "<h1>Thanks for your order, {}!</h1>\
         <p>Order <strong>{}</strong> is now <strong>{}</strong>.</p>\
         <table><tr><th>Item</th><th>Qty</th><th>Line total</th></tr>{}</table>\
         <p>Subtotal: {}<br>Shipping: {}<br>Tax: {}<br>Discount: -{}<br>\
         Loyalty points: -{}<br><strong>Total: {}</strong></p>\
         <p>You earned {} loyalty points.</p>\
         <p>Delivery to: {}, {}</p>",
        escape(&payload.name),
        escape(&payload.order_id),
        escape(&payload.status),
        rows,
        payload.subtotal,
        payload.shipping_fee,
        payload.tax,
        payload.discount_amount,
        payload.loyalty_discount_amount,
        payload.total,
        payload.loyalty_points_earned,
        escape(&payload.address),
        escape(&payload.phone),
    );

    OutgoingEmail {
        to: payload.email.clone(),
        to_name: payload.name.clone(),
        subject: format!("Order confirmation {}", payload.order_id),
        body_text: text,
        body_html: html,
    }
}

pub fn password_reset(payload: &PasswordResetPayload) -> OutgoingEmail {
    let text = format!(
        "Hi {},\n\nYour password reset code is: {}\n\n\
         The code expires shortly. If you did not request a reset, ignore this email.\n",
        payload.name, payload.code
    );
    let html = format!(
        "<p>Hi {},</p><p>Your password reset code is: <strong>{}</strong></p>\
         <p>The code expires shortly. If you did not request a reset, ignore this email.</p>",
        escape(&payload.name),
        escape(&payload.code),
    );

    OutgoingEmail {
        to: payload.email.clone(),
        to_name: payload.name.clone(),
        subject: "Password reset code".to_string(),
        body_text: text,
        body_html: html,
    }
}

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use service_core::jobs::OrderConfirmationItem;

    fn payload() -> OrderConfirmationPayload {
        OrderConfirmationPayload {
            email: "buyer@example.com".to_string(),
            name: "Buyer".to_string(),
            phone: "0123456789".to_string(),
            address: "1 Main St".to_string(),
            order_id: "ord-42".to_string(),
            status: "pending".to_string(),
            subtotal: 2000,
            shipping_fee: 30000,
            tax: 0,
            discount_amount: 500,
            loyalty_discount_amount: 0,
            total: 31500,
            loyalty_points_earned: 315,
            items: vec![OrderConfirmationItem {
                variant_name: "250g <Whole Bean>".to_string(),
                quantity: 2,
                line_total: 2000,
            }],
        }
    }

    #[test]
    fn order_confirmation_carries_the_money_breakdown() {
        let email = order_confirmation(&payload());

        assert_eq!(email.to, "buyer@example.com");
        assert!(email.subject.contains("ord-42"));
        assert!(email.body_text.contains("Subtotal: 2000"));
        assert!(email.body_text.contains("Shipping: 30000"));
        assert!(email.body_text.contains("Discount: -500"));
        assert!(email.body_text.contains("Total: 31500"));
        assert!(email.body_text.contains("315 loyalty points"));
        assert!(email.body_html.contains("Total: 31500"));
    }

    #[test]
    fn html_escapes_item_names() {
        let email = order_confirmation(&payload());
        assert!(email.body_html.contains("250g &lt;Whole Bean&gt;"));
        assert!(!email.body_html.contains("<Whole Bean>"));
    }

    #[test]
    fn password_reset_carries_the_code() {
        let email = password_reset(&PasswordResetPayload {
            email: "buyer@example.com".to_string(),
            name: "Buyer".to_string(),
            code: "483920".to_string(),
        });

        assert_eq!(email.subject, "Password reset code");
        assert!(email.body_text.contains("483920"));
        assert!(email.body_html.contains("483920"));
    }
}
