mod common;

use common::{SHIPPING_FEE, TestApp};
use mongodb::bson::doc;
use serde_json::json;
use store_service::models::{Discount, DiscountKind, Role};

const SESSION_HEADER: &str = "x-session-id";

fn shipping() -> serde_json::Value {
    json!({
        "name": "Alice",
        "phone": "0123456789",
        "address": "1 Main St, Hanoi",
        "email": "alice@example.com",
    })
}

async fn add_to_cart(app: &TestApp, session: &str, product_id: &str, variant_id: &str, qty: i64) {
    let response = app
        .client
        .post(format!("{}/cart/items", app.address))
        .header(SESSION_HEADER, session)
        .json(&json!({ "product_id": product_id, "variant_id": variant_id, "quantity": qty }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

async fn variant_stock(app: &TestApp, product_id: &str, variant_id: &str) -> i64 {
    let product = app
        .db
        .products()
        .find_one(doc! { "_id": product_id }, None)
        .await
        .unwrap()
        .unwrap();
    product.variant(variant_id).unwrap().stock
}

#[tokio::test]
async fn checkout_computes_totals_and_decrements_stock() {
    let app = TestApp::spawn().await;
    let category_id = app.seed_category("Beans").await;
    let (product_id, variant_id) = app.seed_product(&category_id, "House Blend", 1000, 10).await;

    add_to_cart(&app, "session-1", &product_id, &variant_id, 2).await;

    let response = app
        .client
        .post(format!("{}/orders", app.address))
        .header(SESSION_HEADER, "session-1")
        .json(&json!({
            "items": [{ "product_id": product_id, "variant_id": variant_id }],
            "shipping": shipping(),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let order: serde_json::Value = response.json().await.unwrap();
    assert_eq!(order["subtotal"], 2000);
    assert_eq!(order["shipping_fee"], SHIPPING_FEE);
    assert_eq!(order["total"], 2000 + SHIPPING_FEE);
    assert_eq!(order["status"], "pending");
    assert_eq!(order["items"][0]["quantity"], 2);

    assert_eq!(variant_stock(&app, &product_id, &variant_id).await, 8);

    // The ordered line is gone from the cart.
    let cart: serde_json::Value = app
        .client
        .get(format!("{}/cart", app.address))
        .header(SESSION_HEADER, "session-1")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(cart["items"].as_array().unwrap().is_empty());

    app.cleanup().await;
}

#[tokio::test]
async fn unselected_lines_stay_in_the_cart() {
    let app = TestApp::spawn().await;
    let category_id = app.seed_category("Beans").await;
    let (first_id, first_variant) = app.seed_product(&category_id, "House Blend", 1000, 10).await;
    let (second_id, second_variant) = app.seed_product(&category_id, "Dark Roast", 2000, 10).await;

    add_to_cart(&app, "session-1", &first_id, &first_variant, 1).await;
    add_to_cart(&app, "session-1", &second_id, &second_variant, 1).await;

    let response = app
        .client
        .post(format!("{}/orders", app.address))
        .header(SESSION_HEADER, "session-1")
        .json(&json!({
            "items": [{ "product_id": first_id, "variant_id": first_variant }],
            "shipping": shipping(),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let cart: serde_json::Value = app
        .client
        .get(format!("{}/cart", app.address))
        .header(SESSION_HEADER, "session-1")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let lines = cart["items"].as_array().unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["product_id"], second_id);

    app.cleanup().await;
}

#[tokio::test]
async fn percent_discount_is_applied_and_counted() {
    let app = TestApp::spawn().await;
    let category_id = app.seed_category("Beans").await;
    let (product_id, variant_id) = app.seed_product(&category_id, "House Blend", 50000, 10).await;

    let discount = Discount::new("SAVE10".to_string(), DiscountKind::Percent, 10, 5);
    app.db.discounts().insert_one(&discount, None).await.unwrap();

    add_to_cart(&app, "session-1", &product_id, &variant_id, 2).await;

    let response = app
        .client
        .post(format!("{}/orders", app.address))
        .header(SESSION_HEADER, "session-1")
        .json(&json!({
            "items": [{ "product_id": product_id, "variant_id": variant_id }],
            "shipping": shipping(),
            "discount_code": "SAVE10",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let order: serde_json::Value = response.json().await.unwrap();
    assert_eq!(order["subtotal"], 100000);
    assert_eq!(order["discount_amount"], 10000);
    assert_eq!(order["total"], 100000 + SHIPPING_FEE - 10000);

    let discount = app
        .db
        .discounts()
        .find_one(doc! { "code": "SAVE10" }, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(discount.used_count, 1);

    app.cleanup().await;
}

#[tokio::test]
async fn exhausted_discount_aborts_and_releases_stock() {
    let app = TestApp::spawn().await;
    let category_id = app.seed_category("Beans").await;
    let (product_id, variant_id) = app.seed_product(&category_id, "House Blend", 1000, 10).await;

    let mut discount = Discount::new("ONEUSE".to_string(), DiscountKind::Fixed, 500, 1);
    discount.used_count = 1;
    app.db.discounts().insert_one(&discount, None).await.unwrap();

    add_to_cart(&app, "session-1", &product_id, &variant_id, 2).await;

    let response = app
        .client
        .post(format!("{}/orders", app.address))
        .header(SESSION_HEADER, "session-1")
        .json(&json!({
            "items": [{ "product_id": product_id, "variant_id": variant_id }],
            "shipping": shipping(),
            "discount_code": "ONEUSE",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    // The stock claim made before the discount check was compensated.
    assert_eq!(variant_stock(&app, &product_id, &variant_id).await, 10);

    app.cleanup().await;
}

#[tokio::test]
async fn loyalty_points_redeem_and_accrue() {
    let app = TestApp::spawn().await;
    let category_id = app.seed_category("Beans").await;
    let (product_id, variant_id) = app.seed_product(&category_id, "House Blend", 50000, 10).await;

    let (user_id, token) = app
        .create_user("alice@example.com", "a-strong-password", Role::User)
        .await;
    app.db
        .users()
        .update_one(
            doc! { "_id": &user_id },
            doc! { "$set": { "loyalty_points": 5000_i64 } },
            None,
        )
        .await
        .unwrap();

    let response = app
        .client
        .post(format!("{}/cart/items", app.address))
        .bearer_auth(&token)
        .json(&json!({ "product_id": product_id, "variant_id": variant_id, "quantity": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = app
        .client
        .post(format!("{}/orders", app.address))
        .bearer_auth(&token)
        .json(&json!({
            "items": [{ "product_id": product_id, "variant_id": variant_id }],
            "shipping": shipping(),
            "loyalty_points": 5000,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let order: serde_json::Value = response.json().await.unwrap();
    assert_eq!(order["loyalty_discount_amount"], 5000);
    let expected_total = 50000 + SHIPPING_FEE - 5000;
    assert_eq!(order["total"], expected_total);
    let earned = expected_total / 100;
    assert_eq!(order["loyalty_points_earned"], earned);

    let user = app
        .db
        .users()
        .find_one(doc! { "_id": &user_id }, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.loyalty_points, 5000 - 5000 + earned);

    app.cleanup().await;
}

#[tokio::test]
async fn guest_cannot_redeem_loyalty_points() {
    let app = TestApp::spawn().await;
    let category_id = app.seed_category("Beans").await;
    let (product_id, variant_id) = app.seed_product(&category_id, "House Blend", 1000, 10).await;

    add_to_cart(&app, "session-1", &product_id, &variant_id, 1).await;

    let response = app
        .client
        .post(format!("{}/orders", app.address))
        .header(SESSION_HEADER, "session-1")
        .json(&json!({
            "items": [{ "product_id": product_id, "variant_id": variant_id }],
            "shipping": shipping(),
            "loyalty_points": 100,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    app.cleanup().await;
}

#[tokio::test]
async fn concurrent_checkouts_cannot_both_claim_the_last_unit() {
    let app = TestApp::spawn().await;
    let category_id = app.seed_category("Beans").await;
    let (product_id, variant_id) = app.seed_product(&category_id, "Limited", 1000, 1).await;

    add_to_cart(&app, "session-a", &product_id, &variant_id, 1).await;
    add_to_cart(&app, "session-b", &product_id, &variant_id, 1).await;

    let order_body = json!({
        "items": [{ "product_id": product_id, "variant_id": variant_id }],
        "shipping": shipping(),
    });

    let first = app
        .client
        .post(format!("{}/orders", app.address))
        .header(SESSION_HEADER, "session-a")
        .json(&order_body)
        .send();
    let second = app
        .client
        .post(format!("{}/orders", app.address))
        .header(SESSION_HEADER, "session-b")
        .json(&order_body)
        .send();

    let (first, second) = tokio::join!(first, second);
    let statuses = [first.unwrap().status(), second.unwrap().status()];

    assert_eq!(statuses.iter().filter(|s| s.as_u16() == 201).count(), 1);
    assert_eq!(statuses.iter().filter(|s| s.as_u16() == 400).count(), 1);
    assert_eq!(variant_stock(&app, &product_id, &variant_id).await, 0);

    app.cleanup().await;
}

#[tokio::test]
async fn status_moves_forward_only() {
    let app = TestApp::spawn().await;
    let category_id = app.seed_category("Beans").await;
    let (product_id, variant_id) = app.seed_product(&category_id, "House Blend", 1000, 10).await;
    let admin_token = app.admin_token().await;

    add_to_cart(&app, "session-1", &product_id, &variant_id, 1).await;
    let order: serde_json::Value = app
        .client
        .post(format!("{}/orders", app.address))
        .header(SESSION_HEADER, "session-1")
        .json(&json!({
            "items": [{ "product_id": product_id, "variant_id": variant_id }],
            "shipping": shipping(),
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let order_id = order["_id"].as_str().unwrap();

    let response = app
        .client
        .put(format!("{}/admin/orders/{}/status", app.address, order_id))
        .bearer_auth(&admin_token)
        .json(&json!({ "status": "shipping" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let updated: serde_json::Value = response.json().await.unwrap();
    assert_eq!(updated["status"], "shipping");
    assert_eq!(updated["status_history"].as_array().unwrap().len(), 2);

    // Backwards move is rejected.
    let response = app
        .client
        .put(format!("{}/admin/orders/{}/status", app.address, order_id))
        .bearer_auth(&admin_token)
        .json(&json!({ "status": "confirmed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    app.cleanup().await;
}

#[tokio::test]
async fn owners_only_see_their_own_orders() {
    let app = TestApp::spawn().await;
    let category_id = app.seed_category("Beans").await;
    let (product_id, variant_id) = app.seed_product(&category_id, "House Blend", 1000, 10).await;

    add_to_cart(&app, "session-a", &product_id, &variant_id, 1).await;
    let order: serde_json::Value = app
        .client
        .post(format!("{}/orders", app.address))
        .header(SESSION_HEADER, "session-a")
        .json(&json!({
            "items": [{ "product_id": product_id, "variant_id": variant_id }],
            "shipping": shipping(),
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let order_id = order["_id"].as_str().unwrap();

    let response = app
        .client
        .get(format!("{}/orders/{}", app.address, order_id))
        .header(SESSION_HEADER, "session-b")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    let response = app
        .client
        .get(format!("{}/orders/{}", app.address, order_id))
        .header(SESSION_HEADER, "session-a")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    app.cleanup().await;
}
