mod common;

use common::{SHIPPING_FEE, TestApp};
use serde_json::json;

const SESSION_HEADER: &str = "x-session-id";

fn shipping() -> serde_json::Value {
    json!({
        "name": "Alice",
        "phone": "0123456789",
        "address": "1 Main St, Hanoi",
        "email": "alice@example.com",
    })
}

/// Checkout `qty` units from a fresh session and walk the order to delivered.
async fn place_delivered_order(
    app: &TestApp,
    admin_token: &str,
    session: &str,
    product_id: &str,
    variant_id: &str,
    qty: i64,
) -> i64 {
    let response = app
        .client
        .post(format!("{}/cart/items", app.address))
        .header(SESSION_HEADER, session)
        .json(&json!({ "product_id": product_id, "variant_id": variant_id, "quantity": qty }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let order: serde_json::Value = app
        .client
        .post(format!("{}/orders", app.address))
        .header(SESSION_HEADER, session)
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
        .bearer_auth(admin_token)
        .json(&json!({ "status": "delivered" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    order["total"].as_i64().unwrap()
}

#[tokio::test]
async fn dashboard_requires_admin() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("{}/admin/dashboard", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    app.cleanup().await;
}

#[tokio::test]
async fn simple_dashboard_counts_delivered_orders_only() {
    let app = TestApp::spawn().await;
    let admin_token = app.admin_token().await;
    let category_id = app.seed_category("Beans").await;
    let (product_id, variant_id) = app.seed_product(&category_id, "House Blend", 1000, 50).await;

    let total_a =
        place_delivered_order(&app, &admin_token, "s-a", &product_id, &variant_id, 2).await;
    let total_b =
        place_delivered_order(&app, &admin_token, "s-b", &product_id, &variant_id, 3).await;

    // A pending order that must not count.
    app.client
        .post(format!("{}/cart/items", app.address))
        .header(SESSION_HEADER, "s-c")
        .json(&json!({ "product_id": product_id, "variant_id": variant_id, "quantity": 1 }))
        .send()
        .await
        .unwrap();
    app.client
        .post(format!("{}/orders", app.address))
        .header(SESSION_HEADER, "s-c")
        .json(&json!({
            "items": [{ "product_id": product_id, "variant_id": variant_id }],
            "shipping": shipping(),
        }))
        .send()
        .await
        .unwrap();

    let totals: serde_json::Value = app
        .client
        .get(format!("{}/admin/dashboard", app.address))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let revenue = total_a + total_b;
    assert_eq!(totals["total_revenue"], revenue);
    assert_eq!(totals["total_orders"], 2);
    assert_eq!(totals["total_units"], 5);
    assert_eq!(totals["profit"], revenue as f64 * 0.3);

    app.cleanup().await;
}

#[tokio::test]
async fn monthly_buckets_merge_same_month_orders() {
    let app = TestApp::spawn().await;
    let admin_token = app.admin_token().await;
    let category_id = app.seed_category("Beans").await;
    let (product_id, variant_id) = app.seed_product(&category_id, "House Blend", 1000, 50).await;

    place_delivered_order(&app, &admin_token, "s-a", &product_id, &variant_id, 2).await;
    place_delivered_order(&app, &admin_token, "s-b", &product_id, &variant_id, 1).await;

    let buckets: serde_json::Value = app
        .client
        .get(format!("{}/admin/dashboard/advanced?type=month", app.address))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let buckets = buckets.as_array().unwrap();
    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0]["total_orders"], 2);
    assert_eq!(buckets[0]["total_units"], 3);
    assert_eq!(
        buckets[0]["total_revenue"],
        2000 + SHIPPING_FEE + 1000 + SHIPPING_FEE
    );
    assert!(buckets[0]["year"].as_i64().is_some());
    assert!(buckets[0]["month"].as_i64().is_some());

    app.cleanup().await;
}

#[tokio::test]
async fn range_requires_start_and_end() {
    let app = TestApp::spawn().await;
    let admin_token = app.admin_token().await;

    let response = app
        .client
        .get(format!("{}/admin/dashboard/advanced?type=range", app.address))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let response = app
        .client
        .get(format!(
            "{}/admin/dashboard/advanced?type=range&start=2026-01-01&end=2026-12-31",
            app.address
        ))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    app.cleanup().await;
}

#[tokio::test]
async fn top_products_rank_by_units_sold() {
    let app = TestApp::spawn().await;
    let admin_token = app.admin_token().await;
    let category_id = app.seed_category("Beans").await;
    let (slow_id, slow_variant) = app.seed_product(&category_id, "Slow Seller", 1000, 50).await;
    let (hot_id, hot_variant) = app.seed_product(&category_id, "Best Seller", 1000, 50).await;

    place_delivered_order(&app, &admin_token, "s-a", &slow_id, &slow_variant, 1).await;
    place_delivered_order(&app, &admin_token, "s-b", &hot_id, &hot_variant, 5).await;

    let top: serde_json::Value = app
        .client
        .get(format!("{}/admin/dashboard/top-products", app.address))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let top = top.as_array().unwrap();
    assert_eq!(top.len(), 2);
    assert_eq!(top[0]["product_id"], hot_id);
    assert_eq!(top[0]["name"], "Best Seller");
    assert_eq!(top[0]["total_quantity"], 5);

    app.cleanup().await;
}
