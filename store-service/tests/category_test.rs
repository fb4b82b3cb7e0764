mod common;

use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn category_crud_requires_admin() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(format!("{}/admin/categories", app.address))
        .json(&json!({ "name": "Beans" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let (_, user_token) = app
        .create_user("user@example.com", "a-strong-password", store_service::models::Role::User)
        .await;
    let response = app
        .client
        .post(format!("{}/admin/categories", app.address))
        .bearer_auth(&user_token)
        .json(&json!({ "name": "Beans" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    app.cleanup().await;
}

#[tokio::test]
async fn create_and_list_categories() {
    let app = TestApp::spawn().await;
    let admin_token = app.admin_token().await;

    let response = app
        .client
        .post(format!("{}/admin/categories", app.address))
        .bearer_auth(&admin_token)
        .json(&json!({ "name": "Beans", "description": "Coffee beans" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    // Duplicate name is a conflict.
    let response = app
        .client
        .post(format!("{}/admin/categories", app.address))
        .bearer_auth(&admin_token)
        .json(&json!({ "name": "Beans" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);

    let response = app
        .client
        .get(format!("{}/categories", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let categories: serde_json::Value = response.json().await.unwrap();
    assert_eq!(categories.as_array().unwrap().len(), 1);

    app.cleanup().await;
}

#[tokio::test]
async fn delete_is_blocked_while_products_reference_it() {
    let app = TestApp::spawn().await;
    let admin_token = app.admin_token().await;
    let category_id = app.seed_category("Beans").await;
    app.seed_product(&category_id, "House Blend", 1000, 10).await;
    app.seed_product(&category_id, "Dark Roast", 2000, 10).await;

    let response = app
        .client
        .delete(format!("{}/admin/categories/{}", app.address, category_id))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["fields"]["productCount"], 2);

    app.cleanup().await;
}

#[tokio::test]
async fn empty_category_can_be_deleted() {
    let app = TestApp::spawn().await;
    let admin_token = app.admin_token().await;
    let category_id = app.seed_category("Empty").await;

    let response = app
        .client
        .delete(format!("{}/admin/categories/{}", app.address, category_id))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    app.cleanup().await;
}
