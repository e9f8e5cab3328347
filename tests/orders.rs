mod common;

use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{spawn_app, TestApp};

async fn place(app: &TestApp) -> i64 {
    app.checkout(json!({
        "customer": { "name": "Ana", "email": "ana@example.com" },
        "cart": [{ "productId": 6, "quantity": 1 }]
    }))
    .await
    .json::<Value>()
    .await
    .expect("Failed to parse JSON")["orderId"]
        .as_i64()
        .expect("orderId missing")
}

async fn patch_status(app: &TestApp, id: i64, status: Value) -> reqwest::Response {
    app.client
        .patch(app.url(&format!("/api/orders/{id}/status")))
        .json(&json!({ "status": status }))
        .send()
        .await
        .expect("Failed to send status update")
}

async fn stored_status(app: &TestApp, id: i64) -> Value {
    app.client
        .get(app.url(&format!("/api/orders/{id}")))
        .send()
        .await
        .expect("Failed to fetch order")
        .json::<Value>()
        .await
        .expect("Failed to parse JSON")["order"]["status"]
        .clone()
}

#[tokio::test]
async fn test_update_status() {
    let app = spawn_app().await;
    let id = place(&app).await;

    let response = patch_status(&app, id, json!("PAID")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.json::<Value>().await.expect("Failed to parse JSON");
    assert_eq!(body, json!({ "ok": true, "orderId": id, "status": "PAID" }));
    assert_eq!(stored_status(&app, id).await, "PAID");
}

#[tokio::test]
async fn test_invalid_status_is_rejected() {
    let app = spawn_app().await;
    let id = place(&app).await;

    for status in [json!("REFUNDED"), json!("paid"), json!(""), Value::Null] {
        let response = patch_status(&app, id, status.clone()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{status}");
        let body = response.json::<Value>().await.expect("Failed to parse JSON");
        assert_eq!(body["category"], "validation");
    }
    assert_eq!(stored_status(&app, id).await, "PENDING");
}

#[tokio::test]
async fn test_unknown_order() {
    let app = spawn_app().await;

    let response = patch_status(&app, 999, json!("SHIPPED")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .client
        .get(app.url("/api/orders/999"))
        .send()
        .await
        .expect("Failed to fetch order");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/health"))
        .send()
        .await
        .expect("Failed to send health request");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.expect("Failed to read body"), "ok");
}
