//! Integration tests for the catalog.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database
//! - The API running (cargo run -p alankree-server)
//! - `TEST_ADMIN_PASSWORD` matching the server's admin hash

use alankree_integration_tests::TestContext;
use reqwest::StatusCode;
use serde_json::{Value, json};
use uuid::Uuid;

fn names(body: &Value) -> Vec<String> {
    body["products"]
        .as_array()
        .expect("products array")
        .iter()
        .filter_map(|p| p["name"].as_str().map(str::to_owned))
        .collect()
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_created_product_listed_under_its_category() {
    let ctx = TestContext::new();
    let token = ctx.admin_token().await;
    let name = format!("Test Jhumka {}", Uuid::new_v4().simple());

    let product = ctx.create_product(&token, &name, "earrings", 15).await;
    assert_eq!(product["category"], "earrings");
    assert_eq!(product["stock"], 15);

    let earrings = ctx
        .send_json(
            ctx.client.get(ctx.url("/api/products?category=earrings")),
            StatusCode::OK,
        )
        .await;
    assert!(names(&earrings).contains(&name));

    let sarees = ctx
        .send_json(
            ctx.client.get(ctx.url("/api/products?category=saree")),
            StatusCode::OK,
        )
        .await;
    assert!(!names(&sarees).contains(&name));

    let id = product["id"].as_i64().expect("numeric id");
    let fetched = ctx
        .send_json(
            ctx.client.get(ctx.url(&format!("/api/products/{id}"))),
            StatusCode::OK,
        )
        .await;
    assert_eq!(fetched["product"]["name"], name.as_str());
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_unknown_product_is_404() {
    let ctx = TestContext::new();
    let body = ctx
        .send_json(
            ctx.client.get(ctx.url("/api/products/999999999")),
            StatusCode::NOT_FOUND,
        )
        .await;
    assert_eq!(body["message"], "Product not found");
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_product_create_requires_admin() {
    let ctx = TestContext::new();
    let (_, customer_token) = ctx.register_customer("Priya").await;

    ctx.send_json(
        ctx.client
            .post(ctx.url("/api/products"))
            .bearer_auth(customer_token)
            .json(&json!({ "name": "Nope" })),
        StatusCode::UNAUTHORIZED,
    )
    .await;
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_health_reports_database() {
    let ctx = TestContext::new();
    let body = ctx
        .send_json(ctx.client.get(ctx.url("/api/health")), StatusCode::OK)
        .await;
    assert_eq!(body["status"], "OK");
    assert_eq!(body["database"], "connected");
}
