//! Integration tests for customer accounts: cart, wishlist and addresses.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database
//! - The API running (cargo run -p alankree-server)
//! - `TEST_ADMIN_PASSWORD` matching the server's admin hash

use alankree_integration_tests::{TestContext, unique_email};
use reqwest::StatusCode;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_duplicate_registration_conflicts() {
    let ctx = TestContext::new();
    let (email, _) = ctx.register_customer("Asha").await;

    ctx.send_json(
        ctx.client.post(ctx.url("/api/users/register")).json(&json!({
            "name": "Asha Again",
            "email": email,
            "password": "another-password",
        })),
        StatusCode::CONFLICT,
    )
    .await;
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_registration_rejects_short_password() {
    let ctx = TestContext::new();
    ctx.send_json(
        ctx.client.post(ctx.url("/api/users/register")).json(&json!({
            "name": "Short",
            "email": unique_email("short"),
            "password": "123",
        })),
        StatusCode::BAD_REQUEST,
    )
    .await;
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_cart_merges_and_removes_lines() {
    let ctx = TestContext::new();
    let admin = ctx.admin_token().await;
    let product = ctx
        .create_product(
            &admin,
            &format!("Test Pearl Drops {}", Uuid::new_v4().simple()),
            "earrings",
            10,
        )
        .await;
    let product_id = product["id"].as_i64().expect("numeric id");
    let (_, token) = ctx.register_customer("Lakshmi").await;

    for _ in 0..2 {
        ctx.send_json(
            ctx.client
                .post(ctx.url("/api/users/cart"))
                .bearer_auth(&token)
                .json(&json!({ "productId": product_id, "quantity": 2 })),
            StatusCode::OK,
        )
        .await;
    }
    let cart = ctx
        .send_json(
            ctx.client.get(ctx.url("/api/users/cart")).bearer_auth(&token),
            StatusCode::OK,
        )
        .await;
    assert_eq!(cart["cart"][0]["quantity"], 4);

    // Quantity 0 removes the line
    ctx.send_json(
        ctx.client
            .put(ctx.url(&format!("/api/users/cart/{product_id}")))
            .bearer_auth(&token)
            .json(&json!({ "quantity": 0 })),
        StatusCode::OK,
    )
    .await;
    let cart = ctx
        .send_json(
            ctx.client.get(ctx.url("/api/users/cart")).bearer_auth(&token),
            StatusCode::OK,
        )
        .await;
    assert_eq!(cart["cart"].as_array().map(Vec::len), Some(0));

    // Unknown products are rejected
    ctx.send_json(
        ctx.client
            .post(ctx.url("/api/users/cart"))
            .bearer_auth(&token)
            .json(&json!({ "productId": 999_999_999, "quantity": 1 })),
        StatusCode::NOT_FOUND,
    )
    .await;
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_default_address_promotion() {
    let ctx = TestContext::new();
    let (_, token) = ctx.register_customer("Divya").await;

    let add = |street: &'static str, is_default: bool| {
        ctx.client
            .post(ctx.url("/api/users/addresses"))
            .bearer_auth(&token)
            .json(&json!({
                "street": street,
                "city": "Chennai",
                "state": "Tamil Nadu",
                "pincode": "600001",
                "isDefault": is_default,
            }))
    };

    let first = ctx.send_json(add("1 Anna Salai", false), StatusCode::OK).await;
    assert_eq!(first["addresses"][0]["isDefault"], true);

    let second = ctx.send_json(add("2 Mount Road", true), StatusCode::OK).await;
    let addresses = second["addresses"].as_array().expect("addresses");
    assert_eq!(
        addresses.iter().filter(|a| a["isDefault"] == true).count(),
        1
    );
    let default_id = addresses
        .iter()
        .find(|a| a["isDefault"] == true)
        .and_then(|a| a["id"].as_i64())
        .expect("default address");

    // Deleting the default promotes the remaining address
    let after = ctx
        .send_json(
            ctx.client
                .delete(ctx.url(&format!("/api/users/addresses/{default_id}")))
                .bearer_auth(&token),
            StatusCode::OK,
        )
        .await;
    assert_eq!(after["addresses"][0]["street"], "1 Anna Salai");
    assert_eq!(after["addresses"][0]["isDefault"], true);
}
