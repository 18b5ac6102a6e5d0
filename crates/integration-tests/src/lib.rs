//! Integration tests for Alankree.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the database and apply migrations
//! cargo run -p alankree-cli -- migrate
//!
//! # Start the API
//! cargo run -p alankree-server
//!
//! # Run integration tests
//! TEST_ADMIN_PASSWORD=... cargo test -p alankree-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `API_BASE_URL` - API under test (default `http://localhost:5000`)
//! - `ADMIN_EMAIL` - Back-office login email (default `admin@alankree.in`)
//! - `TEST_ADMIN_PASSWORD` - Back-office password matching the server's hash
//!
//! Tests create their own data with unique `@example.com` emails.

#![allow(clippy::missing_panics_doc)]

use reqwest::{Client, Response, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

/// Base URL for the API (configurable via environment).
#[must_use]
pub fn base_url() -> String {
    std::env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:5000".to_string())
}

/// A unique `@example.com` address, removed by the development cleanup.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", Uuid::new_v4().simple())
}

/// HTTP client plus the base URL.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: base_url(),
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Log in to the back office and return the admin token.
    pub async fn admin_token(&self) -> String {
        let email =
            std::env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@alankree.in".to_string());
        let password =
            std::env::var("TEST_ADMIN_PASSWORD").expect("TEST_ADMIN_PASSWORD must be set");

        let body = self
            .send_json(
                self.client
                    .post(self.url("/api/admin/login"))
                    .json(&json!({ "email": email, "password": password })),
                StatusCode::OK,
            )
            .await;
        token_of(&body)
    }

    /// Register a fresh customer and return `(email, token)`.
    pub async fn register_customer(&self, name: &str) -> (String, String) {
        let email = unique_email("customer");
        let body = self
            .send_json(
                self.client.post(self.url("/api/users/register")).json(&json!({
                    "name": name,
                    "email": email,
                    "password": "saree-lover-123",
                    "phone": "9876543210",
                })),
                StatusCode::CREATED,
            )
            .await;
        (email, token_of(&body))
    }

    /// Create a catalog product through the admin JSON endpoint.
    pub async fn create_product(&self, admin_token: &str, name: &str, category: &str, stock: i32) -> Value {
        let body = self
            .send_json(
                self.client
                    .post(self.url("/api/products"))
                    .bearer_auth(admin_token)
                    .json(&json!({
                        "name": name,
                        "description": "Created by integration tests",
                        "price": 1999,
                        "originalPrice": 2499,
                        "category": category,
                        "image": "https://images.example.com/test.jpg",
                        "sizes": ["Free Size"],
                        "stock": stock,
                    })),
                StatusCode::CREATED,
            )
            .await;
        body["product"].clone()
    }

    /// Send a request, assert the status and return the JSON body.
    pub async fn send_json(&self, request: reqwest::RequestBuilder, expected: StatusCode) -> Value {
        let response: Response = request.send().await.expect("Request failed");
        let status = response.status();
        let body: Value = response.json().await.expect("Response is not JSON");
        assert_eq!(status, expected, "unexpected status, body: {body}");
        assert_eq!(
            body["success"],
            expected.is_success(),
            "success flag mismatch, body: {body}"
        );
        body
    }
}

fn token_of(body: &Value) -> String {
    body["token"]
        .as_str()
        .expect("response has no token")
        .to_string()
}
