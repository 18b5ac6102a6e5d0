//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                                  - API banner
//! GET  /api/health                        - Health with database status
//!
//! # Catalog
//! GET  /api/products                      - Product listing (?category=)
//! GET  /api/products/{id}                 - Product detail
//! POST /api/products                      - Create product (admin)
//!
//! # Orders
//! POST /api/orders/create                 - Checkout (guest or signed in)
//! POST /api/orders/create-auth            - Checkout (signed in)
//! GET  /api/orders/{id}                   - Order detail (owner or ?email=)
//! GET  /api/orders/track/{orderId}        - Public tracking (?email=)
//! PUT  /api/orders/{id}/cancel            - Customer cancellation
//! GET  /api/orders/user/my-orders         - Signed-in customer's orders
//! GET  /api/orders/admin/all              - Every order (admin)
//! PUT  /api/orders/admin/status/{id}      - Set status (admin)
//!
//! # Accounts
//! POST /api/users/register                - Register
//! POST /api/users/login                   - Login (rate limited)
//! GET|PUT /api/users/profile              - Profile
//! GET  /api/users/orders                  - Order history
//! GET|POST /api/users/cart                - Cart
//! PUT|DELETE /api/users/cart/{productId}  - Cart line
//! GET  /api/users/wishlist                - Wishlist
//! POST|DELETE /api/users/wishlist/{productId}
//! POST /api/users/addresses               - Add address
//! PUT|DELETE /api/users/addresses/{addressId}
//!
//! # Back office
//! /api/admin/*                            - See [`admin`]
//!
//! # Notifications (admin)
//! GET  /api/notifications                 - Feed (?unreadOnly=&limit=)
//! GET  /api/notifications/stats           - Counts by type
//! PUT  /api/notifications/mark-all-read   - Mark everything read
//! PUT  /api/notifications/{id}/read       - Mark one read
//! DELETE /api/notifications/{id}          - Delete one
//! ```

pub mod admin;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod users;

use axum::{
    Router,
    extract::State,
    routing::{delete, get, post, put},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};

use crate::db;
use crate::error::AppError;
use crate::extract::Success;
use crate::middleware::login_rate_limiter;
use crate::state::AppState;

/// Create the catalog router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::list).post(products::create))
        .route("/{id}", get(products::show))
}

/// Create the order router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/create", post(orders::create))
        .route("/create-auth", post(orders::create_authenticated))
        .route("/track/{orderId}", get(orders::track))
        .route("/user/my-orders", get(orders::mine))
        .route("/admin/all", get(orders::all))
        .route("/admin/status/{id}", put(orders::update_status))
        .route("/{id}", get(orders::show))
        .route("/{id}/cancel", put(orders::cancel))
}

/// Create the account router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(users::register))
        .route("/login", post(users::login).layer(login_rate_limiter()))
        .route(
            "/profile",
            get(users::profile).put(users::update_profile),
        )
        .route("/orders", get(users::orders))
        .route("/cart", get(users::cart).post(users::add_to_cart))
        .route(
            "/cart/{productId}",
            put(users::update_cart).delete(users::remove_from_cart),
        )
        .route("/wishlist", get(users::wishlist))
        .route(
            "/wishlist/{productId}",
            post(users::add_to_wishlist).delete(users::remove_from_wishlist),
        )
        .route("/addresses", post(users::add_address))
        .route(
            "/addresses/{addressId}",
            put(users::update_address).delete(users::delete_address),
        )
}

/// Create the notification router.
pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(notifications::list))
        .route("/stats", get(notifications::stats))
        .route("/mark-all-read", put(notifications::mark_all_read))
        .route("/{id}/read", put(notifications::mark_read))
        .route("/{id}", delete(notifications::delete))
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(banner))
        .route("/api/health", get(health))
        .nest("/api/products", product_routes())
        .nest("/api/orders", order_routes())
        .nest("/api/users", user_routes())
        .nest("/api/admin", admin::routes())
        .nest("/api/notifications", notification_routes())
        .fallback(not_found)
}

#[derive(Debug, Serialize)]
struct Banner {
    message: &'static str,
    version: &'static str,
    endpoints: Value,
}

/// GET /
async fn banner() -> Success<Banner> {
    Success::new(Banner {
        message: "Alankree API is running",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: json!({
            "products": "/api/products",
            "orders": "/api/orders",
            "users": "/api/users",
            "admin": "/api/admin",
            "notifications": "/api/notifications",
            "health": "/api/health",
        }),
    })
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    timestamp: DateTime<Utc>,
    database: &'static str,
}

/// GET /api/health
async fn health(State(state): State<AppState>) -> Success<Health> {
    let database = if db::ping(state.pool()).await {
        "connected"
    } else {
        "disconnected"
    };
    Success::new(Health {
        status: "OK",
        timestamp: Utc::now(),
        database,
    })
}

async fn not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;

    async fn call(method: &str, uri: &str) -> (StatusCode, Value) {
        let app = routes().with_state(AppState::for_tests());
        let response = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_banner() {
        let (status, body) = call("GET", "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["endpoints"]["orders"], "/api/orders");
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let (status, body) = call("GET", "/api/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Route not found");
    }

    #[tokio::test]
    async fn test_customer_routes_require_token() {
        let (status, body) = call("GET", "/api/users/profile").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "No token provided, authorization denied");

        let (status, _) = call("GET", "/api/orders/user/my-orders").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_routes_require_admin_token() {
        for (method, uri) in [
            ("GET", "/api/admin/dashboard"),
            ("GET", "/api/admin/inventory"),
            ("GET", "/api/notifications"),
            ("GET", "/api/orders/admin/all"),
            ("POST", "/api/admin/cleanup-dummy-data"),
        ] {
            let (status, body) = call(method, uri).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
            assert_eq!(body["message"], "Access denied. No admin token provided.");
        }
    }

    #[tokio::test]
    async fn test_notifications_with_admin_token() {
        let state = AppState::for_tests();
        let token = state.tokens().issue_admin_token().unwrap();
        let app = routes().with_state(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/notifications/stats")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["stats"]["total"], 0);
    }
}
