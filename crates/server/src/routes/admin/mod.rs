//! Back-office API under `/api/admin`.
//!
//! Every route except `/login` requires an admin token.

pub mod auth;
pub mod dashboard;
pub mod maintenance;
pub mod orders;
pub mod products;
pub mod uploads;
pub mod users;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::middleware::login_rate_limiter;
use crate::state::AppState;

/// Create the back-office router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login).layer(login_rate_limiter()))
        // Dashboard
        .route("/dashboard", get(dashboard::stats))
        .route("/dashboard-stats", get(dashboard::stats))
        // Orders
        .route("/orders", get(orders::list))
        .route("/orders/{orderId}", get(orders::show))
        .route("/orders/{orderId}/status", put(orders::update_status))
        .route("/orders/{orderId}/delivery", put(orders::update_delivery))
        .route("/orders/{orderId}/agent", put(orders::assign_agent))
        // Products
        .route("/products", get(products::list).post(products::create))
        .route(
            "/products/{productId}",
            put(products::update).delete(products::delete),
        )
        .route("/inventory", get(products::inventory))
        // Customers
        .route("/users", get(users::list))
        .route("/users/{userId}", get(users::show))
        // Media
        .route("/upload-image", post(uploads::upload_image))
        // Development only
        .route("/cleanup-dummy-data", post(maintenance::cleanup_dummy_data))
}
