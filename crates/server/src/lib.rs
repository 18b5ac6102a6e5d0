//! Alankree API library.
//!
//! The storefront and back-office JSON API for the Alankree saree and
//! earrings shop, exposed as a library so the router can be driven from
//! tests without binding a socket.
//!
//! # Security
//!
//! Customer and back-office sessions use separately signed JWTs. Admin
//! credentials come from configuration only.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue, Method, header},
    middleware::{from_fn, from_fn_with_state},
};
use tower_http::{cors::CorsLayer, services::ServeDir};

use crate::config::ServerConfig;
use crate::middleware::{
    REQUEST_ID_HEADER, https_redirect_middleware, request_id_middleware,
    security_headers_middleware,
};
use crate::state::AppState;

/// Request body limit for JSON and multipart bodies.
pub const BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

/// CORS for the configured browser origins, with credentials.
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
}

/// Build the application router with every API route and the shared
/// middleware stack.
///
/// Tracing and Sentry layers are added by the binary.
pub fn app(state: AppState) -> Router {
    let config = state.config();
    let uploads = ServeDir::new(&config.uploads_dir);
    let cors = cors_layer(config);

    routes::routes()
        .nest_service("/uploads", uploads)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(cors)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn_with_state(state.clone(), https_redirect_middleware))
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn test_app_sets_request_id_and_security_headers() {
        let response = app(AppState::for_tests())
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
        assert_eq!(response.headers()["x-frame-options"], "DENY");
    }

    #[tokio::test]
    async fn test_cors_preflight_for_configured_origin() {
        let response = app(AppState::for_tests())
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/products")
                    .header(header::ORIGIN, "http://localhost:3000")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS],
            "true"
        );
    }
}
