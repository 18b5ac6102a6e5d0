//! HTTP middleware and request extractors.
//!
//! - `auth`: bearer-token extractors for customers and the back office
//! - `rate_limit`: per-IP rate limiting for login endpoints
//! - `request_id`: request correlation IDs for tracing and Sentry
//! - `security_headers`: response hardening and production HTTPS redirect

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use auth::{AuthRejection, OptionalUser, RequireAdmin, RequireUser};
pub use rate_limit::{RateLimiterLayer, login_rate_limiter};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use security_headers::{https_redirect_middleware, security_headers_middleware};
