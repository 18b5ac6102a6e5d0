//! Request extractors and the success envelope.
//!
//! Axum's stock extractors reject with plain-text bodies. These wrappers
//! route every rejection through [`AppError`] so clients always get the
//! `{"success": false, "message": ...}` shape.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::AppError;

/// JSON body extractor with JSON rejections.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path extractor with JSON rejections.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Query-string extractor with JSON rejections.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Successful response body: `{"success": true, ...fields}`.
#[derive(Debug, Serialize)]
pub struct Success<T> {
    success: bool,
    #[serde(flatten)]
    body: T,
}

impl<T: Serialize> Success<T> {
    pub const fn new(body: T) -> Self {
        Self {
            success: true,
            body,
        }
    }
}

impl<T: Serialize> IntoResponse for Success<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_success_flattens_body() {
        let value = serde_json::to_value(Success::new(json!({ "count": 2 }))).unwrap();
        assert_eq!(value, json!({ "success": true, "count": 2 }));
    }

    #[derive(Serialize)]
    struct Message {
        message: &'static str,
    }

    #[test]
    fn test_success_with_struct() {
        let value = serde_json::to_value(Success::new(Message { message: "ok" })).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["message"], "ok");
    }
}
