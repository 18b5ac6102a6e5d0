//! Bearer-token extractors.
//!
//! Customer tokens are resolved to a live user row on every request, so
//! deleted or deactivated accounts lose access immediately. Back-office
//! tokens are verified against the admin signing secret only.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::db::UserRepository;
use crate::error::{AppError, set_sentry_user};
use crate::models::User;
use crate::services::auth::{AdminClaims, AuthError};
use crate::state::AppState;

/// Read the token from `Authorization: Bearer <token>`.
pub(crate) fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Error returned when a request lacks valid credentials.
#[derive(Debug)]
pub enum AuthRejection {
    /// No bearer token on a customer route.
    MissingToken,
    /// No bearer token on a back-office route.
    MissingAdminToken,
    /// Token failed verification or names an unusable account.
    Invalid(AuthError),
    /// Token is valid but its user no longer exists.
    UserNotFound,
    /// Lookup failed.
    Internal(AppError),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::MissingToken => (
                StatusCode::UNAUTHORIZED,
                "No token provided, authorization denied",
            ),
            Self::MissingAdminToken => (
                StatusCode::UNAUTHORIZED,
                "Access denied. No admin token provided.",
            ),
            Self::UserNotFound => (StatusCode::UNAUTHORIZED, "User not found"),
            Self::Invalid(err) => return AppError::Auth(err).into_response(),
            Self::Internal(err) => return err.into_response(),
        };
        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}

async fn load_user(state: &AppState, token: &str) -> Result<User, AuthRejection> {
    let claims = state
        .tokens()
        .verify_user_token(token)
        .map_err(AuthRejection::Invalid)?;

    let user = UserRepository::new(state.pool())
        .get_by_id(claims.sub)
        .await
        .map_err(|e| AuthRejection::Internal(e.into()))?
        .ok_or(AuthRejection::UserNotFound)?;

    if !user.is_active {
        return Err(AuthRejection::Invalid(AuthError::AccountDeactivated));
    }
    Ok(user)
}

/// Extractor that requires a signed-in customer.
///
/// # Example
///
/// ```rust,ignore
/// async fn profile(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireUser(pub User);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthRejection::MissingToken)?;
        let user = load_user(state, token).await?;

        set_sentry_user(&user.id, Some(user.email.as_str()));
        tracing::Span::current().record("user_id", tracing::field::display(user.id));

        Ok(Self(user))
    }
}

/// Extractor that optionally gets the signed-in customer.
///
/// Missing, invalid or expired tokens all yield `None`, so guest checkout
/// keeps working with a stale token in the client.
pub struct OptionalUser(pub Option<User>);

impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            return Ok(Self(None));
        };

        match load_user(state, token).await {
            Ok(user) => Ok(Self(Some(user))),
            Err(AuthRejection::Internal(err)) => {
                tracing::warn!(error = %err, "Optional auth lookup failed, continuing as guest");
                Ok(Self(None))
            }
            Err(_) => Ok(Self(None)),
        }
    }
}

/// Extractor that requires a back-office token.
pub struct RequireAdmin(pub AdminClaims);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthRejection::MissingAdminToken)?;
        let claims = state
            .tokens()
            .verify_admin_token(token)
            .map_err(AuthRejection::Invalid)?;

        set_sentry_user(&claims.sub, Some(&claims.email));
        Ok(Self(claims))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/users/profile");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts_with(Some("Bearer abc.def"))), Some("abc.def"));
        assert_eq!(bearer_token(&parts_with(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&parts_with(Some("Bearer   "))), None);
        assert_eq!(bearer_token(&parts_with(None)), None);
    }

    #[tokio::test]
    async fn test_require_admin_rejects_customer_token() {
        let state = AppState::for_tests();
        let token = state
            .tokens()
            .issue_user_token(alankree_core::UserId::new(1))
            .unwrap();
        let mut parts = parts_with(Some(&format!("Bearer {token}")));

        let rejection = RequireAdmin::from_request_parts(&mut parts, &state)
            .await
            .err()
            .unwrap();
        assert_eq!(rejection.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_require_admin_accepts_admin_token() {
        let state = AppState::for_tests();
        let token = state.tokens().issue_admin_token().unwrap();
        let mut parts = parts_with(Some(&format!("Bearer {token}")));

        let RequireAdmin(claims) = RequireAdmin::from_request_parts(&mut parts, &state)
            .await
            .ok()
            .unwrap();
        assert_eq!(claims.email, "admin@alankree.in");
    }

    #[tokio::test]
    async fn test_optional_user_ignores_bad_tokens() {
        let state = AppState::for_tests();
        let mut parts = parts_with(Some("Bearer not-a-token"));
        let OptionalUser(user) = OptionalUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert!(user.is_none());
    }

    #[tokio::test]
    async fn test_require_user_without_token() {
        let state = AppState::for_tests();
        let mut parts = parts_with(None);
        let rejection = RequireUser::from_request_parts(&mut parts, &state)
            .await
            .err()
            .unwrap();
        assert!(matches!(rejection, AuthRejection::MissingToken));
    }
}
