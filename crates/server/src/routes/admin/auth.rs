//! Back-office login.

use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use alankree_core::{Email, UserRole};

use crate::error::{AppError, Result};
use crate::extract::{ApiJson, Success};
use crate::services::auth::AuthService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AdminLoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProfile {
    pub email: Email,
    pub role: UserRole,
    pub is_admin: bool,
    pub login_time: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct AdminSession {
    pub message: &'static str,
    pub token: String,
    pub admin: AdminProfile,
}

/// POST /api/admin/login
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AdminLoginRequest>,
) -> Result<Success<AdminSession>> {
    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    let auth = AuthService::new(state.pool(), state.tokens(), &state.config().auth);
    let (email, token) = auth.admin_login(&request.email, &request.password)?;

    Ok(Success::new(AdminSession {
        message: "Admin login successful",
        token,
        admin: AdminProfile {
            email,
            role: UserRole::Admin,
            is_admin: true,
            login_time: Utc::now(),
        },
    }))
}
