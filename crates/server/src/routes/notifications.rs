//! Back-office notification feed routes. Every route requires an admin token.

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::extract::{ApiPath, ApiQuery, Success};
use crate::middleware::RequireAdmin;
use crate::services::notifications::{DEFAULT_LIST_LIMIT, NotificationPage, NotificationStats};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct StatsBody {
    pub stats: NotificationStats,
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: &'static str,
}

fn not_found() -> AppError {
    AppError::NotFound("Notification not found".to_string())
}

/// GET /api/notifications?unreadOnly=true&limit=20
#[instrument(skip(state, _admin))]
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiQuery(params): ApiQuery<ListParams>,
) -> Result<Success<NotificationPage>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let page = state.notifications().list(params.unread_only, limit).await;
    Ok(Success::new(page))
}

/// GET /api/notifications/stats
#[instrument(skip_all)]
pub async fn stats(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Success<StatsBody>> {
    let stats = state.notifications().stats().await;
    Ok(Success::new(StatsBody { stats }))
}

/// PUT /api/notifications/{id}/read
#[instrument(skip(state, _admin))]
pub async fn mark_read(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Success<Message>> {
    if !state.notifications().mark_read(id).await {
        return Err(not_found());
    }
    Ok(Success::new(Message {
        message: "Notification marked as read",
    }))
}

/// PUT /api/notifications/mark-all-read
#[instrument(skip_all)]
pub async fn mark_all_read(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Success<Message>> {
    let changed = state.notifications().mark_all_read().await;
    tracing::debug!(changed, "Marked notifications read");
    Ok(Success::new(Message {
        message: "All notifications marked as read",
    }))
}

/// DELETE /api/notifications/{id}
#[instrument(skip(state, _admin))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Success<Message>> {
    if !state.notifications().delete(id).await {
        return Err(not_found());
    }
    Ok(Success::new(Message {
        message: "Notification deleted",
    }))
}
