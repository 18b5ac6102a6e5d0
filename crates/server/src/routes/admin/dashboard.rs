//! Dashboard figures.

use axum::extract::State;
use serde::Serialize;
use tracing::instrument;

use crate::db::{DashboardStats, StatsRepository};
use crate::error::Result;
use crate::extract::Success;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct DashboardBody {
    pub stats: DashboardStats,
}

/// GET /api/admin/dashboard and /api/admin/dashboard-stats
#[instrument(skip_all)]
pub async fn stats(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Success<DashboardBody>> {
    let stats = StatsRepository::new(state.pool()).dashboard().await?;
    Ok(Success::new(DashboardBody { stats }))
}
