//! Development-only data reset.

use axum::extract::State;
use serde::Serialize;
use tracing::instrument;

use crate::config::Environment;
use crate::db::{OrderRepository, ProductRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::extract::Success;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// Email domain used by seeded test accounts.
pub const DUMMY_EMAIL_DOMAIN: &str = "example.com";

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupCounts {
    pub deleted_users: u64,
    pub deleted_orders: u64,
    pub deleted_products: u64,
}

#[derive(Debug, Serialize)]
pub struct CleanupBody {
    pub message: &'static str,
    pub data: CleanupCounts,
}

fn ensure_development(environment: Environment) -> Result<()> {
    match environment {
        Environment::Development => Ok(()),
        Environment::Production => Err(AppError::Forbidden(
            "Cleanup is only available in development".to_string(),
        )),
    }
}

/// POST /api/admin/cleanup-dummy-data
///
/// Deletes `@example.com` users and their orders, then every product.
#[instrument(skip_all)]
pub async fn cleanup_dummy_data(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Success<CleanupBody>> {
    ensure_development(state.config().environment)?;

    let pool = state.pool();
    let data = CleanupCounts {
        deleted_orders: OrderRepository::new(pool)
            .delete_by_email_domain(DUMMY_EMAIL_DOMAIN)
            .await?,
        deleted_users: UserRepository::new(pool)
            .delete_by_email_domain(DUMMY_EMAIL_DOMAIN)
            .await?,
        deleted_products: ProductRepository::new(pool).delete_all().await?,
    };
    tracing::warn!(
        admin = %admin.email,
        users = data.deleted_users,
        orders = data.deleted_orders,
        products = data.deleted_products,
        "Dummy data cleaned up"
    );

    Ok(Success::new(CleanupBody {
        message: "Dummy data cleaned up successfully",
        data,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_refused_in_production() {
        assert!(ensure_development(Environment::Development).is_ok());
        assert!(matches!(
            ensure_development(Environment::Production),
            Err(AppError::Forbidden(_))
        ));
    }
}
