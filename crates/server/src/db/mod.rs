//! Database operations for the Alankree `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `products` - Catalog
//! - `users` - Customer accounts and guest-checkout records
//! - `user_addresses` - Saved addresses (at most one default per user)
//! - `cart_items`, `wishlist_items` - Per-user product lists
//! - `orders` - Orders with JSONB snapshots of customer, items, history
//!   and delivery tracking
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p alankree-cli -- migrate
//! ```
//!
//! Queries are built at runtime with `sqlx::query_as` and `FromRow` row
//! types, so the workspace builds without a live database.

pub mod addresses;
pub mod cart;
pub mod orders;
pub mod products;
pub mod stats;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use addresses::AddressRepository;
pub use cart::{CartRepository, WishlistRepository};
pub use orders::{NewOrder, OrderListQuery, OrderRepository, OrderSort, StockLevel};
pub use products::{
    CatalogQuery, CatalogSort, CategoryStats, InventoryReport, ProductRepository, SalesStats,
};
pub use stats::{DashboardStats, MonthlyRevenue, RecentOrder, StatsRepository, StatusCount};
pub use users::{ProfileUpdate, UserRepository};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map unique and foreign-key violations to [`RepositoryError::Conflict`].
    pub(crate) fn from_constraint(err: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && (db_err.is_unique_violation() || db_err.is_foreign_key_violation())
        {
            return Self::Conflict(message.to_owned());
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Liveness probe used by the health endpoints.
pub async fn ping(pool: &PgPool) -> bool {
    sqlx::query("SELECT 1").execute(pool).await.is_ok()
}
