//! Dashboard aggregation queries.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use alankree_core::{OrderId, OrderStatus, Price};

use super::RepositoryError;
use crate::models::LOW_STOCK_THRESHOLD;

/// Days of delivered orders included in the monthly revenue series.
const REVENUE_WINDOW_DAYS: i32 = 180;

const RECENT_ORDER_COUNT: i64 = 5;

/// Headline numbers for the back-office dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_orders: i64,
    pub pending_orders: i64,
    pub delivered_orders: i64,
    /// Sum of delivered order totals.
    pub total_revenue: Price,
    pub total_products: i64,
    pub low_stock_products: i64,
    pub recent_orders: Vec<RecentOrder>,
    pub orders_by_status: Vec<StatusCount>,
    pub monthly_revenue: Vec<MonthlyRevenue>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RecentOrder {
    pub id: OrderId,
    pub customer: String,
    pub amount: Price,
    pub status: OrderStatus,
    /// `YYYY-MM-DD`.
    pub date: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRevenue {
    pub year: i32,
    pub month: i32,
    pub revenue: Price,
    pub orders: i64,
}

#[derive(sqlx::FromRow)]
struct OrderTotalsRow {
    total_orders: i64,
    pending_orders: i64,
    delivered_orders: i64,
    total_revenue: Option<Decimal>,
}

#[derive(sqlx::FromRow)]
struct ProductTotalsRow {
    total_products: i64,
    low_stock_products: i64,
}

#[derive(sqlx::FromRow)]
struct MonthlyRevenueRow {
    year: i32,
    month: i32,
    revenue: Decimal,
    orders: i64,
}

fn to_price(amount: Decimal) -> Result<Price, RepositoryError> {
    Price::new(amount).map_err(|e| RepositoryError::DataCorruption(format!("revenue: {e}")))
}

/// Repository for dashboard aggregates.
pub struct StatsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StatsRepository<'a> {
    /// Create a new stats repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Compute every dashboard figure.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn dashboard(&self) -> Result<DashboardStats, RepositoryError> {
        let orders = sqlx::query_as::<_, OrderTotalsRow>(
            r"
            SELECT COUNT(*) AS total_orders,
                   COUNT(*) FILTER (WHERE order_status = 'pending') AS pending_orders,
                   COUNT(*) FILTER (WHERE order_status = 'delivered') AS delivered_orders,
                   SUM(total_price) FILTER (WHERE order_status = 'delivered') AS total_revenue
            FROM orders
            ",
        )
        .fetch_one(self.pool)
        .await?;

        let products = sqlx::query_as::<_, ProductTotalsRow>(
            r"
            SELECT COUNT(*) AS total_products,
                   COUNT(*) FILTER (WHERE stock < $1) AS low_stock_products
            FROM products
            ",
        )
        .bind(LOW_STOCK_THRESHOLD)
        .fetch_one(self.pool)
        .await?;

        let recent_orders = sqlx::query_as::<_, RecentOrder>(
            r"
            SELECT id,
                   customer_name AS customer,
                   total_price AS amount,
                   order_status AS status,
                   to_char(created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD') AS date
            FROM orders
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            ",
        )
        .bind(RECENT_ORDER_COUNT)
        .fetch_all(self.pool)
        .await?;

        let orders_by_status = self.status_counts().await?;

        let monthly_revenue = sqlx::query_as::<_, MonthlyRevenueRow>(
            r"
            SELECT EXTRACT(YEAR FROM created_at)::int AS year,
                   EXTRACT(MONTH FROM created_at)::int AS month,
                   SUM(total_price) AS revenue,
                   COUNT(*) AS orders
            FROM orders
            WHERE order_status = 'delivered'
              AND created_at >= now() - make_interval(days => $1)
            GROUP BY 1, 2
            ORDER BY 1, 2
            ",
        )
        .bind(REVENUE_WINDOW_DAYS)
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(|row| {
            Ok(MonthlyRevenue {
                year: row.year,
                month: row.month,
                revenue: to_price(row.revenue)?,
                orders: row.orders,
            })
        })
        .collect::<Result<Vec<_>, RepositoryError>>()?;

        Ok(DashboardStats {
            total_orders: orders.total_orders,
            pending_orders: orders.pending_orders,
            delivered_orders: orders.delivered_orders,
            total_revenue: orders.total_revenue.map_or(Ok(Price::ZERO), to_price)?,
            total_products: products.total_products,
            low_stock_products: products.low_stock_products,
            recent_orders,
            orders_by_status,
            monthly_revenue,
        })
    }

    /// Number of orders in each status that has at least one order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn status_counts(&self) -> Result<Vec<StatusCount>, RepositoryError> {
        let counts = sqlx::query_as::<_, StatusCount>(
            r"
            SELECT order_status AS status, COUNT(*) AS count
            FROM orders
            GROUP BY order_status
            ORDER BY order_status
            ",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(counts)
    }
}
