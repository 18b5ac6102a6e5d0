//! Order repository.
//!
//! Orders store their sub-documents (address, items, history, delivery) as
//! JSONB. Status changes are a single guarded `UPDATE` so the status, its
//! timestamp column and the history append land together.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};

use alankree_core::{Email, OrderId, OrderStatus, PaymentMethod, Price, ProductId};

use super::RepositoryError;
use crate::models::{
    Customer, Delivery, Order, OrderItem, PaymentResult, ShippingAddress, StatusChange,
};

const ORDER_COLUMNS: &str = "id, customer_name, customer_email, customer_phone, \
     shipping_address, items, payment_method, payment_result, total_price, order_status, \
     status_history, confirmed_at, processing_at, shipped_at, delivered_at, cancelled_at, \
     delivery, notes, admin_notes, created_at, updated_at";

/// Default page size for the back-office order list.
pub const DEFAULT_PAGE_SIZE: i64 = 50;

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    customer_name: String,
    customer_email: Email,
    customer_phone: Option<String>,
    shipping_address: Json<ShippingAddress>,
    items: Json<Vec<OrderItem>>,
    payment_method: PaymentMethod,
    payment_result: Option<Json<PaymentResult>>,
    total_price: Price,
    order_status: OrderStatus,
    status_history: Json<Vec<StatusChange>>,
    confirmed_at: Option<DateTime<Utc>>,
    processing_at: Option<DateTime<Utc>>,
    shipped_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    delivery: Json<Delivery>,
    notes: Option<String>,
    admin_notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            order_number: row.id.order_number(),
            customer: Customer {
                name: row.customer_name,
                email: row.customer_email,
                phone: row.customer_phone,
                address: row.shipping_address.0,
            },
            items: row.items.0,
            payment_method: row.payment_method,
            payment_result: row.payment_result.map(|json| json.0),
            total_price: row.total_price,
            order_status: row.order_status,
            status_history: row.status_history.0,
            confirmed_at: row.confirmed_at,
            processing_at: row.processing_at,
            shipped_at: row.shipped_at,
            delivered_at: row.delivered_at,
            cancelled_at: row.cancelled_at,
            delivery: row.delivery.0,
            notes: row.notes,
            admin_notes: row.admin_notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// A validated order ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer: Customer,
    pub items: Vec<OrderItem>,
    pub payment_method: PaymentMethod,
    pub payment_result: Option<PaymentResult>,
    pub total_price: Price,
    pub notes: Option<String>,
    pub initial_change: StatusChange,
}

/// Stock left for a product after checkout.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StockLevel {
    pub id: ProductId,
    pub name: String,
    pub stock: i32,
}

/// Sort key for the back-office order list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderSort {
    #[default]
    CreatedAt,
    TotalPrice,
    Status,
}

impl OrderSort {
    /// Parse the `sortBy` query value, falling back to creation time.
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("totalPrice") => Self::TotalPrice,
            Some("orderStatus") => Self::Status,
            _ => Self::CreatedAt,
        }
    }

    const fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::TotalPrice => "total_price",
            Self::Status => "order_status",
        }
    }
}

/// Filter and paging for the back-office order list.
#[derive(Debug, Clone)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    pub sort: OrderSort,
    pub descending: bool,
    /// 1-based page number.
    pub page: i64,
    pub limit: i64,
}

impl Default for OrderListQuery {
    fn default() -> Self {
        Self {
            status: None,
            sort: OrderSort::default(),
            descending: true,
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl OrderListQuery {
    fn offset(&self) -> i64 {
        (self.page.max(1) - 1) * self.limit
    }
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an order and take its catalog items out of stock.
    ///
    /// Stock never goes below zero. Returns the order and the remaining
    /// stock of every product touched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the transaction fails.
    pub async fn create(
        &self,
        order: &NewOrder,
    ) -> Result<(Order, Vec<StockLevel>), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            INSERT INTO orders
                (customer_name, customer_email, customer_phone, shipping_address, items,
                 payment_method, payment_result, total_price, order_status, status_history, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(&order.customer.name)
        .bind(&order.customer.email)
        .bind(&order.customer.phone)
        .bind(Json(&order.customer.address))
        .bind(Json(&order.items))
        .bind(order.payment_method)
        .bind(order.payment_result.as_ref().map(Json))
        .bind(order.total_price)
        .bind(order.initial_change.status)
        .bind(Json(vec![&order.initial_change]))
        .bind(&order.notes)
        .fetch_one(&mut *tx)
        .await?;

        let mut levels = Vec::new();
        for item in &order.items {
            let Some(product_id) = item.product_id else {
                continue;
            };
            let quantity = i32::try_from(item.quantity).unwrap_or(i32::MAX);
            let level = sqlx::query_as::<_, StockLevel>(
                r"
                UPDATE products
                SET stock = GREATEST(stock - $2, 0), updated_at = now()
                WHERE id = $1
                RETURNING id, name, stock
                ",
            )
            .bind(product_id)
            .bind(quantity)
            .fetch_optional(&mut *tx)
            .await?;
            // Deleted products keep their snapshot on the order
            if let Some(level) = level {
                levels.push(level);
            }
        }

        tx.commit().await?;
        Ok((row.into(), levels))
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    /// Orders placed with an email, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_email(&self, email: &Email) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE customer_email = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(email)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Orders placed with any of the given emails, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_emails(&self, emails: &[String]) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE customer_email = ANY($1) ORDER BY created_at DESC, id DESC"
        ))
        .bind(emails)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Every order, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// One page of orders plus the total number of matching orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_page(
        &self,
        query: &OrderListQuery,
    ) -> Result<(Vec<Order>, i64), RepositoryError> {
        let mut count: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM orders");
        if let Some(status) = query.status {
            count.push(" WHERE order_status = ").push_bind(status);
        }
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        let mut select: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders"));
        if let Some(status) = query.status {
            select.push(" WHERE order_status = ").push_bind(status);
        }
        let direction = if query.descending { "DESC" } else { "ASC" };
        select
            .push(format!(
                " ORDER BY {} {direction}, id {direction}",
                query.sort.column()
            ))
            .push(" LIMIT ")
            .push_bind(query.limit)
            .push(" OFFSET ")
            .push_bind(query.offset());

        let rows = select
            .build_query_as::<OrderRow>()
            .fetch_all(self.pool)
            .await?;
        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    /// Move an order to `status`, appending `change` to its history.
    ///
    /// The update only applies while the locked row is in one of
    /// `allowed_from` and is not terminal (or is already in `status`).
    /// Moving into `cancelled` returns catalog items to stock in the same
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist and
    /// `RepositoryError::Conflict` if its current status does not allow the
    /// change.
    pub async fn update_status(
        &self,
        id: OrderId,
        change: &StatusChange,
        allowed_from: &[OrderStatus],
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let previous: Option<OrderStatus> =
            sqlx::query_scalar("SELECT order_status FROM orders WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(previous) = previous else {
            return Err(RepositoryError::NotFound);
        };
        if !allowed_from.contains(&previous) {
            return Err(RepositoryError::Conflict(format!("order is already {previous}")));
        }

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            UPDATE orders
            SET order_status = $2,
                status_history = status_history || jsonb_build_array($3::jsonb),
                confirmed_at  = CASE WHEN $2 = 'confirmed'::order_status  THEN now() ELSE confirmed_at END,
                processing_at = CASE WHEN $2 = 'processing'::order_status THEN now() ELSE processing_at END,
                shipped_at    = CASE WHEN $2 = 'shipped'::order_status    THEN now() ELSE shipped_at END,
                delivered_at  = CASE WHEN $2 = 'delivered'::order_status  THEN now() ELSE delivered_at END,
                cancelled_at  = CASE WHEN $2 = 'cancelled'::order_status  THEN now() ELSE cancelled_at END,
                updated_at = now()
            WHERE id = $1
              AND (order_status NOT IN ('delivered', 'cancelled') OR order_status = $2)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(change.status)
        .bind(Json(change))
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            RepositoryError::Conflict(format!("order is already {previous}"))
        })?;

        if change.status == OrderStatus::Cancelled && previous != OrderStatus::Cancelled {
            sqlx::query(
                r"
                UPDATE products p
                SET stock = p.stock + returned.quantity, updated_at = now()
                FROM (
                    SELECT (item->>'productId')::int AS product_id,
                           SUM((item->>'quantity')::int)::int AS quantity
                    FROM orders o
                    CROSS JOIN LATERAL jsonb_array_elements(o.items) AS item
                    WHERE o.id = $1 AND item ? 'productId'
                    GROUP BY 1
                ) AS returned
                WHERE p.id = returned.product_id
                ",
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(row.into())
    }

    /// Replace delivery tracking and, when given, the admin notes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn update_delivery(
        &self,
        id: OrderId,
        delivery: &Delivery,
        admin_notes: Option<&str>,
    ) -> Result<Order, RepositoryError> {
        sqlx::query_as::<_, OrderRow>(&format!(
            r"
            UPDATE orders
            SET delivery = $2,
                admin_notes = COALESCE($3, admin_notes),
                updated_at = now()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(Json(delivery))
        .bind(admin_notes)
        .fetch_optional(self.pool)
        .await?
        .map(Into::into)
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete orders whose customer email ends with `@domain`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete_by_email_domain(&self, domain: &str) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM orders WHERE customer_email LIKE '%@' || $1")
            .bind(domain)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
