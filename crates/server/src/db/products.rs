//! Product repository.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgPool, Postgres, QueryBuilder};

use alankree_core::{Price, ProductCategory, ProductId};

use super::RepositoryError;
use crate::models::{LOW_STOCK_THRESHOLD, Product, ProductDraft};

const PRODUCT_COLUMNS: &str = "id, name, description, price, original_price, category, image, \
     rating, reviews, sizes, stock, created_at, updated_at";

/// Sort orders offered by the back-office catalog view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CatalogSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

impl CatalogSort {
    /// Parse the `sortBy` query value, falling back to newest first.
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("price_asc") => Self::PriceAsc,
            Some("price_desc") => Self::PriceDesc,
            Some("name") => Self::Name,
            _ => Self::Newest,
        }
    }

    const fn order_by(self) -> &'static str {
        match self {
            Self::Newest => " ORDER BY created_at DESC, id DESC",
            Self::PriceAsc => " ORDER BY price ASC, id ASC",
            Self::PriceDesc => " ORDER BY price DESC, id DESC",
            Self::Name => " ORDER BY lower(name) ASC, id ASC",
        }
    }
}

/// Catalog filter.
#[derive(Debug, Clone, Default)]
pub struct CatalogQuery {
    pub category: Option<ProductCategory>,
    /// Case-insensitive match against name and description.
    pub search: Option<String>,
    pub sort: CatalogSort,
}

/// Price statistics for one category.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStats {
    pub category: ProductCategory,
    pub count: i64,
    pub average_price: Price,
    pub min_price: Price,
    pub max_price: Price,
}

#[derive(sqlx::FromRow)]
struct CategoryStatsRow {
    category: ProductCategory,
    count: i64,
    average_price: Option<Decimal>,
    min_price: Option<Decimal>,
    max_price: Option<Decimal>,
}

/// Units and revenue sold for one product across non-cancelled orders.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesStats {
    pub total_sold: i64,
    pub total_revenue: Price,
    pub order_count: i64,
}

#[derive(sqlx::FromRow)]
struct SalesStatsRow {
    product_id: ProductId,
    total_sold: Option<i64>,
    total_revenue: Option<Decimal>,
    order_count: i64,
}

/// Stock overview for the inventory screen.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryReport {
    pub low_stock: Vec<Product>,
    pub out_of_stock: Vec<Product>,
    pub total_products: i64,
    pub total_units: i64,
    /// Sum of price x stock.
    pub total_inventory_value: Price,
}

#[derive(sqlx::FromRow)]
struct InventoryTotalsRow {
    total_products: i64,
    total_units: Option<i64>,
    total_value: Option<Decimal>,
}

/// Convert an aggregate that may be NULL (no rows) or fractional into a price.
fn price_or_zero(value: Option<Decimal>) -> Result<Price, RepositoryError> {
    value.map_or(Ok(Price::ZERO), |amount| {
        Price::new(amount)
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid price aggregate: {e}")))
    })
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List products, optionally filtered, sorted and searched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, query: &CatalogQuery) -> Result<Vec<Product>, RepositoryError> {
        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE TRUE"));

        if let Some(category) = query.category {
            builder.push(" AND category = ").push_bind(category);
        }

        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", escape_like(search));
            builder
                .push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        builder.push(query.sort.order_by());

        let products = builder
            .build_query_as::<Product>()
            .fetch_all(self.pool)
            .await?;
        Ok(products)
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(product)
    }

    /// Insert a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, draft: &ProductDraft) -> Result<Product, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            r"
            INSERT INTO products
                (name, description, price, original_price, category, image,
                 rating, reviews, sizes, stock)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(draft.price)
        .bind(draft.original_price)
        .bind(draft.category)
        .bind(&draft.image)
        .bind(draft.rating)
        .bind(draft.reviews)
        .bind(&draft.sizes)
        .bind(draft.stock)
        .fetch_one(self.pool)
        .await?;
        Ok(product)
    }

    /// Replace every editable field of a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn update(
        &self,
        id: ProductId,
        draft: &ProductDraft,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            r"
            UPDATE products
            SET name = $2, description = $3, price = $4, original_price = $5,
                category = $6, image = $7, rating = $8, reviews = $9,
                sizes = $10, stock = $11, updated_at = now()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(draft.price)
        .bind(draft.original_price)
        .bind(draft.category)
        .bind(&draft.image)
        .bind(draft.rating)
        .bind(draft.reviews)
        .bind(&draft.sizes)
        .bind(draft.stock)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a product. Cart and wishlist entries cascade; orders keep
    /// their snapshot.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn delete(&self, id: ProductId) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            "DELETE FROM products WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete every product. Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete_all(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM products").execute(self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Price statistics grouped by category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn category_stats(&self) -> Result<Vec<CategoryStats>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryStatsRow>(
            r"
            SELECT category,
                   COUNT(*) AS count,
                   ROUND(AVG(price), 2) AS average_price,
                   MIN(price) AS min_price,
                   MAX(price) AS max_price
            FROM products
            GROUP BY category
            ORDER BY category
            ",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(CategoryStats {
                    category: row.category,
                    count: row.count,
                    average_price: price_or_zero(row.average_price)?,
                    min_price: price_or_zero(row.min_price)?,
                    max_price: price_or_zero(row.max_price)?,
                })
            })
            .collect()
    }

    /// Sales per product, computed from order line items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn sales_stats(&self) -> Result<HashMap<ProductId, SalesStats>, RepositoryError> {
        let rows = sqlx::query_as::<_, SalesStatsRow>(
            r"
            SELECT (item->>'productId')::int AS product_id,
                   SUM((item->>'quantity')::bigint)::bigint AS total_sold,
                   SUM((item->>'price')::numeric * (item->>'quantity')::int) AS total_revenue,
                   COUNT(DISTINCT o.id) AS order_count
            FROM orders o
            CROSS JOIN LATERAL jsonb_array_elements(o.items) AS item
            WHERE o.order_status <> 'cancelled'
              AND item ? 'productId'
            GROUP BY 1
            ",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok((
                    row.product_id,
                    SalesStats {
                        total_sold: row.total_sold.unwrap_or(0),
                        total_revenue: price_or_zero(row.total_revenue)?,
                        order_count: row.order_count,
                    },
                ))
            })
            .collect()
    }

    /// Low-stock and out-of-stock products plus inventory totals.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn inventory_report(&self) -> Result<InventoryReport, RepositoryError> {
        let low_stock = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE stock > 0 AND stock < $1 ORDER BY stock ASC, id ASC"
        ))
        .bind(LOW_STOCK_THRESHOLD)
        .fetch_all(self.pool)
        .await?;

        let out_of_stock = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE stock = 0 ORDER BY updated_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        let totals = sqlx::query_as::<_, InventoryTotalsRow>(
            r"
            SELECT COUNT(*) AS total_products,
                   SUM(stock)::bigint AS total_units,
                   SUM(price * stock) AS total_value
            FROM products
            ",
        )
        .fetch_one(self.pool)
        .await?;

        Ok(InventoryReport {
            low_stock,
            out_of_stock,
            total_products: totals.total_products,
            total_units: totals.total_units.unwrap_or(0),
            total_inventory_value: price_or_zero(totals.total_value)?,
        })
    }
}

/// Escape `LIKE` wildcards in user input.
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
