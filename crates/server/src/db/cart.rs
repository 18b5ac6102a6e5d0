//! Cart and wishlist repositories.

use sqlx::PgPool;

use alankree_core::{ProductId, UserId};

use super::RepositoryError;
use crate::models::{CartLine, Product};

const JOINED_PRODUCT_COLUMNS: &str = "p.id, p.name, p.description, p.price, p.original_price, \
     p.category, p.image, p.rating, p.reviews, p.sizes, p.stock, p.created_at, p.updated_at";

#[derive(sqlx::FromRow)]
struct CartLineRow {
    #[sqlx(flatten)]
    product: Product,
    quantity: i32,
}

/// Repository for a user's cart.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Cart lines with their products, in the order they were added.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineRow>(&format!(
            r"
            SELECT {JOINED_PRODUCT_COLUMNS}, c.quantity
            FROM cart_items c
            JOIN products p ON p.id = c.product_id
            WHERE c.user_id = $1
            ORDER BY c.added_at, p.id
            "
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| CartLine {
                product: row.product,
                quantity: row.quantity,
            })
            .collect())
    }

    /// Add a product, summing with any quantity already in the cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the product does not exist.
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO cart_items (user_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "product does not exist"))?;
        Ok(())
    }

    /// Set the quantity of an existing line. Returns `false` if the product
    /// is not in the cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn set_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE cart_items SET quantity = $3 WHERE user_id = $1 AND product_id = $2",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove a line. Returns `false` if the product was not in the cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn remove(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn clear(&self, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}

/// Repository for a user's wishlist.
pub struct WishlistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WishlistRepository<'a> {
    /// Create a new wishlist repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Wishlisted products, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn products(&self, user_id: UserId) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            r"
            SELECT {JOINED_PRODUCT_COLUMNS}
            FROM wishlist_items w
            JOIN products p ON p.id = w.product_id
            WHERE w.user_id = $1
            ORDER BY w.added_at DESC, p.id
            "
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(products)
    }

    /// Add a product. Returns `false` if it was already wishlisted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the product does not exist.
    pub async fn add(&self, user_id: UserId, product_id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO wishlist_items (user_id, product_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, product_id) DO NOTHING
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "product does not exist"))?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove a product. Returns `false` if it was not wishlisted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn remove(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1 AND product_id = $2")
                .bind(user_id)
                .bind(product_id)
                .execute(self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
