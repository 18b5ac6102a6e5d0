//! Address book repository.
//!
//! A partial unique index allows one default address per user, so every
//! change to the default flag clears the others first inside a transaction.

use sqlx::{PgConnection, PgPool};

use alankree_core::{AddressId, UserId};

use super::RepositoryError;
use crate::models::{Address, AddressInput};

const ADDRESS_COLUMNS: &str = "id, street, city, state, pincode, country, is_default";

/// Repository for saved addresses.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A user's addresses, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError> {
        let addresses = sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM user_addresses WHERE user_id = $1 ORDER BY created_at, id"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(addresses)
    }

    /// The default address, or the oldest one if none is flagged.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn preferred(&self, user_id: UserId) -> Result<Option<Address>, RepositoryError> {
        let address = sqlx::query_as::<_, Address>(&format!(
            r"
            SELECT {ADDRESS_COLUMNS} FROM user_addresses
            WHERE user_id = $1
            ORDER BY is_default DESC, created_at, id
            LIMIT 1
            "
        ))
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(address)
    }

    /// Add an address. The first address a user saves becomes the default.
    ///
    /// `input` must already be normalized.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the transaction fails.
    pub async fn add(
        &self,
        user_id: UserId,
        input: &AddressInput,
    ) -> Result<Vec<Address>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let existing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM user_addresses WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?;
        let is_default = input.is_default || existing == 0;
        if is_default {
            clear_default(&mut *tx, user_id).await?;
        }

        sqlx::query(
            r"
            INSERT INTO user_addresses (user_id, street, city, state, pincode, country, is_default)
            VALUES ($1, $2, $3, $4, $5, COALESCE($6, 'India'), $7)
            ",
        )
        .bind(user_id)
        .bind(&input.street)
        .bind(&input.city)
        .bind(&input.state)
        .bind(&input.pincode)
        .bind(&input.country)
        .bind(is_default)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        self.list(user_id).await
    }

    /// Replace an address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no such address.
    pub async fn update(
        &self,
        user_id: UserId,
        id: AddressId,
        input: &AddressInput,
    ) -> Result<Vec<Address>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if input.is_default {
            clear_default(&mut *tx, user_id).await?;
        }

        // Unflagging keeps the current default rather than leaving none
        let result = sqlx::query(
            r"
            UPDATE user_addresses
            SET street = $3, city = $4, state = $5, pincode = $6,
                country = COALESCE($7, country),
                is_default = $8 OR is_default
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(id)
        .bind(user_id)
        .bind(&input.street)
        .bind(&input.city)
        .bind(&input.state)
        .bind(&input.pincode)
        .bind(&input.country)
        .bind(input.is_default)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        self.list(user_id).await
    }

    /// Delete an address. Deleting the default promotes the oldest
    /// remaining address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no such address.
    pub async fn delete(
        &self,
        user_id: UserId,
        id: AddressId,
    ) -> Result<Vec<Address>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let was_default: Option<bool> = sqlx::query_scalar(
            "DELETE FROM user_addresses WHERE id = $1 AND user_id = $2 RETURNING is_default",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        match was_default {
            None => return Err(RepositoryError::NotFound),
            Some(true) => {
                sqlx::query(
                    r"
                    UPDATE user_addresses SET is_default = TRUE
                    WHERE id = (
                        SELECT id FROM user_addresses
                        WHERE user_id = $1
                        ORDER BY created_at, id
                        LIMIT 1
                    )
                    ",
                )
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
            }
            Some(false) => {}
        }

        tx.commit().await?;
        self.list(user_id).await
    }
}

async fn clear_default(conn: &mut PgConnection, user_id: UserId) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE user_addresses SET is_default = FALSE WHERE user_id = $1 AND is_default")
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(())
}
