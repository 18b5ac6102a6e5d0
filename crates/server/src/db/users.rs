//! User repository.

use sqlx::PgPool;

use alankree_core::{Email, UserId};

use super::RepositoryError;
use crate::models::User;

const USER_COLUMNS: &str = "id, name, email, phone, role, is_registered, is_active, \
     preferences, last_login, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct UserWithHashRow {
    #[sqlx(flatten)]
    user: User,
    password_hash: Option<String>,
}

/// Profile fields a customer may change.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub preferences: Option<serde_json::Value>,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(user)
    }

    /// Get a user by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;
        Ok(user)
    }

    /// Get a user together with their password hash for login.
    ///
    /// Guest records have no hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, Option<String>)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithHashRow>(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(|r| (r.user, r.password_hash)))
    }

    /// Register an account, upgrading a guest record for the same email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a registered account already
    /// uses the email.
    pub async fn register(
        &self,
        name: &str,
        email: &Email,
        phone: Option<&str>,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(&format!(
            r"
            INSERT INTO users (name, email, phone, password_hash, is_registered)
            VALUES ($1, $2, $3, $4, TRUE)
            ON CONFLICT (email) DO UPDATE
            SET name = EXCLUDED.name,
                phone = COALESCE(EXCLUDED.phone, users.phone),
                password_hash = EXCLUDED.password_hash,
                is_registered = TRUE,
                updated_at = now()
            WHERE users.is_registered = FALSE
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(name)
        .bind(email)
        .bind(phone)
        .bind(password_hash)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| RepositoryError::Conflict("email already registered".to_string()))
    }

    /// Create an unregistered record for a guest checkout if none exists.
    ///
    /// Returns `true` when a record was created.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn ensure_guest(
        &self,
        name: &str,
        email: &Email,
        phone: Option<&str>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO users (name, email, phone, is_registered)
            VALUES ($1, $2, $3, FALSE)
            ON CONFLICT (email) DO NOTHING
            ",
        )
        .bind(name)
        .bind(email)
        .bind(phone)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Stamp a successful login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn record_login(&self, id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE users SET last_login = now() WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Apply a profile update. Absent fields are left unchanged.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate,
    ) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(&format!(
            r"
            UPDATE users
            SET name = COALESCE($2, name),
                phone = COALESCE($3, phone),
                preferences = COALESCE($4, preferences),
                updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&update.name)
        .bind(&update.phone)
        .bind(&update.preferences)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Replace a user's password hash, marking the account registered.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no user has the email.
    pub async fn set_password(
        &self,
        email: &Email,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE users
            SET password_hash = $2, is_registered = TRUE, updated_at = now()
            WHERE email = $1
            ",
        )
        .bind(email)
        .bind(password_hash)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Customer accounts (role `user`), newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_customers(&self) -> Result<Vec<User>, RepositoryError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = 'user' ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(users)
    }

    /// Delete users whose email ends with `@domain`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete_by_email_domain(&self, domain: &str) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE email LIKE '%@' || $1")
            .bind(domain)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
