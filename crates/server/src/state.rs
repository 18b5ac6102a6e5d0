//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::services::auth::TokenService;
use crate::services::images::ImageStore;
use crate::services::notifications::NotificationCenter;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    tokens: TokenService,
    images: ImageStore,
    notifications: NotificationCenter,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration
    /// * `pool` - `PostgreSQL` connection pool
    #[must_use]
    pub fn new(config: ServerConfig, pool: PgPool) -> Self {
        let tokens = TokenService::new(&config.auth);
        let images = ImageStore::from_config(&config);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                tokens,
                images,
                notifications: NotificationCenter::new(),
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the JWT service.
    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    /// Get a reference to the product image store.
    #[must_use]
    pub fn images(&self) -> &ImageStore {
        &self.inner.images
    }

    /// Get a reference to the back-office notification feed.
    #[must_use]
    pub fn notifications(&self) -> &NotificationCenter {
        &self.inner.notifications
    }
}

#[cfg(test)]
impl AppState {
    /// State backed by a pool that never connects, for router tests that
    /// stay off the database.
    pub(crate) fn for_tests() -> Self {
        Self::for_tests_in(crate::config::Environment::Development)
    }

    pub(crate) fn for_tests_in(environment: crate::config::Environment) -> Self {
        use secrecy::ExposeSecret;

        let mut config = ServerConfig::for_tests();
        config.environment = environment;
        let pool = sqlx::postgres::PgPoolOptions::new()
            .acquire_timeout(std::time::Duration::from_millis(200))
            .connect_lazy(config.database_url.expose_secret())
            .unwrap_or_else(|e| panic!("invalid test database url: {e}"));
        Self::new(config, pool)
    }
}
