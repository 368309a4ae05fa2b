//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::db::{CatalogLookup, OrderStore, UserDirectory};
use crate::services::{CheckoutDeps, NotificationSink};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Storage is reached through the
/// capability traits so tests can run the real router on in-memory stores.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    catalog: Arc<dyn CatalogLookup>,
    orders: Arc<dyn OrderStore>,
    users: Arc<dyn UserDirectory>,
    notifier: Arc<dyn NotificationSink>,
}

/// Storage and notification backends for [`AppState`].
pub struct Backends {
    pub catalog: Arc<dyn CatalogLookup>,
    pub orders: Arc<dyn OrderStore>,
    pub users: Arc<dyn UserDirectory>,
    pub notifier: Arc<dyn NotificationSink>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// `pool` is only used by the readiness probe; everything else goes
    /// through `backends`.
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool, backends: Backends) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                catalog: backends.catalog,
                orders: backends.orders,
                users: backends.users,
                notifier: backends.notifier,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn catalog(&self) -> &dyn CatalogLookup {
        self.inner.catalog.as_ref()
    }

    #[must_use]
    pub fn orders(&self) -> &dyn OrderStore {
        self.inner.orders.as_ref()
    }

    /// Collaborators for [`crate::services::create_order`].
    #[must_use]
    pub fn checkout_deps(&self) -> CheckoutDeps<'_> {
        CheckoutDeps {
            catalog: self.inner.catalog.as_ref(),
            orders: self.inner.orders.as_ref(),
            users: self.inner.users.as_ref(),
            notifier: self.inner.notifier.as_ref(),
            notify_timeout: self.inner.config.notify_timeout,
        }
    }
}
