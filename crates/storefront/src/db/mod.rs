//! Database operations for storefront `PostgreSQL`.
//!
//! # Schema: `shop`
//!
//! - `parts` - Catalog (written by the inventory import job, read-only here)
//! - `users` - Registered customers and staff
//! - `orders` - Placed orders, status stored as a three-letter code
//! - `order_items` - Order lines with snapshotted name and price
//! - `notification_recipients` - Telegram chats that receive new orders
//!
//! Sessions live in the `tower_sessions` schema managed by the session store.
//!
//! # Capabilities
//!
//! Request handlers and the checkout service never touch the pool directly.
//! They go through the traits below so tests can swap in the in-memory
//! implementations from [`memory`].
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p partsyard-cli -- migrate
//! ```

pub mod memory;
pub mod orders;
pub mod parts;
pub mod recipients;
pub mod users;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use tower_sessions_sqlx_store::PostgresStore;

use partsyard_core::{
    CatalogItem, Email, NewOrder, Order, OrderId, OrderStatus, PartId, RecipientId, UserId,
};

pub use memory::{InMemoryCatalog, InMemoryOrderStore, InMemoryRecipients, InMemoryUsers};
pub use orders::PgOrderStore;
pub use parts::PgCatalog;
pub use recipients::PgRecipientDirectory;
pub use users::PgUserDirectory;

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

    /// Constraint violation (e.g., duplicate chat ID).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Registered account matched by email at checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub email: String,
    pub is_staff: bool,
}

/// A chat that receives new-order notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub id: RecipientId,
    pub name: String,
    pub chat_id: i64,
    pub is_active: bool,
}

/// Batched catalog resolution.
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    /// Resolve every ID in one round trip. IDs that do not exist are simply
    /// absent from the returned map.
    async fn resolve_many(
        &self,
        ids: &[PartId],
    ) -> Result<HashMap<PartId, CatalogItem>, RepositoryError>;

    /// Resolve a single part.
    async fn get(&self, id: PartId) -> Result<Option<CatalogItem>, RepositoryError> {
        Ok(self.resolve_many(&[id]).await?.remove(&id))
    }
}

/// Durable order storage.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert the order and all of its items atomically.
    ///
    /// The order is created with status `NEW` and `is_paid = false`. On error
    /// nothing is persisted.
    async fn create(&self, order: &NewOrder) -> Result<Order, RepositoryError>;

    /// Fetch an order with its items.
    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Orders linked to `user_id` or placed with `email` (case-insensitive),
    /// newest first.
    async fn list_for_customer(
        &self,
        user_id: UserId,
        email: &Email,
    ) -> Result<Vec<Order>, RepositoryError>;

    /// Every order, newest first.
    async fn list_all(&self) -> Result<Vec<Order>, RepositoryError>;

    /// Set the status and return the updated order.
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError>;

    /// Set the paid flag and return the updated order.
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    async fn set_paid(&self, id: OrderId, is_paid: bool) -> Result<Order, RepositoryError>;
}

/// Lookup of registered accounts.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Find an account by email, ignoring case.
    async fn find_by_email(&self, email: &Email) -> Result<Option<UserRecord>, RepositoryError>;
}

/// Registry of notification recipients.
#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    /// Recipients with `is_active = true`.
    async fn active_recipients(&self) -> Result<Vec<Recipient>, RepositoryError>;

    /// All recipients, active or not.
    async fn list(&self) -> Result<Vec<Recipient>, RepositoryError>;

    /// Register a chat.
    ///
    /// Returns `RepositoryError::Conflict` if the chat ID is already registered.
    async fn add(&self, name: &str, chat_id: i64) -> Result<Recipient, RepositoryError>;

    /// Stop sending to a chat without deleting it.
    ///
    /// Returns `RepositoryError::NotFound` if no recipient has this chat ID.
    async fn deactivate(&self, chat_id: i64) -> Result<(), RepositoryError>;
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

/// Run the `shop` schema migrations and create the session table.
///
/// # Errors
///
/// Returns `sqlx::migrate::MigrateError` if a migration fails, or wraps the
/// session store error in the same type.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    PostgresStore::new(pool.clone())
        .migrate()
        .await
        .map_err(sqlx::migrate::MigrateError::Execute)?;
    Ok(())
}

/// Map a unique-constraint violation to `RepositoryError::Conflict`.
pub(crate) fn conflict_or_database(err: sqlx::Error, what: &str) -> RepositoryError {
    match err {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            RepositoryError::Conflict(format!("{what} already exists"))
        }
        other => RepositoryError::Database(other),
    }
}
