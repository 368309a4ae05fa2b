//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! partsyard migrate
//! ```
//!
//! Applies `crates/storefront/migrations/` and then creates the
//! tower-sessions table used for carts.

use super::{CommandError, connect};

/// Run storefront database migrations.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running storefront migrations...");
    partsyard_storefront::db::migrate(&pool).await?;

    tracing::info!("Storefront migrations complete!");
    Ok(())
}
