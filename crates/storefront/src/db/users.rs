//! User repository for database operations.
//!
//! Accounts are created by the registration flow. Checkout only needs to find
//! one by email to link a guest-looking order to an existing customer.

use async_trait::async_trait;
use sqlx::PgPool;

use partsyard_core::{Email, UserId};

use super::{RepositoryError, UserDirectory, UserRecord};

/// Account directory backed by `shop.users`.
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    /// Create a new user directory.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    /// Get a user by their email address, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    async fn find_by_email(&self, email: &Email) -> Result<Option<UserRecord>, RepositoryError> {
        let row: Option<(UserId, String, bool)> = sqlx::query_as(
            r"
            SELECT id, email, is_staff
            FROM shop.users
            WHERE lower(email) = lower($1)
            ORDER BY id
            LIMIT 1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, email, is_staff)| UserRecord {
            id,
            email,
            is_staff,
        }))
    }
}
