//! Notification recipient registry (`shop.notification_recipients`).

use async_trait::async_trait;
use sqlx::PgPool;

use partsyard_core::RecipientId;

use super::{Recipient, RecipientDirectory, RepositoryError, conflict_or_database};

#[derive(Debug, sqlx::FromRow)]
struct RecipientRow {
    id: RecipientId,
    name: String,
    chat_id: i64,
    is_active: bool,
}

impl From<RecipientRow> for Recipient {
    fn from(row: RecipientRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            chat_id: row.chat_id,
            is_active: row.is_active,
        }
    }
}

/// Recipient registry backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgRecipientDirectory {
    pool: PgPool,
}

impl PgRecipientDirectory {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecipientDirectory for PgRecipientDirectory {
    async fn active_recipients(&self) -> Result<Vec<Recipient>, RepositoryError> {
        let rows = sqlx::query_as::<_, RecipientRow>(
            r"
            SELECT id, name, chat_id, is_active
            FROM shop.notification_recipients
            WHERE is_active
            ORDER BY id
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Recipient::from).collect())
    }

    async fn list(&self) -> Result<Vec<Recipient>, RepositoryError> {
        let rows = sqlx::query_as::<_, RecipientRow>(
            r"
            SELECT id, name, chat_id, is_active
            FROM shop.notification_recipients
            ORDER BY id
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Recipient::from).collect())
    }

    #[tracing::instrument(skip(self))]
    async fn add(&self, name: &str, chat_id: i64) -> Result<Recipient, RepositoryError> {
        let row = sqlx::query_as::<_, RecipientRow>(
            r"
            INSERT INTO shop.notification_recipients (name, chat_id)
            VALUES ($1, $2)
            RETURNING id, name, chat_id, is_active
            ",
        )
        .bind(name)
        .bind(chat_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_database(e, "recipient with this chat ID"))?;

        Ok(row.into())
    }

    #[tracing::instrument(skip(self))]
    async fn deactivate(&self, chat_id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.notification_recipients
            SET is_active = FALSE
            WHERE chat_id = $1
            ",
        )
        .bind(chat_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
