//! Catalog lookups against `shop.parts`.

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;

use partsyard_core::{CatalogItem, PartId, Price};

use super::{CatalogLookup, RepositoryError};

#[derive(Debug, sqlx::FromRow)]
struct PartRow {
    id: PartId,
    title: String,
    price: Decimal,
    is_active: bool,
}

impl TryFrom<PartRow> for CatalogItem {
    type Error = RepositoryError;

    fn try_from(row: PartRow) -> Result<Self, Self::Error> {
        let price = Price::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price for part {}: {e}", row.id))
        })?;
        Ok(Self {
            id: row.id,
            title: row.title,
            price,
            is_active: row.is_active,
        })
    }
}

/// Catalog backed by the `shop.parts` table.
#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogLookup for PgCatalog {
    #[tracing::instrument(skip(self), fields(count = ids.len()))]
    async fn resolve_many(
        &self,
        ids: &[PartId],
    ) -> Result<HashMap<PartId, CatalogItem>, RepositoryError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let raw: Vec<i32> = ids.iter().map(PartId::as_i32).collect();
        let rows = sqlx::query_as::<_, PartRow>(
            r"
            SELECT id, title, price, is_active
            FROM shop.parts
            WHERE id = ANY($1)
            ",
        )
        .bind(&raw)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| CatalogItem::try_from(row).map(|item| (item.id, item)))
            .collect()
    }
}
