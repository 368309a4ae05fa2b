//! Order repository for database operations.
//!
//! An order and its items are always written in one transaction, so a reader
//! never sees an order without its lines or lines without their order.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use partsyard_core::{
    Email, NewOrder, NewOrderItem, Order, OrderId, OrderItem, OrderItemId, OrderStatus, PartId,
    Price, UserId,
};

use super::{OrderStore, RepositoryError};

const ORDER_COLUMNS: &str = "id, user_id, first_name, last_name, email, phone, \
     requires_delivery, delivery_address, is_paid, status, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, order_id, part_id, name, price, quantity, created_at";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: Option<UserId>,
    first_name: String,
    last_name: String,
    email: String,
    phone: String,
    requires_delivery: bool,
    delivery_address: String,
    is_paid: bool,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: OrderItemId,
    order_id: OrderId,
    part_id: Option<PartId>,
    name: String,
    price: Decimal,
    quantity: i32,
    created_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, RepositoryError> {
        let status = OrderStatus::from_code(&self.status).map_err(|e| {
            RepositoryError::DataCorruption(format!("order {}: {e}", self.id))
        })?;

        Ok(Order {
            id: self.id,
            user_id: self.user_id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            requires_delivery: self.requires_delivery,
            delivery_address: self.delivery_address,
            is_paid: self.is_paid,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
            items,
        })
    }
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        let price = Price::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("order item {}: {e}", row.id))
        })?;
        let quantity = u32::try_from(row.quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "order item {}: negative quantity {}",
                row.id, row.quantity
            ))
        })?;

        Ok(Self {
            id: row.id,
            order_id: row.order_id,
            part_id: row.part_id,
            name: row.name,
            price,
            quantity,
            created_at: row.created_at,
        })
    }
}

/// Order storage backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    /// Create a new order store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_item(
        tx: &mut Transaction<'_, Postgres>,
        order_id: OrderId,
        item: &NewOrderItem,
    ) -> Result<OrderItem, RepositoryError> {
        let quantity = i32::try_from(item.quantity).map_err(|_| {
            RepositoryError::Conflict(format!("quantity {} is out of range", item.quantity))
        })?;

        let row = sqlx::query_as::<_, OrderItemRow>(&format!(
            r"
            INSERT INTO shop.order_items (order_id, part_id, name, price, quantity)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ITEM_COLUMNS}
            "
        ))
        .bind(order_id)
        .bind(item.part_id)
        .bind(&item.name)
        .bind(item.price.amount())
        .bind(quantity)
        .fetch_one(&mut **tx)
        .await?;

        row.try_into()
    }

    /// Load items for a set of orders, grouped by order.
    async fn items_for(
        &self,
        order_ids: &[OrderId],
    ) -> Result<HashMap<OrderId, Vec<OrderItem>>, RepositoryError> {
        let raw: Vec<i32> = order_ids.iter().map(OrderId::as_i32).collect();
        let rows = sqlx::query_as::<_, OrderItemRow>(&format!(
            r"
            SELECT {ITEM_COLUMNS}
            FROM shop.order_items
            WHERE order_id = ANY($1)
            ORDER BY id
            "
        ))
        .bind(&raw)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            let item = OrderItem::try_from(row)?;
            grouped.entry(item.order_id).or_default().push(item);
        }
        Ok(grouped)
    }

    async fn attach_items(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        let ids: Vec<OrderId> = rows.iter().map(|r| r.id).collect();
        let mut items = self.items_for(&ids).await?;
        rows.into_iter()
            .map(|row| {
                let lines = items.remove(&row.id).unwrap_or_default();
                row.into_order(lines)
            })
            .collect()
    }

    async fn get_required(&self, id: OrderId) -> Result<Order, RepositoryError> {
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    #[tracing::instrument(skip(self, order), fields(items = order.items.len()))]
    async fn create(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let buyer = &order.buyer;
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            INSERT INTO shop.orders
                (user_id, first_name, last_name, email, phone,
                 requires_delivery, delivery_address, is_paid, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE, $8)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(order.user_id)
        .bind(&buyer.first_name)
        .bind(&buyer.last_name)
        .bind(buyer.email.as_str())
        .bind(buyer.phone.as_str())
        .bind(buyer.requires_delivery)
        .bind(&buyer.delivery_address)
        .bind(OrderStatus::New.code())
        .fetch_one(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(order.items.len());
        for item in &order.items {
            items.push(Self::insert_item(&mut tx, row.id, item).await?);
        }

        // Dropping `tx` on any error above rolls the whole order back.
        tx.commit().await?;

        let created = row.into_order(items)?;
        tracing::info!(order_id = %created.id, "Order persisted");
        Ok(created)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.attach_items(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_for_customer(
        &self,
        user_id: UserId,
        email: &Email,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            SELECT {ORDER_COLUMNS}
            FROM shop.orders
            WHERE user_id = $1 OR lower(email) = lower($2)
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(user_id)
        .bind(email.as_str())
        .fetch_all(&self.pool)
        .await?;

        self.attach_items(rows).await
    }

    async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.orders ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        self.attach_items(rows).await
    }

    #[tracing::instrument(skip(self))]
    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.orders
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(status.code())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get_required(id).await
    }

    #[tracing::instrument(skip(self))]
    async fn set_paid(&self, id: OrderId, is_paid: bool) -> Result<Order, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.orders
            SET is_paid = $2, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(is_paid)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get_required(id).await
    }
}
