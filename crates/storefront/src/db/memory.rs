//! In-memory implementations of the storage capabilities.
//!
//! These provide the same interface as the `PostgreSQL` implementations and
//! back the test suites. Orders are kept in a single map behind one lock, so
//! `create` is atomic the same way the database transaction is.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use partsyard_core::{
    CatalogItem, Email, NewOrder, Order, OrderId, OrderItem, OrderItemId, OrderStatus, PartId,
    RecipientId, UserId,
};

use super::{
    CatalogLookup, OrderStore, Recipient, RecipientDirectory, RepositoryError, UserDirectory,
    UserRecord,
};

/// In-memory catalog.
#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    parts: Arc<RwLock<HashMap<PartId, CatalogItem>>>,
}

impl InMemoryCatalog {
    /// Build a catalog holding `items`.
    #[must_use]
    pub fn with_items(items: impl IntoIterator<Item = CatalogItem>) -> Self {
        let parts = items.into_iter().map(|item| (item.id, item)).collect();
        Self {
            parts: Arc::new(RwLock::new(parts)),
        }
    }

    /// Insert or replace a part.
    pub async fn upsert(&self, item: CatalogItem) {
        self.parts.write().await.insert(item.id, item);
    }

    /// Delete a part, as the inventory import does for sold-out stock.
    pub async fn remove(&self, id: PartId) {
        self.parts.write().await.remove(&id);
    }
}

#[async_trait]
impl CatalogLookup for InMemoryCatalog {
    async fn resolve_many(
        &self,
        ids: &[PartId],
    ) -> Result<HashMap<PartId, CatalogItem>, RepositoryError> {
        let parts = self.parts.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| parts.get(id).map(|item| (*id, item.clone())))
            .collect())
    }
}

#[derive(Default)]
struct OrderTables {
    next_order_id: i32,
    next_item_id: i32,
    orders: BTreeMap<OrderId, Order>,
}

/// In-memory order store.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    tables: Arc<RwLock<OrderTables>>,
}

impl InMemoryOrderStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }

    /// Number of stored order items across all orders.
    pub async fn item_count(&self) -> usize {
        self.tables
            .read()
            .await
            .orders
            .values()
            .map(|o| o.items.len())
            .sum()
    }

    async fn modify(
        &self,
        id: OrderId,
        apply: impl FnOnce(&mut Order) + Send,
    ) -> Result<Order, RepositoryError> {
        let mut tables = self.tables.write().await;
        let order = tables.orders.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        apply(order);
        order.updated_at = Utc::now();
        Ok(order.clone())
    }
}

fn newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        // Same rule as the `order_items.quantity > 0` check; nothing is
        // written when any item violates it.
        if let Some(item) = order.items.iter().find(|i| i.quantity == 0) {
            return Err(RepositoryError::Conflict(format!(
                "order item {} has zero quantity",
                item.name
            )));
        }

        let mut tables = self.tables.write().await;
        let now = Utc::now();

        tables.next_order_id += 1;
        let id = OrderId::new(tables.next_order_id);

        let mut items = Vec::with_capacity(order.items.len());
        for item in &order.items {
            tables.next_item_id += 1;
            items.push(OrderItem {
                id: OrderItemId::new(tables.next_item_id),
                order_id: id,
                part_id: item.part_id,
                name: item.name.clone(),
                price: item.price,
                quantity: item.quantity,
                created_at: now,
            });
        }

        let buyer = &order.buyer;
        let created = Order {
            id,
            user_id: order.user_id,
            first_name: buyer.first_name.clone(),
            last_name: buyer.last_name.clone(),
            email: buyer.email.as_str().to_owned(),
            phone: buyer.phone.as_str().to_owned(),
            requires_delivery: buyer.requires_delivery,
            delivery_address: buyer.delivery_address.clone(),
            is_paid: false,
            status: OrderStatus::New,
            created_at: now,
            updated_at: now,
            items,
        };
        tables.orders.insert(id, created.clone());
        Ok(created)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.tables.read().await.orders.get(&id).cloned())
    }

    async fn list_for_customer(
        &self,
        user_id: UserId,
        email: &Email,
    ) -> Result<Vec<Order>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut orders: Vec<Order> = tables
            .orders
            .values()
            .filter(|o| o.user_id == Some(user_id) || o.email.eq_ignore_ascii_case(email.as_str()))
            .cloned()
            .collect();
        newest_first(&mut orders);
        Ok(orders)
    }

    async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let mut orders: Vec<Order> = self.tables.read().await.orders.values().cloned().collect();
        newest_first(&mut orders);
        Ok(orders)
    }

    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        self.modify(id, |o| o.status = status).await
    }

    async fn set_paid(&self, id: OrderId, is_paid: bool) -> Result<Order, RepositoryError> {
        self.modify(id, |o| o.is_paid = is_paid).await
    }
}

/// In-memory account directory.
#[derive(Clone, Default)]
pub struct InMemoryUsers {
    users: Arc<RwLock<Vec<UserRecord>>>,
}

impl InMemoryUsers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account.
    pub async fn insert(&self, user: UserRecord) {
        self.users.write().await.push(user);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUsers {
    async fn find_by_email(&self, email: &Email) -> Result<Option<UserRecord>, RepositoryError> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email.as_str()))
            .cloned())
    }
}

/// In-memory recipient registry.
#[derive(Clone, Default)]
pub struct InMemoryRecipients {
    recipients: Arc<RwLock<Vec<Recipient>>>,
}

impl InMemoryRecipients {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecipientDirectory for InMemoryRecipients {
    async fn active_recipients(&self) -> Result<Vec<Recipient>, RepositoryError> {
        Ok(self
            .recipients
            .read()
            .await
            .iter()
            .filter(|r| r.is_active)
            .cloned()
            .collect())
    }

    async fn list(&self) -> Result<Vec<Recipient>, RepositoryError> {
        Ok(self.recipients.read().await.clone())
    }

    async fn add(&self, name: &str, chat_id: i64) -> Result<Recipient, RepositoryError> {
        let mut recipients = self.recipients.write().await;
        if recipients.iter().any(|r| r.chat_id == chat_id) {
            return Err(RepositoryError::Conflict(
                "recipient with this chat ID already exists".to_owned(),
            ));
        }
        let next = i32::try_from(recipients.len() + 1)
            .map_err(|_| RepositoryError::Conflict("too many recipients".to_owned()))?;
        let recipient = Recipient {
            id: RecipientId::new(next),
            name: name.to_owned(),
            chat_id,
            is_active: true,
        };
        recipients.push(recipient.clone());
        Ok(recipient)
    }

    async fn deactivate(&self, chat_id: i64) -> Result<(), RepositoryError> {
        let mut recipients = self.recipients.write().await;
        let recipient = recipients
            .iter_mut()
            .find(|r| r.chat_id == chat_id)
            .ok_or(RepositoryError::NotFound)?;
        recipient.is_active = false;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use partsyard_core::{CheckoutForm, NewOrderItem, Price};

    use super::*;

    fn new_order(email: &str) -> NewOrder {
        let buyer = CheckoutForm {
            first_name: "Anna".into(),
            last_name: "Smirnova".into(),
            email: email.into(),
            phone: "89991234567".into(),
            ..CheckoutForm::default()
        }
        .validate()
        .unwrap();
        NewOrder {
            user_id: None,
            buyer,
            items: vec![NewOrderItem {
                part_id: Some(PartId::new(1)),
                name: "Radiator".into(),
                price: Price::from_cents(450_000).unwrap(),
                quantity: 1,
            }],
        }
    }

    #[tokio::test]
    async fn test_create_assigns_ids_and_defaults() {
        let store = InMemoryOrderStore::new();
        let order = store.create(&new_order("a@example.com")).await.unwrap();

        assert_eq!(order.id, OrderId::new(1));
        assert_eq!(order.status, OrderStatus::New);
        assert!(!order.is_paid);
        assert_eq!(order.items[0].order_id, order.id);
        assert_eq!(store.item_count().await, 1);
    }

    #[tokio::test]
    async fn test_failed_item_leaves_no_order() {
        let store = InMemoryOrderStore::new();
        let mut order = new_order("a@example.com");
        order.items.push(NewOrderItem {
            part_id: Some(PartId::new(2)),
            name: "Fan shroud".into(),
            price: Price::from_cents(90_000).unwrap(),
            quantity: 0,
        });

        let result = store.create(&order).await;
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
        assert_eq!(store.order_count().await, 0);
        assert_eq!(store.item_count().await, 0);

        // IDs are not consumed by the failed attempt.
        let created = store.create(&new_order("a@example.com")).await.unwrap();
        assert_eq!(created.id, OrderId::new(1));
    }

    #[tokio::test]
    async fn test_list_for_customer_matches_email_case_insensitively() {
        let store = InMemoryOrderStore::new();
        store.create(&new_order("Anna@Example.com")).await.unwrap();
        store.create(&new_order("other@example.com")).await.unwrap();

        let email = Email::parse("anna@example.com").unwrap();
        let orders = store.list_for_customer(UserId::new(9), &email).await.unwrap();
        assert_eq!(orders.len(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_order_is_not_found() {
        let store = InMemoryOrderStore::new();
        let result = store.set_paid(OrderId::new(42), true).await;
        assert!(matches!(result, Err(RepositoryError::NotFound)));
    }

    #[tokio::test]
    async fn test_duplicate_recipient_conflicts() {
        let recipients = InMemoryRecipients::new();
        recipients.add("Manager", 1001).await.unwrap();
        let result = recipients.add("Manager again", 1001).await;
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));

        recipients.deactivate(1001).await.unwrap();
        assert!(recipients.active_recipients().await.unwrap().is_empty());
        assert_eq!(recipients.list().await.unwrap().len(), 1);
    }
}
