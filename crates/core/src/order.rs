//! Persisted order records.
//!
//! An [`Order`] is created exactly once per successful checkout. Its
//! [`OrderItem`]s carry the name and unit price as they were at checkout, so
//! the order stays an accurate record of what was sold after the catalog
//! changes or the part is deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::checkout::BuyerInfo;
use crate::types::{OrderId, OrderItemId, OrderStatus, PartId, Price, UserId};

/// Everything needed to insert an order and its items in one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    /// Linked account, `None` for guest orders.
    pub user_id: Option<UserId>,
    pub buyer: BuyerInfo,
    pub items: Vec<NewOrderItem>,
}

/// One line of a [`NewOrder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    /// `None` if the part could not be resolved at checkout.
    pub part_id: Option<PartId>,
    pub name: String,
    pub price: Price,
    pub quantity: u32,
}

/// A stored order with its items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: Option<UserId>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub requires_delivery: bool,
    pub delivery_address: String,
    pub is_paid: bool,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

/// A stored order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    /// Set to `None` when the part is later deleted from the catalog.
    pub part_id: Option<PartId>,
    pub name: String,
    pub price: Price,
    pub quantity: u32,
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.price.times(self.quantity)
    }
}

impl Order {
    /// Sum of item subtotals.
    #[must_use]
    pub fn total_price(&self) -> Price {
        self.items.iter().map(OrderItem::subtotal).sum()
    }

    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }

    /// Plain-text summary sent to shop staff when the order is placed.
    #[must_use]
    pub fn notification_text(&self) -> String {
        use std::fmt::Write;

        let mut text = format!(
            "New order #{}\nCustomer: {} {}\nPhone: {}\nEmail: {}\n",
            self.id, self.first_name, self.last_name, self.phone, self.email
        );
        if self.requires_delivery {
            let _ = writeln!(text, "Delivery: {}", self.delivery_address);
        } else {
            text.push_str("Delivery: pickup\n");
        }
        text.push_str("Items:\n");
        for item in &self.items {
            let _ = writeln!(
                text,
                "- {} x{} @ {} = {}",
                item.name,
                item.quantity,
                item.price,
                item.subtotal()
            );
        }
        let _ = write!(text, "Total: {}", self.total_price());
        text
    }
}
