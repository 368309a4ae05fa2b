//! Order builder: turns the session cart into a durable order.
//!
//! The sequence is fixed:
//!
//! 1. Refuse an empty cart.
//! 2. Validate the buyer form.
//! 3. Link a registered account by email, if one exists.
//! 4. Resolve the cart against the catalog and persist the order and its
//!    items in one transaction.
//! 5. Clear the cart, then notify staff.
//!
//! Steps 1 and 2 never touch storage. A failure in step 4 leaves the cart
//! intact for a retry. Notification runs after the commit and its outcome
//! never reaches the caller.

use std::time::Duration;

use thiserror::Error;
use tracing::instrument;

use partsyard_core::{CartEntry, CheckoutForm, NewOrder, NewOrderItem, Order, ValidationErrors};

use super::cart::{self, CartError, SessionCart};
use super::notify::NotificationSink;
use crate::db::{CatalogLookup, OrderStore, RepositoryError, UserDirectory};

/// Why a checkout did not produce an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The cart holds no items.
    #[error("cart is empty")]
    EmptyCart,

    /// Buyer or delivery fields failed validation.
    #[error("invalid checkout data: {0}")]
    Validation(ValidationErrors),

    /// The batched catalog lookup failed.
    #[error("catalog lookup failed: {0}")]
    Catalog(RepositoryError),

    /// Persisting the order or updating the session failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<CartError> for CheckoutError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::Catalog(e) => Self::Catalog(e),
            CartError::Session(e) => Self::Storage(e.to_string()),
        }
    }
}

/// Collaborators checkout needs.
pub struct CheckoutDeps<'a> {
    pub catalog: &'a dyn CatalogLookup,
    pub orders: &'a dyn OrderStore,
    pub users: &'a dyn UserDirectory,
    pub notifier: &'a dyn NotificationSink,
    /// Upper bound on the whole notification call.
    pub notify_timeout: Duration,
}

/// Place an order from the session cart.
///
/// # Errors
///
/// - `CheckoutError::EmptyCart` when the cart has no units
/// - `CheckoutError::Validation` with every failing field
/// - `CheckoutError::Catalog` / `CheckoutError::Storage` when the order could
///   not be persisted; the cart is left untouched
#[instrument(skip_all, fields(lines = cart.unique_count(), order_id = tracing::field::Empty))]
pub async fn create_order(
    deps: &CheckoutDeps<'_>,
    form: &CheckoutForm,
    cart: &mut SessionCart,
) -> Result<Order, CheckoutError> {
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let buyer = form.validate().map_err(CheckoutError::Validation)?;

    let user_id = match deps.users.find_by_email(&buyer.email).await {
        Ok(user) => user.map(|u| u.id),
        Err(e) => {
            tracing::warn!(error = %e, "User lookup failed, placing order as guest");
            None
        }
    };

    let entries = cart::resolve(cart.cart(), deps.catalog).await?;
    let new_order = NewOrder {
        user_id,
        buyer,
        items: entries.iter().map(order_item).collect(),
    };

    let order = deps
        .orders
        .create(&new_order)
        .await
        .map_err(|e| CheckoutError::Storage(e.to_string()))?;
    tracing::Span::current().record("order_id", tracing::field::display(order.id));
    tracing::info!(
        order_id = %order.id,
        total = %order.total_price(),
        guest = order.user_id.is_none(),
        "Order created"
    );

    // The order is committed; a session failure here must not fail checkout.
    if let Err(e) = cart.clear().await {
        tracing::error!(order_id = %order.id, error = %e, "Failed to clear cart after checkout");
    }

    notify(deps, &order).await;

    Ok(order)
}

fn order_item(entry: &CartEntry) -> NewOrderItem {
    match &entry.part {
        Some(part) if !part.is_active => {
            tracing::warn!(part_id = %entry.part_id, "Ordering a part marked inactive");
        }
        Some(_) => {}
        None => {
            tracing::warn!(
                part_id = %entry.part_id,
                "Part no longer in catalog, keeping last-known name and price"
            );
        }
    }

    NewOrderItem {
        part_id: entry.part.as_ref().map(|p| p.id),
        name: entry.display_name(),
        price: entry.price,
        quantity: entry.quantity,
    }
}

async fn notify(deps: &CheckoutDeps<'_>, order: &Order) {
    let message = order.notification_text();
    match tokio::time::timeout(deps.notify_timeout, deps.notifier.send(&message)).await {
        Ok(Ok(report)) => tracing::debug!(
            order_id = %order.id,
            delivered = report.delivered,
            failed = report.failed,
            "Order notification sent"
        ),
        Ok(Err(e)) => {
            tracing::warn!(order_id = %order.id, error = %e, "Order notification failed");
        }
        Err(_) => tracing::warn!(
            order_id = %order.id,
            timeout_secs = deps.notify_timeout.as_secs(),
            "Order notification timed out"
        ),
    }
}
