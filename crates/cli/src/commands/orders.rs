//! Order administration from the command line.
//!
//! # Usage
//!
//! ```bash
//! partsyard orders list
//! partsyard orders set-status 42 SHP
//! partsyard orders set-paid 42 --paid true
//! ```

use partsyard_core::{OrderId, OrderStatus};
use partsyard_storefront::db::{OrderStore, PgOrderStore, RepositoryError};
use partsyard_storefront::services::change_status;

use super::{CommandError, connect};

fn not_found(id: OrderId) -> impl FnOnce(RepositoryError) -> CommandError {
    move |e| match e {
        RepositoryError::NotFound => CommandError::InvalidArgument(format!("no order {id}")),
        other => other.into(),
    }
}

/// Print all orders, newest first.
pub async fn list() -> Result<(), CommandError> {
    let store = PgOrderStore::new(connect().await?);
    let orders = store.list_all().await?;

    #[allow(clippy::print_stdout)]
    {
        if orders.is_empty() {
            println!("No orders yet");
        }
        for order in &orders {
            println!(
                "{:>6}  {}  {:<22}  {:<4}  {:>4} pcs  {:>10}  {}",
                order.id,
                order.created_at.format("%Y-%m-%d %H:%M"),
                order.status.label(),
                if order.is_paid { "paid" } else { "" },
                order.total_quantity(),
                order.total_price(),
                order.phone,
            );
        }
    }
    Ok(())
}

/// Move an order to a new status given by its three-letter code.
pub async fn set_status(id: i32, code: &str) -> Result<(), CommandError> {
    let status =
        OrderStatus::from_code(code).map_err(|e| CommandError::InvalidArgument(e.to_string()))?;
    let id = OrderId::new(id);

    let store = PgOrderStore::new(connect().await?);
    let order = change_status(&store, id, status)
        .await
        .map_err(not_found(id))?;

    tracing::info!("Order {} is now {}", order.id, order.status.label());
    Ok(())
}

/// Set or clear an order's paid flag.
pub async fn set_paid(id: i32, is_paid: bool) -> Result<(), CommandError> {
    let id = OrderId::new(id);

    let store = PgOrderStore::new(connect().await?);
    let order = store.set_paid(id, is_paid).await.map_err(not_found(id))?;

    tracing::info!("Order {} paid: {}", order.id, order.is_paid);
    Ok(())
}
