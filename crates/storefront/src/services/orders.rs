//! Order administration shared by the staff routes and the CLI.

use tracing::instrument;

use partsyard_core::{Order, OrderId, OrderStatus};

use crate::db::{OrderStore, RepositoryError};

/// True when `next` does not follow the lifecycle from `previous`: a move
/// backwards, or any move out of a terminal status.
#[must_use]
pub fn is_unusual_transition(previous: OrderStatus, next: OrderStatus) -> bool {
    previous != next && !next.is_forward_of(previous)
}

/// Move an order to `status`. Any status may follow any other; unusual moves
/// are logged at WARN.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` for an unknown order, or the
/// underlying storage error.
#[instrument(skip(orders), fields(order_id = %id, to = status.code()))]
pub async fn change_status(
    orders: &dyn OrderStore,
    id: OrderId,
    status: OrderStatus,
) -> Result<Order, RepositoryError> {
    let previous = orders.get(id).await?.ok_or(RepositoryError::NotFound)?.status;
    if is_unusual_transition(previous, status) {
        tracing::warn!(
            from = previous.code(),
            to = status.code(),
            "Order status moved outside the usual lifecycle"
        );
    }

    let order = orders.update_status(id, status).await?;
    tracing::info!(status = status.code(), "Order status updated");
    Ok(order)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use partsyard_core::{BuyerInfo, Email, NewOrder, Phone};

    use super::*;
    use crate::db::InMemoryOrderStore;

    async fn stored_order(store: &InMemoryOrderStore) -> OrderId {
        let order = NewOrder {
            user_id: None,
            buyer: BuyerInfo {
                first_name: "Ivan".to_owned(),
                last_name: "Petrov".to_owned(),
                email: Email::parse("ivan@example.com").unwrap(),
                phone: Phone::parse("+79991234567").unwrap(),
                requires_delivery: false,
                delivery_address: String::new(),
            },
            items: Vec::new(),
        };
        store.create(&order).await.unwrap().id
    }

    #[test]
    fn test_unusual_transitions() {
        use OrderStatus::{Canceled, Completed, New, Processing, Shipped};

        assert!(!is_unusual_transition(New, Processing));
        assert!(!is_unusual_transition(New, Shipped));
        assert!(!is_unusual_transition(Processing, Canceled));
        assert!(!is_unusual_transition(Shipped, Shipped));

        assert!(is_unusual_transition(Shipped, Processing));
        assert!(is_unusual_transition(Completed, New));
        assert!(is_unusual_transition(Canceled, Processing));
        assert!(is_unusual_transition(Completed, Canceled));
    }

    #[tokio::test]
    async fn test_change_status_allows_leaving_terminal_state() {
        let store = InMemoryOrderStore::new();
        let id = stored_order(&store).await;

        let order = change_status(&store, id, OrderStatus::Completed).await.unwrap();
        assert_eq!(order.status, OrderStatus::Completed);

        let order = change_status(&store, id, OrderStatus::New).await.unwrap();
        assert_eq!(order.status, OrderStatus::New);
    }

    #[tokio::test]
    async fn test_change_status_unknown_order() {
        let store = InMemoryOrderStore::new();
        let err = change_status(&store, OrderId::new(404), OrderStatus::Shipped)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }
}
