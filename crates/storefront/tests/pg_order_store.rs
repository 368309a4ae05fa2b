//! PostgreSQL order store tests.
//!
//! These run against a scratch database and are skipped when
//! `PARTSYARD_TEST_DATABASE_URL` is not set:
//!
//! ```bash
//! PARTSYARD_TEST_DATABASE_URL=postgres://localhost/partsyard_test \
//!     cargo test -p partsyard-storefront --test pg_order_store
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used)]

use partsyard_core::{CheckoutForm, NewOrder, NewOrderItem, OrderStatus, Price};
use partsyard_storefront::db::{self, OrderStore, PgOrderStore, RepositoryError};
use partsyard_storefront::services::change_status;
use sqlx::PgPool;
use tokio::sync::OnceCell;
use uuid::Uuid;

static MIGRATED: OnceCell<Option<String>> = OnceCell::const_new();

async fn pool() -> Option<PgPool> {
    let url = MIGRATED
        .get_or_init(|| async {
            let url = std::env::var("PARTSYARD_TEST_DATABASE_URL").ok()?;
            let pool = PgPool::connect(&url).await.expect("connect to test database");
            db::migrate(&pool).await.expect("run migrations");
            pool.close().await;
            Some(url)
        })
        .await
        .clone()?;
    Some(PgPool::connect(&url).await.expect("connect to test database"))
}

fn unique_email() -> String {
    format!("buyer-{}@example.com", Uuid::new_v4().simple())
}

fn new_order(email: &str, quantities: &[u32]) -> NewOrder {
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
        items: quantities
            .iter()
            .enumerate()
            .map(|(i, &quantity)| NewOrderItem {
                part_id: None,
                name: format!("Used part {i}"),
                price: Price::from_cents(1_250).unwrap(),
                quantity,
            })
            .collect(),
    }
}

async fn orders_with_email(pool: &PgPool, email: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM shop.orders WHERE email = $1")
        .bind(email)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_create_persists_order_and_items() {
    let Some(pool) = pool().await else { return };
    let store = PgOrderStore::new(pool.clone());
    let email = unique_email();

    let order = store.create(&new_order(&email, &[2, 1])).await.unwrap();
    assert_eq!(order.status, OrderStatus::New);
    assert_eq!(order.items.len(), 2);
    assert_eq!(order.total_price().to_string(), "37.50");

    let stored = store.get(order.id).await.unwrap().unwrap();
    assert_eq!(stored.email, email);
    assert_eq!(stored.items, order.items);
}

#[tokio::test]
async fn test_failing_item_rolls_back_whole_order() {
    let Some(pool) = pool().await else { return };
    let store = PgOrderStore::new(pool.clone());
    let email = unique_email();

    // The order row and first item are written before the second item hits
    // the `quantity > 0` check.
    let result = store.create(&new_order(&email, &[1, 0])).await;
    assert!(matches!(result, Err(RepositoryError::Database(_))));

    assert_eq!(orders_with_email(&pool, &email).await, 0);
    let orphaned: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM shop.order_items i \
         LEFT JOIN shop.orders o ON o.id = i.order_id WHERE o.id IS NULL",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(orphaned, 0);
}

#[tokio::test]
async fn test_status_change_out_of_terminal_state() {
    let Some(pool) = pool().await else { return };
    let store = PgOrderStore::new(pool);
    let order = store
        .create(&new_order(&unique_email(), &[1]))
        .await
        .unwrap();

    change_status(&store, order.id, OrderStatus::Completed)
        .await
        .unwrap();
    let reopened = change_status(&store, order.id, OrderStatus::Processing)
        .await
        .unwrap();
    assert_eq!(reopened.status, OrderStatus::Processing);

    let paid = store.set_paid(order.id, true).await.unwrap();
    assert!(paid.is_paid);
}
