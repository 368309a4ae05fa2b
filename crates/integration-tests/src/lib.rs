//! Integration tests for the Partsyard storefront.
//!
//! The full router runs in-process against in-memory repositories and a
//! `MemoryStore` session store, so no database or network is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p partsyard-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_flow` - Cart routes over a shared session cookie
//! - `checkout` - Order creation and its failure modes
//! - `staff_routes` - Order management and account history

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Json, Router,
    body::{Body, Bytes},
    http::{HeaderMap, Request, StatusCode, header},
    response::Response,
    routing::post,
};
use secrecy::SecretString;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::Mutex;
use tower::ServiceExt;
use tower_sessions::{MemoryStore, Session};

use partsyard_core::{CatalogItem, Email, PartId, Price, UserId};
use partsyard_storefront::config::{SentryConfig, StorefrontConfig};
use partsyard_storefront::db::{
    InMemoryCatalog, InMemoryOrderStore, InMemoryUsers, OrderStore, RepositoryError,
};
use partsyard_storefront::middleware::{create_session_layer, set_current_user};
use partsyard_storefront::models::CurrentUser;
use partsyard_storefront::routes;
use partsyard_storefront::services::{DeliveryReport, NotificationError, NotificationSink};
use partsyard_storefront::state::{AppState, Backends};

/// Active part priced at 10.00.
pub const BRAKE_PADS: PartId = PartId::new(1);
/// Active part priced at 5.00.
pub const OIL_FILTER: PartId = PartId::new(2);
/// Part present in the catalog but hidden from sale.
pub const HEADLIGHT: PartId = PartId::new(3);
/// ID with no catalog row.
pub const MISSING_PART: PartId = PartId::new(999);

/// Bound on the post-checkout notification call in tests.
pub const NOTIFY_TIMEOUT: Duration = Duration::from_millis(200);

/// Configuration for an in-process storefront.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://localhost/partsyard_test"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "http://localhost:3000".to_owned(),
        notify_timeout: NOTIFY_TIMEOUT,
        telegram: None,
        sentry: SentryConfig::default(),
    }
}

/// Catalog item with a decimal price given as a string.
#[must_use]
pub fn part(id: PartId, title: &str, price: &str, is_active: bool) -> CatalogItem {
    CatalogItem {
        id,
        title: title.to_owned(),
        price: Price::from_str(price).expect("valid price"),
        is_active,
    }
}

fn seeded_catalog() -> InMemoryCatalog {
    InMemoryCatalog::with_items([
        part(BRAKE_PADS, "Brake pad set", "10.00", true),
        part(OIL_FILTER, "Oil filter", "5.00", true),
        part(HEADLIGHT, "Headlight, left", "40.00", false),
    ])
}

/// Notifier that records every message it is asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub async fn messages(&self) -> Vec<String> {
        self.messages.lock().await.clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn send(&self, message: &str) -> Result<DeliveryReport, NotificationError> {
        self.messages.lock().await.push(message.to_owned());
        Ok(DeliveryReport {
            delivered: 1,
            failed: 0,
        })
    }
}

/// Notifier whose every delivery fails.
pub struct FailingNotifier;

#[async_trait]
impl NotificationSink for FailingNotifier {
    async fn send(&self, _message: &str) -> Result<DeliveryReport, NotificationError> {
        Err(NotificationError::NotConfigured("no recipients".to_owned()))
    }
}

/// Notifier that never answers within [`NOTIFY_TIMEOUT`].
pub struct StalledNotifier;

#[async_trait]
impl NotificationSink for StalledNotifier {
    async fn send(&self, _message: &str) -> Result<DeliveryReport, NotificationError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(DeliveryReport::default())
    }
}

/// Order store that rejects every write, as if the database were down.
pub struct UnavailableOrderStore;

#[async_trait]
impl OrderStore for UnavailableOrderStore {
    async fn create(
        &self,
        _order: &partsyard_core::NewOrder,
    ) -> Result<partsyard_core::Order, RepositoryError> {
        Err(RepositoryError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn get(
        &self,
        _id: partsyard_core::OrderId,
    ) -> Result<Option<partsyard_core::Order>, RepositoryError> {
        Err(RepositoryError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn list_for_customer(
        &self,
        _user_id: UserId,
        _email: &Email,
    ) -> Result<Vec<partsyard_core::Order>, RepositoryError> {
        Err(RepositoryError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn list_all(&self) -> Result<Vec<partsyard_core::Order>, RepositoryError> {
        Err(RepositoryError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn update_status(
        &self,
        _id: partsyard_core::OrderId,
        _status: partsyard_core::OrderStatus,
    ) -> Result<partsyard_core::Order, RepositoryError> {
        Err(RepositoryError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn set_paid(
        &self,
        _id: partsyard_core::OrderId,
        _is_paid: bool,
    ) -> Result<partsyard_core::Order, RepositoryError> {
        Err(RepositoryError::Database(sqlx::Error::PoolTimedOut))
    }
}

/// Buffered response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    /// Redirect target, if any.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.header(header::LOCATION.as_str())
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Parse the body as JSON.
    #[must_use]
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }
}

/// A storefront instance plus one browser session.
///
/// Requests carry the session cookie issued by earlier responses, the way a
/// browser would. Use [`TestApp::new_client`] for a second, unrelated visitor
/// against the same backends.
pub struct TestApp {
    router: Router,
    cookie: Option<String>,
    pub catalog: Arc<InMemoryCatalog>,
    pub orders: Arc<InMemoryOrderStore>,
    pub users: Arc<InMemoryUsers>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestApp {
    /// Storefront with in-memory backends and a seeded catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::build(None, None)
    }

    /// Storefront whose order writes go to `orders` instead of the in-memory
    /// store.
    #[must_use]
    pub fn with_order_store(orders: Arc<dyn OrderStore>) -> Self {
        Self::build(Some(orders), None)
    }

    /// Storefront whose notifications go to `notifier`.
    #[must_use]
    pub fn with_notifier(notifier: Arc<dyn NotificationSink>) -> Self {
        Self::build(None, Some(notifier))
    }

    fn build(
        order_override: Option<Arc<dyn OrderStore>>,
        notifier_override: Option<Arc<dyn NotificationSink>>,
    ) -> Self {
        let config = test_config();
        let catalog = Arc::new(seeded_catalog());
        let orders = Arc::new(InMemoryOrderStore::new());
        let users = Arc::new(InMemoryUsers::new());
        let notifier = Arc::new(RecordingNotifier::default());

        let default_orders: Arc<dyn OrderStore> = orders.clone();
        let default_notifier: Arc<dyn NotificationSink> = notifier.clone();
        let backends = Backends {
            catalog: catalog.clone(),
            orders: order_override.unwrap_or(default_orders),
            users: users.clone(),
            notifier: notifier_override.unwrap_or(default_notifier),
        };

        // Never connected: only the readiness probe touches the pool.
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(100))
            .connect_lazy("postgres://localhost/partsyard_test")
            .expect("lazy pool");

        let store = MemoryStore::default();
        let sign_in = Router::new()
            .route("/test/sign-in", post(sign_in))
            .layer(create_session_layer(store.clone(), &config));

        let state = AppState::new(config, pool, backends);
        let router = routes::app(state, store).merge(sign_in);

        Self {
            router,
            cookie: None,
            catalog,
            orders,
            users,
            notifier,
        }
    }

    /// A second visitor with its own (empty) session, sharing all backends.
    #[must_use]
    pub fn new_client(&self) -> Self {
        Self {
            router: self.router.clone(),
            cookie: None,
            catalog: self.catalog.clone(),
            orders: self.orders.clone(),
            users: self.users.clone(),
            notifier: self.notifier.clone(),
        }
    }

    /// Send a request with the current session cookie.
    pub async fn send(&mut self, mut request: Request<Body>) -> TestResponse {
        if let Some(cookie) = &self.cookie {
            request.headers_mut().insert(
                header::COOKIE,
                cookie.parse().expect("cookie header value"),
            );
        }

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        self.remember_cookie(&response);

        let (parts, body) = response.into_parts();
        let body = axum::body::to_bytes(body, usize::MAX)
            .await
            .expect("read body");

        TestResponse {
            status: parts.status,
            headers: parts.headers,
            body,
        }
    }

    fn remember_cookie(&mut self, response: &Response) {
        let session_cookie = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .find(|pair| pair.starts_with("partsyard_session="));
        if let Some(pair) = session_cookie {
            self.cookie = Some(pair.to_owned());
        }
    }

    pub async fn get(&mut self, path: &str) -> TestResponse {
        let request = Request::get(path)
            .header(header::ACCEPT, "application/json")
            .body(Body::empty())
            .expect("request");
        self.send(request).await
    }

    /// POST a JSON body as an AJAX client.
    pub async fn post_json(&mut self, path: &str, body: &Value) -> TestResponse {
        let request = Request::post(path)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-requested-with", "XMLHttpRequest")
            .body(Body::from(body.to_string()))
            .expect("request");
        self.send(request).await
    }

    /// POST an urlencoded form as a plain browser would.
    pub async fn post_form(&mut self, path: &str, body: &str) -> TestResponse {
        let request = Request::post(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_owned()))
            .expect("request");
        self.send(request).await
    }

    /// Add `quantity` units of `part_id` over the JSON endpoint.
    pub async fn add_to_cart(&mut self, part_id: PartId, quantity: u32) -> TestResponse {
        self.post_json(
            &format!("/cart/add/{part_id}"),
            &serde_json::json!({ "quantity": quantity }),
        )
        .await
    }

    /// Current cart badge count.
    pub async fn cart_count(&mut self) -> u64 {
        let response = self.get("/cart/count").await;
        assert_eq!(response.status, StatusCode::OK);
        response.json()["total_quantity"]
            .as_u64()
            .expect("total_quantity is a number")
    }

    /// Place an order with valid pickup details.
    pub async fn checkout(&mut self, email: &str) -> TestResponse {
        self.post_json("/orders/create-order", &checkout_body(email))
            .await
    }

    /// Sign this session in as `user`.
    pub async fn sign_in(&mut self, user: &CurrentUser) {
        let response = self
            .post_json(
                "/test/sign-in",
                &serde_json::to_value(user).expect("user serializes"),
            )
            .await;
        assert_eq!(response.status, StatusCode::NO_CONTENT);
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Valid pickup checkout form as JSON.
#[must_use]
pub fn checkout_body(email: &str) -> Value {
    serde_json::json!({
        "first_name": "Ivan",
        "last_name": "Petrov",
        "email": email,
        "phone": "+7 (999) 123-45-67",
        "requires_delivery": false,
    })
}

/// Session identity for a staff member.
#[must_use]
pub fn staff_user() -> CurrentUser {
    CurrentUser {
        id: UserId::new(1),
        email: Email::parse("staff@partsyard.test").expect("valid email"),
        is_staff: true,
    }
}

/// Session identity for a registered customer.
#[must_use]
pub fn customer(id: i32, email: &str) -> CurrentUser {
    CurrentUser {
        id: UserId::new(id),
        email: Email::parse(email).expect("valid email"),
        is_staff: false,
    }
}

async fn sign_in(session: Session, Json(user): Json<CurrentUser>) -> StatusCode {
    match set_current_user(&session, &user).await {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
