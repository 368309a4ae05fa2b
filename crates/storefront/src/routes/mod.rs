//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                         - Liveness
//! GET  /health/ready                   - Readiness (database ping)
//!
//! # Cart
//! GET  /cart                           - Cart contents with resolved parts
//! POST /cart/add/{part_id}             - Add (or override quantity)
//! POST /cart/remove/{part_id}          - Remove a line
//! GET  /cart/count                     - Total quantity for the badge
//!
//! # Orders
//! POST /orders/create-order            - Checkout
//! GET  /orders/success/{order_id}      - Confirmation
//! GET  /orders                         - All orders (staff)
//! POST /orders/update_status/{id}      - Change status (staff)
//! POST /orders/update_paid_status/{id} - Change paid flag (staff)
//!
//! # Account (requires auth)
//! GET  /account/orders                 - Order history
//! ```

pub mod account;
pub mod cart;
pub mod extract;
pub mod health;
pub mod orders;

use axum::{
    Router,
    body::Body,
    http::Request,
    middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tower_sessions::SessionStore;

use crate::middleware::{create_session_layer, request_id_middleware};
use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add/{part_id}", post(cart::add))
        .route("/remove/{part_id}", post(cart::remove))
        .route("/count", get(cart::count))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/create-order", post(orders::create))
        .route("/success/{order_id}", get(orders::success))
        .route("/update_status/{order_id}", post(orders::update_status))
        .route(
            "/update_paid_status/{order_id}",
            post(orders::update_paid_status),
        )
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new().route("/orders", get(account::orders))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/cart", cart_routes())
        .nest("/orders", order_routes())
        .nest("/account", account_routes())
}

/// Build the complete application: health probes, routes, session layer,
/// request IDs and tracing.
///
/// Sentry layers are added by the binary on top of this.
pub fn app<S>(state: AppState, session_store: S) -> Router
where
    S: SessionStore + Clone,
{
    let session_layer = create_session_layer(session_store, state.config());

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(routes())
        .layer(session_layer)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}
