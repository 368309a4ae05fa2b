//! Checkout and order management handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use partsyard_core::{
    CheckoutForm, Order, OrderId, OrderStatus, Price, checkout::deserialize_checkbox,
};

use super::extract::{FormOrJson, wants_json};
use crate::error::{AppError, Result};
use crate::middleware::{OptionalAuth, RequireStaff};
use crate::models::session::keys;
use crate::services::{SessionCart, change_status, create_order};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct OrderCreated {
    success: bool,
    order_id: OrderId,
    total_quantity: u64,
}

/// An order with its computed totals.
#[derive(Debug, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub status_label: &'static str,
    pub total_price: Price,
    pub total_quantity: u64,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        Self {
            status_label: order.status.label(),
            total_price: order.total_price(),
            total_quantity: order.total_quantity(),
            order,
        }
    }
}

/// Status update form.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    /// Three-letter status code, e.g. `SHP`.
    pub status: String,
}

/// Paid flag form.
#[derive(Debug, Deserialize)]
pub struct PaidForm {
    #[serde(default, deserialize_with = "deserialize_checkbox")]
    pub is_paid: bool,
}

#[derive(Debug, Serialize)]
pub struct StatusUpdated {
    success: bool,
    status: OrderStatus,
    is_paid: bool,
}

/// Place an order from the session cart.
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    FormOrJson(form): FormOrJson<CheckoutForm>,
) -> Result<Response> {
    let mut cart = SessionCart::load(&session).await?;
    let order = create_order(&state.checkout_deps(), &form, &mut cart).await?;

    if let Err(e) = session.insert(keys::LAST_ORDER_ID, order.id).await {
        tracing::error!(order_id = %order.id, error = %e, "Failed to remember last order");
    }

    if wants_json(&headers) {
        return Ok(Json(OrderCreated {
            success: true,
            order_id: order.id,
            total_quantity: order.total_quantity(),
        })
        .into_response());
    }
    Ok(Redirect::to(&format!("/orders/success/{}", order.id)).into_response())
}

/// Order confirmation, visible to the session that placed the order and to
/// staff.
#[instrument(skip(state, session, user))]
pub async fn success(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(order_id): Path<OrderId>,
) -> Result<Json<OrderView>> {
    let placed_here = session.get::<OrderId>(keys::LAST_ORDER_ID).await? == Some(order_id);
    let is_staff = user.is_some_and(|u| u.is_staff);
    if !placed_here && !is_staff {
        return Err(AppError::NotFound(format!("order {order_id}")));
    }

    let order = state
        .orders()
        .get(order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))?;
    Ok(Json(order.into()))
}

/// All orders, newest first.
pub async fn index(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
) -> Result<Json<Vec<OrderView>>> {
    let orders = state.orders().list_all().await?;
    Ok(Json(orders.into_iter().map(OrderView::from).collect()))
}

/// Change an order's status. Any status may follow any other.
#[instrument(skip(state, staff, form), fields(staff_id = %staff.id))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(order_id): Path<OrderId>,
    FormOrJson(form): FormOrJson<StatusForm>,
) -> Result<Json<StatusUpdated>> {
    let status = OrderStatus::from_code(&form.status)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let order = change_status(state.orders(), order_id, status).await?;

    Ok(Json(StatusUpdated {
        success: true,
        status: order.status,
        is_paid: order.is_paid,
    }))
}

/// Mark an order paid or unpaid.
#[instrument(skip(state, staff, form), fields(staff_id = %staff.id))]
pub async fn update_paid_status(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(order_id): Path<OrderId>,
    FormOrJson(form): FormOrJson<PaidForm>,
) -> Result<Json<StatusUpdated>> {
    let order = state.orders().set_paid(order_id, form.is_paid).await?;
    tracing::info!(is_paid = order.is_paid, "Order paid flag updated");

    Ok(Json(StatusUpdated {
        success: true,
        status: order.status,
        is_paid: order.is_paid,
    }))
}
