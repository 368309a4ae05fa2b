//! Cart route handlers.
//!
//! The cart is stored in the session under a single slot. Mutating handlers
//! load it, apply one change, and save it back before responding.

use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use partsyard_core::{CartEntry, PartId, Price, ValidationErrors, checkout::deserialize_checkbox};

use super::extract::{FormOrJson, wants_json};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::services::SessionCart;
use crate::state::AppState;

/// Smallest quantity accepted by the add form.
pub const MIN_QUANTITY: u32 = 1;
/// Largest quantity accepted by the add form.
pub const MAX_QUANTITY: u32 = 99;

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    #[serde(default)]
    pub quantity: Option<u32>,
    /// Set the quantity instead of adding to it.
    #[serde(rename = "override", default, deserialize_with = "deserialize_checkbox")]
    pub override_quantity: bool,
}

/// Cart contents resolved against the catalog.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartEntry>,
    pub total_quantity: u64,
    pub total_price: Price,
    pub unique_count: usize,
}

#[derive(Debug, Serialize)]
struct CartUpdated {
    success: bool,
    message: String,
    total_quantity: u64,
}

/// Display the cart.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Json<CartView>> {
    let cart = SessionCart::load(&session).await?;
    let items = cart.resolve(state.catalog()).await?;

    Ok(Json(CartView {
        items,
        total_quantity: cart.total_quantity(),
        total_price: cart.total_price(),
        unique_count: cart.unique_count(),
    }))
}

/// Add a part to the cart, or set its quantity with `override`.
#[instrument(skip(state, session, headers, form), fields(part_id = %part_id))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Path(part_id): Path<PartId>,
    headers: HeaderMap,
    FormOrJson(form): FormOrJson<AddToCartForm>,
) -> Result<Response> {
    let part = state
        .catalog()
        .get(part_id)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| AppError::NotFound(format!("part {part_id}")))?;

    let quantity = form.quantity.unwrap_or(MIN_QUANTITY);
    if !(MIN_QUANTITY..=MAX_QUANTITY).contains(&quantity) {
        if !wants_json(&headers) {
            return Ok(Redirect::to("/cart").into_response());
        }
        return Err(AppError::Validation(ValidationErrors::single(
            "quantity",
            format!("must be between {MIN_QUANTITY} and {MAX_QUANTITY}"),
        )));
    }

    let mut cart = SessionCart::load(&session).await?;
    cart.add_item(&part, quantity, form.override_quantity);
    cart.save().await?;

    let id = part_id.to_string();
    add_breadcrumb("cart", "Added part to cart", Some(&[("part_id", id.as_str())]));
    tracing::debug!(quantity, total_quantity = cart.total_quantity(), "Cart updated");

    if wants_json(&headers) {
        return Ok(Json(CartUpdated {
            success: true,
            message: format!("{} added to cart", part.title),
            total_quantity: cart.total_quantity(),
        })
        .into_response());
    }
    Ok(Redirect::to("/cart").into_response())
}

/// Remove a part from the cart. Removing a part that is not in the cart is a
/// no-op.
#[instrument(skip(session, headers), fields(part_id = %part_id))]
pub async fn remove(
    session: Session,
    Path(part_id): Path<PartId>,
    headers: HeaderMap,
) -> Result<Response> {
    let mut cart = SessionCart::load(&session).await?;
    cart.remove(part_id);
    cart.save().await?;

    if wants_json(&headers) {
        return Ok(Json(CartUpdated {
            success: true,
            message: "Removed from cart".to_owned(),
            total_quantity: cart.total_quantity(),
        })
        .into_response());
    }
    Ok(Redirect::to("/cart").into_response())
}

/// Cart badge count.
pub async fn count(session: Session) -> Result<Json<serde_json::Value>> {
    let cart = SessionCart::load(&session).await?;
    Ok(Json(serde_json::json!({ "total_quantity": cart.total_quantity() })))
}
