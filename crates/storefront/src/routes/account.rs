//! Account route handlers.
//!
//! These routes require a signed-in user.

use axum::{Json, extract::State};
use tracing::instrument;

use super::orders::OrderView;
use crate::error::Result;
use crate::middleware::auth::RequireAuth;
use crate::state::AppState;

/// Order history, newest first.
///
/// Customers see orders linked to their account plus any guest orders placed
/// with their email. Staff see every order.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<OrderView>>> {
    let orders = if user.is_staff {
        state.orders().list_all().await?
    } else {
        state.orders().list_for_customer(user.id, &user.email).await?
    };
    Ok(Json(orders.into_iter().map(OrderView::from).collect()))
}
