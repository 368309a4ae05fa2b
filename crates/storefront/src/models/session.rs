//! Session-related types.
//!
//! Types stored in the session alongside the cart.

use serde::{Deserialize, Serialize};

use partsyard_core::{Email, UserId};

/// Session-stored user identity.
///
/// Written by the sign-in flow; the storefront only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Shop staff may view every order and change order status.
    #[serde(default)]
    pub is_staff: bool,
}

/// Session keys.
pub mod keys {
    /// Slot holding the serialized cart (`part_id -> {quantity, price, title}`).
    pub const CART: &str = "cart";

    /// ID of the order most recently placed from this session.
    pub const LAST_ORDER_ID: &str = "last_order_id";

    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";
}
