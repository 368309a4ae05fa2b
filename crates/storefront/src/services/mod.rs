//! Business logic services for storefront.
//!
//! # Services
//!
//! - `cart` - Session-backed cart (load, mutate, persist, resolve)
//! - `checkout` - Order builder turning a cart into a persisted order
//! - `notify` - Best-effort delivery of new-order messages to staff
//! - `orders` - Status changes shared by staff routes and the CLI

pub mod cart;
pub mod checkout;
pub mod notify;
pub mod orders;

pub use cart::{CartError, SessionCart};
pub use checkout::{CheckoutDeps, CheckoutError, create_order};
pub use orders::change_status;
pub use notify::{DeliveryReport, LogNotifier, NotificationError, NotificationSink, TelegramNotifier};
