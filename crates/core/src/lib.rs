//! Partsyard Core - Shared types library.
//!
//! This crate provides the domain model used by the Partsyard components:
//! - `storefront` - Public catalog, cart and checkout service
//! - `cli` - Command-line tools for migrations and order management
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. The cart is a plain data structure that the
//! storefront loads from and writes back to the visitor's session.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails, phones and statuses
//! - [`cart`] - Session-scoped shopping cart with price snapshots
//! - [`checkout`] - Buyer form validation
//! - [`order`] - Persisted order records and the admin notification summary

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod checkout;
pub mod order;
pub mod types;

pub use cart::{Cart, CartEntry, CartLine, CatalogItem};
pub use checkout::{BuyerInfo, CheckoutForm, ValidationErrors};
pub use order::{NewOrder, NewOrderItem, Order, OrderItem};
pub use types::*;
