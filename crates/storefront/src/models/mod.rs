//! Storefront models that live outside the core crate.

pub mod session;

pub use session::CurrentUser;
