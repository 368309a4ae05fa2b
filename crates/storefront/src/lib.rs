//! Partsyard Storefront library.
//!
//! Session cart, checkout and order management for the parts shop, exposed
//! as a library so the binary, the CLI and the integration tests share one
//! router and one set of repositories.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
