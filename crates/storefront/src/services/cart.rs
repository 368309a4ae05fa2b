//! Session-backed cart.
//!
//! [`SessionCart`] deserializes the [`Cart`] from the session slot at the
//! start of a request and writes it back only when it changed. Concurrent
//! requests for the same session are last-write-wins at slot granularity.

use std::ops::{Deref, DerefMut};

use thiserror::Error;
use tower_sessions::Session;

use partsyard_core::{Cart, CartEntry};

use crate::db::{CatalogLookup, RepositoryError};
use crate::models::session::keys;

/// Errors loading, saving or resolving the cart.
#[derive(Debug, Error)]
pub enum CartError {
    /// Session store unavailable or payload unreadable.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Batched catalog lookup failed.
    #[error("catalog error: {0}")]
    Catalog(#[from] RepositoryError),
}

/// A [`Cart`] bound to the session it was loaded from.
pub struct SessionCart {
    session: Session,
    cart: Cart,
}

impl SessionCart {
    /// Load the cart for this session, or an empty one.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Session` if the session store cannot be read.
    pub async fn load(session: &Session) -> Result<Self, CartError> {
        let cart = session
            .get::<Cart>(keys::CART)
            .await?
            .unwrap_or_default()
            .sanitized();

        Ok(Self {
            session: session.clone(),
            cart,
        })
    }

    /// Persist the cart if it changed since it was loaded.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Session` if the session store cannot be written.
    pub async fn save(&mut self) -> Result<(), CartError> {
        if self.cart.is_dirty() {
            self.session.insert(keys::CART, &self.cart).await?;
            self.cart.mark_clean();
        }
        Ok(())
    }

    /// Empty the cart and drop its session slot.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Session` if the session store cannot be written.
    pub async fn clear(&mut self) -> Result<(), CartError> {
        self.cart.clear();
        self.session.remove::<Cart>(keys::CART).await?;
        self.cart.mark_clean();
        Ok(())
    }

    /// Join every line with fresh catalog data using one batched lookup.
    ///
    /// Parts that no longer resolve come back with `part: None`. Call again
    /// to re-resolve.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Catalog` if the lookup itself fails.
    pub async fn resolve(&self, catalog: &dyn CatalogLookup) -> Result<Vec<CartEntry>, CartError> {
        resolve(&self.cart, catalog).await
    }

    /// The underlying cart.
    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }
}

/// Resolve a cart against the catalog in one call.
///
/// # Errors
///
/// Returns `CartError::Catalog` if the lookup fails.
pub async fn resolve(cart: &Cart, catalog: &dyn CatalogLookup) -> Result<Vec<CartEntry>, CartError> {
    if cart.unique_count() == 0 {
        return Ok(Vec::new());
    }
    let resolved = catalog.resolve_many(&cart.part_ids()).await?;
    Ok(cart.entries(&resolved).collect())
}

impl Deref for SessionCart {
    type Target = Cart;

    fn deref(&self) -> &Cart {
        &self.cart
    }
}

impl DerefMut for SessionCart {
    fn deref_mut(&mut self) -> &mut Cart {
        &mut self.cart
    }
}
