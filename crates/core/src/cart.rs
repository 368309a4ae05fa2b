//! Session-scoped shopping cart.
//!
//! The cart is a plain map of part ID to [`CartLine`]. The storefront
//! deserializes it from the visitor's session at the start of a request,
//! mutates it, and writes it back when [`Cart::is_dirty`] says so. It holds
//! no catalog objects: parts are resolved in one batch when the cart is
//! displayed or checked out, and joined back with [`Cart::entries`].
//!
//! Each line keeps the unit price (and title) seen when the part was first
//! added. Later catalog price changes never rewrite it.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::types::{PartId, Price};

/// Catalog data for one part, as returned by a batched lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: PartId,
    pub title: String,
    pub price: Price,
    pub is_active: bool,
}

/// One part's quantity and snapshots within a [`Cart`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Always greater than zero while the line is stored.
    pub quantity: u32,
    /// Unit price captured on first add.
    pub price: Price,
    /// Part title captured on first add.
    #[serde(default)]
    pub title: String,
}

/// A cart line joined with the freshly resolved catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartEntry {
    pub part_id: PartId,
    pub quantity: u32,
    /// Snapshotted unit price (not the live catalog price).
    pub price: Price,
    pub total_price: Price,
    /// Title snapshotted on first add.
    pub title: String,
    /// `None` when the part no longer resolves in the catalog.
    pub part: Option<CatalogItem>,
}

impl CartEntry {
    /// Name to show or record for this line: the live catalog title when the
    /// part resolves, otherwise the snapshot taken on first add.
    #[must_use]
    pub fn display_name(&self) -> String {
        match &self.part {
            Some(part) => part.title.clone(),
            None if !self.title.is_empty() => self.title.clone(),
            None => format!("Part #{}", self.part_id),
        }
    }
}

/// Mapping of part ID to cart line.
///
/// Lines are kept in a `BTreeMap` so iteration order, and therefore replay
/// of a sequence of operations, is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: BTreeMap<PartId, CartLine>,
    #[serde(skip)]
    dirty: bool,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `quantity` units of a part, or set its quantity when
    /// `override_quantity` is true.
    ///
    /// `price` and `title` are only used when the line is created; an
    /// existing line keeps its snapshots. A resulting quantity of zero
    /// removes the line.
    pub fn add(
        &mut self,
        part_id: PartId,
        price: Price,
        title: &str,
        quantity: u32,
        override_quantity: bool,
    ) {
        let line = self.lines.entry(part_id).or_insert_with(|| CartLine {
            quantity: 0,
            price,
            title: title.to_owned(),
        });

        line.quantity = if override_quantity {
            quantity
        } else {
            line.quantity.saturating_add(quantity)
        };

        if line.quantity == 0 {
            self.lines.remove(&part_id);
        }
        self.dirty = true;
    }

    /// Add a resolved catalog item, snapshotting its current price and title.
    pub fn add_item(&mut self, item: &CatalogItem, quantity: u32, override_quantity: bool) {
        self.add(item.id, item.price, &item.title, quantity, override_quantity);
    }

    /// Remove a part's line. Absent parts are ignored.
    pub fn remove(&mut self, part_id: PartId) {
        if self.lines.remove(&part_id).is_some() {
            self.dirty = true;
        }
    }

    /// Empty the cart. Clearing an empty cart changes nothing.
    pub fn clear(&mut self) {
        if !self.lines.is_empty() {
            self.lines.clear();
            self.dirty = true;
        }
    }

    /// Look up a single line.
    #[must_use]
    pub fn line(&self, part_id: PartId) -> Option<&CartLine> {
        self.lines.get(&part_id)
    }

    /// IDs of every part in the cart, for a batched catalog lookup.
    #[must_use]
    pub fn part_ids(&self) -> Vec<PartId> {
        self.lines.keys().copied().collect()
    }

    /// Join the stored lines with resolved catalog items.
    ///
    /// Lines whose part is missing from `resolved` are still yielded, with
    /// `part: None`.
    pub fn entries<'a>(
        &'a self,
        resolved: &'a HashMap<PartId, CatalogItem>,
    ) -> impl Iterator<Item = CartEntry> + 'a {
        self.lines.iter().map(move |(id, line)| CartEntry {
            part_id: *id,
            quantity: line.quantity,
            price: line.price,
            total_price: line.price.times(line.quantity),
            title: line.title.clone(),
            part: resolved.get(id).cloned(),
        })
    }

    /// Sum of all line quantities.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.lines.values().map(|l| u64::from(l.quantity)).sum()
    }

    /// Sum of quantity × snapshotted unit price, in exact decimal arithmetic.
    #[must_use]
    pub fn total_price(&self) -> Price {
        self.lines.values().map(|l| l.price.times(l.quantity)).sum()
    }

    /// Number of distinct parts.
    #[must_use]
    pub fn unique_count(&self) -> usize {
        self.lines.len()
    }

    /// True when the cart holds no units. Checkout refuses empty carts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_quantity() == 0
    }

    /// True if the cart was modified since it was loaded.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Reset the dirty flag after the cart has been persisted.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Drop any zero-quantity lines that a hand-edited or legacy session
    /// payload may contain.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        let before = self.lines.len();
        self.lines.retain(|_, line| line.quantity > 0);
        if self.lines.len() != before {
            self.dirty = true;
        }
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn price(s: &str) -> Price {
        s.parse().unwrap()
    }

    fn item(id: i32, p: &str) -> CatalogItem {
        CatalogItem {
            id: PartId::new(id),
            title: format!("Part {id}"),
            price: price(p),
            is_active: true,
        }
    }

    #[test]
    fn test_add_accumulates() {
        let mut cart = Cart::new();
        let a = item(1, "10.00");
        cart.add_item(&a, 2, false);
        cart.add_item(&a, 3, false);
        cart.add_item(&item(2, "1.00"), 4, false);

        assert_eq!(cart.total_quantity(), 9);
        assert_eq!(cart.unique_count(), 2);
        assert_eq!(cart.line(PartId::new(1)).unwrap().quantity, 5);
        assert!(cart.is_dirty());
    }

    #[test]
    fn test_override_sets_exact_quantity() {
        let mut cart = Cart::new();
        let a = item(1, "10.00");
        cart.add_item(&a, 7, false);
        cart.add_item(&a, 2, true);
        assert_eq!(cart.total_quantity(), 2);
    }

    #[test]
    fn test_override_zero_removes_line() {
        let mut cart = Cart::new();
        let a = item(1, "10.00");
        cart.add_item(&a, 3, false);
        cart.add_item(&a, 0, true);

        assert_eq!(cart.total_quantity(), 0);
        assert_eq!(cart.unique_count(), 0);
        assert!(cart.line(PartId::new(1)).is_none());
    }

    #[test]
    fn test_zero_quantity_first_add_leaves_nothing() {
        let mut cart = Cart::new();
        cart.add_item(&item(1, "10.00"), 0, false);
        assert_eq!(cart.unique_count(), 0);
    }

    #[test]
    fn test_price_snapshot_is_kept() {
        let mut cart = Cart::new();
        cart.add_item(&item(1, "10.00"), 1, false);
        // Catalog price changed before the second add.
        cart.add_item(&item(1, "12.50"), 1, false);

        let line = cart.line(PartId::new(1)).unwrap();
        assert_eq!(line.price, price("10.00"));
        assert_eq!(cart.total_price(), price("20.00"));
    }

    #[test]
    fn test_total_price_exact() {
        let mut cart = Cart::new();
        cart.add_item(&item(1, "19.99"), 3, false);
        assert_eq!(cart.total_price(), price("59.97"));
        assert_eq!(cart.total_price().to_string(), "59.97");
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut cart = Cart::new();
        cart.remove(PartId::new(99));
        assert!(!cart.is_dirty());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut cart = Cart::new();
        cart.add_item(&item(1, "1.00"), 1, false);
        cart.clear();
        let once = cart.clone();
        cart.clear();

        assert_eq!(cart, once);
        assert_eq!(cart.total_quantity(), 0);
        assert_eq!(cart.unique_count(), 0);
    }

    #[test]
    fn test_entries_include_unresolved_lines() {
        let mut cart = Cart::new();
        cart.add_item(&item(1, "10.00"), 2, false);
        cart.add_item(&item(2, "5.00"), 1, false);

        let mut resolved = HashMap::new();
        resolved.insert(PartId::new(1), item(1, "11.00"));

        let entries: Vec<_> = cart.entries(&resolved).collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].total_price, price("20.00"));
        assert!(entries[0].part.is_some());
        assert!(entries[1].part.is_none());
        assert_eq!(entries[1].display_name(), "Part 2");
    }

    #[test]
    fn test_session_payload_round_trip() {
        let mut cart = Cart::new();
        cart.add_item(&item(3, "19.99"), 2, false);

        let value = serde_json::to_value(&cart).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "3": { "quantity": 2, "price": "19.99", "title": "Part 3" } })
        );

        let restored: Cart = serde_json::from_value(value).unwrap();
        assert_eq!(restored.total_price(), price("39.98"));
        assert!(!restored.is_dirty());
    }

    #[test]
    fn test_sanitized_drops_zero_lines() {
        let payload = serde_json::json!({
            "1": { "quantity": 0, "price": "1.00" },
            "2": { "quantity": 1, "price": "2.00" }
        });
        let cart: Cart = serde_json::from_value::<Cart>(payload).unwrap().sanitized();
        assert_eq!(cart.unique_count(), 1);
        assert!(cart.is_dirty());
    }

    #[test]
    fn test_sequential_replay_is_deterministic() {
        let run = || {
            let mut cart = Cart::new();
            for (id, qty, ov) in [(1, 2, false), (2, 1, false), (1, 5, true), (3, 1, false)] {
                cart.add_item(&item(id, "2.50"), qty, ov);
            }
            cart.remove(PartId::new(2));
            cart
        };
        assert_eq!(run(), run());
        assert_eq!(run().total_quantity(), 6);
    }
}
