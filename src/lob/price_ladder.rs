//! Aggregated price ladder for one side of the book.
//!
//! A `PriceLadder` maps price → aggregate resting quantity and yields prices
//! in priority order (highest first for bids, lowest first for asks).
//!
//! # Invariant
//!
//! Every price present in the ladder has an aggregate quantity `> 0`, and the
//! price list holds exactly the keys of the aggregate map. Levels that reach
//! zero are removed; a delta that would drive an aggregate negative is
//! rejected as a data integrity error and leaves the ladder untouched.
//! Verified in debug builds via `verify_invariant()`.
//!
//! # Performance
//!
//! | Operation | Complexity |
//! |-----------|------------|
//! | `update_quantity` (existing price) | O(1) |
//! | `update_quantity` (new price) | O(1), marks order dirty |
//! | `update_quantity` (level removed) | O(log n) clean / O(n) dirty |
//! | `top` / `top_n` | O(1) clean, O(n log n) after insertions |
//! | `quantity_at` | O(1) |
//!
//! Sorting is lazy: a burst of insertions costs one sort at the next query.

use ahash::AHashMap;
use std::cmp::Ordering;

use crate::error::{BookError, Result};
use crate::types::{PriceLevel, Side};

/// Aggregate quantity by price for one side.
#[derive(Debug, Clone)]
pub struct PriceLadder {
    side: Side,
    /// price -> aggregate quantity (always > 0)
    quantities: AHashMap<i64, i64>,
    /// Prices in priority order when `dirty` is false
    prices: Vec<i64>,
    dirty: bool,
}

impl PriceLadder {
    /// Create an empty ladder for `side`.
    pub fn new(side: Side) -> Self {
        Self {
            side,
            quantities: AHashMap::new(),
            prices: Vec::new(),
            dirty: false,
        }
    }

    /// Side this ladder aggregates.
    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    /// Apply a non-zero quantity delta at `price`.
    ///
    /// Returns the new aggregate at that price (0 if the level was removed).
    ///
    /// # Errors
    /// - `InvalidDelta` if `delta == 0`
    /// - `DataIntegrity` if the aggregate would become negative or overflow
    pub fn update_quantity(&mut self, price: i64, delta: i64) -> Result<i64> {
        if delta == 0 {
            return Err(BookError::InvalidDelta { price });
        }

        let (side, aggregate) = (self.side, self.quantity_at(price));
        let integrity_error = || BookError::DataIntegrity {
            side,
            price,
            aggregate,
            delta,
        };
        let updated = aggregate.checked_add(delta).ok_or_else(integrity_error)?;

        match updated.cmp(&0) {
            Ordering::Less => return Err(integrity_error()),
            Ordering::Equal => {
                self.quantities.remove(&price);
                self.remove_price(price);
            }
            Ordering::Greater => {
                if self.quantities.insert(price, updated).is_none() {
                    self.prices.push(price);
                    self.dirty = true;
                }
            }
        }

        #[cfg(debug_assertions)]
        self.verify_invariant();

        Ok(updated)
    }

    /// Best price (max for bids, min for asks), or `None` if empty.
    #[inline]
    pub fn top(&mut self) -> Option<i64> {
        self.ensure_sorted();
        self.prices.first().copied()
    }

    /// Up to `n` prices in priority order.
    #[inline]
    pub fn top_n(&mut self, n: usize) -> &[i64] {
        self.ensure_sorted();
        let n = n.min(self.prices.len());
        &self.prices[..n]
    }

    /// Up to `n` levels (price, aggregate) in priority order.
    pub fn top_levels(&mut self, n: usize) -> Vec<PriceLevel> {
        self.ensure_sorted();
        self.prices
            .iter()
            .take(n)
            .map(|&price| PriceLevel::new(price, self.quantity_at(price)))
            .collect()
    }

    /// Aggregate quantity at `price`, 0 if absent.
    #[inline]
    pub fn quantity_at(&self, price: i64) -> i64 {
        self.quantities.get(&price).copied().unwrap_or(0)
    }

    /// Number of populated price levels.
    #[inline]
    pub fn len(&self) -> usize {
        self.quantities.len()
    }

    /// Check if the ladder has no levels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.quantities.is_empty()
    }

    /// Sum of all aggregates on this side.
    pub fn total_quantity(&self) -> i64 {
        self.quantities.values().sum()
    }

    /// Remove all levels.
    pub fn clear(&mut self) {
        self.quantities.clear();
        self.prices.clear();
        self.dirty = false;
    }

    /// Priority comparison: better prices sort first.
    #[inline]
    fn priority(&self, a: &i64, b: &i64) -> Ordering {
        match self.side {
            Side::Bid => b.cmp(a),
            Side::Ask => a.cmp(b),
        }
    }

    fn ensure_sorted(&mut self) {
        if self.dirty {
            let side = self.side;
            self.prices.sort_unstable_by(|a, b| match side {
                Side::Bid => b.cmp(a),
                Side::Ask => a.cmp(b),
            });
            self.dirty = false;
        }
    }

    fn remove_price(&mut self, price: i64) {
        let position = if self.dirty {
            self.prices.iter().position(|&p| p == price)
        } else {
            self.prices
                .binary_search_by(|p| self.priority(p, &price))
                .ok()
        };
        if let Some(index) = position {
            self.prices.remove(index);
        }
    }

    /// Verify that the price list and aggregate map agree and every
    /// aggregate is positive.
    #[cfg(debug_assertions)]
    pub fn verify_invariant(&self) {
        debug_assert_eq!(
            self.prices.len(),
            self.quantities.len(),
            "PriceLadder invariant violated: {} prices vs {} aggregates",
            self.prices.len(),
            self.quantities.len()
        );
        debug_assert!(
            self.quantities.values().all(|&q| q > 0),
            "PriceLadder invariant violated: non-positive aggregate"
        );
    }

    #[cfg(not(debug_assertions))]
    #[inline]
    pub fn verify_invariant(&self) {}
}

/// The bid and ask ladders of one book.
#[derive(Debug, Clone)]
pub struct BookSides {
    pub bid: PriceLadder,
    pub ask: PriceLadder,
}

impl Default for BookSides {
    fn default() -> Self {
        Self::new()
    }
}

impl BookSides {
    pub fn new() -> Self {
        Self {
            bid: PriceLadder::new(Side::Bid),
            ask: PriceLadder::new(Side::Ask),
        }
    }

    #[inline]
    pub fn side(&self, side: Side) -> &PriceLadder {
        match side {
            Side::Bid => &self.bid,
            Side::Ask => &self.ask,
        }
    }

    #[inline]
    pub fn side_mut(&mut self, side: Side) -> &mut PriceLadder {
        match side {
            Side::Bid => &mut self.bid,
            Side::Ask => &mut self.ask,
        }
    }

    /// Check if both ladders are empty.
    pub fn is_empty(&self) -> bool {
        self.bid.is_empty() && self.ask.is_empty()
    }

    pub fn clear(&mut self) {
        self.bid.clear();
        self.ask.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_ladder_is_empty() {
        let mut ladder = PriceLadder::new(Side::Bid);
        assert!(ladder.is_empty());
        assert_eq!(ladder.top(), None);
        assert!(ladder.top_n(5).is_empty());
        assert_eq!(ladder.quantity_at(100), 0);
    }

    #[test]
    fn test_zero_delta_rejected() {
        let mut ladder = PriceLadder::new(Side::Ask);
        assert_eq!(
            ladder.update_quantity(100, 0),
            Err(BookError::InvalidDelta { price: 100 })
        );
    }

    #[test]
    fn test_aggregate_overflow_rejected() {
        let mut ladder = PriceLadder::new(Side::Ask);
        ladder.update_quantity(100, i64::MAX).unwrap();
        let err = ladder.update_quantity(100, 1).unwrap_err();
        assert!(matches!(
            err,
            BookError::DataIntegrity {
                side: Side::Ask,
                price: 100,
                aggregate: i64::MAX,
                delta: 1
            }
        ));
        assert_eq!(ladder.quantity_at(100), i64::MAX);
    }

    #[test]
    fn test_negative_aggregate_rejected() {
        let mut ladder = PriceLadder::new(Side::Bid);
        ladder.update_quantity(100, 5).unwrap();
        let err = ladder.update_quantity(100, -6).unwrap_err();
        assert!(matches!(
            err,
            BookError::DataIntegrity {
                side: Side::Bid,
                price: 100,
                aggregate: 5,
                delta: -6
            }
        ));
        // Ladder untouched
        assert_eq!(ladder.quantity_at(100), 5);

        let err = ladder.update_quantity(200, -1).unwrap_err();
        assert!(matches!(err, BookError::DataIntegrity { aggregate: 0, .. }));
        assert_eq!(ladder.len(), 1);
    }

    #[test]
    fn test_level_removed_at_zero() {
        let mut ladder = PriceLadder::new(Side::Ask);
        ladder.update_quantity(100, 5).unwrap();
        ladder.update_quantity(101, 5).unwrap();
        assert_eq!(ladder.update_quantity(100, -5).unwrap(), 0);
        assert_eq!(ladder.len(), 1);
        assert_eq!(ladder.top(), Some(101));
    }

    #[test]
    fn test_bid_priority_descending() {
        let mut ladder = PriceLadder::new(Side::Bid);
        for price in [100, 103, 101, 99, 102] {
            ladder.update_quantity(price, 1).unwrap();
        }
        assert_eq!(ladder.top(), Some(103));
        assert_eq!(ladder.top_n(3), &[103, 102, 101]);
        assert_eq!(ladder.top_n(10), &[103, 102, 101, 100, 99]);
    }

    #[test]
    fn test_ask_priority_ascending() {
        let mut ladder = PriceLadder::new(Side::Ask);
        for price in [105, 103, 104] {
            ladder.update_quantity(price, 2).unwrap();
        }
        assert_eq!(ladder.top(), Some(103));
        assert_eq!(ladder.top_n(2), &[103, 104]);
    }

    #[test]
    fn test_removal_while_clean_keeps_order() {
        let mut ladder = PriceLadder::new(Side::Bid);
        for price in [100, 101, 102, 103] {
            ladder.update_quantity(price, 1).unwrap();
        }
        assert_eq!(ladder.top(), Some(103)); // sorts, now clean
        ladder.update_quantity(102, -1).unwrap();
        ladder.update_quantity(103, -1).unwrap();
        assert_eq!(ladder.top_n(5), &[101, 100]);
    }

    #[test]
    fn test_removal_while_dirty() {
        let mut ladder = PriceLadder::new(Side::Ask);
        ladder.update_quantity(105, 1).unwrap();
        ladder.update_quantity(103, 1).unwrap();
        ladder.update_quantity(105, -1).unwrap();
        assert_eq!(ladder.top_n(5), &[103]);
    }

    #[test]
    fn test_top_levels_carry_aggregates() {
        let mut ladder = PriceLadder::new(Side::Bid);
        ladder.update_quantity(100, 5).unwrap();
        ladder.update_quantity(100, 3).unwrap();
        ladder.update_quantity(99, 7).unwrap();
        assert_eq!(
            ladder.top_levels(5),
            vec![PriceLevel::new(100, 8), PriceLevel::new(99, 7)]
        );
        assert_eq!(ladder.total_quantity(), 15);
    }

    #[test]
    fn test_book_sides() {
        let mut sides = BookSides::new();
        assert!(sides.is_empty());
        sides.side_mut(Side::Ask).update_quantity(101, 4).unwrap();
        assert_eq!(sides.side(Side::Ask).quantity_at(101), 4);
        assert!(sides.side(Side::Bid).is_empty());
        sides.clear();
        assert!(sides.is_empty());
    }

    proptest! {
        #[test]
        fn top_n_is_priority_ordered_and_aggregated(
            adds in prop::collection::vec((1i64..500, 1i64..1_000), 1..200),
            n in 1usize..20,
        ) {
            let mut bids = PriceLadder::new(Side::Bid);
            let mut asks = PriceLadder::new(Side::Ask);
            let mut expected = std::collections::BTreeMap::new();

            for &(price, qty) in &adds {
                bids.update_quantity(price, qty).unwrap();
                asks.update_quantity(price, qty).unwrap();
                *expected.entry(price).or_insert(0i64) += qty;
            }

            let bid_top: Vec<i64> = bids.top_n(n).to_vec();
            let want_bid: Vec<i64> = expected.keys().rev().take(n).copied().collect();
            prop_assert_eq!(bid_top, want_bid);

            let ask_top: Vec<i64> = asks.top_n(n).to_vec();
            let want_ask: Vec<i64> = expected.keys().take(n).copied().collect();
            prop_assert_eq!(ask_top, want_ask);

            for (&price, &qty) in &expected {
                prop_assert_eq!(bids.quantity_at(price), qty);
                prop_assert_eq!(asks.quantity_at(price), qty);
            }
        }

        #[test]
        fn add_then_remove_restores_aggregate(
            existing in prop::collection::vec((1i64..50, 1i64..100), 0..50),
            price in 1i64..50,
            qty in 1i64..100,
        ) {
            let mut ladder = PriceLadder::new(Side::Ask);
            for &(p, q) in &existing {
                ladder.update_quantity(p, q).unwrap();
            }
            let before = ladder.quantity_at(price);
            let levels_before = ladder.len();

            ladder.update_quantity(price, qty).unwrap();
            ladder.update_quantity(price, -qty).unwrap();

            prop_assert_eq!(ladder.quantity_at(price), before);
            prop_assert_eq!(ladder.len(), levels_before);
        }
    }
}
