//! Resting order registry.
//!
//! Tracks resting orders by identifier and keeps the bid/ask ladders in step
//! with every mutation: ladder levels change only as a consequence of a
//! registry add, modify or delete.
//!
//! # Duplicate identifiers
//!
//! Feeds occasionally reuse an order id while an earlier order under the same
//! id is still resting. The registry then stacks the entries for that id:
//! deletes pop the most recently added entry first (LIFO), and modifies are
//! rejected while more than one entry is stacked.

use ahash::AHashMap;

use super::price_ladder::BookSides;
use crate::error::{BookError, Result};
use crate::types::Side;

/// A live, unmatched order contributing quantity to a ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestingOrder {
    pub order_id: u64,
    pub side: Side,
    pub price: i64,
    pub quantity: i64,
}

/// Storage for one order id.
#[derive(Debug, Clone)]
enum OrderSlot {
    Single(RestingOrder),
    /// Reused id; last element is the most recent entry
    Stacked(Vec<RestingOrder>),
}

impl OrderSlot {
    #[inline]
    fn latest(&self) -> &RestingOrder {
        match self {
            OrderSlot::Single(order) => order,
            // Stacks always hold at least two entries
            OrderSlot::Stacked(stack) => &stack[stack.len() - 1],
        }
    }

    #[inline]
    fn depth(&self) -> usize {
        match self {
            OrderSlot::Single(_) => 1,
            OrderSlot::Stacked(stack) => stack.len(),
        }
    }
}

/// Order id → resting order(s).
#[derive(Debug, Clone, Default)]
pub struct OrderRegistry {
    orders: AHashMap<u64, OrderSlot>,
    /// Total resting entries, counting stacked duplicates
    resting: usize,
    /// Number of adds that reused a live id
    duplicate_adds: u64,
}

impl OrderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an order and apply `+quantity` to its ladder.
    ///
    /// A live `order_id` is not an error: the new entry is stacked on top of
    /// the existing one(s).
    ///
    /// # Errors
    /// `InvalidDelta` if `quantity <= 0`; nothing is changed.
    pub fn add(
        &mut self,
        sides: &mut BookSides,
        order_id: u64,
        side: Side,
        price: i64,
        quantity: i64,
    ) -> Result<()> {
        if quantity <= 0 {
            return Err(BookError::InvalidDelta { price });
        }
        sides.side_mut(side).update_quantity(price, quantity)?;

        let order = RestingOrder {
            order_id,
            side,
            price,
            quantity,
        };

        match self.orders.remove(&order_id) {
            None => {
                self.orders.insert(order_id, OrderSlot::Single(order));
            }
            Some(OrderSlot::Single(existing)) => {
                self.duplicate_adds += 1;
                log::debug!("Order id {order_id} reused while resting, stacking entry");
                self.orders
                    .insert(order_id, OrderSlot::Stacked(vec![existing, order]));
            }
            Some(OrderSlot::Stacked(mut stack)) => {
                self.duplicate_adds += 1;
                stack.push(order);
                self.orders.insert(order_id, OrderSlot::Stacked(stack));
            }
        }
        self.resting += 1;

        Ok(())
    }

    /// Remove the most recent entry for `order_id` and apply `-quantity`.
    ///
    /// Returns the removed entry.
    pub fn delete(&mut self, sides: &mut BookSides, order_id: u64) -> Result<RestingOrder> {
        let target = *self
            .orders
            .get(&order_id)
            .ok_or(BookError::OrderNotFound(order_id))?
            .latest();

        sides
            .side_mut(target.side)
            .update_quantity(target.price, -target.quantity)?;

        match self.orders.remove(&order_id) {
            Some(OrderSlot::Stacked(mut stack)) => {
                stack.pop();
                let slot = if stack.len() == 1 {
                    OrderSlot::Single(stack[0])
                } else {
                    OrderSlot::Stacked(stack)
                };
                self.orders.insert(order_id, slot);
            }
            Some(OrderSlot::Single(_)) | None => {}
        }
        self.resting -= 1;

        Ok(target)
    }

    /// Move an order to `new_price` with `new_quantity`.
    ///
    /// Applies `-old_quantity` at the old price and `+new_quantity` at the
    /// new price on the order's side. Returns the previous entry.
    pub fn modify(
        &mut self,
        sides: &mut BookSides,
        order_id: u64,
        new_price: i64,
        new_quantity: i64,
    ) -> Result<RestingOrder> {
        let slot = self
            .orders
            .get_mut(&order_id)
            .ok_or(BookError::OrderNotFound(order_id))?;

        let previous = match slot {
            OrderSlot::Single(order) => *order,
            OrderSlot::Stacked(stack) => {
                return Err(BookError::UnsupportedModifyOnDuplicate {
                    order_id,
                    depth: stack.len(),
                });
            }
        };

        if new_quantity <= 0 {
            return Err(BookError::InvalidDelta { price: new_price });
        }

        let ladder = sides.side_mut(previous.side);
        ladder.update_quantity(previous.price, -previous.quantity)?;
        if let Err(err) = ladder.update_quantity(new_price, new_quantity) {
            // Restore the old level so the ladder matches the registry
            ladder.update_quantity(previous.price, previous.quantity)?;
            return Err(err);
        }

        *slot = OrderSlot::Single(RestingOrder {
            order_id,
            side: previous.side,
            price: new_price,
            quantity: new_quantity,
        });

        Ok(previous)
    }

    /// Most recent entry for an order id.
    #[inline]
    pub fn get(&self, order_id: u64) -> Option<&RestingOrder> {
        self.orders.get(&order_id).map(OrderSlot::latest)
    }

    /// Number of stacked entries for an order id (0 if unknown).
    #[inline]
    pub fn depth(&self, order_id: u64) -> usize {
        self.orders.get(&order_id).map_or(0, OrderSlot::depth)
    }

    #[inline]
    pub fn contains(&self, order_id: u64) -> bool {
        self.orders.contains_key(&order_id)
    }

    /// Number of distinct live order ids.
    #[inline]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Number of resting entries, counting stacked duplicates.
    #[inline]
    pub fn resting_count(&self) -> usize {
        self.resting
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Number of adds that reused a live order id.
    #[inline]
    pub fn duplicate_adds(&self) -> u64 {
        self.duplicate_adds
    }

    pub fn clear(&mut self) {
        self.orders.clear();
        self.resting = 0;
        self.duplicate_adds = 0;
    }
}
