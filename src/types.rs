//! Core data types for canonical feed events and book snapshots.
//!
//! These types are designed to be:
//! - Small and `Copy` where they sit on the per-event hot path
//! - Exhaustively matched (no dynamic dispatch over event kinds)
//! - Serializable for downstream sinks
//!
//! Prices are integers scaled by [`PRICE_SCALE`]; quantities are signed
//! 64-bit so that ladder arithmetic can detect negative aggregates instead of
//! wrapping.

use serde::{Deserialize, Serialize};

/// Fixed-point scale for prices: real price = stored value / `PRICE_SCALE`.
pub const PRICE_SCALE: i64 = 1_000_000;

/// Default number of levels per side in a snapshot.
pub const DEFAULT_SNAPSHOT_DEPTH: usize = 10;

/// Convert a fixed-point price to a floating point real price.
#[inline]
pub fn real_price(price: i64) -> f64 {
    price as f64 / PRICE_SCALE as f64
}

/// Order side (bid or ask)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Side {
    /// Buy order (bid)
    Bid = b'B',
    /// Sell order (ask)
    Ask = b'A',
}

impl Side {
    /// Parse side from a byte. Accepts `S` as a sell alias.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'B' => Some(Side::Bid),
            b'A' | b'S' => Some(Side::Ask),
            _ => None,
        }
    }

    /// Convert to byte representation.
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Check if this is a bid.
    #[inline(always)]
    pub fn is_bid(self) -> bool {
        matches!(self, Side::Bid)
    }

    /// Check if this is an ask.
    #[inline(always)]
    pub fn is_ask(self) -> bool {
        matches!(self, Side::Ask)
    }

    /// The opposite side.
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }
}

/// New resting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOrder {
    pub order_id: u64,
    pub side: Side,
    pub price: i64,
    pub quantity: i64,
    pub sequence: i64,
    /// UTC microseconds
    pub timestamp: i64,
}

/// Price/quantity change of a resting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyOrder {
    pub order_id: u64,
    pub price: i64,
    pub quantity: i64,
    pub sequence: i64,
    pub timestamp: i64,
}

/// Removal of a resting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOrder {
    pub order_id: u64,
    pub sequence: i64,
    pub timestamp: i64,
}

/// Trade print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub price: i64,
    pub quantity: i64,
    pub sequence: i64,
    pub timestamp: i64,
    /// Exchange trade type code (0 when the feed does not carry one)
    pub trade_type: i64,
    pub aggressor_side: Option<Side>,
}

/// Normalized feed event produced by format-specific parsers.
///
/// Within one symbol's stream, sequence numbers are strictly increasing and
/// timestamps are non-decreasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CanonicalEvent {
    Add(AddOrder),
    Modify(ModifyOrder),
    Delete(DeleteOrder),
    Trade(TradeEvent),
}

impl CanonicalEvent {
    /// Create an add event.
    pub fn add(
        order_id: u64,
        side: Side,
        price: i64,
        quantity: i64,
        sequence: i64,
        timestamp: i64,
    ) -> Self {
        CanonicalEvent::Add(AddOrder {
            order_id,
            side,
            price,
            quantity,
            sequence,
            timestamp,
        })
    }

    /// Create a modify event.
    pub fn modify(order_id: u64, price: i64, quantity: i64, sequence: i64, timestamp: i64) -> Self {
        CanonicalEvent::Modify(ModifyOrder {
            order_id,
            price,
            quantity,
            sequence,
            timestamp,
        })
    }

    /// Create a delete event.
    pub fn delete(order_id: u64, sequence: i64, timestamp: i64) -> Self {
        CanonicalEvent::Delete(DeleteOrder {
            order_id,
            sequence,
            timestamp,
        })
    }

    /// Create a trade event without type or aggressor information.
    pub fn trade(price: i64, quantity: i64, sequence: i64, timestamp: i64) -> Self {
        CanonicalEvent::Trade(TradeEvent {
            price,
            quantity,
            sequence,
            timestamp,
            trade_type: 0,
            aggressor_side: None,
        })
    }

    /// Sequence number of the event.
    #[inline]
    pub fn sequence(&self) -> i64 {
        match self {
            CanonicalEvent::Add(e) => e.sequence,
            CanonicalEvent::Modify(e) => e.sequence,
            CanonicalEvent::Delete(e) => e.sequence,
            CanonicalEvent::Trade(e) => e.sequence,
        }
    }

    /// Timestamp of the event (UTC microseconds).
    #[inline]
    pub fn timestamp(&self) -> i64 {
        match self {
            CanonicalEvent::Add(e) => e.timestamp,
            CanonicalEvent::Modify(e) => e.timestamp,
            CanonicalEvent::Delete(e) => e.timestamp,
            CanonicalEvent::Trade(e) => e.timestamp,
        }
    }

    /// Single-letter record code, as used by delimited add/modify/delete feeds.
    pub fn code(&self) -> char {
        match self {
            CanonicalEvent::Add(_) => 'A',
            CanonicalEvent::Modify(_) => 'M',
            CanonicalEvent::Delete(_) => 'D',
            CanonicalEvent::Trade(_) => 'T',
        }
    }

    /// True for trade prints.
    #[inline]
    pub fn is_trade(&self) -> bool {
        matches!(self, CanonicalEvent::Trade(_))
    }
}

/// One price level in a snapshot.
///
/// `(0, 0)` marks an unused slot past the last populated level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: i64,
    pub quantity: i64,
}

impl PriceLevel {
    /// Unused slot.
    pub const EMPTY: PriceLevel = PriceLevel {
        price: 0,
        quantity: 0,
    };

    pub fn new(price: i64, quantity: i64) -> Self {
        Self { price, quantity }
    }

    /// True for an unused slot.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.price == 0 && self.quantity == 0
    }
}

/// Book consistency status of a snapshot's top of book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookConsistency {
    /// best_bid < best_ask
    Valid,
    /// No quotes on one or both sides
    Empty,
    /// best_bid == best_ask
    Locked,
    /// best_bid > best_ask
    Crossed,
}

impl BookConsistency {
    /// Classify a pair of optional top prices.
    #[inline]
    pub fn classify(bid: Option<i64>, ask: Option<i64>) -> Self {
        match (bid, ask) {
            (Some(bid), Some(ask)) => {
                if bid < ask {
                    BookConsistency::Valid
                } else if bid == ask {
                    BookConsistency::Locked
                } else {
                    BookConsistency::Crossed
                }
            }
            _ => BookConsistency::Empty,
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        matches!(self, BookConsistency::Valid)
    }

    #[inline]
    pub fn is_crossed(&self) -> bool {
        matches!(self, BookConsistency::Crossed)
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        matches!(self, BookConsistency::Locked)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, BookConsistency::Empty)
    }
}

/// Fixed-depth book snapshot.
///
/// `bid` is sorted best (highest) first and `ask` best (lowest) first; both
/// always hold exactly `depth` slots, padded with [`PriceLevel::EMPTY`].
/// Immutable once emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSnapshot {
    /// UTC microseconds
    pub timestamp: i64,
    pub timestamp_string: String,
    pub sequence: i64,
    pub bid: Vec<PriceLevel>,
    pub ask: Vec<PriceLevel>,
    /// Unchanged candidates suppressed since the previously emitted snapshot
    pub suppressed: u64,
}

impl BookSnapshot {
    /// Create an empty snapshot with `depth` slots per side.
    pub fn empty(depth: usize) -> Self {
        Self {
            timestamp: 0,
            timestamp_string: String::new(),
            sequence: 0,
            bid: vec![PriceLevel::EMPTY; depth],
            ask: vec![PriceLevel::EMPTY; depth],
            suppressed: 0,
        }
    }

    /// Number of slots per side.
    #[inline]
    pub fn depth(&self) -> usize {
        self.bid.len()
    }

    /// Levels for one side.
    #[inline]
    pub fn side(&self, side: Side) -> &[PriceLevel] {
        match side {
            Side::Bid => &self.bid,
            Side::Ask => &self.ask,
        }
    }

    /// Top price on one side, if populated.
    #[inline]
    pub fn top_price(&self, side: Side) -> Option<i64> {
        self.side(side)
            .first()
            .filter(|level| !level.is_empty())
            .map(|level| level.price)
    }

    /// Best (highest) bid price.
    #[inline]
    pub fn best_bid(&self) -> Option<i64> {
        self.top_price(Side::Bid)
    }

    /// Best (lowest) ask price.
    #[inline]
    pub fn best_ask(&self) -> Option<i64> {
        self.top_price(Side::Ask)
    }

    /// Top level on both sides.
    pub fn top(&self) -> (PriceLevel, PriceLevel) {
        self.level(0)
    }

    /// Level `i` on both sides (empty slots past the depth).
    pub fn level(&self, i: usize) -> (PriceLevel, PriceLevel) {
        (
            self.bid.get(i).copied().unwrap_or(PriceLevel::EMPTY),
            self.ask.get(i).copied().unwrap_or(PriceLevel::EMPTY),
        )
    }

    /// Mid price in real units.
    pub fn mid_price(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((real_price(bid) + real_price(ask)) / 2.0),
            _ => None,
        }
    }

    /// Spread in fixed-point units.
    pub fn spread(&self) -> Option<i64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Consistency of the top of book.
    #[inline]
    pub fn consistency(&self) -> BookConsistency {
        BookConsistency::classify(self.best_bid(), self.best_ask())
    }

    /// Level-by-level equality, ignoring time and sequence metadata.
    #[inline]
    pub fn same_levels(&self, other: &BookSnapshot) -> bool {
        self.bid == other.bid && self.ask == other.ask
    }
}

/// Trade record emitted for downstream consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp: i64,
    pub timestamp_string: String,
    pub sequence: i64,
    pub price: i64,
    pub quantity: i64,
    pub trade_type: i64,
    pub aggressor_side: Option<Side>,
}
