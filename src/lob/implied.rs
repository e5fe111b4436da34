//! Implied book derivation.
//!
//! Merges one symbol's published snapshot stream with its trade stream by
//! sequence number. A trade that is marketable against the displayed top of
//! book depletes a working copy of the last snapshot, producing an *implied*
//! book state until the next published snapshot resynchronises the view.
//!
//! # Merge Rule
//!
//! | Next trade vs next snapshot | Action |
//! |-----------------------------|--------|
//! | `trade.sequence <= snapshot.sequence` | consume the trade |
//! | otherwise, or no trade pending | consume the snapshot, drop implied state |
//! | no snapshot pending | stream ends, remaining trades dropped |
//!
//! Non-marketable trades are skipped inside a loop, so arbitrarily long runs
//! of them cost no stack depth.

use std::iter::Peekable;

use serde::{Deserialize, Serialize};

use crate::error::{BookError, Result};
use crate::sink::BookSink;
use crate::types::{BookSnapshot, PriceLevel, Side, TradeRecord};

/// Side of the displayed book a trade at `trade_price` executes against.
///
/// A trade is marketable against the bid when it prints at or below the top
/// bid and no lower than the deepest displayed bid, and against the ask when
/// it prints at or above the top ask and no higher than the deepest displayed
/// ask. The bid side is checked first. Trades outside both ranges are off-book
/// and return `None`.
///
/// # Example
/// ```
/// use auction_book::{trade_improves_top, BookSnapshot, PriceLevel, Side};
///
/// let mut snap = BookSnapshot::empty(3);
/// snap.bid[0] = PriceLevel::new(102, 10);
/// snap.bid[1] = PriceLevel::new(101, 10);
/// snap.ask[0] = PriceLevel::new(105, 10);
///
/// assert_eq!(trade_improves_top(101, &snap), Some(Side::Bid));
/// assert_eq!(trade_improves_top(105, &snap), Some(Side::Ask));
/// assert_eq!(trade_improves_top(99, &snap), None);
/// assert_eq!(trade_improves_top(103, &snap), None);
/// ```
pub fn trade_improves_top(trade_price: i64, snapshot: &BookSnapshot) -> Option<Side> {
    [Side::Bid, Side::Ask]
        .into_iter()
        .find(|&side| within_displayed(side, trade_price, snapshot.side(side)))
}

fn within_displayed(side: Side, price: i64, levels: &[PriceLevel]) -> bool {
    let mut populated = levels.iter().take_while(|level| !level.is_empty());
    let Some(top) = populated.next() else {
        return false;
    };
    let deepest = populated.last().unwrap_or(top);

    match side {
        Side::Bid => price <= top.price && price >= deepest.price,
        Side::Ask => price >= top.price && price <= deepest.price,
    }
}

/// Working copy of the last published snapshot, depleted by trades.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpliedBookState {
    book: BookSnapshot,
}

impl ImpliedBookState {
    /// Start a working copy of a published snapshot.
    pub fn from_snapshot(snapshot: &BookSnapshot) -> Self {
        let mut book = snapshot.clone();
        book.suppressed = 0;
        Self { book }
    }

    #[inline]
    pub fn snapshot(&self) -> &BookSnapshot {
        &self.book
    }

    pub fn into_snapshot(self) -> BookSnapshot {
        self.book
    }

    /// Deplete `side` by an execution of `trade`.
    ///
    /// Every level priced better than the trade is removed outright. A level
    /// at exactly the trade price loses the trade quantity and is removed once
    /// it reaches zero. Removed levels shift the rest of the side up, back-filling with empty slots.
    ///
    /// # Errors
    /// `OutOfOrderTimestamp` if the trade's sequence or timestamp is behind
    /// the state's. The state is left unchanged.
    pub fn apply_trade(&mut self, side: Side, trade: &TradeRecord) -> Result<()> {
        if trade.sequence < self.book.sequence || trade.timestamp < self.book.timestamp {
            return Err(BookError::OutOfOrderTimestamp {
                last_sequence: self.book.sequence,
                last_timestamp: self.book.timestamp,
                sequence: trade.sequence,
                timestamp: trade.timestamp,
            });
        }

        let levels = match side {
            Side::Bid => &mut self.book.bid,
            Side::Ask => &mut self.book.ask,
        };

        while let Some(front) = levels.first_mut() {
            if front.is_empty() {
                break;
            }
            let better = match side {
                Side::Bid => front.price > trade.price,
                Side::Ask => front.price < trade.price,
            };
            if better {
                shift_up(levels);
                continue;
            }
            if front.price == trade.price {
                front.quantity -= trade.quantity;
                if front.quantity <= 0 {
                    shift_up(levels);
                }
            }
            break;
        }

        self.book.timestamp = trade.timestamp;
        self.book.timestamp_string.clone_from(&trade.timestamp_string);
        self.book.sequence = trade.sequence;
        Ok(())
    }
}

/// Drop the front level and back-fill the tail.
fn shift_up(levels: &mut Vec<PriceLevel>) {
    if !levels.is_empty() {
        levels.remove(0);
        levels.push(PriceLevel::EMPTY);
    }
}

/// One element of the merged stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookView {
    /// Snapshot exactly as published by the book builder
    Published(BookSnapshot),
    /// Synthetic state reflecting trades not yet seen in a published snapshot
    Implied(BookSnapshot),
}

impl BookView {
    #[inline]
    pub fn is_implied(&self) -> bool {
        matches!(self, BookView::Implied(_))
    }

    #[inline]
    pub fn snapshot(&self) -> &BookSnapshot {
        match self {
            BookView::Published(book) | BookView::Implied(book) => book,
        }
    }

    pub fn into_snapshot(self) -> BookSnapshot {
        match self {
            BookView::Published(book) | BookView::Implied(book) => book,
        }
    }
}

/// Counters for the merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpliedStats {
    pub snapshots_passed: u64,
    /// Marketable trades applied to an implied state
    pub trades_applied: u64,
    /// Off-book trades and trades before the first snapshot
    pub trades_skipped: u64,
    /// Trades left over after the snapshot stream ended
    pub trades_dropped: u64,
    pub implied_states: u64,
}

/// Pull-based merge of a snapshot stream and a trade stream.
///
/// Yields `Result<BookView>`; iteration stops after the first error.
///
/// # Example
/// ```
/// use auction_book::{BookSnapshot, ImpliedBookEngine, PriceLevel, TradeRecord};
///
/// let mut snap = BookSnapshot::empty(2);
/// snap.sequence = 1;
/// snap.bid[0] = PriceLevel::new(100, 50);
///
/// let trade = TradeRecord {
///     timestamp: 0,
///     timestamp_string: String::new(),
///     sequence: 2,
///     price: 100,
///     quantity: 20,
///     trade_type: 0,
///     aggressor_side: None,
/// };
///
/// let mut later = snap.clone();
/// later.sequence = 3;
///
/// let views: Vec<_> = ImpliedBookEngine::from_vecs(vec![snap, later], vec![trade])
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(views.len(), 3);
/// assert!(views[1].is_implied());
/// assert_eq!(views[1].snapshot().bid[0], PriceLevel::new(100, 30));
/// ```
pub struct ImpliedBookEngine<S, T>
where
    S: Iterator<Item = BookSnapshot>,
    T: Iterator<Item = TradeRecord>,
{
    snapshots: Peekable<S>,
    trades: Peekable<T>,
    /// Last published snapshot
    current: Option<BookSnapshot>,
    implied: Option<ImpliedBookState>,
    stats: ImpliedStats,
    done: bool,
}

impl<S, T> ImpliedBookEngine<S, T>
where
    S: Iterator<Item = BookSnapshot>,
    T: Iterator<Item = TradeRecord>,
{
    pub fn new<I, J>(snapshots: I, trades: J) -> Self
    where
        I: IntoIterator<IntoIter = S>,
        J: IntoIterator<IntoIter = T>,
    {
        Self {
            snapshots: snapshots.into_iter().peekable(),
            trades: trades.into_iter().peekable(),
            current: None,
            implied: None,
            stats: ImpliedStats::default(),
            done: false,
        }
    }

    #[inline]
    pub fn stats(&self) -> &ImpliedStats {
        &self.stats
    }

    /// Active implied state, if any trade has touched the current snapshot.
    pub fn implied_state(&self) -> Option<&ImpliedBookState> {
        self.implied.as_ref()
    }

    /// Last published snapshot consumed.
    pub fn current(&self) -> Option<&BookSnapshot> {
        self.current.as_ref()
    }

    /// Apply one trade. `None` when it does not touch the displayed book.
    fn apply_trade(&mut self, trade: &TradeRecord) -> Result<Option<BookView>> {
        let Some(current) = self.current.as_ref() else {
            self.stats.trades_skipped += 1;
            return Ok(None);
        };

        let displayed = self
            .implied
            .as_ref()
            .map_or(current, ImpliedBookState::snapshot);
        let Some(side) = trade_improves_top(trade.price, displayed) else {
            self.stats.trades_skipped += 1;
            return Ok(None);
        };

        let state = self
            .implied
            .get_or_insert_with(|| ImpliedBookState::from_snapshot(current));
        state.apply_trade(side, trade)?;

        self.stats.trades_applied += 1;
        self.stats.implied_states += 1;
        Ok(Some(BookView::Implied(state.snapshot().clone())))
    }

    /// Run the merge to completion, writing every view to `sink`.
    pub fn drain_into(mut self, symbol: &str, sink: &mut impl BookSink) -> Result<ImpliedStats> {
        for view in self.by_ref() {
            sink.write_view(symbol, &view?)?;
        }
        log::debug!(
            "{}: {} implied states from {} trades, {} published",
            symbol,
            self.stats.implied_states,
            self.stats.trades_applied,
            self.stats.snapshots_passed
        );
        Ok(self.stats)
    }

    fn finish(&mut self) {
        self.done = true;
        let dropped = self.trades.by_ref().count() as u64;
        if dropped > 0 {
            log::debug!("Dropping {dropped} trades after the last snapshot");
            self.stats.trades_dropped += dropped;
        }
    }
}

impl<S, T> Iterator for ImpliedBookEngine<S, T>
where
    S: Iterator<Item = BookSnapshot>,
    T: Iterator<Item = TradeRecord>,
{
    type Item = Result<BookView>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let Some(next_sequence) = self.snapshots.peek().map(|snap| snap.sequence) else {
                self.finish();
                return None;
            };

            let trade = match self.trades.peek() {
                Some(trade) if trade.sequence <= next_sequence => self.trades.next(),
                _ => None,
            };

            let Some(trade) = trade else {
                let snapshot = self.snapshots.next()?;
                self.implied = None;
                self.current = Some(snapshot.clone());
                self.stats.snapshots_passed += 1;
                return Some(Ok(BookView::Published(snapshot)));
            };

            match self.apply_trade(&trade) {
                Ok(Some(view)) => return Some(Ok(view)),
                Ok(None) => continue,
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

impl ImpliedBookEngine<std::vec::IntoIter<BookSnapshot>, std::vec::IntoIter<TradeRecord>> {
    /// Engine over in-memory snapshot and trade vectors.
    pub fn from_vecs(snapshots: Vec<BookSnapshot>, trades: Vec<TradeRecord>) -> Self {
        Self::new(snapshots, trades)
    }
}
