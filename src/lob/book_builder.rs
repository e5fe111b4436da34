//! Single-symbol book builder.
//!
//! Applies canonical add/modify/delete events to an [`OrderRegistry`] and
//! its bid/ask [`PriceLadder`](super::price_ladder::PriceLadder)s, then emits
//! a fixed-depth [`BookSnapshot`] whenever the visible top-N levels change.
//!
//! Per event:
//! 1. Reject sequence/timestamp regressions
//! 2. Dispatch to the registry (trades are passed through, not applied)
//! 3. Rebuild the top-N levels for both sides
//! 4. Record a crossed/locked warning if `top_bid >= top_ask`
//! 5. Suppress the snapshot if it is level-for-level identical to the
//!    previously emitted one

use serde::{Deserialize, Serialize};

use super::order_registry::OrderRegistry;
use super::price_ladder::BookSides;
use crate::error::{BookError, Result};
use crate::time::timestamp_string;
use crate::types::{
    real_price, BookSnapshot, CanonicalEvent, PriceLevel, Side, TradeEvent, TradeRecord,
    DEFAULT_SNAPSHOT_DEPTH,
};
use crate::warnings::{BookIntegrityWarning, IntegrityTag};

/// How snapshot levels are laid out below the top price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LevelLayout {
    /// The N best distinct resting prices
    #[default]
    Distinct,

    /// N consecutive ticks from the top price, quantity 0 where nothing rests
    TickGrid { tick_size: i64 },
}

/// Configuration for book builder behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookConfig {
    /// Number of levels per side in each snapshot
    pub snapshot_depth: usize,

    /// Whether trade events produce trade records
    pub include_trades: bool,

    /// Level layout below the top price
    pub layout: LevelLayout,

    /// Whether to log crossed/locked books as they occur
    pub log_warnings: bool,

    /// Offset from UTC used for `timestamp_string` (seconds east)
    pub display_utc_offset_secs: i32,
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            snapshot_depth: DEFAULT_SNAPSHOT_DEPTH,
            include_trades: false,
            layout: LevelLayout::Distinct,
            log_warnings: true,
            display_utc_offset_secs: 0,
        }
    }
}

impl BookConfig {
    /// Create a new config with specified snapshot depth.
    pub fn new(snapshot_depth: usize) -> Self {
        Self {
            snapshot_depth,
            ..Default::default()
        }
    }

    /// Enable/disable trade records.
    pub fn with_trades(mut self, include: bool) -> Self {
        self.include_trades = include;
        self
    }

    /// Set the level layout.
    pub fn with_layout(mut self, layout: LevelLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Enable/disable warning logs.
    pub fn with_logging(mut self, log: bool) -> Self {
        self.log_warnings = log;
        self
    }

    /// Set the display offset for timestamp strings.
    pub fn with_display_offset(mut self, utc_offset_secs: i32) -> Self {
        self.display_utc_offset_secs = utc_offset_secs;
        self
    }

    /// Reject configurations that cannot produce snapshots.
    pub fn validate(&self) -> Result<()> {
        if self.snapshot_depth == 0 {
            return Err(BookError::InvalidConfig(
                "snapshot_depth must be at least 1".to_string(),
            ));
        }
        if let LevelLayout::TickGrid { tick_size } = self.layout {
            if tick_size <= 0 {
                return Err(BookError::InvalidConfig(format!(
                    "tick_size must be positive, got {tick_size}"
                )));
            }
        }
        Ok(())
    }
}

/// Lifecycle of a builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderState {
    Active,
    /// Stream exhausted; no further events accepted
    Closed,
}

/// Record produced by applying one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookOutput {
    Snapshot(BookSnapshot),
    Trade(TradeRecord),
}

/// Statistics for monitoring book health.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookStats {
    /// Total events applied (all kinds)
    pub events_applied: u64,
    pub adds: u64,
    pub modifies: u64,
    pub deletes: u64,
    pub trades: u64,
    pub snapshots_emitted: u64,
    /// Candidate snapshots identical to the previous one
    pub unchanged: u64,
    pub crossed_quotes: u64,
    pub locked_quotes: u64,
    pub first_timestamp: Option<i64>,
    pub last_timestamp: Option<i64>,
}

/// End-of-stream report for one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSummary {
    pub symbol: String,
    /// Distinct order ids still resting
    pub outstanding_orders: usize,
    /// Resting entries including stacked duplicates
    pub resting_entries: usize,
    pub bid_levels: usize,
    pub ask_levels: usize,
    pub unchanged: u64,
    /// True when nothing is left resting
    pub is_complete: bool,
}

/// Per-symbol book state machine.
#[derive(Debug, Clone)]
pub struct BookBuilder {
    symbol: String,
    config: BookConfig,
    registry: OrderRegistry,
    sides: BookSides,
    /// Last emitted snapshot
    previous: Option<BookSnapshot>,
    /// Suppressions since `previous` was emitted
    suppressed: u64,
    last_sequence: Option<i64>,
    last_timestamp: i64,
    state: BuilderState,
    stats: BookStats,
    warnings: Vec<BookIntegrityWarning>,
}

impl BookBuilder {
    /// Create a builder with the default configuration.
    ///
    /// # Example
    /// ```
    /// use auction_book::BookBuilder;
    ///
    /// let book = BookBuilder::new("ESZ1");
    /// assert_eq!(book.symbol(), "ESZ1");
    /// ```
    pub fn new(symbol: impl Into<String>) -> Self {
        Self::build(symbol.into(), BookConfig::default())
    }

    /// Create a builder with a custom configuration.
    ///
    /// # Example
    /// ```
    /// use auction_book::{BookBuilder, BookConfig};
    ///
    /// let config = BookConfig::new(5).with_trades(true);
    /// let book = BookBuilder::with_config("ESZ1", config).unwrap();
    /// assert_eq!(book.config().snapshot_depth, 5);
    /// ```
    pub fn with_config(symbol: impl Into<String>, config: BookConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(symbol.into(), config))
    }

    /// Builder over an already validated config.
    pub(super) fn build(symbol: String, config: BookConfig) -> Self {
        Self {
            symbol,
            config,
            registry: OrderRegistry::new(),
            sides: BookSides::new(),
            previous: None,
            suppressed: 0,
            last_sequence: None,
            last_timestamp: i64::MIN,
            state: BuilderState::Active,
            stats: BookStats::default(),
            warnings: Vec::new(),
        }
    }

    #[inline]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[inline]
    pub fn config(&self) -> &BookConfig {
        &self.config
    }

    #[inline]
    pub fn state(&self) -> BuilderState {
        self.state
    }

    /// Apply one event.
    ///
    /// Returns the emitted snapshot, a trade record (trades with
    /// `include_trades`), or `None` when nothing is emitted.
    ///
    /// # Errors
    /// Every error is fatal for this symbol's stream: `OutOfOrderTimestamp`,
    /// `OrderNotFound`, `UnsupportedModifyOnDuplicate`, `InvalidDelta`,
    /// `DataIntegrity`, or `StreamClosed` after [`close`](Self::close).
    pub fn apply_event(&mut self, event: &CanonicalEvent) -> Result<Option<BookOutput>> {
        if self.state == BuilderState::Closed {
            return Err(BookError::StreamClosed(self.symbol.clone()));
        }
        self.check_ordering(event)?;

        match event {
            CanonicalEvent::Add(add) => {
                self.registry.add(
                    &mut self.sides,
                    add.order_id,
                    add.side,
                    add.price,
                    add.quantity,
                )?;
                self.stats.adds += 1;
            }
            CanonicalEvent::Modify(modify) => {
                self.registry.modify(
                    &mut self.sides,
                    modify.order_id,
                    modify.price,
                    modify.quantity,
                )?;
                self.stats.modifies += 1;
            }
            CanonicalEvent::Delete(delete) => {
                self.registry.delete(&mut self.sides, delete.order_id)?;
                self.stats.deletes += 1;
            }
            CanonicalEvent::Trade(trade) => {
                self.commit_ordering(event);
                self.stats.trades += 1;
                return Ok(self
                    .config
                    .include_trades
                    .then(|| BookOutput::Trade(self.trade_record(trade))));
            }
        }

        self.commit_ordering(event);
        self.check_integrity(event.sequence(), event.timestamp());

        let candidate = self.candidate_snapshot(event.sequence(), event.timestamp());
        Ok(self.emit_if_changed(candidate).map(BookOutput::Snapshot))
    }

    fn check_ordering(&self, event: &CanonicalEvent) -> Result<()> {
        if let Some(last_sequence) = self.last_sequence {
            if event.sequence() <= last_sequence || event.timestamp() < self.last_timestamp {
                return Err(BookError::OutOfOrderTimestamp {
                    last_sequence,
                    last_timestamp: self.last_timestamp,
                    sequence: event.sequence(),
                    timestamp: event.timestamp(),
                });
            }
        }
        Ok(())
    }

    fn commit_ordering(&mut self, event: &CanonicalEvent) {
        let timestamp = event.timestamp();
        self.last_sequence = Some(event.sequence());
        self.last_timestamp = timestamp;
        self.stats.events_applied += 1;
        self.stats.first_timestamp.get_or_insert(timestamp);
        self.stats.last_timestamp = Some(timestamp);
    }

    /// Record a warning when the top of book is crossed or locked.
    fn check_integrity(&mut self, sequence: i64, timestamp: i64) {
        let (Some(bid), Some(ask)) = (self.sides.bid.top(), self.sides.ask.top()) else {
            return;
        };
        let Some(tag) = IntegrityTag::classify(bid, ask) else {
            return;
        };

        match tag {
            IntegrityTag::Crossed => {
                self.stats.crossed_quotes += 1;
                if self.config.log_warnings {
                    log::warn!(
                        "{}: crossed market bid={:.4} > ask={:.4} (sequence {})",
                        self.symbol,
                        real_price(bid),
                        real_price(ask),
                        sequence
                    );
                }
            }
            IntegrityTag::Locked => {
                self.stats.locked_quotes += 1;
                if self.config.log_warnings {
                    log::debug!(
                        "{}: locked market bid=ask={:.4} (sequence {})",
                        self.symbol,
                        real_price(bid),
                        sequence
                    );
                }
            }
        }

        self.warnings.push(BookIntegrityWarning {
            symbol: self.symbol.clone(),
            sequence,
            timestamp,
            tag,
            bid,
            ask,
        });
    }

    /// Current top-N book, stamped with the given sequence/timestamp.
    fn candidate_snapshot(&mut self, sequence: i64, timestamp: i64) -> BookSnapshot {
        BookSnapshot {
            timestamp,
            timestamp_string: timestamp_string(timestamp, self.config.display_utc_offset_secs),
            sequence,
            bid: self.levels(Side::Bid),
            ask: self.levels(Side::Ask),
            suppressed: 0,
        }
    }

    /// `snapshot_depth` levels for one side, padded with empty slots.
    fn levels(&mut self, side: Side) -> Vec<PriceLevel> {
        let depth = self.config.snapshot_depth;
        let ladder = self.sides.side_mut(side);

        let mut levels = match self.config.layout {
            LevelLayout::Distinct => ladder.top_levels(depth),
            LevelLayout::TickGrid { tick_size } => match ladder.top() {
                Some(top) => {
                    let step = match side {
                        Side::Bid => -tick_size,
                        Side::Ask => tick_size,
                    };
                    (0..depth as i64)
                        .map(|i| {
                            let price = top + i * step;
                            PriceLevel::new(price, ladder.quantity_at(price))
                        })
                        .collect()
                }
                None => Vec::with_capacity(depth),
            },
        };

        levels.resize(depth, PriceLevel::EMPTY);
        levels
    }

    fn emit_if_changed(&mut self, mut candidate: BookSnapshot) -> Option<BookSnapshot> {
        let unchanged = match &self.previous {
            Some(previous) => previous.same_levels(&candidate),
            None => candidate
                .bid
                .iter()
                .chain(candidate.ask.iter())
                .all(PriceLevel::is_empty),
        };

        if unchanged {
            self.stats.unchanged += 1;
            self.suppressed += 1;
            return None;
        }

        candidate.suppressed = std::mem::take(&mut self.suppressed);
        self.stats.snapshots_emitted += 1;
        self.previous = Some(candidate.clone());
        Some(candidate)
    }

    fn trade_record(&self, trade: &TradeEvent) -> TradeRecord {
        TradeRecord {
            timestamp: trade.timestamp,
            timestamp_string: timestamp_string(
                trade.timestamp,
                self.config.display_utc_offset_secs,
            ),
            sequence: trade.sequence,
            price: trade.price,
            quantity: trade.quantity,
            trade_type: trade.trade_type,
            aggressor_side: trade.aggressor_side,
        }
    }

    /// Drain integrity warnings raised since the last call.
    pub fn take_warnings(&mut self) -> Vec<BookIntegrityWarning> {
        std::mem::take(&mut self.warnings)
    }

    /// Warnings raised and not yet drained.
    pub fn pending_warnings(&self) -> &[BookIntegrityWarning] {
        &self.warnings
    }

    /// End-of-stream report. A non-empty registry marks the run incomplete.
    pub fn summary(&self) -> BookSummary {
        BookSummary {
            symbol: self.symbol.clone(),
            outstanding_orders: self.registry.len(),
            resting_entries: self.registry.resting_count(),
            bid_levels: self.sides.bid.len(),
            ask_levels: self.sides.ask.len(),
            unchanged: self.stats.unchanged,
            is_complete: self.registry.is_empty() && self.sides.is_empty(),
        }
    }

    /// Mark the stream exhausted and return the summary.
    pub fn close(&mut self) -> BookSummary {
        self.state = BuilderState::Closed;
        let summary = self.summary();
        log::info!(
            "Completed {}: outstanding orders={}, bid levels={}, ask levels={}, unchanged={}",
            summary.symbol,
            summary.outstanding_orders,
            summary.bid_levels,
            summary.ask_levels,
            summary.unchanged
        );
        summary
    }

    /// Last emitted snapshot.
    pub fn last_snapshot(&self) -> Option<&BookSnapshot> {
        self.previous.as_ref()
    }

    /// Number of suppressed unchanged snapshots.
    #[inline]
    pub fn unchanged(&self) -> u64 {
        self.stats.unchanged
    }

    pub fn stats(&self) -> &BookStats {
        &self.stats
    }

    pub fn registry(&self) -> &OrderRegistry {
        &self.registry
    }

    pub fn sides(&self) -> &BookSides {
        &self.sides
    }

    /// Best bid, if any.
    pub fn top_bid(&mut self) -> Option<i64> {
        self.sides.bid.top()
    }

    /// Best ask, if any.
    pub fn top_ask(&mut self) -> Option<i64> {
        self.sides.ask.top()
    }

    /// Reset to an empty, active book.
    pub fn reset(&mut self) {
        let symbol = std::mem::take(&mut self.symbol);
        let config = self.config.clone();
        *self = Self::build(symbol, config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> BookBuilder {
        BookBuilder::with_config("TEST", BookConfig::new(3).with_logging(false)).unwrap()
    }

    fn snapshot(output: Option<BookOutput>) -> BookSnapshot {
        match output {
            Some(BookOutput::Snapshot(snap)) => snap,
            other => panic!("expected snapshot, got {other:?}"),
        }
    }

    #[test]
    fn test_new_book() {
        let book = book();
        assert_eq!(book.state(), BuilderState::Active);
        assert!(book.last_snapshot().is_none());
        assert!(book.summary().is_complete);
    }

    #[test]
    fn test_invalid_config() {
        assert!(BookBuilder::with_config("X", BookConfig::new(0)).is_err());
        let grid = BookConfig::new(5).with_layout(LevelLayout::TickGrid { tick_size: 0 });
        assert!(matches!(
            BookBuilder::with_config("X", grid),
            Err(BookError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_add_emits_snapshot() {
        let mut book = book();
        let snap = snapshot(
            book.apply_event(&CanonicalEvent::add(1, Side::Bid, 100, 5, 1, 10))
                .unwrap(),
        );

        assert_eq!(snap.sequence, 1);
        assert_eq!(snap.timestamp, 10);
        assert_eq!(snap.bid[0], PriceLevel::new(100, 5));
        assert_eq!(snap.bid[1], PriceLevel::EMPTY);
        assert_eq!(snap.ask, vec![PriceLevel::EMPTY; 3]);
        assert_eq!(snap.depth(), 3);
    }

    #[test]
    fn test_levels_sorted_and_truncated() {
        let mut book = book();
        let events = [
            CanonicalEvent::add(1, Side::Bid, 100, 1, 1, 1),
            CanonicalEvent::add(2, Side::Bid, 102, 2, 2, 1),
            CanonicalEvent::add(3, Side::Bid, 101, 3, 3, 1),
            CanonicalEvent::add(4, Side::Bid, 99, 4, 4, 1),
            CanonicalEvent::add(5, Side::Ask, 104, 5, 5, 1),
            CanonicalEvent::add(6, Side::Ask, 103, 6, 6, 1),
        ];
        let mut last = None;
        for event in &events {
            if let Some(output) = book.apply_event(event).unwrap() {
                last = Some(output);
            }
        }
        let snap = snapshot(last);
        assert_eq!(
            snap.bid,
            vec![
                PriceLevel::new(102, 2),
                PriceLevel::new(101, 3),
                PriceLevel::new(100, 1)
            ]
        );
        assert_eq!(
            snap.ask,
            vec![
                PriceLevel::new(103, 6),
                PriceLevel::new(104, 5),
                PriceLevel::EMPTY
            ]
        );
    }

    #[test]
    fn test_crossed_market_warns_and_emits() {
        let mut book = book();
        book.apply_event(&CanonicalEvent::add(1, Side::Bid, 101, 10, 1, 1))
            .unwrap();
        let output = book
            .apply_event(&CanonicalEvent::add(2, Side::Ask, 100, 10, 2, 2))
            .unwrap();

        assert!(matches!(output, Some(BookOutput::Snapshot(_))));
        let warnings = book.take_warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].tag.as_char(), 'C');
        assert_eq!(warnings[0].sequence, 2);
        assert_eq!((warnings[0].bid, warnings[0].ask), (101, 100));
        assert_eq!(book.stats().crossed_quotes, 1);
        assert!(book.take_warnings().is_empty());
    }

    #[test]
    fn test_locked_market_warns() {
        let mut book = book();
        book.apply_event(&CanonicalEvent::add(1, Side::Bid, 100, 10, 1, 1))
            .unwrap();
        book.apply_event(&CanonicalEvent::add(2, Side::Ask, 100, 10, 2, 2))
            .unwrap();

        let warnings = book.take_warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].tag, IntegrityTag::Locked);
        assert_eq!(book.stats().locked_quotes, 1);
    }

    #[test]
    fn test_unchanged_modify_suppressed() {
        let mut book = book();
        book.apply_event(&CanonicalEvent::add(1, Side::Bid, 100, 5, 1, 1))
            .unwrap();
        book.apply_event(&CanonicalEvent::add(2, Side::Bid, 100, 5, 2, 1))
            .unwrap();

        book.apply_event(&CanonicalEvent::modify(1, 100, 7, 3, 2))
            .unwrap();
        let output = book
            .apply_event(&CanonicalEvent::modify(2, 100, 3, 4, 2))
            .unwrap();
        assert!(output.is_some());

        let before = book.unchanged();
        let output = book
            .apply_event(&CanonicalEvent::modify(2, 100, 3, 5, 3))
            .unwrap();
        assert!(output.is_none());
        assert_eq!(book.unchanged(), before + 1);
    }

    #[test]
    fn test_suppressed_count_carried_on_next_snapshot() {
        let mut book = book();
        book.apply_event(&CanonicalEvent::add(1, Side::Ask, 100, 5, 1, 1))
            .unwrap();
        book.apply_event(&CanonicalEvent::add(2, Side::Ask, 101, 1, 2, 1))
            .unwrap();
        book.apply_event(&CanonicalEvent::add(3, Side::Ask, 102, 1, 3, 1))
            .unwrap();

        // Outside the visible depth
        assert!(book
            .apply_event(&CanonicalEvent::add(20, Side::Ask, 110, 1, 4, 1))
            .unwrap()
            .is_none());
        assert!(book
            .apply_event(&CanonicalEvent::add(21, Side::Ask, 111, 1, 5, 1))
            .unwrap()
            .is_none());
        let snap = snapshot(
            book.apply_event(&CanonicalEvent::add(22, Side::Ask, 99, 1, 6, 1))
                .unwrap(),
        );
        assert_eq!(snap.suppressed, 2);
        assert_eq!(book.unchanged(), 2);
    }

    #[test]
    fn test_unknown_delete_is_fatal() {
        let mut book = book();
        let err = book
            .apply_event(&CanonicalEvent::delete(99, 1, 1))
            .unwrap_err();
        assert_eq!(err, BookError::OrderNotFound(99));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_modify_on_duplicate_is_fatal() {
        let mut book = book();
        book.apply_event(&CanonicalEvent::add(1, Side::Bid, 100, 5, 1, 1))
            .unwrap();
        book.apply_event(&CanonicalEvent::add(1, Side::Bid, 100, 3, 2, 1))
            .unwrap();
        let err = book
            .apply_event(&CanonicalEvent::modify(1, 100, 1, 3, 1))
            .unwrap_err();
        assert!(matches!(
            err,
            BookError::UnsupportedModifyOnDuplicate { order_id: 1, depth: 2 }
        ));
    }

    #[test]
    fn test_sequence_regression_rejected() {
        let mut book = book();
        book.apply_event(&CanonicalEvent::add(1, Side::Bid, 100, 5, 5, 10))
            .unwrap();

        let err = book
            .apply_event(&CanonicalEvent::add(2, Side::Bid, 100, 5, 5, 10))
            .unwrap_err();
        assert!(matches!(err, BookError::OutOfOrderTimestamp { sequence: 5, .. }));

        let err = book
            .apply_event(&CanonicalEvent::add(2, Side::Bid, 100, 5, 6, 9))
            .unwrap_err();
        assert!(matches!(err, BookError::OutOfOrderTimestamp { timestamp: 9, .. }));
    }

    #[test]
    fn test_trades_pass_through() {
        let mut book = book();
        assert!(book
            .apply_event(&CanonicalEvent::trade(100, 5, 1, 1))
            .unwrap()
            .is_none());
        assert_eq!(book.stats().trades, 1);

        let mut with_trades =
            BookBuilder::with_config("TEST", BookConfig::new(3).with_trades(true)).unwrap();
        match with_trades
            .apply_event(&CanonicalEvent::trade(100, 5, 1, 1))
            .unwrap()
        {
            Some(BookOutput::Trade(trade)) => {
                assert_eq!((trade.price, trade.quantity, trade.sequence), (100, 5, 1));
            }
            other => panic!("expected trade, got {other:?}"),
        }
        assert!(with_trades.registry().is_empty());
    }

    #[test]
    fn test_trade_sequence_still_checked() {
        let mut book = book();
        book.apply_event(&CanonicalEvent::trade(100, 5, 3, 1)).unwrap();
        assert!(book
            .apply_event(&CanonicalEvent::add(1, Side::Bid, 100, 5, 2, 1))
            .is_err());
    }

    #[test]
    fn test_tick_grid_layout() {
        let config = BookConfig::new(3)
            .with_logging(false)
            .with_layout(LevelLayout::TickGrid { tick_size: 25 });
        let mut book = BookBuilder::with_config("ESZ1", config).unwrap();
        book.apply_event(&CanonicalEvent::add(1, Side::Bid, 1_000, 5, 1, 1))
            .unwrap();
        book.apply_event(&CanonicalEvent::add(2, Side::Bid, 950, 7, 2, 1))
            .unwrap();
        let snap = snapshot(
            book.apply_event(&CanonicalEvent::add(3, Side::Ask, 1_025, 2, 3, 1))
                .unwrap(),
        );
        assert_eq!(
            snap.bid,
            vec![
                PriceLevel::new(1_000, 5),
                PriceLevel::new(975, 0),
                PriceLevel::new(950, 7)
            ]
        );
        assert_eq!(snap.ask[0], PriceLevel::new(1_025, 2));
        assert_eq!(snap.ask[2], PriceLevel::new(1_075, 0));
    }

    #[test]
    fn test_close_and_summary() {
        let mut book = book();
        book.apply_event(&CanonicalEvent::add(1, Side::Bid, 100, 5, 1, 1))
            .unwrap();
        let summary = book.close();
        assert!(!summary.is_complete);
        assert_eq!(summary.outstanding_orders, 1);
        assert_eq!(book.state(), BuilderState::Closed);
        assert!(matches!(
            book.apply_event(&CanonicalEvent::delete(1, 2, 2)),
            Err(BookError::StreamClosed(_))
        ));
    }

    #[test]
    fn test_empty_book_after_delete_is_emitted() {
        let mut book = book();
        book.apply_event(&CanonicalEvent::add(1, Side::Bid, 100, 5, 1, 1))
            .unwrap();
        let snap = snapshot(book.apply_event(&CanonicalEvent::delete(1, 2, 2)).unwrap());
        assert_eq!(snap.bid[0], PriceLevel::EMPTY);
        assert!(book.close().is_complete);
    }

    #[test]
    fn test_reset() {
        let mut book = book();
        book.apply_event(&CanonicalEvent::add(1, Side::Bid, 100, 5, 1, 1))
            .unwrap();
        book.reset();
        assert_eq!(book.symbol(), "TEST");
        assert!(book.registry().is_empty());
        assert_eq!(book.stats().events_applied, 0);
        // Sequence history cleared too
        book.apply_event(&CanonicalEvent::add(1, Side::Bid, 100, 5, 1, 1))
            .unwrap();
    }

    #[test]
    fn test_timestamp_string_uses_offset() {
        let config = BookConfig::new(1).with_display_offset(-6 * 3600);
        let mut book = BookBuilder::with_config("ESZ1", config).unwrap();
        let snap = snapshot(
            book.apply_event(&CanonicalEvent::add(1, Side::Bid, 100, 5, 1, 1_311_322_800_095_000))
                .unwrap(),
        );
        assert_eq!(snap.timestamp_string, "02:20:00:095000");
    }
}
