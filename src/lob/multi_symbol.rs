//! Multi-symbol book manager.
//!
//! Routes `(symbol, event)` pairs to one [`BookBuilder`] per symbol, created
//! on first sight. Symbols share no state: a fatal error aborts only the
//! symbol that raised it, and its later events are counted and dropped while
//! every other symbol keeps going.

use indexmap::IndexMap;

use super::book_builder::{BookBuilder, BookConfig, BookOutput, BookSummary};
use crate::error::{BookError, Result};
use crate::sink::BookSink;
use crate::source::{EventSource, SourceMetadata};
use crate::summary::{now_micros, AbortInfo, ParseSummary, SymbolSummary};
use crate::types::CanonicalEvent;
use crate::warnings::WarningLog;

/// One symbol's builder plus its abort bookkeeping.
#[derive(Debug, Clone)]
struct SymbolBook {
    builder: BookBuilder,
    aborted: Option<AbortInfo>,
    dropped: u64,
}

impl SymbolBook {
    fn new(builder: BookBuilder) -> Self {
        Self {
            builder,
            aborted: None,
            dropped: 0,
        }
    }
}

/// Statistics for multi-symbol processing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiSymbolStats {
    /// Total symbols tracked
    pub symbol_count: usize,

    /// Events routed across all symbols (including dropped ones)
    pub total_events: u64,

    /// Symbols stopped by a fatal error
    pub aborted_symbols: usize,

    /// Events discarded because their symbol had aborted
    pub dropped_events: u64,
}

/// Multi-symbol book manager.
///
/// # Example
/// ```
/// use auction_book::{BookConfig, CanonicalEvent, MemorySink, MultiSymbolBooks, Side};
///
/// let mut books = MultiSymbolBooks::new(BookConfig::default()).unwrap();
/// let mut sink = MemorySink::new();
///
/// books
///     .apply("ESZ1", &CanonicalEvent::add(1, Side::Bid, 100, 5, 1, 1), &mut sink)
///     .unwrap();
/// books
///     .apply("NQZ1", &CanonicalEvent::add(1, Side::Ask, 200, 5, 1, 1), &mut sink)
///     .unwrap();
///
/// let summary = books.finish(&mut sink).unwrap();
/// assert_eq!(summary.symbols.len(), 2);
/// assert_eq!(sink.snapshots("ESZ1").len(), 1);
/// ```
pub struct MultiSymbolBooks {
    config: BookConfig,

    /// Symbol -> book, in first-seen order
    books: IndexMap<String, SymbolBook>,

    /// Integrity warnings across all symbols
    warnings: WarningLog,

    source: SourceMetadata,

    /// Wall-clock start of the run (UTC microseconds)
    parse_start: i64,

    stats: MultiSymbolStats,
}

impl MultiSymbolBooks {
    /// Create a manager whose builders all share `config`.
    pub fn new(config: BookConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            books: IndexMap::new(),
            warnings: WarningLog::new(),
            source: SourceMetadata::new(),
            parse_start: now_micros(),
            stats: MultiSymbolStats::default(),
        })
    }

    /// Use a preconfigured warning log.
    pub fn with_warning_log(mut self, warnings: WarningLog) -> Self {
        self.warnings = warnings;
        self
    }

    /// Record where the events come from.
    pub fn with_source(mut self, source: SourceMetadata) -> Self {
        self.source = source;
        self
    }

    pub fn config(&self) -> &BookConfig {
        &self.config
    }

    /// Start tracking a symbol ahead of its first event.
    ///
    /// # Returns
    /// Ok if added, error if symbol already exists
    pub fn add_symbol(&mut self, symbol: impl Into<String>) -> Result<()> {
        let symbol = symbol.into();

        if self.books.contains_key(&symbol) {
            return Err(BookError::generic(format!(
                "Symbol {} already exists",
                symbol
            )));
        }

        self.insert_symbol(symbol);
        Ok(())
    }

    /// Index of the new entry.
    fn insert_symbol(&mut self, symbol: String) -> usize {
        log::debug!("Tracking new symbol {symbol}");
        let builder = BookBuilder::build(symbol.clone(), self.config.clone());
        let (index, _) = self.books.insert_full(symbol, SymbolBook::new(builder));
        self.stats.symbol_count = self.books.len();
        index
    }

    /// Stop tracking a symbol.
    pub fn remove_symbol(&mut self, symbol: &str) -> Result<()> {
        let removed = self
            .books
            .shift_remove(symbol)
            .ok_or_else(|| BookError::SymbolNotFound(symbol.to_string()))?;

        self.stats.symbol_count = self.books.len();
        if removed.aborted.is_some() {
            self.stats.aborted_symbols -= 1;
        }
        Ok(())
    }

    /// Apply one event to its symbol's book and write any output to `sink`.
    ///
    /// # Returns
    /// * `Ok(Some(output))` - snapshot or trade record written to the sink
    /// * `Ok(None)` - nothing emitted
    /// * `Err(e)` with `e.is_fatal()` - this event aborted the symbol; other
    ///   symbols are unaffected and processing may continue
    /// * `Err(SymbolAborted)` - the symbol aborted earlier; the event is
    ///   counted and dropped
    /// * `Err(e)` otherwise - the sink failed
    pub fn apply(
        &mut self,
        symbol: &str,
        event: &CanonicalEvent,
        sink: &mut impl BookSink,
    ) -> Result<Option<BookOutput>> {
        self.stats.total_events += 1;

        let index = match self.books.get_index_of(symbol) {
            Some(index) => index,
            None => self.insert_symbol(symbol.to_string()),
        };
        let book = &mut self.books[index];

        if book.aborted.is_some() {
            book.dropped += 1;
            self.stats.dropped_events += 1;
            return Err(BookError::SymbolAborted(symbol.to_string()));
        }

        let result = book.builder.apply_event(event);
        self.warnings.record_all(book.builder.take_warnings());

        match result {
            Ok(Some(output)) => {
                match &output {
                    BookOutput::Snapshot(snapshot) => sink.write_snapshot(symbol, snapshot)?,
                    BookOutput::Trade(trade) => sink.write_trade(symbol, trade)?,
                }
                Ok(Some(output))
            }
            Ok(None) => Ok(None),
            Err(err) if err.is_fatal() => {
                log::error!(
                    "Aborting {} at sequence {}: {}",
                    symbol,
                    event.sequence(),
                    err
                );
                book.aborted = Some(AbortInfo {
                    sequence: event.sequence(),
                    timestamp: event.timestamp(),
                    error: err.to_string(),
                });
                self.stats.aborted_symbols += 1;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Apply every event from `source`, isolating per-symbol failures.
    ///
    /// Only sink errors stop the run.
    pub fn process_source<E: EventSource>(
        &mut self,
        source: E,
        sink: &mut impl BookSink,
    ) -> Result<()> {
        self.source = source.metadata().clone();
        log::info!("Processing events from {}", self.source.label());

        for item in source.events()? {
            match self.apply(&item.symbol, &item.event, sink) {
                Ok(_) => {}
                Err(err) if err.is_fatal() => {}
                Err(BookError::SymbolAborted(_)) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Close every book, report each to `sink`, and summarise the run.
    pub fn finish(&mut self, sink: &mut impl BookSink) -> Result<ParseSummary> {
        let mut symbols = Vec::with_capacity(self.books.len());

        for (symbol, book) in &mut self.books {
            let closed = book.builder.close();
            sink.finish_symbol(symbol, &closed)?;
            symbols.push(symbol_summary(book, &closed));
        }
        sink.finish()?;

        let summary = ParseSummary::from_symbols(
            self.source.clone(),
            self.parse_start,
            symbols,
            self.warnings.summary(),
        );

        if summary.is_valid {
            log::info!(
                "Run complete: {} events, {} symbols",
                summary.processed,
                summary.symbols.len()
            );
        } else {
            log::warn!(
                "Run incomplete: {} of {} symbols aborted or left orders resting",
                summary.incomplete_symbols().count(),
                summary.symbols.len()
            );
        }
        Ok(summary)
    }

    /// Builder for a symbol.
    pub fn builder(&self, symbol: &str) -> Result<&BookBuilder> {
        self.books
            .get(symbol)
            .map(|book| &book.builder)
            .ok_or_else(|| BookError::SymbolNotFound(symbol.to_string()))
    }

    /// Whether a symbol's stream was aborted.
    pub fn is_aborted(&self, symbol: &str) -> bool {
        self.books
            .get(symbol)
            .is_some_and(|book| book.aborted.is_some())
    }

    /// Reset one symbol's book, clearing any abort.
    pub fn reset_symbol(&mut self, symbol: &str) -> Result<()> {
        let book = self
            .books
            .get_mut(symbol)
            .ok_or_else(|| BookError::SymbolNotFound(symbol.to_string()))?;

        book.builder.reset();
        if book.aborted.take().is_some() {
            self.stats.aborted_symbols -= 1;
        }
        book.dropped = 0;
        Ok(())
    }

    /// Symbols in first-seen order.
    pub fn symbols(&self) -> Vec<&str> {
        self.books.keys().map(|s| s.as_str()).collect()
    }

    pub fn symbol_count(&self) -> usize {
        self.books.len()
    }

    pub fn has_symbol(&self, symbol: &str) -> bool {
        self.books.contains_key(symbol)
    }

    pub fn stats(&self) -> &MultiSymbolStats {
        &self.stats
    }

    pub fn warnings(&self) -> &WarningLog {
        &self.warnings
    }
}

fn symbol_summary(book: &SymbolBook, closed: &BookSummary) -> SymbolSummary {
    let stats = book.builder.stats();
    SymbolSummary {
        symbol: closed.symbol.clone(),
        events: stats.events_applied,
        snapshots: stats.snapshots_emitted,
        trades: stats.trades,
        unchanged: stats.unchanged,
        crossed: stats.crossed_quotes,
        locked: stats.locked_quotes,
        outstanding_orders: closed.outstanding_orders,
        bid_levels: closed.bid_levels,
        ask_levels: closed.ask_levels,
        dropped_events: book.dropped,
        first_timestamp: stats.first_timestamp,
        last_timestamp: stats.last_timestamp,
        aborted: book.aborted.clone(),
    }
}
