//! Run summaries.
//!
//! A [`ParseSummary`] records the outcome of one reconstruction run: where
//! the data came from, how much was processed, the span of market data
//! covered, and per-symbol completeness. It is a data-quality record written
//! next to the book output, not a diagnostic log.
//!
//! # Usage
//!
//! ```ignore
//! let summary = books.finish(&mut sink)?;
//! summary.save_json("books/20111017.summary.json")?;
//! if !summary.is_valid {
//!     for symbol in summary.incomplete_symbols() {
//!         log::warn!("{} incomplete", symbol.symbol);
//!     }
//! }
//! ```

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::source::SourceMetadata;
use crate::time::timestamp_string;
use crate::warnings::WarningSummary;

/// Fatal error that stopped one symbol's stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbortInfo {
    /// Sequence number of the offending event
    pub sequence: i64,
    pub timestamp: i64,
    pub error: String,
}

/// Outcome for one symbol.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolSummary {
    pub symbol: String,
    /// Events applied to the book
    pub events: u64,
    pub snapshots: u64,
    pub trades: u64,
    /// Candidate snapshots suppressed as unchanged
    pub unchanged: u64,
    pub crossed: u64,
    pub locked: u64,
    /// Distinct order ids still resting at end of stream
    pub outstanding_orders: usize,
    pub bid_levels: usize,
    pub ask_levels: usize,
    /// Events received after an abort and discarded
    pub dropped_events: u64,
    pub first_timestamp: Option<i64>,
    pub last_timestamp: Option<i64>,
    pub aborted: Option<AbortInfo>,
}

impl SymbolSummary {
    /// Stream ran to the end with nothing left resting.
    pub fn is_complete(&self) -> bool {
        self.aborted.is_none() && self.outstanding_orders == 0
    }
}

/// Outcome of one reconstruction run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseSummary {
    /// False when any symbol aborted or ended with resting orders
    pub is_valid: bool,
    pub source: SourceMetadata,
    /// Wall-clock run start/stop (UTC microseconds)
    pub parse_start: i64,
    pub parse_stop: i64,
    /// Events applied across all symbols
    pub processed: u64,
    /// Updates with no effect on the visible book
    pub irrelevants: u64,
    /// Market data span (UTC microseconds)
    pub data_start: Option<i64>,
    pub data_stop: Option<i64>,
    pub warnings: WarningSummary,
    pub symbols: Vec<SymbolSummary>,
}

impl ParseSummary {
    /// Aggregate per-symbol outcomes into a run summary.
    pub fn from_symbols(
        source: SourceMetadata,
        parse_start: i64,
        symbols: Vec<SymbolSummary>,
        warnings: WarningSummary,
    ) -> Self {
        let processed = symbols.iter().map(|s| s.events).sum();
        let irrelevants = symbols.iter().map(|s| s.unchanged).sum();
        let data_start = symbols.iter().filter_map(|s| s.first_timestamp).min();
        let data_stop = symbols.iter().filter_map(|s| s.last_timestamp).max();
        let is_valid = symbols.iter().all(SymbolSummary::is_complete);

        Self {
            is_valid,
            source,
            parse_start,
            parse_stop: now_micros(),
            processed,
            irrelevants,
            data_start,
            data_stop,
            warnings,
            symbols,
        }
    }

    /// Summary for one symbol.
    pub fn symbol(&self, symbol: &str) -> Option<&SymbolSummary> {
        self.symbols.iter().find(|s| s.symbol == symbol)
    }

    /// Symbols stopped by a fatal error.
    pub fn aborted_symbols(&self) -> impl Iterator<Item = &SymbolSummary> {
        self.symbols.iter().filter(|s| s.aborted.is_some())
    }

    /// Symbols that aborted or ended with resting orders.
    pub fn incomplete_symbols(&self) -> impl Iterator<Item = &SymbolSummary> {
        self.symbols.iter().filter(|s| !s.is_complete())
    }

    /// Save to JSON file.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from JSON file.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

impl fmt::Display for ParseSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let span = |ts: Option<i64>| ts.map(|ts| timestamp_string(ts, 0)).unwrap_or_default();

        writeln!(f, "Summary of: {}", self.source.label())?;
        writeln!(f, "\tis_valid: {}", self.is_valid)?;
        if let Some(date) = &self.source.date {
            writeln!(f, "\tdate: {date}")?;
        }
        writeln!(f, "\tdata_start: {}", span(self.data_start))?;
        writeln!(f, "\tdata_stop: {}", span(self.data_stop))?;
        writeln!(f, "\tprocessed: {}", self.processed)?;
        writeln!(f, "\tirrelevants: {}", self.irrelevants)?;
        writeln!(f, "\ttotal warnings: {}", self.warnings.total)?;
        for symbol in &self.symbols {
            write!(
                f,
                "\t{}: snapshots={} outstanding={}",
                symbol.symbol, symbol.snapshots, symbol.outstanding_orders
            )?;
            if let Some(abort) = &symbol.aborted {
                write!(f, " aborted at {} ({})", abort.sequence, abort.error)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Current wall-clock time in UTC microseconds.
pub fn now_micros() -> i64 {
    chrono::Utc::now().timestamp_micros()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(name: &str, events: u64, outstanding: usize, span: (i64, i64)) -> SymbolSummary {
        SymbolSummary {
            symbol: name.to_string(),
            events,
            snapshots: events / 2,
            unchanged: events / 4,
            outstanding_orders: outstanding,
            first_timestamp: Some(span.0),
            last_timestamp: Some(span.1),
            ..Default::default()
        }
    }

    #[test]
    fn test_aggregation() {
        let summary = ParseSummary::from_symbols(
            SourceMetadata::new().with_venue("cme"),
            0,
            vec![symbol("ESZ1", 100, 0, (50, 900)), symbol("NQZ1", 40, 0, (20, 700))],
            WarningSummary::default(),
        );

        assert!(summary.is_valid);
        assert_eq!(summary.processed, 140);
        assert_eq!(summary.irrelevants, 25 + 10);
        assert_eq!(summary.data_start, Some(20));
        assert_eq!(summary.data_stop, Some(900));
        assert!(summary.parse_stop >= summary.parse_start);
        assert_eq!(summary.symbol("NQZ1").map(|s| s.events), Some(40));
        assert_eq!(summary.incomplete_symbols().count(), 0);
    }

    #[test]
    fn test_resting_orders_invalidate() {
        let summary = ParseSummary::from_symbols(
            SourceMetadata::new(),
            0,
            vec![symbol("ESZ1", 10, 0, (1, 2)), symbol("NQZ1", 10, 3, (1, 2))],
            WarningSummary::default(),
        );
        assert!(!summary.is_valid);
        assert_eq!(summary.aborted_symbols().count(), 0);
        let incomplete: Vec<_> = summary.incomplete_symbols().map(|s| s.symbol.as_str()).collect();
        assert_eq!(incomplete, vec!["NQZ1"]);
    }

    #[test]
    fn test_abort_invalidates() {
        let mut aborted = symbol("ESZ1", 10, 0, (1, 2));
        aborted.aborted = Some(AbortInfo {
            sequence: 7,
            timestamp: 2,
            error: "Order not found: 9".to_string(),
        });
        let summary =
            ParseSummary::from_symbols(SourceMetadata::new(), 0, vec![aborted], WarningSummary::default());
        assert!(!summary.is_valid);
        assert_eq!(summary.aborted_symbols().count(), 1);
        assert!(summary.to_string().contains("aborted at 7"));
    }

    #[test]
    fn test_empty_run_is_valid() {
        let summary =
            ParseSummary::from_symbols(SourceMetadata::new(), 0, Vec::new(), WarningSummary::default());
        assert!(summary.is_valid);
        assert_eq!(summary.data_start, None);
    }

    #[test]
    fn test_save_load_json() {
        let path = std::env::temp_dir().join(format!(
            "auction_book_summary_{}.json",
            std::process::id()
        ));
        let summary = ParseSummary::from_symbols(
            SourceMetadata::from_path("/data/XCME_MD_ES_20111017.gz"),
            1,
            vec![symbol("ESZ1", 8, 1, (5, 6))],
            WarningSummary::default(),
        );
        summary.save_json(&path).unwrap();
        let loaded = ParseSummary::load_json(&path).unwrap();
        assert_eq!(loaded, summary);
        assert_eq!(loaded.source.date.as_deref(), Some("2011-10-17"));
        std::fs::remove_file(&path).unwrap();
    }
}
