//! Book integrity warnings.
//!
//! Crossed and locked top-of-book states are data-quality anomalies, not
//! failures: reconstruction continues and the anomaly is recorded here with
//! enough context (symbol, sequence, prices) to find its root cause later.
//!
//! A run accumulates warnings in a [`WarningLog`] keyed by
//! `(symbol, sequence, tag)`; re-recording the same key is a no-op, so the
//! log can safely be fed from several passes over the same stream.
//!
//! # Example
//!
//! ```
//! use auction_book::warnings::{BookIntegrityWarning, IntegrityTag, WarningLog};
//!
//! let mut log = WarningLog::new();
//! log.record(BookIntegrityWarning::new("ESZ1", 42, 1_000, 101, 100));
//!
//! assert_eq!(log.count_by_tag(IntegrityTag::Crossed), 1);
//! assert_eq!(log.summary().total, 1);
//! ```

use ahash::AHashSet;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;

/// Kind of top-of-book anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IntegrityTag {
    /// Top bid above top ask
    Crossed,
    /// Top bid equal to top ask
    Locked,
}

impl IntegrityTag {
    /// Tag for a pair of top prices, `None` when `bid < ask`.
    #[inline]
    pub fn classify(bid: i64, ask: i64) -> Option<Self> {
        if bid > ask {
            Some(IntegrityTag::Crossed)
        } else if bid == ask {
            Some(IntegrityTag::Locked)
        } else {
            None
        }
    }

    /// Single-letter tag: `'C'` crossed, `'L'` locked.
    pub fn as_char(self) -> char {
        match self {
            IntegrityTag::Crossed => 'C',
            IntegrityTag::Locked => 'L',
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            IntegrityTag::Crossed => "CROSSED",
            IntegrityTag::Locked => "LOCKED",
        }
    }
}

/// Crossed or locked top of book observed after applying an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookIntegrityWarning {
    pub symbol: String,
    pub sequence: i64,
    /// Data timestamp (UTC microseconds)
    pub timestamp: i64,
    pub tag: IntegrityTag,
    pub bid: i64,
    pub ask: i64,
}

impl BookIntegrityWarning {
    /// Build a warning, classifying the tag from the prices.
    ///
    /// Callers only construct warnings for `bid >= ask`; a non-anomalous pair
    /// is tagged as locked.
    pub fn new(symbol: impl Into<String>, sequence: i64, timestamp: i64, bid: i64, ask: i64) -> Self {
        Self {
            symbol: symbol.into(),
            sequence,
            timestamp,
            tag: IntegrityTag::classify(bid, ask).unwrap_or(IntegrityTag::Locked),
            bid,
            ask,
        }
    }

    /// Key under which the warning is stored in a [`WarningLog`].
    pub fn key(&self) -> WarningKey {
        (self.symbol.clone(), self.sequence, self.tag)
    }
}

/// `(symbol, sequence, tag)`
pub type WarningKey = (String, i64, IntegrityTag);

/// Summary statistics for a warning log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningSummary {
    pub total: u64,
    pub crossed: u64,
    pub locked: u64,
    /// Count per symbol
    pub by_symbol: BTreeMap<String, u64>,
    pub first_timestamp: Option<i64>,
    pub last_timestamp: Option<i64>,
    /// Warnings counted but not retained because the log was full
    pub dropped: u64,
}

/// Configuration for a warning log.
#[derive(Debug, Clone)]
pub struct WarningLogConfig {
    /// Maximum number of warnings kept in memory (counts keep going)
    pub max_warnings: usize,
}

impl Default for WarningLogConfig {
    fn default() -> Self {
        Self {
            max_warnings: 100_000,
        }
    }
}

/// Per-run warning log keyed by `(symbol, sequence, tag)`.
#[derive(Debug, Clone, Default)]
pub struct WarningLog {
    config: WarningLogConfig,
    entries: IndexMap<WarningKey, BookIntegrityWarning>,
    /// Keys counted but not retained once the log is full
    dropped_keys: AHashSet<WarningKey>,
    crossed: u64,
    locked: u64,
    dropped: u64,
}

impl WarningLog {
    pub fn new() -> Self {
        Self::with_config(WarningLogConfig::default())
    }

    pub fn with_config(config: WarningLogConfig) -> Self {
        Self {
            config,
            entries: IndexMap::new(),
            dropped_keys: AHashSet::new(),
            crossed: 0,
            locked: 0,
            dropped: 0,
        }
    }

    /// Record a warning. Returns `false` if the key was already present.
    pub fn record(&mut self, warning: BookIntegrityWarning) -> bool {
        let key = warning.key();
        if self.entries.contains_key(&key) || self.dropped_keys.contains(&key) {
            return false;
        }

        match warning.tag {
            IntegrityTag::Crossed => self.crossed += 1,
            IntegrityTag::Locked => self.locked += 1,
        }

        if self.entries.len() < self.config.max_warnings {
            self.entries.insert(key, warning);
        } else {
            self.dropped_keys.insert(key);
            self.dropped += 1;
        }
        true
    }

    /// Record every warning from an iterator; returns how many were new.
    pub fn record_all(&mut self, warnings: impl IntoIterator<Item = BookIntegrityWarning>) -> usize {
        let mut new = 0;
        for warning in warnings {
            if self.record(warning) {
                new += 1;
            }
        }
        new
    }

    /// Number of retained warnings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count including warnings dropped past the capacity limit.
    pub fn total_count(&self) -> u64 {
        self.crossed + self.locked
    }

    pub fn count_by_tag(&self, tag: IntegrityTag) -> u64 {
        match tag {
            IntegrityTag::Crossed => self.crossed,
            IntegrityTag::Locked => self.locked,
        }
    }

    /// Look up a warning by key.
    pub fn get(&self, symbol: &str, sequence: i64, tag: IntegrityTag) -> Option<&BookIntegrityWarning> {
        self.entries.get(&(symbol.to_string(), sequence, tag))
    }

    /// Retained warnings in arrival order.
    pub fn warnings(&self) -> impl Iterator<Item = &BookIntegrityWarning> {
        self.entries.values()
    }

    /// Retained warnings for one symbol.
    pub fn for_symbol(&self, symbol: &str) -> Vec<&BookIntegrityWarning> {
        self.entries
            .values()
            .filter(|w| w.symbol == symbol)
            .collect()
    }

    pub fn summary(&self) -> WarningSummary {
        let mut by_symbol = BTreeMap::new();
        for warning in self.entries.values() {
            *by_symbol.entry(warning.symbol.clone()).or_insert(0) += 1;
        }

        WarningSummary {
            total: self.total_count(),
            crossed: self.crossed,
            locked: self.locked,
            by_symbol,
            first_timestamp: self.entries.values().map(|w| w.timestamp).min(),
            last_timestamp: self.entries.values().map(|w| w.timestamp).max(),
            dropped: self.dropped,
        }
    }

    /// Export summary and warnings to a JSON file.
    pub fn export_json(&self, path: impl AsRef<Path>) -> Result<()> {
        #[derive(Serialize)]
        struct Export<'a> {
            summary: WarningSummary,
            warnings: Vec<&'a BookIntegrityWarning>,
        }

        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(
            writer,
            &Export {
                summary: self.summary(),
                warnings: self.entries.values().collect(),
            },
        )?;
        Ok(())
    }

    /// Export warnings to a CSV file (for spreadsheet analysis).
    pub fn export_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);

        writeln!(writer, "symbol,sequence,timestamp,tag,bid,ask")?;
        for w in self.entries.values() {
            writeln!(
                writer,
                "{},{},{},{},{},{}",
                w.symbol,
                w.sequence,
                w.timestamp,
                w.tag.as_char(),
                w.bid,
                w.ask
            )?;
        }

        writer.flush()?;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.dropped_keys.clear();
        self.crossed = 0;
        self.locked = 0;
        self.dropped = 0;
    }
}
