//! Canonical event sources.
//!
//! Format-specific parsers (delimited add/modify/delete records, tag-value
//! message sets, fixed-width layouts) live outside this crate. They hand the
//! book machinery a stream of `(symbol, CanonicalEvent)` pairs through the
//! [`EventSource`] trait.
//!
//! # Implementing Custom Sources
//!
//! ```
//! use auction_book::source::{EventSource, SourceMetadata, SymbolEvent};
//! use auction_book::Result;
//!
//! struct MyFeed {
//!     events: Vec<SymbolEvent>,
//!     metadata: SourceMetadata,
//! }
//!
//! impl EventSource for MyFeed {
//!     type EventIter = std::vec::IntoIter<SymbolEvent>;
//!
//!     fn events(self) -> Result<Self::EventIter> {
//!         Ok(self.events.into_iter())
//!     }
//!
//!     fn metadata(&self) -> &SourceMetadata {
//!         &self.metadata
//!     }
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::CanonicalEvent;

// ============================================================================
// Source Metadata
// ============================================================================

/// Metadata about an event source.
///
/// Carried into the run summary so the output records where it came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// Session date in YYYY-MM-DD format
    pub date: Option<String>,

    /// Original capture file (if loaded from file)
    pub file_path: Option<PathBuf>,

    /// Venue or feed name (e.g., "cme", "arca")
    pub venue: Option<String>,

    /// Estimated event count (for progress tracking)
    pub estimated_events: Option<u64>,

    /// File size in bytes (if applicable)
    pub file_size: Option<u64>,
}

impl SourceMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the date.
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Set the file path.
    pub fn with_file_path(mut self, path: impl AsRef<Path>) -> Self {
        self.file_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the venue.
    pub fn with_venue(mut self, venue: impl Into<String>) -> Self {
        self.venue = Some(venue.into());
        self
    }

    /// Set the estimated event count.
    pub fn with_estimated_events(mut self, count: u64) -> Self {
        self.estimated_events = Some(count);
        self
    }

    /// Extract metadata from a capture file path.
    ///
    /// Compression and text extensions are stripped, and the first run of
    /// eight digits forming a plausible `YYYYMMDD` becomes the date:
    /// - `arcabookftp20070611.csv.gz` → date="2007-06-11"
    /// - `XCME_MD_ES_20111017.gz` → date="2011-10-17"
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let mut metadata = Self::new().with_file_path(path);

        if let Ok(meta) = std::fs::metadata(path) {
            metadata.file_size = Some(meta.len());
        }

        if let Some(filename) = path.file_name().and_then(|n| n.to_str()) {
            let base = filename
                .trim_end_matches(".gz")
                .trim_end_matches(".zip")
                .trim_end_matches(".csv")
                .trim_end_matches(".txt");
            metadata.date = find_date(base);
        }

        metadata
    }

    /// Label for summaries: the file name if known, else the venue.
    pub fn label(&self) -> String {
        self.file_path
            .as_ref()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .or_else(|| self.venue.clone())
            .unwrap_or_default()
    }
}

/// First `YYYYMMDD` run in `text`, formatted as `YYYY-MM-DD`.
fn find_date(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    (0..bytes.len().saturating_sub(7)).find_map(|start| {
        let window = &bytes[start..start + 8];
        let bounded = (start == 0 || !bytes[start - 1].is_ascii_digit())
            && bytes.get(start + 8).map_or(true, |b| !b.is_ascii_digit());
        if !bounded || !window.iter().all(u8::is_ascii_digit) {
            return None;
        }
        let digits = &text[start..start + 8];
        let date = chrono::NaiveDate::parse_from_str(digits, "%Y%m%d").ok()?;
        Some(date.format("%Y-%m-%d").to_string())
    })
}

// ============================================================================
// Event Source Trait
// ============================================================================

/// One canonical event tagged with its symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEvent {
    pub symbol: String,
    pub event: CanonicalEvent,
}

impl SymbolEvent {
    pub fn new(symbol: impl Into<String>, event: CanonicalEvent) -> Self {
        Self {
            symbol: symbol.into(),
            event,
        }
    }
}

/// Trait for canonical event sources.
///
/// `events()` consumes `self` to allow single-pass iteration. Events for any
/// one symbol must arrive in strictly increasing sequence order; events for
/// different symbols may interleave freely.
pub trait EventSource {
    /// The iterator type for events.
    type EventIter: Iterator<Item = SymbolEvent>;

    /// Consume the source and return an iterator over events.
    fn events(self) -> Result<Self::EventIter>;

    /// Get metadata about the source.
    fn metadata(&self) -> &SourceMetadata;
}

// ============================================================================
// Vector Source (for testing)
// ============================================================================

/// A simple in-memory source.
///
/// # Example
///
/// ```
/// use auction_book::source::{EventSource, SourceMetadata, SymbolEvent, VecSource};
/// use auction_book::{CanonicalEvent, Side};
///
/// let events = vec![
///     SymbolEvent::new("ESZ1", CanonicalEvent::add(1, Side::Bid, 100, 5, 1, 1)),
///     SymbolEvent::new("NQZ1", CanonicalEvent::add(2, Side::Ask, 200, 5, 1, 1)),
/// ];
///
/// let source = VecSource::new(events)
///     .with_metadata(SourceMetadata::new().with_venue("cme"));
///
/// assert_eq!(source.events().unwrap().count(), 2);
/// ```
pub struct VecSource {
    events: Vec<SymbolEvent>,
    metadata: SourceMetadata,
}

impl VecSource {
    pub fn new(events: Vec<SymbolEvent>) -> Self {
        Self {
            metadata: SourceMetadata::new()
                .with_venue("memory")
                .with_estimated_events(events.len() as u64),
            events,
        }
    }

    /// Single-symbol source from bare events.
    pub fn for_symbol(symbol: &str, events: impl IntoIterator<Item = CanonicalEvent>) -> Self {
        Self::new(
            events
                .into_iter()
                .map(|event| SymbolEvent::new(symbol, event))
                .collect(),
        )
    }

    /// Set custom metadata.
    pub fn with_metadata(mut self, metadata: SourceMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

impl EventSource for VecSource {
    type EventIter = std::vec::IntoIter<SymbolEvent>;

    fn events(self) -> Result<Self::EventIter> {
        Ok(self.events.into_iter())
    }

    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }
}

// ============================================================================
// Tests
// ============================================================================
