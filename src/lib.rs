//! # auction-book
//!
//! Depth-limited order book reconstruction from exchange feed captures.
//!
//! This library turns per-symbol streams of add/modify/delete/trade events
//! into time-ordered, fixed-depth book snapshots, and derives *implied* book
//! states for trades that execute ahead of the level updates reflecting them.
//! It is a deterministic, single-pass batch transformation intended for
//! offline analysis of historical market data.
//!
//! ## Features
//!
//! - **Price Ladders**: Aggregated quantity per price, lazily sorted top-N
//! - **Order Registry**: Resting orders by id, including reused-id stacks
//! - **Book Builder**: Snapshot emission with unchanged suppression
//! - **Integrity Warnings**: Crossed/locked detection keyed by (symbol, sequence, tag)
//! - **Implied Books**: Trade-driven depletion merged by sequence number
//! - **Fault Isolation**: A fatal error aborts only the owning symbol
//!
//! ## Quick Start
//!
//! ### Single Symbol
//!
//! ```rust
//! use auction_book::{BookBuilder, BookOutput, CanonicalEvent, Side};
//!
//! let mut book = BookBuilder::new("ESZ1");
//!
//! // Prices are fixed-point with 6 decimal places
//! let add = CanonicalEvent::add(1001, Side::Bid, 1_234_250_000, 10, 1, 1_318_860_000_000_000);
//!
//! if let Some(BookOutput::Snapshot(snapshot)) = book.apply_event(&add).unwrap() {
//!     assert_eq!(snapshot.best_bid(), Some(1_234_250_000));
//!     assert_eq!(snapshot.bid.len(), 10);
//! }
//! ```
//!
//! ### Implied Books
//!
//! ```rust
//! use auction_book::{BookConfig, BookBuilder, BookOutput, CanonicalEvent, ImpliedBookEngine, Side};
//!
//! let config = BookConfig::new(5).with_trades(true);
//! let mut book = BookBuilder::with_config("ESZ1", config).unwrap();
//!
//! let events = [
//!     CanonicalEvent::add(1, Side::Bid, 100, 50, 1, 10),
//!     CanonicalEvent::trade(100, 20, 2, 20),
//!     CanonicalEvent::modify(1, 100, 30, 3, 30),
//! ];
//!
//! let (mut snapshots, mut trades) = (Vec::new(), Vec::new());
//! for event in &events {
//!     match book.apply_event(event).unwrap() {
//!         Some(BookOutput::Snapshot(s)) => snapshots.push(s),
//!         Some(BookOutput::Trade(t)) => trades.push(t),
//!         None => {}
//!     }
//! }
//!
//! let views: Vec<_> = ImpliedBookEngine::from_vecs(snapshots, trades)
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert!(views[1].is_implied());
//! assert_eq!(views[1].snapshot().bid[0].quantity, 30);
//! ```
//!
//! ### Many Symbols
//!
//! ```rust
//! use auction_book::source::{SymbolEvent, VecSource};
//! use auction_book::{BookConfig, CanonicalEvent, MemorySink, MultiSymbolBooks, Side};
//!
//! let source = VecSource::new(vec![
//!     SymbolEvent::new("ESZ1", CanonicalEvent::add(1, Side::Bid, 100, 5, 1, 1)),
//!     SymbolEvent::new("NQZ1", CanonicalEvent::delete(9, 1, 1)), // unknown id: aborts NQZ1
//!     SymbolEvent::new("ESZ1", CanonicalEvent::delete(1, 2, 2)),
//! ]);
//!
//! let mut books = MultiSymbolBooks::new(BookConfig::default()).unwrap();
//! let mut sink = MemorySink::new();
//! books.process_source(source, &mut sink).unwrap();
//! let summary = books.finish(&mut sink).unwrap();
//!
//! assert!(!summary.is_valid);
//! assert!(summary.symbol("ESZ1").unwrap().is_complete());
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`types`] | Core types: `CanonicalEvent`, `BookSnapshot`, `TradeRecord`, `Side`, `PriceLevel` |
//! | [`lob`] | Reconstruction: `PriceLadder`, `OrderRegistry`, `BookBuilder`, `ImpliedBookEngine`, `MultiSymbolBooks` |
//! | [`warnings`] | Integrity warnings: `WarningLog`, `BookIntegrityWarning`, `IntegrityTag` |
//! | [`source`] | Event source abstraction: `EventSource`, `VecSource`, `SourceMetadata` |
//! | [`sink`] | Output: `BookSink`, `MemorySink`, `JsonLinesSink` |
//! | [`summary`] | Run records: `ParseSummary`, `SymbolSummary` |
//! | [`time`] | Display timestamps |

pub mod error;
pub mod lob;
pub mod sink;
pub mod source;
pub mod summary;
pub mod time;
pub mod types;
pub mod warnings;

// Re-exports - Core types
pub use error::{BookError, Result};
pub use types::{
    real_price, AddOrder, BookConsistency, BookSnapshot, CanonicalEvent, DeleteOrder, ModifyOrder,
    PriceLevel, Side, TradeEvent, TradeRecord, DEFAULT_SNAPSHOT_DEPTH, PRICE_SCALE,
};

// Re-exports - Book reconstruction
pub use lob::{
    BookBuilder, BookConfig, BookOutput, BookStats, BookSummary, BuilderState, LevelLayout,
    MultiSymbolBooks, MultiSymbolStats, OrderRegistry, PriceLadder, RestingOrder,
};

// Re-exports - Implied books
pub use lob::{trade_improves_top, BookView, ImpliedBookEngine, ImpliedBookState, ImpliedStats};

// Re-exports - Warnings
pub use warnings::{
    BookIntegrityWarning, IntegrityTag, WarningLog, WarningLogConfig, WarningSummary,
};

// Re-exports - Sources, sinks and summaries
pub use sink::{BookSink, JsonLinesSink, MemorySink};
pub use source::{EventSource, SourceMetadata, VecSource};
pub use summary::{ParseSummary, SymbolSummary};
