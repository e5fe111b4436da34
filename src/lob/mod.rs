//! Order book reconstruction.
//!
//! Per-symbol pipeline:
//!
//! ```text
//! CanonicalEvent ─▶ BookBuilder ─▶ BookSnapshot ─┐
//!                   (OrderRegistry,               ├─▶ ImpliedBookEngine ─▶ BookView
//!                    PriceLadder x2)  TradeRecord ┘
//! ```
//!
//! [`MultiSymbolBooks`] runs one builder per symbol with fault isolation.

pub mod book_builder;
pub mod implied;
mod multi_symbol;
pub mod order_registry;
pub mod price_ladder;

pub use book_builder::{
    BookBuilder, BookConfig, BookOutput, BookStats, BookSummary, BuilderState, LevelLayout,
};
pub use implied::{trade_improves_top, BookView, ImpliedBookEngine, ImpliedBookState, ImpliedStats};
pub use multi_symbol::{MultiSymbolBooks, MultiSymbolStats};
pub use order_registry::{OrderRegistry, RestingOrder};
pub use price_ladder::{BookSides, PriceLadder};
