//! Error types for book reconstruction.
//!
//! Clean error handling using `thiserror` for ergonomic error definitions.
//! Every error raised while applying an event is fatal for the owning
//! symbol's stream only; crossed/locked books are reported as warnings
//! (see [`crate::warnings`]), never as errors.

use thiserror::Error;

use crate::types::Side;

/// Result type alias for book operations.
pub type Result<T> = std::result::Result<T, BookError>;

/// Main error type for book reconstruction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookError {
    /// A zero ladder delta or non-positive order quantity (upstream parser defect)
    #[error("Invalid quantity at price {price}")]
    InvalidDelta { price: i64 },

    /// Aggregate quantity at a price would go negative or overflow
    #[error("Data integrity violation on {side:?} ladder at price {price}: aggregate {aggregate} + delta {delta} out of range")]
    DataIntegrity {
        side: Side,
        price: i64,
        aggregate: i64,
        delta: i64,
    },

    /// Delete/modify referenced an order id that is not resting
    #[error("Order not found: {0}")]
    OrderNotFound(u64),

    /// Modify targeted an order id currently holding stacked duplicates
    #[error("Modify on duplicated order id {order_id} ({depth} stacked entries)")]
    UnsupportedModifyOnDuplicate { order_id: u64, depth: usize },

    /// Sequence or timestamp regressed relative to processed state
    #[error("Out of order event: sequence {sequence} @ {timestamp} after sequence {last_sequence} @ {last_timestamp}")]
    OutOfOrderTimestamp {
        last_sequence: i64,
        last_timestamp: i64,
        sequence: i64,
        timestamp: i64,
    },

    /// Symbol not found (for multi-symbol processing)
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// Symbol stream was aborted by an earlier fatal error
    #[error("Symbol aborted: {0}")]
    SymbolAborted(String),

    /// Event applied after the builder was closed
    #[error("Book stream already closed: {0}")]
    StreamClosed(String),

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Generic error with context
    #[error("Error: {0}")]
    Generic(String),
}

impl BookError {
    /// Create a generic error from any string-like type.
    pub fn generic(msg: impl Into<String>) -> Self {
        BookError::Generic(msg.into())
    }

    /// Whether this error terminates the owning symbol's stream.
    ///
    /// Lookup and configuration errors are caller mistakes and leave the
    /// book untouched.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BookError::InvalidDelta { .. }
                | BookError::DataIntegrity { .. }
                | BookError::OrderNotFound(_)
                | BookError::UnsupportedModifyOnDuplicate { .. }
                | BookError::OutOfOrderTimestamp { .. }
        )
    }
}

impl From<std::io::Error> for BookError {
    fn from(err: std::io::Error) -> Self {
        BookError::Generic(format!("IO error: {err}"))
    }
}

impl From<serde_json::Error> for BookError {
    fn from(err: serde_json::Error) -> Self {
        BookError::Generic(format!("JSON error: {err}"))
    }
}

impl From<String> for BookError {
    fn from(err: String) -> Self {
        BookError::Generic(err)
    }
}

impl From<&str> for BookError {
    fn from(err: &str) -> Self {
        BookError::Generic(err.to_string())
    }
}
