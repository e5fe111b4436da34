//! Output sinks for reconstructed books.
//!
//! A [`BookSink`] is owned by the run and passed to the orchestrator by
//! mutable reference; there is no process-wide registry of open outputs.
//!
//! - [`MemorySink`]: collects everything per symbol, for tests and analysis
//! - [`JsonLinesSink`]: one JSON record per line, written to a temporary
//!   `*.in_progress` file and renamed into place on [`BookSink::finish`]

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{BookError, Result};
use crate::lob::BookSummary;
use crate::lob::implied::BookView;
use crate::types::{BookSnapshot, TradeRecord};

/// I/O buffer size for file sinks.
const IO_BUFFER_SIZE: usize = 1 << 20;

/// Destination for per-symbol book output.
pub trait BookSink {
    /// Write one emitted snapshot.
    fn write_snapshot(&mut self, symbol: &str, snapshot: &BookSnapshot) -> Result<()>;

    /// Write one trade record.
    fn write_trade(&mut self, symbol: &str, trade: &TradeRecord) -> Result<()>;

    /// Write one element of a merged published/implied stream.
    ///
    /// Defaults to writing the snapshot, dropping the implied tag.
    fn write_view(&mut self, symbol: &str, view: &BookView) -> Result<()> {
        self.write_snapshot(symbol, view.snapshot())
    }

    /// Called once per symbol when its stream ends, normally or aborted.
    fn finish_symbol(&mut self, _symbol: &str, _summary: &BookSummary) -> Result<()> {
        Ok(())
    }

    /// Flush and finalise all output.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: BookSink + ?Sized> BookSink for &mut S {
    fn write_snapshot(&mut self, symbol: &str, snapshot: &BookSnapshot) -> Result<()> {
        (**self).write_snapshot(symbol, snapshot)
    }

    fn write_trade(&mut self, symbol: &str, trade: &TradeRecord) -> Result<()> {
        (**self).write_trade(symbol, trade)
    }

    fn write_view(&mut self, symbol: &str, view: &BookView) -> Result<()> {
        (**self).write_view(symbol, view)
    }

    fn finish_symbol(&mut self, symbol: &str, summary: &BookSummary) -> Result<()> {
        (**self).finish_symbol(symbol, summary)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

// ============================================================================
// Memory Sink
// ============================================================================

/// Everything written for one symbol.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolOutput {
    pub snapshots: Vec<BookSnapshot>,
    pub trades: Vec<TradeRecord>,
    /// Merged stream elements, with their implied flag
    pub views: Vec<BookView>,
    pub summary: Option<BookSummary>,
}

/// In-memory sink keyed by symbol in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    outputs: IndexMap<String, SymbolOutput>,
    finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, symbol: &str) -> &mut SymbolOutput {
        self.outputs.entry(symbol.to_string()).or_default()
    }

    /// Output for one symbol.
    pub fn get(&self, symbol: &str) -> Option<&SymbolOutput> {
        self.outputs.get(symbol)
    }

    /// Snapshots written for one symbol (empty if none).
    pub fn snapshots(&self, symbol: &str) -> &[BookSnapshot] {
        self.outputs
            .get(symbol)
            .map(|output| output.snapshots.as_slice())
            .unwrap_or_default()
    }

    /// Trades written for one symbol (empty if none).
    pub fn trades(&self, symbol: &str) -> &[TradeRecord] {
        self.outputs
            .get(symbol)
            .map(|output| output.trades.as_slice())
            .unwrap_or_default()
    }

    /// Symbols in first-seen order.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.outputs.keys().map(String::as_str)
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn into_outputs(self) -> IndexMap<String, SymbolOutput> {
        self.outputs
    }
}

impl BookSink for MemorySink {
    fn write_snapshot(&mut self, symbol: &str, snapshot: &BookSnapshot) -> Result<()> {
        self.entry(symbol).snapshots.push(snapshot.clone());
        Ok(())
    }

    fn write_trade(&mut self, symbol: &str, trade: &TradeRecord) -> Result<()> {
        self.entry(symbol).trades.push(trade.clone());
        Ok(())
    }

    fn write_view(&mut self, symbol: &str, view: &BookView) -> Result<()> {
        self.entry(symbol).views.push(view.clone());
        Ok(())
    }

    fn finish_symbol(&mut self, symbol: &str, summary: &BookSummary) -> Result<()> {
        self.entry(symbol).summary = Some(summary.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}

// ============================================================================
// JSON Lines Sink
// ============================================================================

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Line<'a> {
    Book {
        symbol: &'a str,
        implied: bool,
        #[serde(flatten)]
        snapshot: &'a BookSnapshot,
    },
    Trade {
        symbol: &'a str,
        #[serde(flatten)]
        trade: &'a TradeRecord,
    },
    Summary {
        #[serde(flatten)]
        summary: &'a BookSummary,
    },
}

/// Newline-delimited JSON file sink.
///
/// Records go to `<path>.in_progress`; the file is renamed to `path` only
/// when [`finish`](BookSink::finish) succeeds, so a partial run never leaves
/// a file at the final location.
pub struct JsonLinesSink {
    path: PathBuf,
    temp_path: PathBuf,
    writer: Option<BufWriter<File>>,
    records: u64,
}

impl JsonLinesSink {
    /// Create the temporary output file.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut temp_name = path.as_os_str().to_os_string();
        temp_name.push(".in_progress");
        let temp_path = PathBuf::from(temp_name);

        let file = File::create(&temp_path).map_err(|e| {
            BookError::generic(format!("Failed to create {}: {}", temp_path.display(), e))
        })?;
        log::info!("Writing book records to {}", temp_path.display());

        Ok(Self {
            path,
            temp_path,
            writer: Some(BufWriter::with_capacity(IO_BUFFER_SIZE, file)),
            records: 0,
        })
    }

    /// Final output location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records written so far.
    pub fn records(&self) -> u64 {
        self.records
    }

    fn write_line(&mut self, line: &Line<'_>) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| BookError::StreamClosed(self.path.display().to_string()))?;
        serde_json::to_writer(&mut *writer, line)?;
        writer.write_all(b"\n")?;
        self.records += 1;
        Ok(())
    }
}

impl BookSink for JsonLinesSink {
    fn write_snapshot(&mut self, symbol: &str, snapshot: &BookSnapshot) -> Result<()> {
        self.write_line(&Line::Book {
            symbol,
            implied: false,
            snapshot,
        })
    }

    fn write_trade(&mut self, symbol: &str, trade: &TradeRecord) -> Result<()> {
        self.write_line(&Line::Trade { symbol, trade })
    }

    fn write_view(&mut self, symbol: &str, view: &BookView) -> Result<()> {
        self.write_line(&Line::Book {
            symbol,
            implied: view.is_implied(),
            snapshot: view.snapshot(),
        })
    }

    fn finish_symbol(&mut self, _symbol: &str, summary: &BookSummary) -> Result<()> {
        self.write_line(&Line::Summary { summary })
    }

    fn finish(&mut self) -> Result<()> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };
        writer.flush()?;
        drop(writer);

        fs::rename(&self.temp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&self.temp_path);
            BookError::generic(format!("Failed to rename temp file: {}", e))
        })?;
        log::info!(
            "Book output complete: {} records written to {}",
            self.records,
            self.path.display()
        );
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PriceLevel;

    fn snapshot(sequence: i64) -> BookSnapshot {
        let mut snap = BookSnapshot::empty(2);
        snap.sequence = sequence;
        snap.bid[0] = PriceLevel::new(100, 5);
        snap
    }

    fn trade(sequence: i64) -> TradeRecord {
        TradeRecord {
            timestamp: 1,
            timestamp_string: "00:00:00:000001".to_string(),
            sequence,
            price: 100,
            quantity: 2,
            trade_type: 0,
            aggressor_side: None,
        }
    }

    #[test]
    fn test_memory_sink_groups_by_symbol() {
        let mut sink = MemorySink::new();
        sink.write_snapshot("NQZ1", &snapshot(1)).unwrap();
        sink.write_snapshot("ESZ1", &snapshot(1)).unwrap();
        sink.write_snapshot("NQZ1", &snapshot(2)).unwrap();
        sink.write_trade("ESZ1", &trade(3)).unwrap();

        assert_eq!(sink.symbols().collect::<Vec<_>>(), vec!["NQZ1", "ESZ1"]);
        assert_eq!(sink.snapshots("NQZ1").len(), 2);
        assert_eq!(sink.trades("ESZ1").len(), 1);
        assert!(sink.snapshots("CLZ1").is_empty());
        assert!(!sink.is_finished());
        sink.finish().unwrap();
        assert!(sink.is_finished());
    }

    #[test]
    fn test_memory_sink_through_mut_ref() {
        fn write_all(mut sink: impl BookSink) {
            sink.write_snapshot("ESZ1", &snapshot(1)).unwrap();
        }

        let mut sink = MemorySink::new();
        write_all(&mut sink);
        assert_eq!(sink.snapshots("ESZ1").len(), 1);
    }

    #[test]
    fn test_json_lines_sink_renames_on_finish() {
        let dir = std::env::temp_dir().join(format!("auction_book_sink_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("books.jsonl");

        let mut sink = JsonLinesSink::create(&path).unwrap();
        sink.write_snapshot("ESZ1", &snapshot(1)).unwrap();
        sink.write_view("ESZ1", &BookView::Implied(snapshot(2))).unwrap();
        sink.write_trade("ESZ1", &trade(3)).unwrap();
        assert!(!path.exists());

        sink.finish().unwrap();
        assert!(path.exists());
        assert_eq!(sink.records(), 3);

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["kind"], "book");
        assert_eq!(lines[0]["implied"], false);
        assert_eq!(lines[1]["implied"], true);
        assert_eq!(lines[1]["sequence"], 2);
        assert_eq!(lines[2]["kind"], "trade");
        assert_eq!(lines[2]["price"], 100);

        assert!(sink.write_trade("ESZ1", &trade(4)).is_err());
        fs::remove_dir_all(&dir).unwrap();
    }
}
