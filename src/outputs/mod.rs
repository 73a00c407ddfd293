//! Sinks that receive crawled news.
//!
//! The crawler only hands over lists of [`NewsItem`]; how they are stored,
//! keyed and deduplicated is decided here.
//!
//! # Submodules
//!
//! - [`csv`]: [`RowSink`] that streams backfill pages into a CSV file
//! - [`json`]: [`NewsSink`] writing one JSON file per topic and run
//! - [`postgres`]: [`NewsSink`] inserting each batch in one transaction
//!
//! # Output Structure
//!
//! ```text
//! csv_dir/
//! └── gold_news.csv              # streamed during backfill
//!
//! json_output_dir/
//! └── 2026-01-07/
//!     ├── gold_210000.json
//!     └── silver_210004.json
//! ```

pub mod csv;
pub mod json;
pub mod postgres;

use crate::error::SinkError;
use crate::models::NewsItem;

/// Incremental writer fed one page at a time during a backfill.
///
/// Rows written before a crash stay written; that is the point of it.
pub trait RowSink {
    fn write_rows(&mut self, items: &[NewsItem]) -> Result<(), SinkError>;
}

/// Batch store for the items of one crawl invocation.
///
/// `topic` names the destination (a table, a file prefix). Returns the
/// number of items stored.
pub trait NewsSink {
    async fn store(&self, topic: &str, items: &[NewsItem]) -> Result<u64, SinkError>;
}
