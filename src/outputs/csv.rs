//! CSV row sink for long backfills.
//!
//! The file starts with a UTF-8 BOM so spreadsheet tools pick the right
//! encoding for Cyrillic text, and is flushed after every page.

use super::RowSink;
use crate::error::SinkError;
use crate::models::NewsItem;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{debug, instrument};

const BOM: &[u8] = b"\xEF\xBB\xBF";
const HEADER: [&str; 5] = ["Заголовок", "Описание", "Полный текст", "Дата и время", "URL"];

pub struct CsvRowSink<W: Write> {
    writer: csv::Writer<W>,
    rows: usize,
}

impl CsvRowSink<File> {
    /// Create (or truncate) `path` and write the BOM and header.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let file = File::create(path.as_ref())?;
        Self::from_writer(file)
    }
}

impl<W: Write> CsvRowSink<W> {
    pub fn from_writer(mut inner: W) -> Result<Self, SinkError> {
        inner.write_all(BOM)?;
        let mut writer = csv::Writer::from_writer(inner);
        writer.write_record(HEADER)?;
        writer.flush()?;
        Ok(Self { writer, rows: 0 })
    }

    pub fn rows_written(&self) -> usize {
        self.rows
    }

    pub fn into_inner(self) -> Result<W, SinkError> {
        self.writer
            .into_inner()
            .map_err(|e| SinkError::Io(e.into_error()))
    }
}

impl<W: Write> RowSink for CsvRowSink<W> {
    fn write_rows(&mut self, items: &[NewsItem]) -> Result<(), SinkError> {
        for item in items {
            self.writer.write_record([
                item.title.as_str(),
                item.description.as_str(),
                item.full_text.as_str(),
                item.published_at.display_text().as_str(),
                item.url.as_str(),
            ])?;
            self.rows += 1;
        }
        self.writer.flush()?;
        debug!(batch = items.len(), total = self.rows, "Flushed CSV rows");
        Ok(())
    }
}
