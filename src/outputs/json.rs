//! JSON file sink.
//!
//! Used when no database is configured. Every non-empty batch becomes one
//! file, grouped by the local date of the run:
//!
//! ```text
//! json_output_dir/
//! └── 2026-01-07/
//!     └── gold_210000.json
//! ```

use super::NewsSink;
use crate::error::SinkError;
use crate::models::NewsItem;
use crate::utils::ensure_writable_dir;
use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use tokio::fs;
use tracing::{error, info, instrument};

#[derive(Debug, Serialize)]
struct Batch<'a> {
    topic: &'a str,
    written_at: NaiveDateTime,
    items: &'a [NewsItem],
}

#[derive(Debug, Clone)]
pub struct JsonNewsSink {
    output_dir: String,
}

impl JsonNewsSink {
    pub fn new(output_dir: &str) -> Self {
        Self {
            output_dir: output_dir.trim_end_matches('/').to_string(),
        }
    }

    /// Write `items` for `topic` as if the run happened at `now`.
    #[instrument(level = "info", skip(self, items), fields(output_dir = %self.output_dir, count = items.len()))]
    pub async fn write_batch(
        &self,
        topic: &str,
        items: &[NewsItem],
        now: NaiveDateTime,
    ) -> Result<String, SinkError> {
        let full_json_dir = format!("{}/{}", self.output_dir, now.format("%Y-%m-%d"));
        info!(%full_json_dir, "Ensuring JSON directory exists");
        if let Err(e) = ensure_writable_dir(&full_json_dir).await {
            error!(%full_json_dir, error = %e, "JSON directory is not writable");
            return Err(e.into());
        }

        let batch = Batch {
            topic,
            written_at: now,
            items,
        };
        let json = serde_json::to_string_pretty(&batch)?;

        let path = format!("{}/{}_{}.json", full_json_dir, topic, now.format("%H%M%S"));
        fs::write(&path, json).await?;
        info!(%path, "Wrote JSON batch");
        Ok(path)
    }
}

impl NewsSink for JsonNewsSink {
    async fn store(&self, topic: &str, items: &[NewsItem]) -> Result<u64, SinkError> {
        if items.is_empty() {
            return Ok(0);
        }
        self.write_batch(topic, items, Local::now().naive_local())
            .await?;
        Ok(items.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PublishedAt;
    use chrono::NaiveDate;

    fn scratch_dir(name: &str) -> String {
        let dir = std::env::temp_dir().join(format!("metal_news_{}_{}", name, std::process::id()));
        dir.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_write_batch_layout_and_content() {
        let dir = scratch_dir("json_batch");
        let sink = JsonNewsSink::new(&dir);
        let now = NaiveDate::from_ymd_opt(2026, 1, 7)
            .unwrap()
            .and_hms_opt(21, 0, 5)
            .unwrap();
        let items = vec![NewsItem {
            title: "Медь дорожает".to_string(),
            description: String::new(),
            full_text: "not found".to_string(),
            published_at: PublishedAt::Parsed(now),
            url: "https://example.com/cu".to_string(),
        }];

        let path = sink.write_batch("copper", &items, now).await.unwrap();
        assert_eq!(path, format!("{dir}/2026-01-07/copper_210005.json"));

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(value["topic"], "copper");
        assert_eq!(value["items"][0]["title"], "Медь дорожает");

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_store_skips_empty_batch() {
        let dir = scratch_dir("json_empty");
        let sink = JsonNewsSink::new(&dir);
        assert_eq!(sink.store("gold", &[]).await.unwrap(), 0);
        assert!(!std::path::Path::new(&dir).exists());
    }
}
