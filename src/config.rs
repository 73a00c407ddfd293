//! Topic and crawl configuration.
//!
//! Loaded from an optional YAML file; anything missing falls back to the
//! built-in defaults, which describe the gold, silver and copper feeds:
//!
//! ```yaml
//! topics:
//!   - name: gold
//!     listing_url: https://www.finversia.ru/dragmetally
//!     keywords: [золот, gold]
//!     table: gold_news
//! crawl:
//!   request_timeout_secs: 10
//!   inter_page_delay_ms: 2000
//!   inter_article_delay_ms: 1000
//!   backfill_years: 5
//!   backfill_max_pages: 200
//!   poll_hours: 1
//! ```

use crate::scrapers::crawler::Politeness;
use crate::utils::is_plain_identifier;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

/// One tracked keyword set and where its news comes from and goes to.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Topic {
    pub name: String,
    pub listing_url: String,
    pub keywords: Vec<String>,
    /// Destination table (or file prefix) for this topic's items.
    pub table: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CrawlSettings {
    pub request_timeout_secs: u64,
    pub inter_page_delay_ms: u64,
    pub inter_article_delay_ms: u64,
    pub backfill_years: u32,
    pub backfill_max_pages: u32,
    pub poll_hours: u32,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 10,
            inter_page_delay_ms: 2000,
            inter_article_delay_ms: 1000,
            backfill_years: 5,
            backfill_max_pages: 200,
            poll_hours: 1,
        }
    }
}

/// Longest accepted backfill window, in years.
pub const MAX_BACKFILL_YEARS: u32 = 100;
/// Longest accepted poll window, in hours (one year).
pub const MAX_POLL_HOURS: u32 = 24 * 366;

fn check_window(what: &str, value: u32, max: u32) -> Result<u32, String> {
    if (1..=max).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{what} must be between 1 and {max}, got {value}"))
    }
}

impl CrawlSettings {
    /// Backfill window in years: `requested` when given, else the configured one.
    pub fn backfill_window(&self, requested: Option<u32>) -> Result<u32, String> {
        check_window(
            "backfill years",
            requested.unwrap_or(self.backfill_years),
            MAX_BACKFILL_YEARS,
        )
    }

    /// Poll window in hours: `requested` when given, else the configured one.
    pub fn poll_window(&self, requested: Option<u32>) -> Result<u32, String> {
        check_window(
            "poll hours",
            requested.unwrap_or(self.poll_hours),
            MAX_POLL_HOURS,
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn politeness(&self) -> Politeness {
        Politeness {
            inter_page_delay: Duration::from_millis(self.inter_page_delay_ms),
            inter_article_delay: Duration::from_millis(self.inter_article_delay_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub topics: Vec<Topic>,
    pub crawl: CrawlSettings,
}

fn topic(name: &str, listing_url: &str, keywords: &[&str], table: &str) -> Topic {
    Topic {
        name: name.to_string(),
        listing_url: listing_url.to_string(),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
        table: table.to_string(),
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            topics: vec![
                topic("gold", "https://www.finversia.ru/dragmetally", &["золот", "gold"], "gold_news"),
                topic("silver", "https://www.finversia.ru/dragmetally", &["серебр", "silver"], "silver_news"),
                topic("copper", "https://www.finversia.ru/syrevye-rynki", &["мед", "copper"], "copper_news"),
            ],
            crawl: CrawlSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load `path`, or the defaults when no path is given.
    #[instrument(level = "info")]
    pub fn load(path: Option<&str>) -> Result<Self, Box<dyn Error>> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(Path::new(path))?;
                let config = Self::from_yaml(&text)?;
                info!(path, topics = config.topics.len(), "Loaded configuration");
                config
            }
            None => {
                info!("No config file given; using built-in topics");
                Self::default()
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.topics.is_empty() {
            return Err("no topics configured".to_string());
        }
        for t in &self.topics {
            Url::parse(&t.listing_url)
                .map_err(|e| format!("topic {}: bad listing_url {:?}: {e}", t.name, t.listing_url))?;
            if t.keywords.is_empty() {
                return Err(format!("topic {}: no keywords", t.name));
            }
            if t.keywords.iter().any(|k| k.trim().is_empty()) {
                return Err(format!("topic {}: blank keyword", t.name));
            }
            if !is_plain_identifier(&t.table) {
                return Err(format!("topic {}: bad table name {:?}", t.name, t.table));
            }
        }
        if self.crawl.backfill_max_pages == 0 {
            return Err("crawl.backfill_max_pages must be at least 1".to_string());
        }
        self.crawl.backfill_window(None)?;
        self.crawl.poll_window(None)?;
        Ok(())
    }

    /// Topics named in `names`, or all of them when `names` is empty.
    pub fn select_topics(&self, names: &[String]) -> Result<Vec<&Topic>, String> {
        if names.is_empty() {
            return Ok(self.topics.iter().collect());
        }
        names
            .iter()
            .map(|n| {
                self.topics
                    .iter()
                    .find(|t| &t.name == n)
                    .ok_or_else(|| format!("unknown topic {n:?}"))
            })
            .collect()
    }
}
