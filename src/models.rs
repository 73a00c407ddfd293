//! Data models for crawled news and crawl configuration.
//!
//! This module defines the core data structures used throughout the application:
//! - [`NewsItem`]: One fully built news item, handed to sinks
//! - [`PublishedAt`]: Parsed listing timestamp, or the raw text when parsing failed
//! - [`CrawlRequest`]: Immutable configuration of one crawl invocation
//! - [`PageResult`]: Transient per-page output of the listing fetcher
//! - [`CrawlReport`]: What a finished crawl produced and why it stopped

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

/// Publication time of a listing entry.
///
/// Listing dates are naive local times as printed by the site. When the text
/// does not parse, the raw text is kept so file sinks can still show it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PublishedAt {
    Parsed(NaiveDateTime),
    Unparsed(String),
}

impl PublishedAt {
    /// The parsed timestamp, if any.
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            PublishedAt::Parsed(ts) => Some(*ts),
            PublishedAt::Unparsed(_) => None,
        }
    }

    /// Text form used by file sinks: `DD.MM.YYYY | HH:MM` or the raw text.
    pub fn display_text(&self) -> String {
        match self {
            PublishedAt::Parsed(ts) => ts.format("%d.%m.%Y | %H:%M").to_string(),
            PublishedAt::Unparsed(raw) => raw.clone(),
        }
    }
}

/// A news item produced by the crawl controller.
///
/// No identity is assigned here; deduplication belongs to whatever stores it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NewsItem {
    pub title: String,
    pub description: String,
    /// Article body, or one of the extractor sentinels.
    pub full_text: String,
    pub published_at: PublishedAt,
    pub url: String,
}

/// How far back a crawl looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// `n` years, counted as `365 * n` days.
    Years(u32),
    Hours(u32),
}

impl Window {
    /// `None` when the window does not fit in a [`TimeDelta`].
    pub fn as_duration(self) -> Option<TimeDelta> {
        match self {
            Window::Years(n) => TimeDelta::try_days(365 * i64::from(n)),
            Window::Hours(n) => TimeDelta::try_hours(i64::from(n)),
        }
    }

    /// The fixed cutoff for a crawl started at `now`.
    ///
    /// A window reaching past the representable range cuts off at
    /// [`NaiveDateTime::MIN`], so every dated entry is inside it.
    pub fn cutoff_from(self, now: NaiveDateTime) -> NaiveDateTime {
        self.as_duration()
            .and_then(|window| now.checked_sub_signed(window))
            .unwrap_or(NaiveDateTime::MIN)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlMode {
    Backfill,
    Incremental,
}

/// What to do with keyword-matching entries whose date does not parse.
///
/// Undated entries never trigger the cutoff. Backfill keeps them; the
/// incremental poll drops them because their recency cannot be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndatedPolicy {
    Keep,
    Drop,
}

impl CrawlMode {
    pub fn default_undated_policy(self) -> UndatedPolicy {
        match self {
            CrawlMode::Backfill => UndatedPolicy::Keep,
            CrawlMode::Incremental => UndatedPolicy::Drop,
        }
    }
}

/// Configuration of one crawl invocation.
#[derive(Debug, Clone)]
pub struct CrawlRequest {
    pub listing_url: String,
    /// Trimmed and lowercased at construction, blanks removed; matching is
    /// case-insensitive substring.
    pub keywords: Vec<String>,
    pub max_pages: u32,
    pub window: Window,
    pub mode: CrawlMode,
    pub undated: UndatedPolicy,
}

impl CrawlRequest {
    /// Bulk historical crawl over `max_pages` pages and a `years` window.
    pub fn backfill(listing_url: &str, keywords: &[String], years: u32, max_pages: u32) -> Self {
        Self::new(
            listing_url,
            keywords,
            max_pages,
            Window::Years(years),
            CrawlMode::Backfill,
        )
    }

    /// Single-page poll for items from the last `hours` hours.
    pub fn incremental(listing_url: &str, keywords: &[String], hours: u32) -> Self {
        Self::new(
            listing_url,
            keywords,
            1,
            Window::Hours(hours),
            CrawlMode::Incremental,
        )
    }

    fn new(
        listing_url: &str,
        keywords: &[String],
        max_pages: u32,
        window: Window,
        mode: CrawlMode,
    ) -> Self {
        Self {
            listing_url: listing_url.to_string(),
            keywords: keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            max_pages: max_pages.max(1),
            window,
            mode,
            undated: mode.default_undated_policy(),
        }
    }
}

/// Output of one listing page.
#[derive(Debug, Clone, Default)]
pub struct PageResult {
    pub items: Vec<NewsItem>,
    /// The page held an entry older than the cutoff; paging must stop here.
    pub truncated: bool,
}

/// Why the crawl controller stopped paging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    PageBudget,
    ListingExhausted,
    CutoffReached,
}

#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub items: Vec<NewsItem>,
    pub pages_fetched: u32,
    pub stop_reason: StopReason,
}
