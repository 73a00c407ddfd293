//! Error types for crawling and persistence.
//!
//! Crawl errors never escape a crawl: each one is caught at the narrowest
//! scope (one listing entry, one article, one page), logged, and turned into
//! a degraded but valid result. They exist so that the absorbing code can log
//! precise context and so that tests can assert on the failure kind.
//!
//! Sink errors are different: a failed write is reported to the caller, who
//! decides whether the run as a whole failed.

use thiserror::Error;

/// Failures that can happen while walking a listing or loading an article.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// Transport failure or non-success HTTP status.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The request did not complete within the configured timeout.
    #[error("request timed out: {url}")]
    Timeout { url: String },

    /// A listing page could not be loaded.
    #[error("failed to load listing page {page}: {source}")]
    PageFetch {
        page: u32,
        #[source]
        source: Box<CrawlError>,
    },

    /// A listing entry is missing a required sub-element.
    #[error("malformed listing entry: {reason}")]
    ElementExtraction { reason: String },

    /// Date text does not match `DD.MM.YYYY | HH:MM`.
    #[error("unparseable date: {raw:?}")]
    DateUnparseable { raw: String },

    /// A listing or article URL could not be built.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl CrawlError {
    /// Map a reqwest error, keeping timeouts distinguishable in logs.
    pub fn from_reqwest(url: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CrawlError::Timeout {
                url: url.to_string(),
            }
        } else {
            CrawlError::Http(e)
        }
    }
}

/// Failures while handing items to a sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Table names are interpolated into SQL, so only plain identifiers pass.
    #[error("invalid table name: {0:?}")]
    InvalidTable(String),
}
