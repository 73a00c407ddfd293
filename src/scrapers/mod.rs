//! News acquisition: listing walk, article extraction, and the crawl controller.
//!
//! The crawl is built from four leaf-first pieces:
//!
//! | Piece | Module | Role |
//! |-------|--------|------|
//! | Date parser | [`date`] | `DD.MM.YYYY \| HH:MM` to timestamp, or "unparseable" |
//! | Article extractor | [`article`] | Full body text, or a sentinel string |
//! | Listing page fetcher | [`listing`] | One listing page to a [`PageResult`](crate::models::PageResult) |
//! | Crawl controller | [`crawler`] | Paging state machine, backfill and poll entry points |
//!
//! # Ordering invariant
//!
//! Listings are trusted to be in descending chronological order. The only
//! place that relies on it is the cutoff check in [`listing::scan_entries`]:
//! the first entry older than the cutoff ends the page and the crawl.
//!
//! # Network access
//!
//! Everything goes through [`HtmlFetcher`]. [`HttpFetcher`] is the real one:
//! browser User-Agent, bounded timeout, non-2xx treated as failure. Calls are
//! made strictly one at a time, with fixed politeness delays in between.

pub mod article;
pub mod crawler;
pub mod date;
pub mod listing;

use crate::error::CrawlError;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

/// User-Agent sent with every request; the site rejects unidentified clients.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Default bound on a single HTTP request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of HTML documents.
///
/// The crawl controller and extractors only ever see this trait, which keeps
/// them independent of the HTTP stack.
pub trait HtmlFetcher {
    /// Fetch `url` and return the response body.
    async fn fetch_html(&self, url: &str) -> Result<String, CrawlError>;
}

/// [`HtmlFetcher`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a fetcher with the browser User-Agent and the given timeout.
    pub fn new(timeout: Duration) -> Result<Self, CrawlError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl HtmlFetcher for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch_html(&self, url: &str) -> Result<String, CrawlError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CrawlError::from_reqwest(url, e))?
            .error_for_status()
            .map_err(|e| CrawlError::from_reqwest(url, e))?;
        let body = response
            .text()
            .await
            .map_err(|e| CrawlError::from_reqwest(url, e))?;
        debug!(bytes = body.len(), "Fetched HTML");
        Ok(body)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_http_fetcher_times_out_on_silent_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept and hold the connection without ever answering.
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        let fetcher = HttpFetcher::new(Duration::from_millis(200)).unwrap();
        let result = fetcher.fetch_html(&format!("http://{addr}/article")).await;
        assert!(matches!(result, Err(CrawlError::Timeout { .. })));
        server.abort();
    }

    #[tokio::test]
    async fn test_http_fetcher_rejects_error_status() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(b"HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                .await
                .unwrap();
        });

        let fetcher = HttpFetcher::new(Duration::from_secs(2)).unwrap();
        let result = fetcher.fetch_html(&format!("http://{addr}/missing")).await;
        assert!(matches!(result, Err(CrawlError::Http(_))));
        server.await.unwrap();
    }
}
