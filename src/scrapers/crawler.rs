//! Crawl controller.
//!
//! Walks listing pages one at a time:
//!
//! ```text
//! page = 1
//! loop:
//!   page > max_pages                    -> stop (page budget)
//!   fetch page (failure = empty page)
//!   no items and page > 1               -> stop (cutoff reached if the page
//!                                          was truncated, else listing exhausted)
//!   keep items
//!   page truncated                      -> stop (cutoff reached)
//!   page += 1, wait inter_page_delay
//! ```
//!
//! The cutoff is fixed when the crawl starts, so slow crawls compare every
//! page against the same instant. Nothing here returns an error: failures are
//! logged and the crawl returns what it has.

use super::listing::fetch_page;
use super::HtmlFetcher;
use crate::models::{CrawlReport, CrawlRequest, NewsItem, PageResult, StopReason};
use crate::outputs::RowSink;
use chrono::{Local, NaiveDateTime};
use std::time::Duration;
use tracing::{info, instrument, warn};

pub const DEFAULT_INTER_PAGE_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_INTER_ARTICLE_DELAY: Duration = Duration::from_secs(1);

/// Fixed waits between consecutive requests to the source site.
#[derive(Debug, Clone, Copy)]
pub struct Politeness {
    pub inter_page_delay: Duration,
    pub inter_article_delay: Duration,
}

impl Default for Politeness {
    fn default() -> Self {
        Self {
            inter_page_delay: DEFAULT_INTER_PAGE_DELAY,
            inter_article_delay: DEFAULT_INTER_ARTICLE_DELAY,
        }
    }
}

/// Sequential news crawler over an [`HtmlFetcher`].
///
/// Holds no state between invocations; every call is self-contained given
/// its request.
#[derive(Debug)]
pub struct Crawler<F> {
    fetcher: F,
    politeness: Politeness,
}

impl<F: HtmlFetcher> Crawler<F> {
    pub fn new(fetcher: F, politeness: Politeness) -> Self {
        Self {
            fetcher,
            politeness,
        }
    }

    /// Full historical crawl, starting now.
    ///
    /// When `rows` is given, each page's items are written to it as soon as
    /// the page completes, so a crash mid-crawl keeps the pages already done.
    pub async fn backfill(
        &self,
        request: &CrawlRequest,
        rows: Option<&mut dyn RowSink>,
    ) -> CrawlReport {
        self.backfill_at(request, Local::now().naive_local(), rows)
            .await
    }

    /// [`backfill`](Self::backfill) with an explicit crawl start time.
    #[instrument(level = "info", skip_all, fields(listing = %request.listing_url, max_pages = request.max_pages))]
    pub async fn backfill_at(
        &self,
        request: &CrawlRequest,
        now: NaiveDateTime,
        mut rows: Option<&mut dyn RowSink>,
    ) -> CrawlReport {
        let cutoff = request.window.cutoff_from(now);
        info!(%cutoff, mode = ?request.mode, keywords = ?request.keywords, "Starting crawl");

        let mut items: Vec<NewsItem> = Vec::new();
        let mut page: u32 = 1;
        let mut pages_fetched: u32 = 0;

        let stop_reason = loop {
            if page > request.max_pages {
                break StopReason::PageBudget;
            }
            if page > 1 && !self.politeness.inter_page_delay.is_zero() {
                tokio::time::sleep(self.politeness.inter_page_delay).await;
            }

            let result = match fetch_page(
                &self.fetcher,
                request,
                page,
                cutoff,
                self.politeness.inter_article_delay,
            )
            .await
            {
                Ok(result) => result,
                Err(e) => {
                    warn!(page, error = %e, "Listing page failed; treating it as empty");
                    PageResult::default()
                }
            };
            pages_fetched += 1;

            if result.items.is_empty() && page > 1 {
                if result.truncated {
                    break StopReason::CutoffReached;
                }
                info!(page, "No more matching items");
                break StopReason::ListingExhausted;
            }

            if let Some(sink) = rows.as_deref_mut() {
                if let Err(e) = sink.write_rows(&result.items) {
                    warn!(page, error = %e, "Row sink write failed; continuing");
                }
            }
            items.extend(result.items);
            info!(page, total = items.len(), "Page done");

            if result.truncated {
                break StopReason::CutoffReached;
            }
            page += 1;
        };

        info!(
            ?stop_reason,
            pages_fetched,
            count = items.len(),
            "Crawl finished"
        );
        CrawlReport {
            items,
            pages_fetched,
            stop_reason,
        }
    }

    /// Items from the last `hours` hours, looking at page 1 only.
    ///
    /// Relies on the listing being newest-first: if page 1 has nothing in the
    /// window, later pages cannot either, and the scan of page 1 stops at the
    /// first matching item outside the window. Should the site ever break that
    /// ordering, items after the first old one are silently missed.
    ///
    /// An empty result means either "nothing new" or "page 1 failed"; callers
    /// treat both as "no update this cycle".
    pub async fn poll_recent(&self, listing_url: &str, keywords: &[String], hours: u32) -> Vec<NewsItem> {
        self.poll_recent_at(listing_url, keywords, hours, Local::now().naive_local())
            .await
    }

    /// [`poll_recent`](Self::poll_recent) with an explicit crawl start time.
    pub async fn poll_recent_at(
        &self,
        listing_url: &str,
        keywords: &[String],
        hours: u32,
        now: NaiveDateTime,
    ) -> Vec<NewsItem> {
        let request = CrawlRequest::incremental(listing_url, keywords, hours);
        self.backfill_at(&request, now, None).await.items
    }
}
