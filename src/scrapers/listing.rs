//! Listing page fetcher.
//!
//! A listing page is a run of news cards:
//!
//! ```html
//! <div class="b-item-cont">
//!   <a class="title" href="/publications/...">Title</a>
//!   <div class="descr">Short description</div>
//!   <div class="date">07.01.2026 | 20:39</div>
//! </div>
//! ```
//!
//! Page 1 is the bare listing URL; page N > 1 adds `?page=N`.
//!
//! Processing is split in two so the per-entry decisions are explicit:
//! [`parse_entries`] turns cards into [`RawEntry`] values (one `Result` per
//! card), then [`scan_entries`] folds them through the keyword filter, the
//! date parser and the cutoff check. Only entries that survive the scan get
//! their article body loaded.
//!
//! If the site renames any of those classes, pages silently come back empty;
//! the controller then treats the listing as exhausted.

use super::article::fetch_article_text;
use super::date::parse_listing_date;
use super::HtmlFetcher;
use crate::error::CrawlError;
use crate::models::{CrawlRequest, NewsItem, PageResult, PublishedAt, UndatedPolicy};
use crate::utils::truncate_for_log;
use chrono::NaiveDateTime;
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::ops::ControlFlow;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

static CARD: Lazy<Selector> = Lazy::new(|| selector("div.b-item-cont"));
static TITLE: Lazy<Selector> = Lazy::new(|| selector("a.title"));
static DESCR: Lazy<Selector> = Lazy::new(|| selector("div.descr"));
static DATE: Lazy<Selector> = Lazy::new(|| selector("div.date"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("listing selector is valid")
}

/// One listing card as found on the page, before any filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub title: String,
    /// Absolute article URL.
    pub url: String,
    pub description: String,
    pub raw_date: String,
}

/// An entry that passed the keyword filter and the date window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub title: String,
    pub url: String,
    pub description: String,
    pub published_at: PublishedAt,
}

/// Outcome of scanning a page's entries.
#[derive(Debug, Default)]
pub struct PageScan {
    pub accepted: Vec<Candidate>,
    pub truncated: bool,
}

/// Address of listing page `page` (1-based).
pub fn page_url(listing_url: &str, page: u32) -> Result<Url, CrawlError> {
    let mut url = Url::parse(listing_url)?;
    if page > 1 {
        url.query_pairs_mut().append_pair("page", &page.to_string());
    }
    Ok(url)
}

/// Case-insensitive substring match against already-lowercased keywords.
pub fn contains_keyword(text: &str, keywords: &[String]) -> bool {
    if text.is_empty() {
        return false;
    }
    let lower = text.to_lowercase();
    keywords.iter().any(|k| lower.contains(k.as_str()))
}

/// Extract every card on a listing page, in page order.
///
/// A malformed card becomes an `Err` in its slot and does not affect the
/// others. Relative links are resolved against `base`.
pub fn parse_entries(html: &str, base: &Url) -> Vec<Result<RawEntry, CrawlError>> {
    let document = Html::parse_document(html);
    document
        .select(&CARD)
        .map(|card| parse_card(card, base))
        .collect()
}

fn parse_card(card: ElementRef<'_>, base: &Url) -> Result<RawEntry, CrawlError> {
    let title_el = card
        .select(&TITLE)
        .next()
        .ok_or_else(|| CrawlError::ElementExtraction {
            reason: "card has no title link".to_string(),
        })?;
    let title = element_text(title_el);
    let href = title_el.value().attr("href").unwrap_or("").trim();
    if href.is_empty() {
        return Err(CrawlError::ElementExtraction {
            reason: format!("title link without href: {title:?}"),
        });
    }
    let url = base.join(href)?.to_string();

    let description = card.select(&DESCR).next().map(element_text).unwrap_or_default();
    let raw_date = card.select(&DATE).next().map(element_text).unwrap_or_default();

    Ok(RawEntry {
        title,
        url,
        description,
        raw_date,
    })
}

/// Text nodes concatenated as written, then whitespace collapsed, so inline
/// markup inside a word (`Зол<b>ото</b>`) does not split it.
fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().split_whitespace().join(" ")
}

/// Fold a page's entries through the keyword filter and the cutoff check.
///
/// This is the single place that relies on listings being in descending
/// chronological order: the first keyword-matching entry dated before
/// `cutoff` marks the page truncated and nothing after it is looked at.
/// Entries whose date does not parse never trigger the cutoff; `undated`
/// decides whether they are kept.
pub fn scan_entries<I>(
    entries: I,
    keywords: &[String],
    cutoff: NaiveDateTime,
    undated: UndatedPolicy,
) -> PageScan
where
    I: IntoIterator<Item = Result<RawEntry, CrawlError>>,
{
    let flow = entries
        .into_iter()
        .try_fold(PageScan::default(), |mut scan, entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping malformed listing entry");
                    return ControlFlow::Continue(scan);
                }
            };

            if !contains_keyword(&entry.title, keywords)
                && !contains_keyword(&entry.description, keywords)
            {
                return ControlFlow::Continue(scan);
            }

            let published_at = match parse_listing_date(&entry.raw_date) {
                Ok(ts) if ts < cutoff => {
                    info!(raw_date = %entry.raw_date, %cutoff, "Reached an entry older than the cutoff");
                    scan.truncated = true;
                    return ControlFlow::Break(scan);
                }
                Ok(ts) => PublishedAt::Parsed(ts),
                Err(e) => match undated {
                    UndatedPolicy::Keep => {
                        warn!(error = %e, url = %entry.url, "Keeping entry with unparseable date");
                        PublishedAt::Unparsed(entry.raw_date.clone())
                    }
                    UndatedPolicy::Drop => {
                        warn!(error = %e, url = %entry.url, "Dropping entry with unparseable date");
                        return ControlFlow::Continue(scan);
                    }
                },
            };

            debug!(title = %truncate_for_log(&entry.title, 50), "Entry matched");
            scan.accepted.push(Candidate {
                title: entry.title,
                url: entry.url,
                description: entry.description,
                published_at,
            });
            ControlFlow::Continue(scan)
        });

    match flow {
        ControlFlow::Continue(scan) | ControlFlow::Break(scan) => scan,
    }
}

/// Load one listing page, filter it, and fetch the bodies of the survivors.
///
/// Article fetches run one after another with `article_delay` between them.
/// An error is returned only when the page itself cannot be loaded; the
/// controller decides what that means for the crawl.
#[instrument(level = "info", skip(fetcher, request, article_delay), fields(listing = %request.listing_url))]
pub async fn fetch_page<F: HtmlFetcher>(
    fetcher: &F,
    request: &CrawlRequest,
    page: u32,
    cutoff: NaiveDateTime,
    article_delay: Duration,
) -> Result<PageResult, CrawlError> {
    let url = page_url(&request.listing_url, page)?;
    info!(%url, "Fetching listing page");

    let html = fetcher
        .fetch_html(url.as_str())
        .await
        .map_err(|e| CrawlError::PageFetch {
            page,
            source: Box::new(e),
        })?;

    let entries = parse_entries(&html, &url);
    let card_count = entries.len();
    let scan = scan_entries(entries, &request.keywords, cutoff, request.undated);
    debug!(
        cards = card_count,
        accepted = scan.accepted.len(),
        truncated = scan.truncated,
        "Scanned listing page"
    );

    let mut items = Vec::with_capacity(scan.accepted.len());
    for (i, candidate) in scan.accepted.into_iter().enumerate() {
        if i > 0 && !article_delay.is_zero() {
            tokio::time::sleep(article_delay).await;
        }
        let full_text = fetch_article_text(fetcher, &candidate.url).await;
        items.push(NewsItem {
            title: candidate.title,
            description: candidate.description,
            full_text,
            published_at: candidate.published_at,
            url: candidate.url,
        });
    }

    Ok(PageResult {
        items,
        truncated: scan.truncated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CrawlRequest;
    use crate::scrapers::article::ARTICLE_LOAD_ERROR;
    use crate::scrapers::testing::{article, card, listing, FakeFetcher};
    use chrono::NaiveDate;

    const LISTING: &str = "https://news.example.com/dragmetally";

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 7)
            .unwrap()
            .and_hms_opt(21, 0, 0)
            .unwrap()
    }

    fn keywords(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_lowercase()).collect()
    }

    fn entry(title: &str, raw_date: &str) -> Result<RawEntry, CrawlError> {
        Ok(RawEntry {
            title: title.to_string(),
            url: format!("https://news.example.com/{}", title.len()),
            description: String::new(),
            raw_date: raw_date.to_string(),
        })
    }

    #[test]
    fn test_page_url() {
        assert_eq!(page_url(LISTING, 1).unwrap().as_str(), LISTING);
        assert_eq!(
            page_url(LISTING, 3).unwrap().as_str(),
            "https://news.example.com/dragmetally?page=3"
        );
        assert_eq!(
            page_url("https://news.example.com/list?tag=gold", 2).unwrap().as_str(),
            "https://news.example.com/list?tag=gold&page=2"
        );
    }

    #[test]
    fn test_keyword_match_is_case_insensitive_substring() {
        let kw = keywords(&["золот"]);
        assert!(contains_keyword("Золото дорожает", &kw));
        assert!(contains_keyword("ЦЕНЫ НА ЗОЛОТО", &kw));
        assert!(!contains_keyword("Gold rises", &keywords(&["серебр"])));
        assert!(contains_keyword("Goldman upgrades miners", &keywords(&["gold"])));
        assert!(!contains_keyword("", &kw));
    }

    #[test]
    fn test_parse_entries_resolves_links_and_isolates_bad_cards() {
        let base = Url::parse(LISTING).unwrap();
        let html = listing(&[
            card("Золото растёт", "/news/1", "описание", "07.01.2026 | 20:39"),
            r#"<div class="b-item-cont"><div class="descr">no title</div></div>"#.to_string(),
            card("Абсолютная", "https://other.example.com/x", "", ""),
            card("Пустая ссылка", "", "", ""),
        ]);
        let entries = parse_entries(&html, &base);
        assert_eq!(entries.len(), 4);

        let first = entries[0].as_ref().unwrap();
        assert_eq!(first.title, "Золото растёт");
        assert_eq!(first.url, "https://news.example.com/news/1");
        assert_eq!(first.description, "описание");
        assert_eq!(first.raw_date, "07.01.2026 | 20:39");

        assert!(matches!(entries[1], Err(CrawlError::ElementExtraction { .. })));
        assert_eq!(entries[2].as_ref().unwrap().url, "https://other.example.com/x");
        assert!(matches!(entries[3], Err(CrawlError::ElementExtraction { .. })));
    }

    #[test]
    fn test_inline_markup_does_not_split_words() {
        let base = Url::parse(LISTING).unwrap();
        let html = listing(&[r#"<div class="b-item-cont">
              <a class="title" href="/n/1">Зол<b>ото</b> <i>дорожает</i></a>
              <div class="descr">
                Цены <span>на</span>  металл
              </div>
              <div class="date">07.01.2026 | <span>20:39</span></div>
            </div>"#
            .to_string()]);
        let entries = parse_entries(&html, &base);
        let entry = entries[0].as_ref().unwrap();

        assert_eq!(entry.title, "Золото дорожает");
        assert_eq!(entry.description, "Цены на металл");
        assert_eq!(entry.raw_date, "07.01.2026 | 20:39");
        assert!(contains_keyword(&entry.title, &keywords(&["золот"])));
    }

    #[test]
    fn test_scan_stops_at_first_entry_older_than_cutoff() {
        let cutoff = now() - chrono::Duration::days(365);
        let scan = scan_entries(
            vec![
                entry("gold new", "07.01.2026 | 20:00"),
                entry("gold old", "01.01.2020 | 10:00"),
                // Would pass the window, but sits after the old entry.
                entry("gold newer", "07.01.2026 | 20:30"),
            ],
            &keywords(&["gold"]),
            cutoff,
            UndatedPolicy::Keep,
        );
        assert!(scan.truncated);
        let titles: Vec<_> = scan.accepted.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["gold new"]);
    }

    #[test]
    fn test_scan_ignores_old_entries_without_keywords() {
        let cutoff = now() - chrono::Duration::days(365);
        let scan = scan_entries(
            vec![
                entry("copper old", "01.01.2020 | 10:00"),
                entry("gold new", "07.01.2026 | 20:00"),
            ],
            &keywords(&["gold"]),
            cutoff,
            UndatedPolicy::Keep,
        );
        assert!(!scan.truncated);
        assert_eq!(scan.accepted.len(), 1);
    }

    #[test]
    fn test_scan_undated_policy() {
        let cutoff = now() - chrono::Duration::hours(1);
        let entries = || {
            vec![
                entry("gold undated", "сегодня"),
                entry("gold dated", "07.01.2026 | 20:30"),
            ]
        };

        let kept = scan_entries(entries(), &keywords(&["gold"]), cutoff, UndatedPolicy::Keep);
        assert!(!kept.truncated);
        assert_eq!(kept.accepted.len(), 2);
        assert_eq!(
            kept.accepted[0].published_at,
            PublishedAt::Unparsed("сегодня".to_string())
        );

        let dropped = scan_entries(entries(), &keywords(&["gold"]), cutoff, UndatedPolicy::Drop);
        assert!(!dropped.truncated);
        assert_eq!(dropped.accepted.len(), 1);
        assert_eq!(dropped.accepted[0].title, "gold dated");
    }

    #[test]
    fn test_scan_skips_malformed_entries() {
        let cutoff = now() - chrono::Duration::days(365);
        let scan = scan_entries(
            vec![
                Err(CrawlError::ElementExtraction {
                    reason: "broken".to_string(),
                }),
                entry("gold ok", "07.01.2026 | 20:00"),
            ],
            &keywords(&["gold"]),
            cutoff,
            UndatedPolicy::Keep,
        );
        assert_eq!(scan.accepted.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_page_loads_bodies_for_survivors_only() {
        let html = listing(&[
            card("Золото дорожает", "/a", "", "07.01.2026 | 20:39"),
            card("Нефть дешевеет", "/b", "", "07.01.2026 | 20:10"),
            card("Золото падало", "/c", "", "01.01.2019 | 10:00"),
            card("Золото после отсечки", "/d", "", "07.01.2026 | 19:00"),
        ]);
        let fetcher = FakeFetcher::default()
            .with(LISTING, &html)
            .with("https://news.example.com/a", &article("Полный текст"));

        let request = CrawlRequest::backfill(LISTING, &["золот".to_string()], 5, 10);
        let cutoff = request.window.cutoff_from(now());
        let page = fetch_page(&fetcher, &request, 1, cutoff, Duration::ZERO)
            .await
            .unwrap();

        assert!(page.truncated);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].full_text, "Полный текст");
        assert!(!fetcher.requested("https://news.example.com/b"));
        assert!(!fetcher.requested("https://news.example.com/c"));
        assert!(!fetcher.requested("https://news.example.com/d"));
    }

    #[tokio::test]
    async fn test_fetch_page_article_failure_degrades_to_sentinel() {
        let html = listing(&[card("Gold rises", "/a", "", "07.01.2026 | 20:39")]);
        let fetcher = FakeFetcher::default().with(LISTING, &html);
        let request = CrawlRequest::backfill(LISTING, &["gold".to_string()], 5, 10);

        let page = fetch_page(&fetcher, &request, 1, request.window.cutoff_from(now()), Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].full_text, ARTICLE_LOAD_ERROR);
    }

    #[tokio::test]
    async fn test_fetch_page_reports_listing_failure() {
        let fetcher = FakeFetcher::default();
        let request = CrawlRequest::backfill(LISTING, &["gold".to_string()], 5, 10);
        let result = fetch_page(&fetcher, &request, 2, request.window.cutoff_from(now()), Duration::ZERO).await;
        assert!(matches!(result, Err(CrawlError::PageFetch { page: 2, .. })));
    }
}
