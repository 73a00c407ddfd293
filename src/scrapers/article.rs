//! Article body extractor.
//!
//! Loads one article page and pulls the plain-text body out of the first
//! known content container. It never fails: a network problem yields
//! [`ARTICLE_LOAD_ERROR`], a page without any known container (or with an
//! empty one) yields [`ARTICLE_NOT_FOUND`].

use super::HtmlFetcher;
use crate::utils::truncate_for_log;
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument, warn};

/// Body text used when the page loaded but no container matched.
pub const ARTICLE_NOT_FOUND: &str = "not found";

/// Body text used when the page could not be loaded.
pub const ARTICLE_LOAD_ERROR: &str = "load error";

/// Content containers, most specific first.
static CONTAINERS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["div.b-publication-text", "div.b-news-text", "article", "div.content"]
        .iter()
        .map(|s| Selector::parse(s).expect("container selector is valid"))
        .collect()
});

static BLOCKS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p, div").expect("block selector is valid"));

/// Fetch `url` and return its body text or a sentinel.
#[instrument(level = "info", skip(fetcher))]
pub async fn fetch_article_text<F: HtmlFetcher>(fetcher: &F, url: &str) -> String {
    match fetcher.fetch_html(url).await {
        Ok(html) => {
            let text = extract_article_text(&html);
            if text == ARTICLE_NOT_FOUND {
                warn!(%url, "No known article container matched");
            } else {
                debug!(%url, chars = text.chars().count(), preview = %truncate_for_log(&text, 80), "Extracted article text");
            }
            text
        }
        Err(e) => {
            warn!(%url, error = %e, "Article load failed");
            ARTICLE_LOAD_ERROR.to_string()
        }
    }
}

/// Extract body text from an article document.
///
/// Within the matched container every `p`/`div` descendant contributes its
/// text; fragments are trimmed, empty ones dropped, and the rest joined with
/// single spaces.
pub fn extract_article_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let Some(container) = CONTAINERS
        .iter()
        .find_map(|sel| document.select(sel).next())
    else {
        return ARTICLE_NOT_FOUND.to_string();
    };

    let text = container.select(&BLOCKS).filter_map(block_text).join(" ");
    if text.is_empty() {
        ARTICLE_NOT_FOUND.to_string()
    } else {
        text
    }
}

fn block_text(element: ElementRef<'_>) -> Option<String> {
    let text = element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .join(" ");
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::testing::FakeFetcher;

    #[test]
    fn test_prefers_most_specific_container() {
        let html = r#"
            <article><p>Generic article text</p></article>
            <div class="b-publication-text">
                <p>  Золото   дорожает </p>
                <p></p>
                <p>Второй <b>абзац</b></p>
            </div>"#;
        assert_eq!(extract_article_text(html), "Золото   дорожает Второй абзац");
    }

    #[test]
    fn test_falls_back_in_order() {
        let news_text = r#"<div class="b-news-text"><p>news text</p></div><div class="content"><p>content</p></div>"#;
        assert_eq!(extract_article_text(news_text), "news text");

        let article = r#"<div class="content"><p>content</p></div><article><div>from article</div></article>"#;
        assert_eq!(extract_article_text(article), "from article");

        let content = r#"<div class="content"><p>only content</p></div>"#;
        assert_eq!(extract_article_text(content), "only content");
    }

    #[test]
    fn test_no_known_container_is_not_found() {
        let html = r#"<html><body><section><p>Some text</p></section></body></html>"#;
        assert_eq!(extract_article_text(html), ARTICLE_NOT_FOUND);
    }

    #[test]
    fn test_empty_container_is_not_found() {
        let html = r#"<div class="b-publication-text">   </div>"#;
        assert_eq!(extract_article_text(html), ARTICLE_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_load_error() {
        let fetcher = FakeFetcher::default();
        let text = fetch_article_text(&fetcher, "https://example.com/gone").await;
        assert_eq!(text, ARTICLE_LOAD_ERROR);
    }

    #[tokio::test]
    async fn test_fetch_without_containers_is_not_found() {
        let fetcher = FakeFetcher::default().with(
            "https://example.com/a",
            "<html><body><main><p>text</p></main></body></html>",
        );
        let text = fetch_article_text(&fetcher, "https://example.com/a").await;
        assert_eq!(text, ARTICLE_NOT_FOUND);
    }
}
