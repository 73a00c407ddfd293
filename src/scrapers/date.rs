//! Listing date parser.
//!
//! The site prints dates as `07.01.2026 | 20:39` (day.month.year, 24h clock,
//! naive local time). Anything else is reported as unparseable so the caller
//! can log it and carry on; a malformed date never aborts a crawl.

use crate::error::CrawlError;
use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d{1,2})\.(\d{1,2})\.(\d{4})\s*\|\s*(\d{1,2}):(\d{2})\s*$")
        .expect("date pattern is valid")
});

/// Parse `DD.MM.YYYY | HH:MM` into a naive timestamp.
///
/// Returns [`CrawlError::DateUnparseable`] for a missing separator, wrong
/// field shapes, or out-of-range values such as `31.02.2026`.
pub fn parse_listing_date(raw: &str) -> Result<NaiveDateTime, CrawlError> {
    let unparseable = || CrawlError::DateUnparseable {
        raw: raw.to_string(),
    };

    let caps = DATE_RE.captures(raw).ok_or_else(unparseable)?;
    let field = |i: usize| -> Result<u32, CrawlError> {
        caps[i].parse::<u32>().map_err(|_| unparseable())
    };
    let year = caps[3].parse::<i32>().map_err(|_| unparseable())?;
    let (day, month, hour, minute) = (field(1)?, field(2)?, field(4)?, field(5)?);

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, 0))
        .ok_or_else(unparseable)
}
