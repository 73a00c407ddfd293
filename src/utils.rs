//! Utility functions for logging, identifier checks, and file system operations.
//!
//! This module provides helper functions used throughout the application:
//! - String truncation for log previews of titles and article bodies
//! - Validation of table names before they are spliced into SQL
//! - File system validation for output directories

use once_cell::sync::Lazy;
use regex::Regex;
use std::fs as stdfs;
use std::io;
use tokio::fs;
use tracing::{info, instrument};

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z_][a-z0-9_]{0,62}$").expect("identifier pattern is valid"));

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and a count of
/// the dropped characters appended. Cuts on a `char` boundary, so Cyrillic
/// titles are safe.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 chars)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => {
            let dropped = s[cut..].chars().count();
            format!("{}…(+{} chars)", &s[..cut], dropped)
        }
    }
}

/// `true` for lowercase SQL identifiers such as `gold_news`.
pub fn is_plain_identifier(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then creates and immediately
/// deletes a probe file.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> io::Result<()> {
    fs::create_dir_all(path).await?;
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Output directory is writable");
    Ok(())
}
