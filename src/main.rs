//! # Metal News
//!
//! Collects keyword-filtered commodity news (gold, silver, copper) from a
//! paginated news listing and hands it to a store.
//!
//! ## Usage
//!
//! ```sh
//! metal_news backfill --csv-dir ./csv      # bulk historical crawl
//! metal_news poll                          # last hour, page 1 only
//! ```
//!
//! ## Architecture
//!
//! 1. **Listing**: Walk listing pages, keep cards whose title or description
//!    contains a topic keyword, stop at the date cutoff
//! 2. **Articles**: Load the full body of each kept card, one at a time
//! 3. **Output**: Insert the batch into Postgres, or write it as JSON
//!
//! `poll` runs once and exits; schedule it externally (hourly).

use clap::Parser;
use std::error::Error;
use tracing::{error, info, instrument, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod cli;
mod config;
mod error;
mod models;
mod outputs;
mod scrapers;
mod utils;

use cli::{BackfillArgs, Cli, Command, PollArgs};
use config::{AppConfig, Topic};
use error::SinkError;
use models::{CrawlRequest, NewsItem};
use outputs::csv::CsvRowSink;
use outputs::json::JsonNewsSink;
use outputs::postgres::PgNewsSink;
use outputs::{NewsSink, RowSink};
use scrapers::crawler::Crawler;
use scrapers::HttpFetcher;
use utils::ensure_writable_dir;

/// The store chosen at startup, built once and shared by every topic.
enum Store {
    Postgres(PgNewsSink),
    Json(JsonNewsSink),
}

impl Store {
    async fn open(database_url: Option<&str>, json_output_dir: &str) -> Result<Self, SinkError> {
        match database_url {
            Some(url) => {
                info!("Connecting to Postgres");
                Ok(Store::Postgres(PgNewsSink::connect(url).await?))
            }
            None => {
                info!(path = %json_output_dir, "No database configured; writing JSON files");
                Ok(Store::Json(JsonNewsSink::new(json_output_dir)))
            }
        }
    }

    async fn store(&self, topic: &Topic, items: &[NewsItem]) -> Result<u64, SinkError> {
        match self {
            Store::Postgres(sink) => sink.store(&topic.table, items).await,
            Store::Json(sink) => sink.store(&topic.name, items).await,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!(error = %e, "No .env loaded");
    }

    let start_time = std::time::Instant::now();
    let args = Cli::parse();
    let config = AppConfig::load(args.config.as_deref())?;

    let fetcher = HttpFetcher::new(config.crawl.request_timeout())?;
    let crawler = Crawler::new(fetcher, config.crawl.politeness());

    let failed = match args.command {
        Command::Backfill(cmd) => {
            let store = Store::open(args.database_url.as_deref(), &cmd.json_output_dir).await?;
            run_backfill(&crawler, &store, &config, &cmd).await?
        }
        Command::Poll(cmd) => {
            let store = Store::open(args.database_url.as_deref(), &cmd.json_output_dir).await?;
            run_poll(&crawler, &store, &config, &cmd).await?
        }
    };

    let elapsed = start_time.elapsed();
    info!(?elapsed, secs = elapsed.as_secs(), failed, "Execution complete");

    if failed > 0 {
        return Err(format!("{failed} topic(s) could not be stored").into());
    }
    Ok(())
}

#[instrument(level = "info", skip_all)]
async fn run_backfill(
    crawler: &Crawler<HttpFetcher>,
    store: &Store,
    config: &AppConfig,
    cmd: &BackfillArgs,
) -> Result<usize, Box<dyn Error>> {
    let years = config.crawl.backfill_window(cmd.years)?;
    let max_pages = cmd.max_pages.unwrap_or(config.crawl.backfill_max_pages);

    if let Some(dir) = &cmd.csv_dir {
        ensure_writable_dir(dir).await?;
    }

    let mut failed = 0usize;
    for topic in config.select_topics(&cmd.topics)? {
        info!(topic = %topic.name, years, max_pages, "Backfilling topic");
        let request = CrawlRequest::backfill(&topic.listing_url, &topic.keywords, years, max_pages);

        let mut csv_sink = match &cmd.csv_dir {
            Some(dir) => {
                let path = format!("{}/{}.csv", dir.trim_end_matches('/'), topic.table);
                Some(CsvRowSink::create(&path)?)
            }
            None => None,
        };
        let rows = csv_sink.as_mut().map(|s| s as &mut dyn RowSink);
        let report = crawler.backfill(&request, rows).await;

        if let Some(sink) = csv_sink {
            let rows_written = sink.rows_written();
            match sink.into_inner() {
                Ok(_) => info!(topic = %topic.name, rows = rows_written, "CSV copy complete"),
                Err(e) => warn!(topic = %topic.name, error = %e, "Failed to close CSV file"),
            }
        }

        if report.items.is_empty() {
            info!(topic = %topic.name, "Nothing collected");
            continue;
        }
        match store.store(topic, &report.items).await {
            Ok(n) => info!(topic = %topic.name, stored = n, ?report.stop_reason, "Topic stored"),
            Err(e) => {
                error!(topic = %topic.name, error = %e, "Failed to store topic");
                failed += 1;
            }
        }
    }
    Ok(failed)
}

#[instrument(level = "info", skip_all)]
async fn run_poll(
    crawler: &Crawler<HttpFetcher>,
    store: &Store,
    config: &AppConfig,
    cmd: &PollArgs,
) -> Result<usize, Box<dyn Error>> {
    let hours = config.crawl.poll_window(cmd.hours)?;

    let mut failed = 0usize;
    for topic in config.select_topics(&cmd.topics)? {
        let items = crawler
            .poll_recent(&topic.listing_url, &topic.keywords, hours)
            .await;
        if items.is_empty() {
            info!(topic = %topic.name, hours, "No new items");
            continue;
        }
        match store.store(topic, &items).await {
            Ok(n) => info!(topic = %topic.name, stored = n, "Topic updated"),
            Err(e) => {
                warn!(topic = %topic.name, error = %e, "Failed to store new items");
                failed += 1;
            }
        }
    }
    Ok(failed)
}
