//! Command-line interface definitions for Metal News.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Connection settings can also come from the environment (or `.env`).

use clap::{Args, Parser, Subcommand};

/// Command-line arguments for the Metal News crawler.
///
/// # Examples
///
/// ```sh
/// # Five-year backfill of every topic into Postgres, streaming CSV copies
/// metal_news --database-url postgres://localhost/metals backfill --csv-dir ./csv
///
/// # Hourly poll (run from cron or a systemd timer) into JSON files
/// metal_news poll --json-output-dir ./json
///
/// # Custom topics
/// metal_news --config topics.yaml backfill --topic gold --max-pages 2
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config with topics and crawl settings
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Postgres URL; when absent, items are written as JSON files
    #[arg(long, env = "DATABASE_URL", global = true)]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Crawl the full listing history back to the year window
    Backfill(BackfillArgs),
    /// Check page 1 for items from the last few hours
    Poll(PollArgs),
}

#[derive(Args, Debug)]
pub struct BackfillArgs {
    /// Topics to crawl (repeatable); all configured topics by default
    #[arg(short, long = "topic")]
    pub topics: Vec<String>,

    /// How many years back to go
    #[arg(long)]
    pub years: Option<u32>,

    /// Page budget per topic
    #[arg(long)]
    pub max_pages: Option<u32>,

    /// Directory for per-topic CSV files written page by page
    #[arg(long)]
    pub csv_dir: Option<String>,

    /// Output directory for JSON files (used without a database)
    #[arg(short, long, default_value = "./news_json")]
    pub json_output_dir: String,
}

#[derive(Args, Debug)]
pub struct PollArgs {
    /// Topics to poll (repeatable); all configured topics by default
    #[arg(short, long = "topic")]
    pub topics: Vec<String>,

    /// Window size in hours
    #[arg(long)]
    pub hours: Option<u32>,

    /// Output directory for JSON files (used without a database)
    #[arg(short, long, default_value = "./news_json")]
    pub json_output_dir: String,
}
