//! # Naver News Scraper
//!
//! Crawls Naver news search results for a list of keywords, saves the
//! articles as CSV, and classifies them for relevance to the cosmetics
//! industry with an OpenAI-compatible chat model.
//!
//! ## Usage
//!
//! ```sh
//! naver_news_scraper crawl 코스맥스 화장품 --max-items 30
//! naver_news_scraper evaluate naver_news_코스맥스_화장품_20250506_093000.csv --api-key sk-...
//! naver_news_scraper stats naver_news_코스맥스_화장품_20250506_093000_evaluated.csv
//! ```
//!
//! ## Architecture
//!
//! 1. **Crawling**: page through search results per keyword ([`crawler`])
//! 2. **Extraction**: resolve fields through selector fallback chains ([`scrapers`])
//! 3. **Storage**: write UTF-8 (BOM) CSV files ([`outputs::csv_store`])
//! 4. **Classification**: one completion call per article ([`relevance`])
//!
//! Logs go to stderr; every subcommand prints its JSON result on stdout.

use clap::Parser;
use serde::Serialize;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod crawler;
mod error;
mod models;
mod outputs;
mod pipeline;
mod relevance;
mod scrapers;
mod utils;

use cli::{Cli, Command};
use config::AppConfig;
use outputs::csv_store;
use pipeline::resolve_input;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let args = Cli::parse();
    debug!(config = ?args.config, results_dir = ?args.results_dir, no_copy = args.no_copy, "Parsed CLI arguments");

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(dir) = args.results_dir {
        config.results_dir = dir;
    }
    if args.no_copy {
        config.copy_to_downloads = false;
    }

    match args.command {
        Command::Crawl {
            keywords,
            max_items,
        } => {
            let keywords = if keywords.is_empty() {
                info!(count = config.default_keywords.len(), "Using default keywords");
                config.default_keywords.clone()
            } else {
                keywords
            };
            let max_items = max_items.unwrap_or(config.crawl.max_items_per_keyword);

            if let Err(e) = ensure_writable_dir(&config.results_dir).await {
                error!(
                    path = %config.results_dir.display(),
                    error = %e,
                    "Results directory is not writable (fix perms or choose a different path)"
                );
                return Err(e);
            }

            let report = pipeline::run_crawl(&config, &keywords, max_items).await;
            print_json(&report)?;
            if !report.success {
                return Err(report.message.into());
            }
        }
        Command::Evaluate {
            file,
            api_key,
            model,
        } => {
            let report =
                pipeline::run_evaluation(&config, &file, &api_key, model.as_deref()).await;
            print_json(&report)?;
            if !report.success {
                return Err(report.message.into());
            }
        }
        Command::Stats { file } => {
            let stats = csv_store::statistics(&resolve_input(&config, &file)).await?;
            print_json(&stats)?;
        }
        Command::Files => {
            let files = csv_store::list_files(&config.results_dir).await?;
            info!(count = files.len(), "Listed result files");
            print_json(&files)?;
        }
        Command::Preview { file, rows } => {
            let preview = csv_store::preview(&resolve_input(&config, &file), rows).await?;
            print_json(&preview)?;
        }
    }

    info!(
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "naver_news_scraper finished"
    );
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
