//! Command-line interface definitions.
//!
//! Global options tune where results go; each subcommand maps onto one
//! pipeline operation or store query.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Naver news keyword crawler with LLM relevance classification.
///
/// # Examples
///
/// ```sh
/// # Crawl the configured default keywords
/// naver_news_scraper crawl
///
/// # Crawl two keywords, 20 articles each, without the Downloads copy
/// naver_news_scraper --no-copy crawl 코스맥스 화장품 --max-items 20
///
/// # Classify a saved crawl
/// OPENAI_API_KEY=sk-... naver_news_scraper evaluate naver_news_코스맥스_20250506_093000.csv
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long, global = true, env = "NAVER_NEWS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory that crawl results are written to and read from
    #[arg(short, long, global = true, env = "NAVER_NEWS_RESULTS_DIR")]
    pub results_dir: Option<PathBuf>,

    /// Do not copy saved crawl results into the Downloads folder
    #[arg(long, global = true)]
    pub no_copy: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Crawl news for keywords and save them as CSV
    Crawl {
        /// Search keywords; the configured defaults when omitted
        keywords: Vec<String>,

        /// Maximum articles per keyword
        #[arg(short = 'n', long)]
        max_items: Option<usize>,
    },

    /// Classify every article of a saved crawl
    Evaluate {
        /// CSV file, relative to the results directory or absolute
        file: PathBuf,

        /// OpenAI API key
        #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
        api_key: String,

        /// Model name; the configured model when omitted
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Print statistics for a CSV file
    Stats { file: PathBuf },

    /// List CSV files in the results directory
    Files,

    /// Print the first rows of a CSV file
    Preview {
        file: PathBuf,

        #[arg(long, default_value_t = 5)]
        rows: usize,
    },
}
