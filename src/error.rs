//! Error taxonomy for the scrape → store → evaluate pipeline.
//!
//! None of these errors is allowed to end a multi-keyword crawl or a
//! multi-record evaluation. They are caught at the nearest boundary (one
//! keyword, one record, one file) and turned into report values by
//! [`crate::pipeline`].
//!
//! Extraction misses have no error type: a field that no selector matches
//! degrades to its placeholder value instead.

use std::path::PathBuf;
use thiserror::Error;

/// Failure while retrieving one search result page.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("search page returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid search URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Failure of a single keyword's crawl.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("keyword is empty")]
    EmptyKeyword,

    #[error("page {page} could not be fetched: {source}")]
    Fetch {
        page: usize,
        #[source]
        source: FetchError,
    },
}

/// Failure reading or writing a tabular (CSV) file.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no records to write")]
    EmptyInput,

    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("file has no data rows: {}", .0.display())]
    EmptyFile(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Failure of one completion request.
#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("API 오류: {0}")]
    Status(u16),

    #[error("요청 처리 중 오류: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("요청 처리 중 오류: completion text missing from response")]
    MissingContent,
}

/// Failure of a whole-file evaluation.
#[derive(Debug, Error)]
pub enum EvaluateError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("file has no rows to evaluate: {}", .0.display())]
    EmptyInput(PathBuf),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failure loading the YAML configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
