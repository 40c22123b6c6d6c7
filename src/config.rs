//! Runtime configuration.
//!
//! The whole application is driven by one immutable [`AppConfig`] built at
//! start-up: defaults, optionally replaced by a YAML file passed with
//! `--config`, then overridden by a handful of CLI flags. It is handed to the
//! crawler and the classifier by reference and never mutated afterwards.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument};

/// Desktop browser string sent with every search request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Top-level application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory that receives every CSV produced by a crawl.
    pub results_dir: PathBuf,
    /// Leading component of raw crawl file names.
    pub file_prefix: String,
    /// Whether to drop a second copy of each crawl file into `downloads_dir`.
    pub copy_to_downloads: bool,
    /// Destination of the optional second copy. Defaults to `$HOME/Downloads`.
    pub downloads_dir: Option<PathBuf>,
    /// Upper bound for any single HTTP request.
    pub request_timeout_secs: u64,
    /// Keywords crawled when none are given on the command line.
    pub default_keywords: Vec<String>,
    pub search: SearchConfig,
    pub crawl: CrawlConfig,
    pub llm: LlmConfig,
}

/// Shape of the search request sent to the source site.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub endpoint: String,
    pub user_agent: String,
    /// Ordered query parameters. `{query}` is replaced by the percent-encoded
    /// keyword and `{start}` by the 1-based result offset; every other value
    /// is sent literally.
    pub params: Vec<(String, String)>,
}

/// Pagination and fan-out limits for the crawl controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Highest page index that will ever be requested.
    pub max_pages: usize,
    /// Results per page; a page with fewer raw items is the last one.
    pub page_size: usize,
    pub max_items_per_keyword: usize,
    /// Number of keywords crawled at the same time.
    pub keyword_concurrency: usize,
}

/// Remote completion service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("results"),
            file_prefix: "naver_news".to_string(),
            copy_to_downloads: true,
            downloads_dir: None,
            request_timeout_secs: 30,
            default_keywords: [
                "코스맥스",
                "코스맥스엔비티",
                "콜마",
                "HK이노엔",
                "아모레퍼시픽",
                "LG생활건강",
                "올리브영",
                "화장품",
                "뷰티",
                "건강기능식품",
                "펫푸드",
                "마이크로바이옴",
                "식품의약품안전처",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            search: SearchConfig::default(),
            crawl: CrawlConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        let params = [
            ("where", "news"),
            ("sm", "tab_jum"),
            ("query", "{query}"),
            ("sort", "0"),
            ("pd", "-1"),
            ("start", "{start}"),
            ("nso", "so:r,p:all,a:all"),
        ];
        Self {
            endpoint: "https://search.naver.com/search.naver".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_pages: 20,
            page_size: 10,
            max_items_per_keyword: 50,
            keyword_concurrency: 1,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.3,
            max_tokens: 300,
        }
    }
}

impl AppConfig {
    /// Load the configuration from `path`, or fall back to the defaults.
    ///
    /// Keys missing from the file keep their default values.
    #[instrument(level = "info")]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            info!("No config file given; using defaults");
            return Ok(Self::default());
        };

        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Where the optional second copy goes, if copying is enabled and a
    /// destination can be determined.
    pub fn copy_dir(&self) -> Option<PathBuf> {
        if !self.copy_to_downloads {
            return None;
        }
        self.downloads_dir.clone().or_else(|| {
            std::env::var_os("HOME").map(|home| PathBuf::from(home).join("Downloads"))
        })
    }
}
