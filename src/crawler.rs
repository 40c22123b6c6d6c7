//! Paginated crawl of Naver news search results.
//!
//! For one keyword the controller walks result pages `1, 2, …` and stops as
//! soon as any of these holds:
//!
//! - the requested number of records has been collected (the rest of the
//!   current page is discarded)
//! - a page yields fewer raw items than a full page (it was the last one)
//! - the page ceiling (`crawl.max_pages`, 20 by default) is reached
//! - a page cannot be fetched (non-success status, transport error or
//!   timeout); there is no retry
//!
//! Across keywords, every failure is confined to its own keyword and recorded
//! in [`CrawlResult::errors`].

use crate::config::{AppConfig, CrawlConfig, SearchConfig};
use crate::error::CrawlError;
use crate::models::{ArticleRecord, CrawlResult};
use crate::scrapers::extract::{extract_fields, extract_items};
use crate::scrapers::naver::{PageFetcher, build_search_url};
use futures::stream::{self, StreamExt};
use scraper::Html;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Drives pagination for one or many keywords over a [`PageFetcher`].
#[derive(Debug)]
pub struct Crawler<F> {
    fetcher: F,
    search: SearchConfig,
    limits: CrawlConfig,
    base: Option<Url>,
}

impl<F: PageFetcher> Crawler<F> {
    pub fn new(fetcher: F, config: &AppConfig) -> Self {
        let base = Url::parse(&config.search.endpoint).ok();
        Self {
            fetcher,
            search: config.search.clone(),
            limits: config.crawl.clone(),
            base,
        }
    }

    /// Crawl one keyword, returning at most `max_items` valid records in
    /// page order.
    ///
    /// # Errors
    ///
    /// - [`CrawlError::EmptyKeyword`] for a blank keyword
    /// - [`CrawlError::Fetch`] when a page fails before any record was
    ///   collected. A failure on a later page ends the crawl but keeps the
    ///   records gathered so far.
    #[instrument(level = "info", skip(self))]
    pub async fn crawl_keyword(
        &self,
        keyword: &str,
        max_items: usize,
    ) -> Result<Vec<ArticleRecord>, CrawlError> {
        if keyword.trim().is_empty() {
            return Err(CrawlError::EmptyKeyword);
        }

        let page_size = self.limits.page_size.max(1);
        let mut records: Vec<ArticleRecord> = Vec::new();
        let mut page = 0usize;

        while records.len() < max_items {
            page += 1;
            if page > self.limits.max_pages {
                info!(max_pages = self.limits.max_pages, "Page ceiling reached");
                break;
            }

            let url = build_search_url(&self.search, keyword, page, page_size);
            debug!(page, %url, "Requesting search page");

            let body = match self.fetcher.fetch(&url).await {
                Ok(body) => body,
                Err(e) => {
                    error!(page, error = %e, "Failed to fetch search page");
                    if records.is_empty() {
                        return Err(CrawlError::Fetch { page, source: e });
                    }
                    warn!(kept = records.len(), "Keeping records collected before the failure");
                    break;
                }
            };

            let (raw_count, candidates) = parse_page(&body, keyword, self.base.as_ref());
            if raw_count == 0 {
                warn!(page, "No news items on page");
                break;
            }

            let before = records.len();
            for record in candidates {
                if records.len() >= max_items {
                    break;
                }
                if record.is_valid() {
                    records.push(record);
                }
            }
            debug!(page, raw_count, kept = records.len() - before, "Processed page");

            if raw_count < page_size {
                info!(page, raw_count, "End of results reached");
                break;
            }
        }

        info!(count = records.len(), pages = page, "Crawled keyword");
        Ok(records)
    }

    /// Crawl every keyword, isolating failures per keyword.
    ///
    /// Up to `crawl.keyword_concurrency` keywords run at the same time.
    /// Records are returned grouped by keyword in input order, each group in
    /// page order.
    #[instrument(level = "info", skip_all, fields(keywords = keywords.len(), max_items = max_items))]
    pub async fn crawl_keywords<S: AsRef<str>>(&self, keywords: &[S], max_items: usize) -> CrawlResult {
        let concurrency = self.limits.keyword_concurrency.max(1);

        let outcomes: Vec<(String, Result<Vec<ArticleRecord>, CrawlError>)> =
            stream::iter(keywords.iter().map(|k| k.as_ref().to_string()))
                .map(|keyword| async move {
                    let outcome = self.crawl_keyword(&keyword, max_items).await;
                    (keyword, outcome)
                })
                .buffered(concurrency)
                .collect()
                .await;

        let mut result = CrawlResult::default();
        for (keyword, outcome) in outcomes {
            match outcome {
                Ok(records) => result.records.extend(records),
                Err(e) => {
                    error!(%keyword, error = %e, "Keyword crawl failed");
                    result.errors.insert(keyword, e.to_string());
                }
            }
        }

        info!(
            total = result.records.len(),
            failed = result.errors.len(),
            "Crawled all keywords"
        );
        result
    }
}

/// Parse one result page into `(raw item count, extracted records)`.
///
/// Kept synchronous so the parsed document never lives across an await.
fn parse_page(body: &str, keyword: &str, base: Option<&Url>) -> (usize, Vec<ArticleRecord>) {
    let document = Html::parse_document(body);
    let items = extract_items(&document);
    let records = items
        .iter()
        .map(|item| extract_fields(*item, base).into_record(keyword))
        .collect();
    (items.len(), records)
}
