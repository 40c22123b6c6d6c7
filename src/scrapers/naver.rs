//! Naver news search page retrieval.
//!
//! The search URL is built deterministically from the keyword and page
//! index; its parameter list lives in [`SearchConfig`] because it tracks
//! Naver's current query contract. Only the pagination arithmetic is fixed
//! here: page `n` starts at result `(n - 1) * page_size + 1`.

use crate::config::SearchConfig;
use crate::error::FetchError;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Source of raw search result markup.
///
/// Implemented over HTTP by [`HttpPageFetcher`]; tests substitute canned pages.
pub trait PageFetcher {
    /// Fetch the page at `url` and return its body.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// 1-based offset of the first result on `page`.
pub fn start_offset(page: usize, page_size: usize) -> usize {
    page.saturating_sub(1) * page_size + 1
}

/// Build the search URL for `keyword` at `page`.
///
/// `{query}` in a parameter value becomes the percent-encoded keyword and
/// `{start}` the result offset. Every other value is passed through as-is.
///
/// # Examples
///
/// ```ignore
/// let url = build_search_url(&SearchConfig::default(), "코스맥스", 2, 10);
/// assert!(url.contains("start=11"));
/// ```
pub fn build_search_url(search: &SearchConfig, keyword: &str, page: usize, page_size: usize) -> String {
    let query = urlencoding::encode(keyword);
    let start = start_offset(page, page_size).to_string();
    let params = search
        .params
        .iter()
        .map(|(key, value)| {
            let value = value.replace("{query}", &query).replace("{start}", &start);
            format!("{key}={value}")
        })
        .collect::<Vec<_>>()
        .join("&");
    format!("{}?{}", search.endpoint, params)
}

/// [`PageFetcher`] backed by a shared `reqwest` client.
///
/// Every request carries the configured desktop `User-Agent` and is bounded
/// by the configured timeout; a timeout surfaces as [`FetchError::Transport`].
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new(search: &SearchConfig, timeout: Duration) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        match HeaderValue::from_str(&search.user_agent) {
            Ok(value) => {
                headers.insert(USER_AGENT, value);
            }
            Err(e) => warn!(error = %e, "Invalid User-Agent in config; sending client default"),
        }
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpPageFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let t0 = Instant::now();
        let parsed = url::Url::parse(url)?;
        let response = self.client.get(parsed).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.text().await?;
        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched search page"
        );
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_start_offset() {
        assert_eq!(start_offset(1, 10), 1);
        assert_eq!(start_offset(2, 10), 11);
        assert_eq!(start_offset(20, 10), 191);
    }

    #[test]
    fn test_build_search_url_default_contract() {
        let url = build_search_url(&SearchConfig::default(), "코스맥스", 3, 10);
        assert_eq!(
            url,
            "https://search.naver.com/search.naver?where=news&sm=tab_jum&query=%EC%BD%94%EC%8A%A4%EB%A7%A5%EC%8A%A4&sort=0&pd=-1&start=21&nso=so:r,p:all,a:all"
        );
    }

    #[test]
    fn test_build_search_url_encodes_only_the_keyword() {
        let search = SearchConfig {
            endpoint: "http://localhost/s".to_string(),
            user_agent: String::new(),
            params: vec![
                ("q".to_string(), "{query}".to_string()),
                ("opt".to_string(), "a:b,c".to_string()),
                ("start".to_string(), "{start}".to_string()),
            ],
        };
        assert_eq!(
            build_search_url(&search, "LG 생활&건강", 1, 10),
            "http://localhost/s?q=LG%20%EC%83%9D%ED%99%9C%26%EA%B1%B4%EA%B0%95&opt=a:b,c&start=1"
        );
    }

    fn search_for(server: &MockServer) -> SearchConfig {
        SearchConfig {
            endpoint: format!("{}/search.naver", server.uri()),
            ..SearchConfig::default()
        }
    }

    #[tokio::test]
    async fn test_fetch_sends_user_agent_and_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.naver"))
            .and(query_param("start", "11"))
            .and(header_exists("user-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let search = search_for(&server);
        let fetcher = HttpPageFetcher::new(&search, Duration::from_secs(5)).unwrap();
        let body = fetcher
            .fetch(&build_search_url(&search, "뷰티", 2, 10))
            .await
            .unwrap();
        assert_eq!(body, "<html>ok</html>");
    }

    #[tokio::test]
    async fn test_fetch_non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let search = search_for(&server);
        let fetcher = HttpPageFetcher::new(&search, Duration::from_secs(5)).unwrap();
        let err = fetcher
            .fetch(&build_search_url(&search, "뷰티", 1, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let search = search_for(&server);
        let fetcher = HttpPageFetcher::new(&search, Duration::from_millis(200)).unwrap();
        let err = fetcher
            .fetch(&build_search_url(&search, "뷰티", 1, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Transport(ref e) if e.is_timeout()));
    }
}
