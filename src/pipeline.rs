//! End-to-end runs behind the CLI subcommands.
//!
//! These functions never return errors. Every failure is folded into the
//! returned [`CrawlReport`] / [`EvaluationReport`], which `main` prints as
//! JSON.

use crate::api::{CompletionClient, OpenAiClient};
use crate::config::AppConfig;
use crate::crawler::Crawler;
use crate::error::EvaluateError;
use crate::models::{CrawlReport, EvaluationReport};
use crate::outputs::csv_store;
use crate::relevance::RelevanceClassifier;
use crate::scrapers::naver::{HttpPageFetcher, PageFetcher};
use crate::utils::{crawl_file_name, relative_to};
use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument, warn};

const NO_ITEMS: &str = "No news items found for the given keywords";

fn error_map(key: &str, message: impl ToString) -> Option<BTreeMap<String, String>> {
    Some(BTreeMap::from([(key.to_string(), message.to_string())]))
}

/// Crawl `keywords` over HTTP and save the records under `results_dir`.
#[instrument(level = "info", skip_all, fields(keywords = keywords.len(), max_items = max_items))]
pub async fn run_crawl(config: &AppConfig, keywords: &[String], max_items: usize) -> CrawlReport {
    let fetcher = match HttpPageFetcher::new(&config.search, config.request_timeout()) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            error!(error = %e, "Could not build HTTP client");
            return CrawlReport {
                success: false,
                message: format!("Error during crawling: {e}"),
                errors: error_map("crawling_error", &e),
                ..CrawlReport::default()
            };
        }
    };
    let crawler = Crawler::new(fetcher, config);
    crawl_and_save(&crawler, config, keywords, max_items, Local::now()).await
}

async fn crawl_and_save<F: PageFetcher>(
    crawler: &Crawler<F>,
    config: &AppConfig,
    keywords: &[String],
    max_items: usize,
    at: DateTime<Local>,
) -> CrawlReport {
    let result = crawler.crawl_keywords(keywords, max_items).await;
    let errors = (!result.errors.is_empty()).then_some(result.errors);

    if result.records.is_empty() {
        warn!("Crawl produced no records");
        return CrawlReport {
            success: false,
            message: NO_ITEMS.to_string(),
            errors,
            ..CrawlReport::default()
        };
    }

    let path = config
        .results_dir
        .join(crawl_file_name(&config.file_prefix, keywords, at));
    let copy_dir = config.copy_dir();
    let saved = match csv_store::write_records(&result.records, &path, copy_dir.as_deref()).await {
        Ok(saved) => saved,
        Err(e) => {
            return CrawlReport {
                success: false,
                message: "Failed to save crawler results".to_string(),
                errors: error_map("save_error", &e),
                ..CrawlReport::default()
            };
        }
    };

    let count = result.records.len();
    let mut message = format!("Successfully crawled {count} news items");
    if let Some(copy) = &saved.copy_path {
        let name = copy.file_name().unwrap_or_default().to_string_lossy();
        message.push_str(&format!(" and saved to your Downloads folder: {name}"));
    }
    info!(count, path = %saved.path.display(), "Crawl saved");

    CrawlReport {
        success: true,
        message,
        file_path: Some(relative_to(&saved.path, &config.results_dir)),
        download_path: saved.copy_path.map(|p| p.to_string_lossy().into_owned()),
        item_count: Some(count),
        keywords: Some(keywords.to_vec()),
        errors,
    }
}

/// Resolve a user-supplied file argument.
///
/// Relative paths name a file inside `results_dir`. A relative path that only
/// exists as given (e.g. `results/x.csv` typed from the project root) is used
/// as-is.
pub fn resolve_input(config: &AppConfig, file: &Path) -> PathBuf {
    if file.is_absolute() {
        return file.to_path_buf();
    }
    let inside = config.results_dir.join(file);
    if !inside.exists() && file.exists() {
        return file.to_path_buf();
    }
    inside
}

/// Evaluate the relevance of every article in `file` with the remote model.
#[instrument(level = "info", skip(config, api_key))]
pub async fn run_evaluation(
    config: &AppConfig,
    file: &Path,
    api_key: &str,
    model: Option<&str>,
) -> EvaluationReport {
    let client = match OpenAiClient::new(&config.llm, api_key, model, config.request_timeout()) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Could not build completion client");
            return EvaluationReport {
                success: false,
                message: format!("Error during relevance evaluation: {e}"),
                errors: error_map("evaluation_error", &e),
                ..EvaluationReport::default()
            };
        }
    };
    info!(model = client.model(), "Evaluating relevance");
    evaluate_with(&RelevanceClassifier::new(client), config, file).await
}

async fn evaluate_with<C: CompletionClient>(
    classifier: &RelevanceClassifier<C>,
    config: &AppConfig,
    file: &Path,
) -> EvaluationReport {
    let path = resolve_input(config, file);
    let display = file.display().to_string();

    match classifier.process_file(&path).await {
        Ok(outcome) => {
            let name = file.file_name().unwrap_or_default().to_string_lossy();
            EvaluationReport {
                success: true,
                message: format!("Successfully evaluated relevance for file: {name}"),
                file_path: Some(relative_to(&outcome.output_path, &config.results_dir)),
                stats: Some(outcome.stats),
                errors: None,
            }
        }
        Err(EvaluateError::NotFound(_)) => {
            warn!(path = %path.display(), "Input file not found");
            EvaluationReport {
                success: false,
                message: format!("File not found: {display}"),
                errors: error_map("file_error", "File not found"),
                ..EvaluationReport::default()
            }
        }
        Err(e) => {
            error!(error = %e, "Relevance evaluation failed");
            EvaluationReport {
                success: false,
                message: "Failed to process file for relevance evaluation".to_string(),
                errors: error_map("process_error", &e),
                ..EvaluationReport::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClassificationError;
    use crate::models::{ArticleRecord, EvaluatedRecord};
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn result_page(count: usize) -> String {
        let mut html = String::from(r#"<html><body><ul class="list_news">"#);
        for i in 0..count {
            html.push_str(&format!(
                r#"<li><a class="news_tit" href="https://n.news.naver.com/article/{i}">뷰티 기사 {i}</a><a class="info press">뷰티신문</a></li>"#
            ));
        }
        html.push_str("</ul></body></html>");
        html
    }

    fn config_for(server: &MockServer, results_dir: &Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.search.endpoint = format!("{}/search.naver", server.uri());
        config.results_dir = results_dir.to_path_buf();
        config.copy_to_downloads = false;
        config.request_timeout_secs = 5;
        config
    }

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 5, 6, 9, 30, 0).unwrap()
    }

    #[tokio::test]
    async fn test_crawl_saves_records_and_reports_relative_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("start", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(result_page(3)))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = config_for(&server, dir.path());
        let fetcher = HttpPageFetcher::new(&config.search, config.request_timeout()).unwrap();
        let crawler = Crawler::new(fetcher, &config);
        let keywords = vec!["뷰티".to_string()];

        let report = crawl_and_save(&crawler, &config, &keywords, 50, fixed_time()).await;
        assert!(report.success, "{report:?}");
        assert_eq!(report.message, "Successfully crawled 3 news items");
        assert_eq!(report.item_count, Some(3));
        assert_eq!(report.keywords, Some(keywords));
        assert!(report.errors.is_none());
        assert!(report.download_path.is_none());

        let file = report.file_path.unwrap();
        assert_eq!(file, "naver_news_뷰티_20250506_093000.csv");
        let saved: Vec<ArticleRecord> = csv_store::read_records(&dir.path().join(&file))
            .await
            .unwrap();
        assert_eq!(saved.len(), 3);
        assert_eq!(saved[2].title, "뷰티 기사 2");
        assert_eq!(saved[2].keyword, "뷰티");
    }

    #[tokio::test]
    async fn test_crawl_with_no_items_reports_failure_and_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = config_for(&server, dir.path());
        let report = run_crawl(&config, &["화장품".to_string()], 5).await;

        assert!(!report.success);
        assert_eq!(report.message, NO_ITEMS);
        assert!(report.file_path.is_none());
        let errors = report.errors.unwrap();
        assert!(errors["화장품"].contains("503"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_crawl_save_failure_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(result_page(2)))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        // results_dir is a regular file, so the save cannot create it
        let blocker = dir.path().join("results");
        std::fs::write(&blocker, "x").unwrap();
        let config = config_for(&server, &blocker);

        let report = run_crawl(&config, &["뷰티".to_string()], 5).await;
        assert!(!report.success);
        assert_eq!(report.message, "Failed to save crawler results");
        assert!(report.errors.unwrap().contains_key("save_error"));
    }

    struct CountingClient(AtomicUsize);

    impl CompletionClient for CountingClient {
        async fn complete(&self, _prompt: &str) -> Result<String, ClassificationError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok("적합성: false\n이유: 무관한 기사\n카테고리: 기타".to_string())
        }
    }

    async fn raw_file(dir: &Path, name: &str) {
        let records = vec![ArticleRecord {
            title: "식품 규제 강화".to_string(),
            url: "https://n.news.naver.com/article/1".to_string(),
            source: "Unknown".to_string(),
            date: "어제".to_string(),
            content: String::new(),
            keyword: "식약처".to_string(),
        }];
        csv_store::write_records(&records, &dir.join(name), None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_evaluation_resolves_relative_paths_against_results_dir() {
        let dir = tempfile::tempdir().unwrap();
        raw_file(dir.path(), "raw.csv").await;
        let mut config = AppConfig::default();
        config.results_dir = dir.path().to_path_buf();

        let client = CountingClient(AtomicUsize::new(0));
        let classifier = RelevanceClassifier::new(&client);
        let report = evaluate_with(&classifier, &config, Path::new("raw.csv")).await;
        assert!(report.success, "{report:?}");
        assert_eq!(report.message, "Successfully evaluated relevance for file: raw.csv");
        assert_eq!(report.file_path.as_deref(), Some("raw_evaluated.csv"));
        let stats = report.stats.unwrap();
        assert_eq!(stats.relevant_count, Some(0));
        assert!(!stats.already_processed);

        let written: Vec<EvaluatedRecord> =
            csv_store::read_records(&dir.path().join("raw_evaluated.csv"))
                .await
                .unwrap();
        assert_eq!(written[0].relevance_reason, "무관한 기사");

        let again = evaluate_with(&classifier, &config, Path::new("raw.csv")).await;
        assert!(again.stats.unwrap().already_processed);
        assert_eq!(client.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_evaluation_of_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.results_dir = dir.path().to_path_buf();

        let classifier = RelevanceClassifier::new(CountingClient(AtomicUsize::new(0)));
        let report = evaluate_with(&classifier, &config, Path::new("nope.csv")).await;
        assert!(!report.success);
        assert_eq!(report.message, "File not found: nope.csv");
        assert_eq!(report.errors.unwrap()["file_error"], "File not found");
    }
}
