//! Data models for scraped articles, classification verdicts and run reports.
//!
//! - [`ArticleRecord`]: one search result as extracted from the result page
//! - [`EvaluatedRecord`]: an article plus its relevance verdict and category
//! - [`Category`] / [`Verdict`]: the classification output
//! - [`CrawlResult`]: records and per-keyword failures of a multi-keyword run
//! - [`CrawlReport`] / [`EvaluationReport`]: the structured outcomes printed by the CLI
//!
//! Field order of the CSV-facing structs is the column order on disk.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Title used when no title selector matches.
pub const UNTITLED: &str = "제목 없음";
/// Source and date placeholder.
pub const UNKNOWN: &str = "Unknown";

/// A single news search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub title: String,
    /// Absolute article link; empty when it could not be resolved.
    pub url: String,
    #[serde(default = "unknown")]
    pub source: String,
    #[serde(default = "unknown")]
    pub date: String,
    #[serde(default)]
    pub content: String,
    /// The search keyword that produced this record.
    #[serde(default)]
    pub keyword: String,
}

fn unknown() -> String {
    UNKNOWN.to_string()
}

impl ArticleRecord {
    /// Records without a title or a link are dropped by the crawler.
    pub fn is_valid(&self) -> bool {
        !self.title.is_empty() && !self.url.is_empty()
    }
}

/// Article classification, in descending priority.
///
/// On disk each category is stored under its Korean label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// Articles that mention the company itself.
    #[serde(rename = "자사 언급기사")]
    SelfMention,
    /// Articles about other cosmetics companies.
    #[serde(rename = "업계 관련기사")]
    IndustryRelated,
    /// Health supplements, pet food and food regulation.
    #[serde(rename = "건강기능식품·펫푸드")]
    HealthFoodPet,
    #[serde(rename = "기타")]
    Other,
}

impl Category {
    /// All categories from highest to lowest priority.
    pub const PRIORITY: [Category; 4] = [
        Category::SelfMention,
        Category::IndustryRelated,
        Category::HealthFoodPet,
        Category::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::SelfMention => "자사 언급기사",
            Category::IndustryRelated => "업계 관련기사",
            Category::HealthFoodPet => "건강기능식품·펫푸드",
            Category::Other => "기타",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::PRIORITY
            .into_iter()
            .find(|category| category.label() == label.trim())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of classifying one article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub is_relevant: bool,
    pub reason: String,
    pub category: Category,
}

impl Verdict {
    /// The verdict used whenever classification fails.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            is_relevant: false,
            reason: reason.into(),
            category: Category::Other,
        }
    }
}

/// An article with its relevance verdict, as written to `*_evaluated.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluatedRecord {
    pub title: String,
    pub url: String,
    pub source: String,
    pub date: String,
    pub content: String,
    pub keyword: String,
    pub is_relevant: bool,
    pub relevance_reason: String,
    pub category: Category,
}

impl EvaluatedRecord {
    pub fn new(article: ArticleRecord, verdict: Verdict) -> Self {
        Self {
            title: article.title,
            url: article.url,
            source: article.source,
            date: article.date,
            content: article.content,
            keyword: article.keyword,
            is_relevant: verdict.is_relevant,
            relevance_reason: verdict.reason,
            category: verdict.category,
        }
    }
}

/// Aggregate of one multi-keyword crawl.
#[derive(Debug, Default)]
pub struct CrawlResult {
    pub records: Vec<ArticleRecord>,
    /// Failed keyword → error message. Such keywords contributed no records.
    pub errors: BTreeMap<String, String>,
}

/// Statistics over a tabular file.
///
/// Blocks whose source column is absent are omitted entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileStatistics {
    pub total_rows: usize,
    pub total_columns: usize,
    pub column_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword_counts: Option<BTreeMap<String, usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevant_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevant_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_counts: Option<BTreeMap<String, usize>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub already_processed: bool,
}

/// Structured outcome of `crawl`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlReport {
    pub success: bool,
    pub message: String,
    /// Saved file, relative to the results directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, String>>,
}

/// Structured outcome of `evaluate`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<FileStatistics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, String>>,
}
