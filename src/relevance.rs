//! Relevance classification of crawled articles.
//!
//! Every article is sent to a chat-completion model with a fixed Korean
//! prompt that asks two things: whether the article is worth forwarding to
//! cosmetics R&D / ODM staff, and which of four [`Category`] values it
//! belongs to. The free-text answer is parsed by [`parse_verdict`], which
//! tolerates answers that ignore the requested format.
//!
//! Classification never fails: remote errors degrade to
//! [`Verdict::failed`] with the error message as the reason.

use crate::api::CompletionClient;
use crate::error::{EvaluateError, StoreError};
use crate::models::{ArticleRecord, Category, EvaluatedRecord, FileStatistics, Verdict};
use crate::outputs::csv_store;
use crate::utils::{evaluated_path, truncate_for_log};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

/// Reason stored when the answer gives none.
pub const MISSING_REASON: &str = "이유가 명확히 제시되지 않음";

static RELEVANCE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)적합성:\s*(true|false)").expect("relevance pattern is a valid regex"));
static REASON_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"이유:\s*(.+)").expect("reason pattern is a valid regex"));
static CATEGORY_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"카테고리:\s*(자사 언급기사|업계 관련기사|건강기능식품·펫푸드|기타)")
        .expect("category pattern is a valid regex")
});

/// Keyword fallback when the answer has no `카테고리:` line, checked in order.
const CATEGORY_RULES: &[(&[&str], Category)] = &[
    (&["자사", "코스맥스"], Category::SelfMention),
    (&["업계", "화장품"], Category::IndustryRelated),
    (&["건강", "펫", "식품"], Category::HealthFoodPet),
];

/// The classification prompt for `article`.
pub fn build_prompt(article: &ArticleRecord) -> String {
    format!(
        r#"당신은 화장품 업계 정보 분석가입니다. 아래의 기사를 분석하여 적합성과 카테고리를 판단해주세요.

제목: {title}
출처: {source}
날짜: {date}
내용: {content}
검색 키워드: {keyword}

### 첫 번째 태스크: 적합성 판단 ###
이 기사가 화장품 연구원이나 화장품 ODM 기업 임직원에게 전달해도 될만한 가치가 있는지 평가해주세요.

중요: 제목과 내용을 모두 면밀히 검토하여 다음 기준에 따라 판단해주세요.

1. 화장품 업계 트렌드나 시장 현황을 제공하는지
2. 화장품 원료나 기술에 관한 정보를 담고 있는지
3. 경쟁사나 산업 내 중요한 변화를 담고 있는지
4. 규제나 법적 변경사항에 대한 정보를 포함하는지
5. 화장품 연구 개발이나 제조에 영향을 줄 수 있는 내용인지
6. 화장품 ODM 기업 활동이나 전략에 대한 정보를 담고 있는지
7. 화장품 산업 내 협업이나 인수합병 정보를 포함하는지
8. 화장품 회사들의 실적이나 주가 정보를 담고 있는지
9. 유의미한 국제 무역이나 관세 정책 정보를 담고 있는지

위 항목 중 하나라도 해당된다면 가치가 있다고 판단하고 True로, 그렇지 않다면 False로 응답해주세요.

### 두 번째 태스크: 카테고리 분류 ###
기사의 내용을 기반으로 다음 4가지 카테고리 중 하나로 분류해주세요:

1. 자사 언급기사: 코스맥스(회사명 "코스맥스", "Cosmax", "코스맥스비티아이" 등)가 직접 언급된 기사
2. 업계 관련기사: 코스맥스 외 화장품 회사(특히 화장품 제조회사)에 관한 기사 (예: 한국콜마, 아모레퍼시픽, LG생활건강, 코스메카코리아 등)
3. 건강기능식품·펫푸드: 건강기능식품, 영양제, 펫푸드, 마이크로바이옴, 식품의약품안전처 관련 기사
4. 기타: 위 세 카테고리에 해당하지 않는 기사 (예: K유통, 일반 소비재 등)

기사가 여러 카테고리에 해당할 경우, 더 높은 우선순위의 카테고리를 선택하세요 (우선순위: 자사 언급기사 > 업계 관련기사 > 건강기능식품·펫푸드 > 기타).

응답 형식:
적합성: [true/false]
이유: [간략한 이유 설명]
카테고리: [자사 언급기사/업계 관련기사/건강기능식품·펫푸드/기타]

위 형식에 맞게 답변해주세요."#,
        title = article.title,
        source = article.source,
        date = article.date,
        content = article.content,
        keyword = article.keyword,
    )
}

/// Parse a model answer into a [`Verdict`].
///
/// Explicit `적합성:` / `이유:` / `카테고리:` lines win. Without them the
/// relevance is `true` whenever the text mentions "true" at all, the reason is
/// [`MISSING_REASON`], and the category comes from [`CATEGORY_RULES`].
pub fn parse_verdict(text: &str) -> Verdict {
    let lower = text.to_lowercase();

    let is_relevant = match RELEVANCE_LINE.captures(text) {
        Some(caps) => caps[1].eq_ignore_ascii_case("true"),
        None => lower.contains("true"),
    };

    let reason = REASON_LINE
        .captures(text)
        .map(|caps| caps[1].trim().to_string())
        .filter(|reason| !reason.is_empty())
        .unwrap_or_else(|| MISSING_REASON.to_string());

    let category = CATEGORY_LINE
        .captures(text)
        .and_then(|caps| Category::from_label(&caps[1]))
        .unwrap_or_else(|| infer_category(&lower));

    Verdict {
        is_relevant,
        reason,
        category,
    }
}

fn infer_category(lower: &str) -> Category {
    CATEGORY_RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| lower.contains(n)))
        .map(|(_, category)| *category)
        .unwrap_or(Category::Other)
}

/// Result of [`RelevanceClassifier::process_file`].
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationOutcome {
    /// The evaluated file; the input itself when it was already evaluated.
    pub output_path: PathBuf,
    pub stats: FileStatistics,
}

/// Classifies articles one at a time through a [`CompletionClient`].
#[derive(Debug)]
pub struct RelevanceClassifier<C> {
    client: C,
}

impl<C: CompletionClient> RelevanceClassifier<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Classify one article. Remote failures become a failed verdict.
    #[instrument(level = "debug", skip_all, fields(title = %truncate_for_log(&article.title, 40)))]
    pub async fn classify(&self, article: &ArticleRecord) -> Verdict {
        let prompt = build_prompt(article);
        match self.client.complete(&prompt).await {
            Ok(answer) => {
                debug!(answer = %truncate_for_log(&answer, 200), "Model answer");
                parse_verdict(&answer)
            }
            Err(e) => {
                warn!(error = %e, "Classification failed; using default verdict");
                Verdict::failed(e.to_string())
            }
        }
    }

    /// Evaluate every record of the CSV at `path` into `<stem>_evaluated.csv`.
    ///
    /// Files that are already evaluated, or whose evaluated sibling already
    /// exists and is complete, are returned as-is without any model calls.
    ///
    /// # Errors
    ///
    /// - [`EvaluateError::NotFound`] when `path` does not exist
    /// - [`EvaluateError::EmptyInput`] when it has no records
    /// - [`EvaluateError::Store`] when reading or writing fails
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn process_file(&self, path: &Path) -> Result<EvaluationOutcome, EvaluateError> {
        if !exists(path).await? {
            return Err(EvaluateError::NotFound(path.to_path_buf()));
        }

        let table = csv_store::read_table(path).await?;
        if table.is_fully_evaluated() {
            info!("File already evaluated; skipping");
            return Ok(already_processed(path, table.statistics()));
        }

        let output = evaluated_path(path);
        if exists(&output).await? {
            let prior = csv_store::read_table(&output).await?;
            if prior.is_fully_evaluated() {
                info!(output = %output.display(), "Evaluated copy already exists; skipping");
                return Ok(already_processed(&output, prior.statistics()));
            }
            debug!(output = %output.display(), "Incomplete evaluated copy will be replaced");
        }

        let articles: Vec<ArticleRecord> = csv_store::read_records(path).await?;
        if articles.is_empty() {
            return Err(EvaluateError::EmptyInput(path.to_path_buf()));
        }

        let t0 = Instant::now();
        let total = articles.len();
        let mut evaluated = Vec::with_capacity(total);
        for (idx, article) in articles.into_iter().enumerate() {
            if idx % 10 == 0 {
                info!(current = idx + 1, total, "Evaluating articles");
            }
            let verdict = self.classify(&article).await;
            evaluated.push(EvaluatedRecord::new(article, verdict));
        }

        csv_store::write_records(&evaluated, &output, None).await?;
        let stats = csv_store::statistics(&output).await?;
        info!(
            output = %output.display(),
            total,
            relevant = stats.relevant_count.unwrap_or(0),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Evaluation complete"
        );
        Ok(EvaluationOutcome {
            output_path: output,
            stats,
        })
    }
}

async fn exists(path: &Path) -> Result<bool, StoreError> {
    Ok(fs::try_exists(path).await?)
}

fn already_processed(path: &Path, mut stats: FileStatistics) -> EvaluationOutcome {
    stats.already_processed = true;
    EvaluationOutcome {
        output_path: path.to_path_buf(),
        stats,
    }
}
