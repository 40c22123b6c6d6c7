//! Field extraction from Naver news search result markup.
//!
//! Naver changes the class names of its result page without notice, so every
//! field is resolved through a [`FieldChain`]: an ordered list of
//! [`Matcher`]s, current markup first, historical markup next, then loose
//! structural heuristics, and finally a fixed placeholder. The first matcher
//! that produces a value wins. Extraction never fails.
//!
//! The chains are plain data. Supporting a new layout means adding a
//! `(selector, Rule)` pair to the relevant table below.
//!
//! # Fallback order
//!
//! | Field | Tiers | Placeholder |
//! |-------|-------|-------------|
//! | title | 2025 headline span, historical title links, first long heading/link | `제목 없음` |
//! | url | 2025 title link, historical links, Naver-hosted link, any absolute link | empty |
//! | source | 2025 profile span, historical press selectors | `Unknown` |
//! | date | 2025 subtext span, any date-looking span, historical info selectors | `Unknown` |
//! | content | 2025 snippet span, historical description selectors, first long paragraph | empty |

use crate::models::{ArticleRecord, UNKNOWN, UNTITLED};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

/// Relative or absolute publication date as rendered on the result page:
/// `5분 전`, `3일 전`, `어제`, `2025.05.08.` and the like.
pub static DATE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9]+(분|시간|일|주|달|년)( ?전)?|어제|오늘|[0-9]{4}\.[0-9]{2}\.[0-9]{2}\.?")
        .expect("date pattern is a valid regex")
});

/// Hosts that serve Naver-hosted article pages.
const NAVER_NEWS_HOSTS: &[&str] = &["news.naver.com", "n.news.naver.com"];

/// Result item containers, newest layout first.
static ITEM_SELECTORS: Lazy<Vec<(&'static str, Selector)>> = Lazy::new(|| {
    compile(&[
        "div.sds-comps-vertical-layout.dZQQMujvOqnxG1bUQsg6",
        "div.group_news > ul.list_news > li",
        "ul.list_news > li",
        "div.news_wrap.api_ani_send",
        "div.news_area",
        "div.newsitem",
        "li.bx",
        "#main_pack > section.sc_new.sp_nnews._fe_news_collection._prs_nws > div.api_subject_bx > div.group_news > ul > li",
    ])
});

static TITLE: Lazy<FieldChain> = Lazy::new(|| {
    FieldChain::new(
        "title",
        UNTITLED,
        &[
            (
                "a.n6AJosQA40hUOAe_Vplg.cdv6mdm2_kpW2D6slkm6 span.sds-comps-text-ellipsis-1.sds-comps-text-type-headline1",
                Rule::Text,
            ),
            ("span.sds-comps-text-ellipsis-1.sds-comps-text-type-headline1", Rule::Text),
            ("a.news_tit", Rule::Text),
            ("div.news_area a.news_tit", Rule::Text),
            ("div.news_wrap a.news_tit", Rule::Text),
            ("a.api_txt_lines.api_txt_lines_title", Rule::Text),
            ("div.news_contents h2.news_title", Rule::Text),
            ("div.newslist_item a.newslist_item_title", Rule::Text),
            ("h2, h3, h4, strong, a", Rule::LongerThan(10)),
        ],
    )
});

static URL: Lazy<FieldChain> = Lazy::new(|| {
    FieldChain::new(
        "url",
        "",
        &[
            ("a.n6AJosQA40hUOAe_Vplg.cdv6mdm2_kpW2D6slkm6", Rule::Href),
            ("a.news_tit", Rule::Href),
            ("div.news_area a.news_tit", Rule::Href),
            ("div.news_wrap a.news_tit", Rule::Href),
            ("a.api_txt_lines.api_txt_lines_title", Rule::Href),
            ("div.news_info_group a.urlBtn", Rule::Href),
            ("div.news_contents a.news_source_link", Rule::Href),
            ("a[href]", Rule::HrefContains(NAVER_NEWS_HOSTS)),
            ("a[href]", Rule::AbsoluteHref),
        ],
    )
});

static SOURCE: Lazy<FieldChain> = Lazy::new(|| {
    FieldChain::new(
        "source",
        UNKNOWN,
        &[
            (
                "div.sds-comps-profile-info-title span.sds-comps-text-type-body2.sds-comps-text-weight-sm",
                Rule::Text,
            ),
            ("span.sds-comps-text-type-body2.sds-comps-text-weight-sm", Rule::Text),
            ("a.info.press", Rule::Text),
            ("div.news_info a.info.press", Rule::Text),
            ("div.news_area div.news_info a.info.press", Rule::Text),
            ("div.news_dsc span.press", Rule::Text),
            ("div.news_info_group div.news_source", Rule::Text),
            ("div.news_contents span.news_source", Rule::Text),
        ],
    )
});

static DATE: Lazy<FieldChain> = Lazy::new(|| {
    const INFO_MARKERS: &[&str] = &["전", "분", "시간", "일", "."];
    FieldChain::new(
        "date",
        UNKNOWN,
        &[
            (
                "span.sds-comps-text-type-body2.sds-comps-text-weight-sm.sds-comps-profile-info-subtext span.sds-comps-text-type-body2.sds-comps-text-weight-sm",
                Rule::Text,
            ),
            ("span.sds-comps-profile-info-subtext span", Rule::Text),
            ("span", Rule::DateLike),
            ("span.info", Rule::Contains(INFO_MARKERS)),
            ("div.news_info span.info", Rule::Contains(INFO_MARKERS)),
            ("div.news_area div.news_info span.info", Rule::Contains(INFO_MARKERS)),
            ("div.news_info_group div.news_time", Rule::Contains(INFO_MARKERS)),
            ("div.news_contents span.news_date", Rule::Contains(INFO_MARKERS)),
        ],
    )
});

static CONTENT: Lazy<FieldChain> = Lazy::new(|| {
    FieldChain::new(
        "content",
        "",
        &[
            (
                "a.n6AJosQA40hUOAe_Vplg.ZtHl2s0jtiC0IevYMD5G span.sds-comps-text-ellipsis-3.sds-comps-text-type-body1",
                Rule::Text,
            ),
            ("span.sds-comps-text-ellipsis-3.sds-comps-text-type-body1", Rule::Text),
            ("div.news_dsc", Rule::Text),
            ("a.api_txt_lines.dsc_txt_wrap", Rule::Text),
            ("div.news_area div.news_dsc", Rule::Text),
            ("div.news_wrap div.news_dsc", Rule::Text),
            ("div.news_contents p.news_description", Rule::Text),
            ("div.newslist_item p.newslist_item_desc", Rule::Text),
            ("p", Rule::LongerThan(20)),
        ],
    )
});

/// How a matched element is turned into a field value.
#[derive(Debug, Clone, Copy)]
pub enum Rule {
    /// Non-empty text of the element.
    Text,
    /// Non-empty `href` attribute.
    Href,
    /// Text longer than the given number of characters.
    LongerThan(usize),
    /// `href` that mentions one of the hosts.
    HrefContains(&'static [&'static str]),
    /// `href` that starts with `http`.
    AbsoluteHref,
    /// Text that looks like a publication date.
    DateLike,
    /// Text containing any of the markers.
    Contains(&'static [&'static str]),
}

impl Rule {
    fn accept(self, el: ElementRef<'_>) -> Option<String> {
        match self {
            Rule::Text => non_empty(node_text(el)),
            Rule::Href => href(el).map(str::to_string),
            Rule::LongerThan(min) => {
                let text = node_text(el);
                (text.chars().count() > min).then_some(text)
            }
            Rule::HrefContains(hosts) => href(el)
                .filter(|h| hosts.iter().any(|host| h.contains(host)))
                .map(str::to_string),
            Rule::AbsoluteHref => href(el)
                .filter(|h| h.starts_with("http"))
                .map(str::to_string),
            Rule::DateLike => {
                let text = node_text(el);
                DATE_PATTERN.is_match(&text).then_some(text)
            }
            Rule::Contains(markers) => {
                let text = node_text(el);
                markers.iter().any(|m| text.contains(m)).then_some(text)
            }
        }
    }
}

/// One fallback tier: a CSS selector plus the rule applied to its matches.
#[derive(Debug)]
pub struct Matcher {
    pub label: &'static str,
    selector: Selector,
    rule: Rule,
}

impl Matcher {
    /// Value from the first descendant of `node` accepted by the rule.
    pub fn apply(&self, node: ElementRef<'_>) -> Option<String> {
        node.select(&self.selector).find_map(|el| self.rule.accept(el))
    }
}

/// Ordered fallback chain for a single field.
#[derive(Debug)]
pub struct FieldChain {
    pub field: &'static str,
    pub placeholder: &'static str,
    pub matchers: Vec<Matcher>,
}

impl FieldChain {
    /// Compile a chain. Selectors that fail to parse are logged and skipped.
    pub fn new(
        field: &'static str,
        placeholder: &'static str,
        tiers: &[(&'static str, Rule)],
    ) -> Self {
        let matchers = tiers
            .iter()
            .filter_map(|&(label, rule)| match Selector::parse(label) {
                Ok(selector) => Some(Matcher {
                    label,
                    selector,
                    rule,
                }),
                Err(e) => {
                    warn!(field, selector = label, error = %e, "Skipping invalid selector");
                    None
                }
            })
            .collect();
        Self {
            field,
            placeholder,
            matchers,
        }
    }

    /// Resolve the field, falling back to the placeholder.
    pub fn resolve(&self, node: ElementRef<'_>) -> String {
        for (tier, matcher) in self.matchers.iter().enumerate() {
            if let Some(value) = matcher.apply(node) {
                debug!(field = self.field, tier, selector = matcher.label, "Field matched");
                return value;
            }
        }
        debug!(field = self.field, "No selector matched; using placeholder");
        self.placeholder.to_string()
    }
}

/// Best-effort fields of one result item, before the keyword is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFields {
    pub title: String,
    pub url: String,
    pub source: String,
    pub date: String,
    pub content: String,
}

impl ExtractedFields {
    pub fn into_record(self, keyword: &str) -> ArticleRecord {
        ArticleRecord {
            title: self.title,
            url: self.url,
            source: self.source,
            date: self.date,
            content: self.content,
            keyword: keyword.to_string(),
        }
    }
}

/// Locate the result item nodes on a search page.
///
/// Container selectors are tried newest layout first; the first one that
/// matches anything wins. Returns an empty list when nothing matches.
pub fn extract_items(document: &Html) -> Vec<ElementRef<'_>> {
    for (label, selector) in ITEM_SELECTORS.iter() {
        let items: Vec<ElementRef<'_>> = document.select(selector).collect();
        if !items.is_empty() {
            info!(selector = %label, count = items.len(), "Found news items");
            return items;
        }
    }
    warn!("No news items found with any selector");
    Vec::new()
}

/// Extract every field of one result item.
///
/// Relative links are resolved against `base` when one is given.
pub fn extract_fields(node: ElementRef<'_>, base: Option<&Url>) -> ExtractedFields {
    let raw_url = URL.resolve(node);
    ExtractedFields {
        title: TITLE.resolve(node),
        url: absolutize(raw_url, base),
        source: SOURCE.resolve(node),
        date: DATE.resolve(node),
        content: CONTENT.resolve(node),
    }
}

fn absolutize(href: String, base: Option<&Url>) -> String {
    if href.is_empty() || Url::parse(&href).is_ok() {
        return href;
    }
    match base.map(|b| b.join(&href)) {
        Some(Ok(resolved)) => resolved.to_string(),
        _ => href,
    }
}

/// All descendant text, whitespace-collapsed.
fn node_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn href(el: ElementRef<'_>) -> Option<&str> {
    el.value().attr("href").map(str::trim).filter(|h| !h.is_empty())
}

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

fn compile(selectors: &[&'static str]) -> Vec<(&'static str, Selector)> {
    selectors
        .iter()
        .filter_map(|&s| match Selector::parse(s) {
            Ok(selector) => Some((s, selector)),
            Err(e) => {
                warn!(selector = s, error = %e, "Skipping invalid selector");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURRENT_ITEM: &str = r#"
        <div class="sds-comps-vertical-layout dZQQMujvOqnxG1bUQsg6">
          <div class="sds-comps-profile-info-title">
            <span class="sds-comps-text-type-body2 sds-comps-text-weight-sm">연합뉴스</span>
          </div>
          <span class="sds-comps-text-type-body2 sds-comps-text-weight-sm sds-comps-profile-info-subtext">
            <span class="sds-comps-text-type-body2 sds-comps-text-weight-sm">3시간 전</span>
          </span>
          <a class="n6AJosQA40hUOAe_Vplg cdv6mdm2_kpW2D6slkm6" href="https://www.yna.co.kr/view/AKR1">
            <span class="sds-comps-text-ellipsis-1 sds-comps-text-type-headline1">코스맥스, 1분기 <mark>매출</mark> 최대</span>
          </a>
          <a class="n6AJosQA40hUOAe_Vplg ZtHl2s0jtiC0IevYMD5G" href="https://www.yna.co.kr/view/AKR1">
            <span class="sds-comps-text-ellipsis-3 sds-comps-text-type-body1">화장품 ODM 기업 코스맥스가 사상 최대 실적을 냈다.</span>
          </a>
        </div>"#;

    const LEGACY_PAGE: &str = r#"
        <div class="group_news"><ul class="list_news">
          <li class="bx">
            <div class="news_wrap api_ani_send"><div class="news_area">
              <div class="news_info"><a class="info press" href="/press">뉴시스</a><span class="info">2025.05.08.</span></div>
              <a class="news_tit" href="https://www.newsis.com/view/1" title="t">아모레퍼시픽 신제품 출시</a>
              <div class="news_dsc"><div class="dsc_wrap">아모레퍼시픽이 새로운 라인을 공개했다.</div></div>
            </div></div>
          </li>
          <li class="bx">
            <div class="news_wrap api_ani_send"><div class="news_area">
              <a class="news_tit" href="https://www.news1.kr/2">LG생활건강 실적</a>
            </div></div>
          </li>
        </ul></div>"#;

    fn first_item(html: &str) -> ExtractedFields {
        let document = Html::parse_document(html);
        let items = extract_items(&document);
        assert!(!items.is_empty(), "fixture must contain an item");
        extract_fields(items[0], None)
    }

    #[test]
    fn test_current_layout_fields() {
        let fields = first_item(CURRENT_ITEM);
        assert_eq!(fields.title, "코스맥스, 1분기 매출 최대");
        assert_eq!(fields.url, "https://www.yna.co.kr/view/AKR1");
        assert_eq!(fields.source, "연합뉴스");
        assert_eq!(fields.date, "3시간 전");
        assert_eq!(fields.content, "화장품 ODM 기업 코스맥스가 사상 최대 실적을 냈다.");
    }

    #[test]
    fn test_legacy_layout_fields() {
        let document = Html::parse_document(LEGACY_PAGE);
        let items = extract_items(&document);
        assert_eq!(items.len(), 2);

        let fields = extract_fields(items[0], None);
        assert_eq!(fields.title, "아모레퍼시픽 신제품 출시");
        assert_eq!(fields.url, "https://www.newsis.com/view/1");
        assert_eq!(fields.source, "뉴시스");
        assert_eq!(fields.date, "2025.05.08.");
        assert_eq!(fields.content, "아모레퍼시픽이 새로운 라인을 공개했다.");

        let sparse = extract_fields(items[1], None);
        assert_eq!(sparse.title, "LG생활건강 실적");
        assert_eq!(sparse.source, UNKNOWN);
        assert_eq!(sparse.date, UNKNOWN);
        assert_eq!(sparse.content, "");
    }

    #[test]
    fn test_unknown_markup_yields_placeholders() {
        let document = Html::parse_fragment(r#"<div class="newsitem"><em>짧음</em></div>"#);
        let items = extract_items(&document);
        let fields = extract_fields(items[0], None);
        assert_eq!(
            fields,
            ExtractedFields {
                title: UNTITLED.to_string(),
                url: String::new(),
                source: UNKNOWN.to_string(),
                date: UNKNOWN.to_string(),
                content: String::new(),
            }
        );
        assert!(!fields.into_record("kw").is_valid());
    }

    #[test]
    fn test_title_falls_back_to_first_long_heading() {
        let html = r#"<div class="newsitem">
            <strong>짧은 제목</strong>
            <h3>충분히 길고 의미 있는 기사 제목입니다</h3>
            <a href="https://example.com/other">다른 아주 길고 긴 링크 텍스트입니다</a>
        </div>"#;
        let fields = first_item(html);
        assert_eq!(fields.title, "충분히 길고 의미 있는 기사 제목입니다");
    }

    #[test]
    fn test_url_prefers_naver_hosted_link_over_other_absolute_links() {
        let html = r#"<div class="newsitem">
            <a href="https://press.example.com/a">언론사</a>
            <a href="https://n.news.naver.com/mnews/article/001/123">네이버뉴스</a>
        </div>"#;
        assert_eq!(first_item(html).url, "https://n.news.naver.com/mnews/article/001/123");

        let html = r#"<div class="newsitem">
            <a href="/relative">상대</a>
            <a href="https://press.example.com/a">언론사</a>
        </div>"#;
        assert_eq!(first_item(html).url, "https://press.example.com/a");
    }

    #[test]
    fn test_relative_designated_link_is_resolved_against_base() {
        let html = r#"<ul class="list_news"><li><a class="news_tit" href="/view?id=7">제목입니다 제목입니다</a></li></ul>"#;
        let document = Html::parse_document(html);
        let items = extract_items(&document);
        let base = Url::parse("https://search.naver.com/search.naver").unwrap();
        let fields = extract_fields(items[0], Some(&base));
        assert_eq!(fields.url, "https://search.naver.com/view?id=7");
    }

    #[test]
    fn test_date_heuristic_scans_spans() {
        let html = r#"<div class="newsitem">
            <span>광고</span><span>어제</span>
        </div>"#;
        assert_eq!(first_item(html).date, "어제");

        let html = r#"<div class="newsitem"><span>2주 전</span></div>"#;
        assert_eq!(first_item(html).date, "2주 전");
    }

    #[test]
    fn test_date_pattern() {
        for ok in ["5분 전", "3시간 전", "2일 전", "1달 전", "어제", "오늘", "2025.05.08.", "2025.05.08"] {
            assert!(DATE_PATTERN.is_match(ok), "{ok} should look like a date");
        }
        for no in ["연합뉴스", "A12면", "네이버뉴스"] {
            assert!(!DATE_PATTERN.is_match(no), "{no} should not look like a date");
        }
    }

    #[test]
    fn test_content_falls_back_to_long_paragraph() {
        let html = r#"<div class="newsitem">
            <p>짧은 문단</p>
            <p>이 문단은 스무 글자를 넘는 충분히 긴 본문 요약입니다.</p>
        </div>"#;
        assert_eq!(first_item(html).content, "이 문단은 스무 글자를 넘는 충분히 긴 본문 요약입니다.");
    }

    #[test]
    fn test_extract_items_prefers_newest_layout() {
        let html = format!("{CURRENT_ITEM}{LEGACY_PAGE}");
        let document = Html::parse_document(&html);
        assert_eq!(extract_items(&document).len(), 1);
    }

    #[test]
    fn test_extract_items_empty_page() {
        let document = Html::parse_document("<html><body><p>검색결과가 없습니다</p></body></html>");
        assert!(extract_items(&document).is_empty());
    }

    #[test]
    fn test_all_chain_selectors_compile() {
        assert_eq!(TITLE.matchers.len(), 9);
        assert_eq!(URL.matchers.len(), 9);
        assert_eq!(SOURCE.matchers.len(), 8);
        assert_eq!(DATE.matchers.len(), 8);
        assert_eq!(CONTENT.matchers.len(), 9);
        assert_eq!(ITEM_SELECTORS.len(), 8);
    }
}
