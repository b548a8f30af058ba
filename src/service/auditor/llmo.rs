//! LLMO auditor: how citable is a page for generative AI engines.
//!
//! Pure function over already-fetched markup. Each signal contributes an
//! independent, capped number of points; every scored dimension records
//! either an issue or a strength, never both.

use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::sync::OnceLock;
use url::Url;

use crate::domain::models::{LlmoAudit, LlmoSignals};
use crate::extractor::jsonld::{extract_json_ld, JsonLdData, ARTICLE_TYPES};

const FAQ_TYPES: [&str; 2] = ["FAQPage", "FAQ"];
const ORGANIZATION_TYPES: [&str; 3] = ["Organization", "LocalBusiness", "Corporation"];

/// Interrogative lead words, Italian and English. A heading counts as a
/// question when one of these starts it (followed by a space or apostrophe)
/// or when it ends with "?".
const INTERROGATIVES: [&str; 23] = [
    "come", "cosa", "perché", "chi", "dove", "quando", "quale", "quali", "quanto", "quanti",
    "how", "what", "why", "who", "where", "when", "which", "is", "are", "can", "does", "do",
    "should",
];

/// Elements excluded from the visible word count.
const EXCLUDED_TEXT_CONTAINERS: [&str; 5] = ["script", "style", "nav", "footer", "header"];

const FAQ_POINTS: u32 = 25;
const ARTICLE_COMPLETE_POINTS: u32 = 20;
const ARTICLE_PARTIAL_POINTS: u32 = 10;
const HOWTO_POINTS: u32 = 10;
const QUESTION_FULL_POINTS: u32 = 15;
const QUESTION_PARTIAL_POINTS: u32 = 7;
const QUESTION_TARGET: usize = 3;
const WORDS_FULL_POINTS: u32 = 12;
const WORDS_PARTIAL_POINTS: u32 = 6;
const WORDS_FULL_TARGET: usize = 1000;
const WORDS_MIN_TARGET: usize = 500;
const BREADCRUMB_POINTS: u32 = 5;
const ORGANIZATION_POINTS: u32 = 8;
const VIDEO_POINTS: u32 = 5;
const MAX_SCORE: u32 = 100;

/// Issue recorded when there is no markup to audit.
pub const UNREACHABLE_ISSUE: &str = "Page unreachable";

/// Audit already-fetched markup. Empty input yields the all-zero audit
/// with a single unreachable issue.
pub fn audit_html(html: &str) -> LlmoAudit {
    if html.trim().is_empty() {
        return LlmoAudit {
            score: 0,
            signals: LlmoSignals::default(),
            issues: vec![UNREACHABLE_ISSUE.to_string()],
            strengths: Vec::new(),
        };
    }

    let document = Html::parse_document(html);
    let jsonld = extract_json_ld(&document);
    let signals = detect_signals(&document, &jsonld);
    let (score, issues, strengths) = score_signals(&signals);

    tracing::trace!(
        "[LLMO] score {} ({} issues, {} strengths)",
        score,
        issues.len(),
        strengths.len()
    );

    LlmoAudit {
        score,
        signals,
        issues,
        strengths,
    }
}

fn detect_signals(document: &Html, jsonld: &JsonLdData) -> LlmoSignals {
    LlmoSignals {
        has_faq_schema: jsonld.has_any_type(&FAQ_TYPES),
        has_article_schema: jsonld.has_any_type(&ARTICLE_TYPES),
        has_how_to_schema: jsonld.has_type("HowTo"),
        has_breadcrumb: jsonld.has_type("BreadcrumbList"),
        has_organization_schema: jsonld.has_any_type(&ORGANIZATION_TYPES),
        has_video_object: jsonld.has_type("VideoObject"),
        has_author_info: detect_author(document, jsonld.article.as_ref()),
        has_date_published: detect_date(document, jsonld.article.as_ref()),
        question_headings_count: count_question_headings(document),
        word_count: count_words(document),
        internal_links_count: count_internal_links(document),
    }
}

fn article_has_key(article: Option<&Value>, keys: &[&str]) -> bool {
    article
        .and_then(Value::as_object)
        .map(|obj| keys.iter().any(|k| obj.get(*k).map(|v| !v.is_null()).unwrap_or(false)))
        .unwrap_or(false)
}

fn detect_author(document: &Html, article: Option<&Value>) -> bool {
    static META: OnceLock<Selector> = OnceLock::new();
    static REL: OnceLock<Selector> = OnceLock::new();
    let meta = META.get_or_init(|| Selector::parse(r#"meta[name="author"]"#).unwrap());
    let rel = REL.get_or_init(|| Selector::parse(r#"[rel="author"]"#).unwrap());

    article_has_key(article, &["author", "creator"])
        || document.select(meta).next().is_some()
        || document.select(rel).next().is_some()
}

fn detect_date(document: &Html, article: Option<&Value>) -> bool {
    static META: OnceLock<Selector> = OnceLock::new();
    static TIME: OnceLock<Selector> = OnceLock::new();
    let meta =
        META.get_or_init(|| Selector::parse(r#"meta[property="article:published_time"]"#).unwrap());
    let time = TIME.get_or_init(|| Selector::parse("time[datetime]").unwrap());

    article_has_key(article, &["datePublished", "dateModified"])
        || document.select(meta).next().is_some()
        || document.select(time).next().is_some()
}

fn count_question_headings(document: &Html) -> usize {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    let selector = SELECTOR.get_or_init(|| Selector::parse("h2, h3").unwrap());

    document
        .select(selector)
        .map(|el| el.text().collect::<String>())
        .filter(|text| is_question_heading(text))
        .count()
}

fn is_question_heading(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }
    if trimmed.ends_with('?') {
        return true;
    }
    let lower = trimmed.to_lowercase();
    INTERROGATIVES.iter().any(|word| {
        lower
            .strip_prefix(word)
            .map(|rest| rest.starts_with(' ') || rest.starts_with('\'') || rest.starts_with('’'))
            .unwrap_or(false)
    })
}

fn count_words(document: &Html) -> usize {
    static BODY: OnceLock<Selector> = OnceLock::new();
    let body = BODY.get_or_init(|| Selector::parse("body").unwrap());

    let mut text = String::new();
    match document.select(body).next() {
        Some(el) => collect_visible_text(el, &mut text),
        None => collect_visible_text(document.root_element(), &mut text),
    }
    text.split_whitespace().count()
}

fn collect_visible_text(el: ElementRef, out: &mut String) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        } else if let Some(child_el) = ElementRef::wrap(child) {
            if EXCLUDED_TEXT_CONTAINERS.contains(&child_el.value().name()) {
                continue;
            }
            collect_visible_text(child_el, out);
        }
    }
}

/// A link is internal when its href is not absolute, or when it shares the
/// origin declared in `og:url`. Absolute links only count as internal when
/// `og:url` provides an origin to compare against.
fn count_internal_links(document: &Html) -> usize {
    static LINKS: OnceLock<Selector> = OnceLock::new();
    static OG_URL: OnceLock<Selector> = OnceLock::new();
    let links = LINKS.get_or_init(|| Selector::parse("a[href]").unwrap());
    let og_url = OG_URL.get_or_init(|| Selector::parse(r#"meta[property="og:url"]"#).unwrap());

    let own_origin = document
        .select(og_url)
        .next()
        .and_then(|el| el.value().attr("content"))
        .and_then(|content| Url::parse(content).ok())
        .map(|u| u.origin());

    document
        .select(links)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| {
            if !href.starts_with("http") {
                return true;
            }
            match (&own_origin, Url::parse(href)) {
                (Some(origin), Ok(target)) => target.origin() == *origin,
                _ => false,
            }
        })
        .count()
}

fn score_signals(signals: &LlmoSignals) -> (u8, Vec<String>, Vec<String>) {
    let mut score: u32 = 0;
    let mut issues = Vec::new();
    let mut strengths = Vec::new();

    if signals.has_faq_schema {
        score += FAQ_POINTS;
        strengths.push("FAQ schema present".to_string());
    } else {
        issues.push("No FAQ schema (FAQPage) found".to_string());
    }

    if signals.has_article_schema {
        if signals.has_author_info && signals.has_date_published {
            score += ARTICLE_COMPLETE_POINTS;
            strengths.push("Article schema with author and publish date".to_string());
        } else {
            score += ARTICLE_PARTIAL_POINTS;
            if !signals.has_author_info {
                issues.push("Article schema missing author information".to_string());
            }
            if !signals.has_date_published {
                issues.push("Article schema missing publish date".to_string());
            }
        }
    } else {
        issues.push("No Article schema found".to_string());
    }

    // Bonus-only signal: no issue when absent.
    if signals.has_how_to_schema {
        score += HOWTO_POINTS;
        strengths.push("HowTo schema present".to_string());
    }

    if signals.question_headings_count >= QUESTION_TARGET {
        score += QUESTION_FULL_POINTS;
        strengths.push("Question-style headings support answer extraction".to_string());
    } else if signals.question_headings_count >= 1 {
        score += QUESTION_PARTIAL_POINTS;
        issues.push("Few question-style headings (aim for 3 or more)".to_string());
    } else {
        issues.push("No question-style headings found".to_string());
    }

    if signals.word_count >= WORDS_FULL_TARGET {
        score += WORDS_FULL_POINTS;
        strengths.push("Long-form content (1000+ words)".to_string());
    } else if signals.word_count >= WORDS_MIN_TARGET {
        score += WORDS_PARTIAL_POINTS;
        issues.push("Content under 1000 words (expand for depth)".to_string());
    } else {
        issues.push("Thin content (under 500 words)".to_string());
    }

    if signals.has_breadcrumb {
        score += BREADCRUMB_POINTS;
        strengths.push("Breadcrumb schema present".to_string());
    } else {
        issues.push("No BreadcrumbList schema".to_string());
    }

    if signals.has_organization_schema {
        score += ORGANIZATION_POINTS;
        strengths.push("Organization schema present".to_string());
    } else {
        issues.push("No Organization schema".to_string());
    }

    // Bonus-only signal: no issue when absent.
    if signals.has_video_object {
        score += VIDEO_POINTS;
        strengths.push("VideoObject schema present".to_string());
    }

    (score.min(MAX_SCORE) as u8, issues, strengths)
}
