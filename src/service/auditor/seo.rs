//! Technical SEO auditor.
//!
//! Scores one page's markup across title, meta description, H1 usage,
//! image alt coverage, structured data presence and canonical tag, then
//! folds the sub-scores into a weighted composite.

use scraper::{Html, Selector};
use std::sync::OnceLock;

use super::UNREACHABLE_MESSAGE;
use crate::domain::models::{
    CanonicalCheck, H1Check, ImageAltCheck, LengthCheck, PageAudit, SchemaCheck,
};
use crate::extractor::jsonld::extract_json_ld;
use crate::service::http::FetchText;

const TITLE_MIN_CHARS: usize = 30;
const TITLE_MAX_CHARS: usize = 65;
const TITLE_SHORT_PENALTY: i32 = 40;
const TITLE_LONG_PENALTY: i32 = 20;

const META_MIN_CHARS: usize = 100;
const META_MAX_CHARS: usize = 165;
const META_SHORT_PENALTY: i32 = 40;
const META_LONG_PENALTY: i32 = 20;

const H1_MIN_CHARS: usize = 10;
const H1_MULTIPLE_PENALTY: i32 = 30;
const H1_SHORT_PENALTY: i32 = 20;
const H1_SAMPLE_LIMIT: usize = 3;

/// Structured data is scored leniently: absence is not catastrophic for
/// classic SEO, unlike for LLMO.
const SCHEMA_MISSING_SCORE: u8 = 30;

const WEIGHT_TITLE: f64 = 0.25;
const WEIGHT_META: f64 = 0.20;
const WEIGHT_H1: f64 = 0.20;
const WEIGHT_IMAGES: f64 = 0.15;
const WEIGHT_SCHEMA: f64 = 0.20;

/// Fetch a page and audit it. An unreachable page yields an all-zero audit
/// carrying a fetch error instead of failing the crawl.
pub async fn audit_page(fetcher: &dyn FetchText, url: &str) -> PageAudit {
    match fetcher.fetch_text(url).await {
        Some(html) => analyze_html(url, &html),
        None => PageAudit::unreachable(url, UNREACHABLE_MESSAGE),
    }
}

/// Audit already-fetched markup.
pub fn analyze_html(url: &str, html: &str) -> PageAudit {
    let document = Html::parse_document(html);

    let title = check_title(&document);
    let meta_description = check_meta_description(&document);
    let h1 = check_h1(&document);
    let images = check_images(&document);
    let schema = check_schema(&document);
    let canonical = check_canonical(&document);
    let overall_score = weighted_score(&title, &meta_description, &h1, &images, &schema);

    tracing::debug!(
        "[SEO] {} -> title {}, meta {}, h1 {}, images {}, schema {}, overall {}",
        url, title.score, meta_description.score, h1.score, images.score, schema.score,
        overall_score
    );

    PageAudit {
        url: url.to_string(),
        title,
        meta_description,
        h1,
        h2_count: count_h2(&document),
        images,
        schema,
        canonical,
        overall_score,
        fetch_error: None,
    }
}

fn weighted_score(
    title: &LengthCheck,
    meta: &LengthCheck,
    h1: &H1Check,
    images: &ImageAltCheck,
    schema: &SchemaCheck,
) -> u8 {
    let weighted = f64::from(title.score) * WEIGHT_TITLE
        + f64::from(meta.score) * WEIGHT_META
        + f64::from(h1.score) * WEIGHT_H1
        + f64::from(images.score) * WEIGHT_IMAGES
        + f64::from(schema.score) * WEIGHT_SCHEMA;
    weighted.round() as u8
}

fn check_title(document: &Html) -> LengthCheck {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    let selector = SELECTOR.get_or_init(|| Selector::parse("title").unwrap());

    let title = document
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());

    match title {
        Some(t) => {
            let length = t.chars().count();
            let mut score: i32 = 100;
            let mut issues = Vec::new();
            if length < TITLE_MIN_CHARS {
                score -= TITLE_SHORT_PENALTY;
                issues.push(format!("Title too short (under {} characters)", TITLE_MIN_CHARS));
            } else if length > TITLE_MAX_CHARS {
                score -= TITLE_LONG_PENALTY;
                issues.push(format!("Title too long (over {} characters)", TITLE_MAX_CHARS));
            }
            LengthCheck {
                value: Some(t),
                length,
                score: score.max(0) as u8,
                issues,
            }
        }
        None => LengthCheck {
            value: None,
            length: 0,
            score: 0,
            issues: vec!["Title is missing".to_string()],
        },
    }
}

fn check_meta_description(document: &Html) -> LengthCheck {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    let selector =
        SELECTOR.get_or_init(|| Selector::parse(r#"meta[name="description"]"#).unwrap());

    let description = document
        .select(selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string())
        .filter(|d| !d.is_empty());

    match description {
        Some(d) => {
            let length = d.chars().count();
            let mut score: i32 = 100;
            let mut issues = Vec::new();
            if length < META_MIN_CHARS {
                score -= META_SHORT_PENALTY;
                issues.push(format!(
                    "Meta description too short (under {} characters)",
                    META_MIN_CHARS
                ));
            } else if length > META_MAX_CHARS {
                score -= META_LONG_PENALTY;
                issues.push(format!(
                    "Meta description too long (over {} characters)",
                    META_MAX_CHARS
                ));
            }
            LengthCheck {
                value: Some(d),
                length,
                score: score.max(0) as u8,
                issues,
            }
        }
        None => LengthCheck {
            value: None,
            length: 0,
            score: 0,
            issues: vec!["Meta description is missing".to_string()],
        },
    }
}

fn check_h1(document: &Html) -> H1Check {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    let selector = SELECTOR.get_or_init(|| Selector::parse("h1").unwrap());

    let texts: Vec<String> = document
        .select(selector)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .collect();
    let count = texts.len();

    if count == 0 {
        return H1Check {
            count: 0,
            values: Vec::new(),
            score: 0,
            issues: vec!["H1 is missing".to_string()],
        };
    }

    let mut score: i32 = 100;
    let mut issues = Vec::new();
    if count > 1 {
        score -= H1_MULTIPLE_PENALTY;
        issues.push(format!("Multiple H1 tags found ({})", count));
    }
    if texts[0].chars().count() < H1_MIN_CHARS {
        score -= H1_SHORT_PENALTY;
        issues.push(format!("First H1 is too short (under {} characters)", H1_MIN_CHARS));
    }

    let mut values = texts;
    values.truncate(H1_SAMPLE_LIMIT);

    H1Check {
        count,
        values,
        score: score.max(0) as u8,
        issues,
    }
}

fn count_h2(document: &Html) -> usize {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    let selector = SELECTOR.get_or_init(|| Selector::parse("h2").unwrap());
    document.select(selector).count()
}

fn check_images(document: &Html) -> ImageAltCheck {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    let selector = SELECTOR.get_or_init(|| Selector::parse("img").unwrap());

    let mut total = 0;
    let mut with_alt = 0;
    for img in document.select(selector) {
        total += 1;
        if img
            .value()
            .attr("alt")
            .map(|a| !a.trim().is_empty())
            .unwrap_or(false)
        {
            with_alt += 1;
        }
    }

    // No images: vacuous pass.
    if total == 0 {
        return ImageAltCheck {
            total: 0,
            with_alt: 0,
            coverage_percent: 100,
            score: 100,
            issues: Vec::new(),
        };
    }

    let coverage = ((with_alt as f64 / total as f64) * 100.0).round() as u8;
    let missing = total - with_alt;
    let issues = if missing > 0 {
        let noun = if missing == 1 { "image" } else { "images" };
        vec![format!("{} {} missing alt text", missing, noun)]
    } else {
        Vec::new()
    };

    ImageAltCheck {
        total,
        with_alt,
        coverage_percent: coverage,
        score: coverage,
        issues,
    }
}

fn check_schema(document: &Html) -> SchemaCheck {
    let data = extract_json_ld(document);
    if data.types.is_empty() {
        SchemaCheck {
            found: false,
            types: Vec::new(),
            score: SCHEMA_MISSING_SCORE,
        }
    } else {
        SchemaCheck {
            found: true,
            types: data.types,
            score: 100,
        }
    }
}

fn check_canonical(document: &Html) -> CanonicalCheck {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    let selector = SELECTOR.get_or_init(|| Selector::parse(r#"link[rel="canonical"]"#).unwrap());

    let value = document
        .select(selector)
        .next()
        .and_then(|el| el.value().attr("href"))
        .map(|s| s.to_string());

    CanonicalCheck {
        present: value.is_some(),
        value,
    }
}
