//! JSON-LD structured-data extraction.
//!
//! Walks every `<script type="application/ld+json">` block in a document,
//! collecting raw `@type` values and the first article-typed object.
//! Unparseable blocks are skipped individually.

use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::OnceLock;

/// Schema.org types treated as articles for author/date scoring.
pub const ARTICLE_TYPES: [&str; 5] = [
    "Article",
    "BlogPosting",
    "NewsArticle",
    "TechArticle",
    "ScholarlyArticle",
];

/// Flattened structured data for one page.
#[derive(Debug, Default)]
pub struct JsonLdData {
    /// Raw `@type` values in document order; repeats preserved.
    pub types: Vec<String>,
    /// First object whose `@type` is in [`ARTICLE_TYPES`].
    pub article: Option<Value>,
}

impl JsonLdData {
    pub fn has_type(&self, name: &str) -> bool {
        self.types.iter().any(|t| t == name)
    }

    pub fn has_any_type(&self, names: &[&str]) -> bool {
        self.types.iter().any(|t| names.iter().any(|n| n == t))
    }
}

/// Extract all JSON-LD data from a parsed document.
pub fn extract_json_ld(document: &Html) -> JsonLdData {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    let selector = SELECTOR
        .get_or_init(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());

    let mut data = JsonLdData::default();
    for block in document.select(selector) {
        let raw = block.text().collect::<String>();
        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => walk(&value, &mut data),
            Err(e) => {
                tracing::debug!("[JSONLD] Skipping unparseable block: {}", e);
            }
        }
    }
    data
}

/// Recursive flatten: `@type` may be a string or an array of strings;
/// `@graph` arrays nest further objects. Graphs here are shallow and
/// externally bounded, so no cycle guard is needed.
fn walk(value: &Value, data: &mut JsonLdData) {
    match value {
        Value::Object(map) => {
            let mut own_types = Vec::new();
            match map.get("@type") {
                Some(Value::String(t)) => own_types.push(t.clone()),
                Some(Value::Array(items)) => {
                    own_types.extend(items.iter().filter_map(|v| v.as_str().map(String::from)));
                }
                _ => {}
            }

            if data.article.is_none()
                && own_types.iter().any(|t| ARTICLE_TYPES.contains(&t.as_str()))
            {
                data.article = Some(value.clone());
            }
            data.types.extend(own_types);

            if let Some(Value::Array(graph)) = map.get("@graph") {
                for item in graph {
                    walk(item, data);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                walk(item, data);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(blocks: &[&str]) -> Html {
        let scripts: String = blocks
            .iter()
            .map(|b| format!(r#"<script type="application/ld+json">{}</script>"#, b))
            .collect();
        Html::parse_document(&format!("<html><head>{}</head><body></body></html>", scripts))
    }

    #[test]
    fn extracts_string_type() {
        let data = extract_json_ld(&doc(&[r#"{"@type": "FAQPage"}"#]));
        assert_eq!(data.types, vec!["FAQPage"]);
        assert!(data.article.is_none());
    }

    #[test]
    fn extracts_array_type() {
        let data = extract_json_ld(&doc(&[r#"{"@type": ["Organization", "LocalBusiness"]}"#]));
        assert_eq!(data.types, vec!["Organization", "LocalBusiness"]);
    }

    #[test]
    fn recurses_into_graph() {
        let data = extract_json_ld(&doc(&[
            r#"{"@graph": [{"@type": "BreadcrumbList"}, {"@type": "Article", "author": "x"}]}"#,
        ]));
        assert_eq!(data.types, vec!["BreadcrumbList", "Article"]);
        assert!(data.article.is_some());
    }

    #[test]
    fn skips_malformed_block_without_losing_others() {
        let data = extract_json_ld(&doc(&[r#"{not json"#, r#"{"@type": "HowTo"}"#]));
        assert_eq!(data.types, vec!["HowTo"]);
    }

    #[test]
    fn first_article_object_wins() {
        let data = extract_json_ld(&doc(&[
            r#"{"@type": "BlogPosting", "author": "first"}"#,
            r#"{"@type": "NewsArticle", "author": "second"}"#,
        ]));
        let article = data.article.unwrap();
        assert_eq!(article["author"], "first");
        // Both raw types are still collected.
        assert_eq!(data.types.len(), 2);
    }

    #[test]
    fn top_level_array_is_walked() {
        let data = extract_json_ld(&doc(&[r#"[{"@type": "VideoObject"}, {"@type": "FAQ"}]"#]));
        assert_eq!(data.types, vec!["VideoObject", "FAQ"]);
    }

    #[test]
    fn repeats_are_preserved() {
        let data = extract_json_ld(&doc(&[
            r#"{"@type": "Product"}"#,
            r#"{"@type": "Product"}"#,
        ]));
        assert_eq!(data.types, vec!["Product", "Product"]);
    }
}
