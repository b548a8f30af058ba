//! AI tip generation.
//!
//! Assembles the audit context into a single structured prompt, constrains
//! the response to the tip-set schema, and validates what comes back.
//! Generation failures are recoverable: the report completes without tips.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::domain::models::{AiTipsResponse, GscPageRow, GscQueryRow, SiteCrawlResult};
use crate::service::gsc;
use crate::service::providers::TipGenerator;

pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const TIPS_MIN: usize = 4;
pub const TIPS_MAX: usize = 20;
pub const AFFECTED_PAGES_LIMIT: usize = 3;

/// A page is an optimization candidate when it draws many impressions but
/// few clicks.
pub const LOW_CTR_MIN_IMPRESSIONS: i64 = 200;
pub const LOW_CTR_MAX_PERCENT: f64 = 3.0;
pub const LOW_CTR_LIMIT: usize = 3;

/// Everything the prompt embeds about one report run.
pub struct TipsContext<'a> {
    pub brand_name: &'a str,
    pub language: &'a str,
    pub description: Option<&'a str>,
    pub strategic_plan: Option<&'a str>,
    pub crawl: &'a SiteCrawlResult,
    pub mention_score: u8,
    pub serp_score: u8,
    pub top_queries: &'a [GscQueryRow],
    pub gsc_pages: &'a [GscPageRow],
}

/// High-impression, low-CTR pages, busiest first.
pub fn low_ctr_pages(rows: &[GscPageRow]) -> Vec<&GscPageRow> {
    let mut candidates: Vec<&GscPageRow> = rows
        .iter()
        .filter(|row| {
            row.impressions > LOW_CTR_MIN_IMPRESSIONS
                && gsc::ctr_percent(row.clicks, row.impressions) < LOW_CTR_MAX_PERCENT
        })
        .collect();
    candidates.sort_by(|a, b| b.impressions.cmp(&a.impressions));
    candidates.truncate(LOW_CTR_LIMIT);
    candidates
}

/// Assemble the generation prompt.
pub fn build_prompt(ctx: &TipsContext<'_>) -> String {
    let aggregated = &ctx.crawl.aggregated;
    let mut prompt = format!(
        "You are an expert consultant for search engine optimization and visibility \
         in generative AI engines. Based on the audit data below, produce {}-{} \
         prioritized, concrete improvement tips plus one overall summary insight. \
         Write all text in language code '{}'.\n\n\
         Brand: {}\n",
        TIPS_MIN, TIPS_MAX, ctx.language, ctx.brand_name
    );
    if let Some(description) = ctx.description {
        prompt.push_str(&format!("About the brand: {}\n", description));
    }
    if let Some(plan) = ctx.strategic_plan {
        prompt.push_str(&format!(
            "Strategic plan (align tips with it and fill strategy_alignment): {}\n",
            plan
        ));
    }

    prompt.push_str(&format!(
        "\nSite audit summary:\n\
         - Pages audited: {}\n\
         - Average SEO score: {}/100\n\
         - Average LLMO score: {}/100\n\
         - Brand mention score: {}/100\n\
         - Search presence score: {}/100\n\
         - Pages with FAQ schema: {}\n\
         - Pages with Article schema: {}\n\
         - Pages with LLMO score below 40: {}\n",
        ctx.crawl.pages_audited,
        aggregated.avg_seo_score,
        aggregated.avg_llmo_score,
        ctx.mention_score,
        ctx.serp_score,
        aggregated.pages_with_faq_schema,
        aggregated.pages_with_article_schema,
        aggregated.pages_below_llmo_floor,
    ));

    if !aggregated.top_seo_issues.is_empty() {
        prompt.push_str("\nMost frequent SEO issues:\n");
        for entry in &aggregated.top_seo_issues {
            prompt.push_str(&format!("- {} ({} pages)\n", entry.issue, entry.count));
        }
    }
    if !aggregated.top_llmo_issues.is_empty() {
        prompt.push_str("\nMost frequent LLMO issues:\n");
        for entry in &aggregated.top_llmo_issues {
            prompt.push_str(&format!("- {} ({} pages)\n", entry.issue, entry.count));
        }
    }

    if !ctx.top_queries.is_empty() {
        prompt.push_str("\nTop search queries:\n");
        for query in ctx.top_queries.iter().take(10) {
            prompt.push_str(&format!(
                "- \"{}\" ({} impressions, {} clicks, position {:.1})\n",
                query.query, query.impressions, query.clicks, query.position
            ));
        }
    }

    let low_ctr = low_ctr_pages(ctx.gsc_pages);
    if !low_ctr.is_empty() {
        prompt.push_str("\nHigh-impression pages with low CTR:\n");
        for row in low_ctr {
            prompt.push_str(&format!(
                "- {} ({} impressions, CTR {}%)\n",
                row.page,
                row.impressions,
                gsc::ctr_percent(row.clicks, row.impressions)
            ));
        }
    }

    prompt.push_str("\nAudited URLs (the only URLs you may reference):\n");
    for page in &ctx.crawl.pages {
        prompt.push_str(&format!("- {}\n", page.seo.url));
    }

    prompt.push_str(&format!(
        "\nRules: affected_pages may only contain URLs from the audited list above \
         (at most {} per tip); never invent URLs. Prefer quick wins where impact \
         is comparable.\n",
        AFFECTED_PAGES_LIMIT
    ));

    prompt
}

/// Response schema the generator is constrained to.
pub fn ai_tips_response_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "tips": {
                "type": "array",
                "minItems": TIPS_MIN,
                "maxItems": TIPS_MAX,
                "items": {
                    "type": "object",
                    "properties": {
                        "category": {
                            "type": "string",
                            "enum": [
                                "seo_onpage", "seo_technical", "llmo_schema",
                                "llmo_content", "content_strategy",
                                "gsc_performance", "geo_visibility"
                            ]
                        },
                        "priority": {
                            "type": "string",
                            "enum": ["critical", "high", "medium", "low"]
                        },
                        "title": { "type": "string" },
                        "description": { "type": "string" },
                        "impact": { "type": "string" },
                        "implementation": { "type": "string" },
                        "estimated_effort": {
                            "type": "string",
                            "enum": ["quick_win", "medium", "complex"]
                        },
                        "affected_pages": {
                            "type": "array",
                            "maxItems": AFFECTED_PAGES_LIMIT,
                            "items": { "type": "string" }
                        },
                        "strategy_alignment": { "type": "string" }
                    },
                    "required": [
                        "category", "priority", "title", "description",
                        "impact", "implementation", "estimated_effort"
                    ]
                }
            },
            "summary_insight": { "type": "string" }
        },
        "required": ["tips", "summary_insight"]
    })
}

/// Reject tip sets that violate the contract.
pub fn validate_response(response: &AiTipsResponse) -> Result<()> {
    let count = response.tips.len();
    if !(TIPS_MIN..=TIPS_MAX).contains(&count) {
        anyhow::bail!("Expected {}-{} tips, got {}", TIPS_MIN, TIPS_MAX, count);
    }
    for tip in &response.tips {
        if let Some(pages) = &tip.affected_pages {
            if pages.len() > AFFECTED_PAGES_LIMIT {
                anyhow::bail!(
                    "Tip '{}' references {} pages (limit {})",
                    tip.title,
                    pages.len(),
                    AFFECTED_PAGES_LIMIT
                );
            }
        }
    }
    Ok(())
}

/// Tip generator backed by the Gemini generateContent API.
pub struct GeminiTipGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiTipGenerator {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: "gemini-2.0-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl TipGenerator for GeminiTipGenerator {
    async fn generate_structured(
        &self,
        prompt: &str,
        schema: &Value,
        temperature: f32,
    ) -> Result<AiTipsResponse> {
        let api_url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let request_body = json!({
            "contents": [{
                "parts": [{
                    "text": prompt
                }]
            }],
            "generationConfig": {
                "temperature": temperature,
                "responseMimeType": "application/json",
                "responseSchema": schema
            }
        });

        let response = self
            .client
            .post(&api_url)
            .header("Content-Type", "application/json")
            .body(request_body.to_string())
            .send()
            .await
            .context("Failed to send request to Gemini API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Gemini API error {}: {}", status, error_text);
        }

        let response_json: Value = response
            .json()
            .await
            .context("Failed to parse Gemini API response")?;

        let text = response_json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .context("Failed to extract text from Gemini response")?;

        let tips: AiTipsResponse =
            serde_json::from_str(text).context("Tip response did not match the expected shape")?;
        validate_response(&tips)?;

        tracing::info!("[TIPS] Generated {} tips", tips.tips.len());
        Ok(tips)
    }
}
