//! Rich domain entities - behavior lives WITH data

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ====== Enums ======

/// Lifecycle of a brand report. `Running` is the only non-terminal state;
/// a terminal report is never mutated again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportStatus {
    Running,
    Completed,
    Failed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Running => "running",
            ReportStatus::Completed => "completed",
            ReportStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ReportStatus::Completed | ReportStatus::Failed)
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "completed" => ReportStatus::Completed,
            "failed" => ReportStatus::Failed,
            _ => ReportStatus::Running,
        }
    }
}

// ====== Technical SEO audit ======

/// A length-scored text element (title, meta description).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LengthCheck {
    pub value: Option<String>,
    pub length: usize,
    pub score: u8,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct H1Check {
    pub count: usize,
    /// First 3 H1 texts, for reporting.
    pub values: Vec<String>,
    pub score: u8,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageAltCheck {
    pub total: usize,
    pub with_alt: usize,
    pub coverage_percent: u8,
    pub score: u8,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaCheck {
    pub found: bool,
    /// Raw `@type` values in document order, repeats preserved.
    pub types: Vec<String>,
    pub score: u8,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanonicalCheck {
    pub present: bool,
    pub value: Option<String>,
}

/// Technical SEO audit of one page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageAudit {
    pub url: String,
    pub title: LengthCheck,
    pub meta_description: LengthCheck,
    pub h1: H1Check,
    pub h2_count: usize,
    pub images: ImageAltCheck,
    pub schema: SchemaCheck,
    pub canonical: CanonicalCheck,
    pub overall_score: u8,
    /// Set iff the page could not be retrieved; overall_score is then 0.
    pub fetch_error: Option<String>,
}

impl PageAudit {
    /// Audit record for a page that could not be fetched. Every sub-score
    /// stays at its zero default.
    pub fn unreachable(url: &str, message: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            fetch_error: Some(message.into()),
            ..Default::default()
        }
    }
}

// ====== LLMO audit ======

/// Detection flags feeding the LLMO score.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmoSignals {
    pub has_faq_schema: bool,
    pub has_article_schema: bool,
    pub has_how_to_schema: bool,
    pub has_breadcrumb: bool,
    pub has_organization_schema: bool,
    pub has_author_info: bool,
    pub has_date_published: bool,
    pub has_video_object: bool,
    pub question_headings_count: usize,
    pub word_count: usize,
    pub internal_links_count: usize,
}

/// AI-citability audit of one page. `score` is the clamped sum of
/// independent signal contributions; every scored dimension lands in
/// `issues` or `strengths`, never both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmoAudit {
    pub score: u8,
    pub signals: LlmoSignals,
    pub issues: Vec<String>,
    pub strengths: Vec<String>,
}

// ====== Search console cross-reference ======

/// Performance data matched to an audited page by URL path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GscPageData {
    pub impressions: i64,
    pub clicks: i64,
    pub position: f64,
    /// clicks/impressions*100 rounded to 1 decimal; 0 when impressions = 0.
    pub ctr: f64,
}

/// One page's full audit: both axes plus optional search-console data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageFullAudit {
    pub seo: PageAudit,
    pub llmo: LlmoAudit,
    pub gsc: Option<GscPageData>,
}

// ====== Crawl result ======

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueFrequency {
    pub issue: String,
    pub count: usize,
}

/// Site-wide aggregates over pages that fetched successfully.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlAggregates {
    pub avg_seo_score: u8,
    pub avg_llmo_score: u8,
    pub top_seo_issues: Vec<IssueFrequency>,
    pub top_llmo_issues: Vec<IssueFrequency>,
    pub schema_type_counts: BTreeMap<String, usize>,
    pub pages_with_faq_schema: usize,
    pub pages_with_article_schema: usize,
    pub pages_with_good_title: usize,
    pub pages_with_meta_description: usize,
    pub pages_below_llmo_floor: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteCrawlResult {
    pub sitemap_url: Option<String>,
    pub pages_discovered: usize,
    pub pages_audited: usize,
    pub pages: Vec<PageFullAudit>,
    pub aggregated: CrawlAggregates,
}

// ====== Collaborator data (search console, scanners) ======

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GscPageRow {
    pub page: String,
    pub impressions: i64,
    pub clicks: i64,
    pub position: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GscQueryRow {
    pub query: String,
    pub impressions: i64,
    pub clicks: i64,
    pub position: f64,
}

/// Previously-synced search-console analytics for an organization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchAnalytics {
    pub top_search_pages: Vec<GscPageRow>,
    pub top_search_queries: Vec<GscQueryRow>,
    pub avg_bounce_rate: Option<f64>,
    pub avg_session_duration: Option<f64>,
}

/// Latest completed LLM brand-mention scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentionScan {
    pub id: String,
    pub score: u8,
    pub completed_at: DateTime<Utc>,
}

/// Latest completed search-results/news scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerpScan {
    pub id: String,
    pub total_results: i64,
    pub positive_count: i64,
    pub negative_count: i64,
    pub neutral_count: i64,
    /// 0.0 - 1.0
    pub avg_importance: f64,
    pub completed_at: DateTime<Utc>,
}

// ====== Brand configuration ======

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandConfig {
    pub id: String,
    pub organization_id: String,
    pub brand_name: String,
    pub website_url: Option<String>,
    pub language: String,
    pub description: Option<String>,
    pub strategic_plan: Option<String>,
}

// ====== AI tips ======

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TipCategory {
    SeoOnpage,
    SeoTechnical,
    LlmoSchema,
    LlmoContent,
    ContentStrategy,
    GscPerformance,
    GeoVisibility,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TipPriority {
    Critical,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TipEffort {
    QuickWin,
    Medium,
    Complex,
}

/// One prioritized improvement recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiTip {
    pub category: TipCategory,
    pub priority: TipPriority,
    pub title: String,
    pub description: String,
    pub impact: String,
    pub implementation: String,
    pub estimated_effort: TipEffort,
    /// Up to 3 URLs taken from the audited set, never invented.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affected_pages: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy_alignment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiTipsResponse {
    pub tips: Vec<AiTip>,
    pub summary_insight: String,
}

// ====== Brand report ======

/// Persisted report row. Terminal fields are populated only on `Completed`,
/// `error_message` only on `Failed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandReport {
    pub id: String,
    pub config_id: String,
    pub status: ReportStatus,
    pub overall_score: Option<u8>,
    pub seo_score: Option<u8>,
    pub llmo_score: Option<u8>,
    pub geo_score: Option<u8>,
    pub serp_score: Option<u8>,
    pub pages_audited: Option<i64>,
    pub seo_audit_data: Option<SiteCrawlResult>,
    pub geo_data: Option<serde_json::Value>,
    pub serp_data: Option<serde_json::Value>,
    pub gsc_insights: Option<serde_json::Value>,
    pub ai_tips: Option<AiTipsResponse>,
    pub error_message: Option<String>,
    pub generated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Update applied to a running report row. Field names mirror the terminal
/// fields of [`BrandReport`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportPatch {
    pub status: Option<ReportStatus>,
    pub overall_score: Option<u8>,
    pub seo_score: Option<u8>,
    pub llmo_score: Option<u8>,
    pub geo_score: Option<u8>,
    pub serp_score: Option<u8>,
    pub pages_audited: Option<i64>,
    pub seo_audit_data: Option<SiteCrawlResult>,
    pub geo_data: Option<serde_json::Value>,
    pub serp_data: Option<serde_json::Value>,
    pub gsc_insights: Option<serde_json::Value>,
    pub ai_tips: Option<AiTipsResponse>,
    pub error_message: Option<String>,
    pub generated_at: Option<DateTime<Utc>>,
}

impl ReportPatch {
    /// Patch marking a report failed with the captured error message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Some(ReportStatus::Failed),
            error_message: Some(message.into()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_status_roundtrip() {
        for status in [ReportStatus::Running, ReportStatus::Completed, ReportStatus::Failed] {
            assert_eq!(ReportStatus::parse(status.as_str()), status);
        }
        assert_eq!(ReportStatus::parse("garbage"), ReportStatus::Running);
    }

    #[test]
    fn terminal_states() {
        assert!(!ReportStatus::Running.is_terminal());
        assert!(ReportStatus::Completed.is_terminal());
        assert!(ReportStatus::Failed.is_terminal());
    }

    #[test]
    fn unreachable_page_audit_is_all_zero() {
        let audit = PageAudit::unreachable("https://example.com", "timeout");
        assert_eq!(audit.overall_score, 0);
        assert_eq!(audit.title.score, 0);
        assert_eq!(audit.schema.score, 0);
        assert!(audit.fetch_error.is_some());
    }

    #[test]
    fn tip_enums_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&TipCategory::SeoOnpage).unwrap(),
            "\"seo_onpage\""
        );
        assert_eq!(
            serde_json::to_string(&TipEffort::QuickWin).unwrap(),
            "\"quick_win\""
        );
        assert_eq!(serde_json::to_string(&TipPriority::High).unwrap(), "\"high\"");
    }
}
