//! Brand report engine.
//!
//! Owns the report lifecycle: validates configuration, creates the running
//! row, gathers scan and search-console inputs concurrently, runs the site
//! crawl, generates recommendations, and lands the row in a terminal state.
//! A report row is mutated only by the `generate` call that created it.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use chrono::Utc;
use serde_json::json;

use crate::domain::models::{
    BrandConfig, BrandReport, GscPageRow, GscQueryRow, ReportPatch, ReportStatus, SerpScan,
};
use crate::error::{AppError, Result};
use crate::service::crawler::{CrawlOptions, SiteCrawler};
use crate::service::providers::{
    ConfigStore, MentionScanStore, ReportStore, SearchConsoleProvider, SerpScanStore, TipGenerator,
};
use crate::service::tips::{self, TipsContext};

const WEIGHT_SEO: f64 = 0.30;
const WEIGHT_LLMO: f64 = 0.30;
const WEIGHT_MENTION: f64 = 0.25;
const WEIGHT_SERP: f64 = 0.15;

const SERP_WEIGHT_SENTIMENT: f64 = 0.6;
const SERP_WEIGHT_IMPORTANCE: f64 = 0.4;

pub struct BrandReportEngine {
    configs: Arc<dyn ConfigStore>,
    reports: Arc<dyn ReportStore>,
    search_console: Arc<dyn SearchConsoleProvider>,
    mention_scans: Arc<dyn MentionScanStore>,
    serp_scans: Arc<dyn SerpScanStore>,
    tips: Arc<dyn TipGenerator>,
    crawler: SiteCrawler,
}

impl BrandReportEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        configs: Arc<dyn ConfigStore>,
        reports: Arc<dyn ReportStore>,
        search_console: Arc<dyn SearchConsoleProvider>,
        mention_scans: Arc<dyn MentionScanStore>,
        serp_scans: Arc<dyn SerpScanStore>,
        tips: Arc<dyn TipGenerator>,
        crawler: SiteCrawler,
    ) -> Self {
        Self {
            configs,
            reports,
            search_console,
            mention_scans,
            serp_scans,
            tips,
            crawler,
        }
    }

    /// Generate a report for a configuration and return the report id.
    ///
    /// Configuration validation happens before any row is created, so a bad
    /// configuration leaves no trace. After the running row exists, any
    /// failure marks it `failed` and then surfaces to the caller.
    pub async fn generate(&self, config_id: &str) -> Result<String> {
        let config = self
            .configs
            .get_config(config_id)
            .await?
            .ok_or_else(|| AppError::ConfigNotFound(config_id.to_string()))?;
        let website_url = config
            .website_url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| AppError::MissingWebsiteUrl(config_id.to_string()))?;

        // Running row first, so polling clients see progress immediately.
        let report_id = self.reports.create_report(config_id).await?;
        tracing::info!("[REPORT] {} created for config {}", report_id, config_id);

        match self.run_pipeline(&report_id, &config, &website_url).await {
            Ok(()) => Ok(report_id),
            Err(e) => {
                tracing::error!("[REPORT] {} failed: {:#}", report_id, e);
                let patch = ReportPatch::failed(format!("{:#}", e));
                // The terminal transition always happens before re-throwing.
                if let Err(update_err) = self.reports.update_report(&report_id, &patch).await {
                    tracing::error!(
                        "[REPORT] {} could not be marked failed: {:#}",
                        report_id,
                        update_err
                    );
                }
                Err(AppError::Other(e))
            }
        }
    }

    /// Newest completed report for a configuration.
    pub async fn latest_completed(&self, config_id: &str) -> Result<Option<BrandReport>> {
        Ok(self.reports.find_latest_completed(config_id).await?)
    }

    /// Newest still-running report for a configuration.
    pub async fn running(&self, config_id: &str) -> Result<Option<BrandReport>> {
        Ok(self.reports.find_running(config_id).await?)
    }

    async fn run_pipeline(
        &self,
        report_id: &str,
        config: &BrandConfig,
        website_url: &str,
    ) -> anyhow::Result<()> {
        let started = Instant::now();

        // Independent inputs, gathered concurrently.
        tracing::info!(
            "[REPORT] {} [STAGE 1/4] Gathering search console and scan data",
            report_id
        );
        let (analytics, mention, serp) = tokio::join!(
            self.search_console.latest_analytics(&config.organization_id),
            self.mention_scans.latest_completed_scan(&config.id),
            self.serp_scans.latest_completed_scan(&config.id),
        );
        let analytics = analytics.context("Failed to load search console analytics")?;
        let mention = mention.context("Failed to load mention scan")?;
        let serp = serp.context("Failed to load search presence scan")?;

        let mention_score = mention.as_ref().map(|m| m.score).unwrap_or(0);
        let serp_score = serp.as_ref().map(serp_presence_score).unwrap_or(0);
        let geo_data = mention
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .context("Failed to serialize mention scan")?;
        let serp_data = serp
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .context("Failed to serialize search presence scan")?;

        let gsc_pages: Vec<GscPageRow> = analytics
            .as_ref()
            .map(|a| a.top_search_pages.clone())
            .unwrap_or_default();
        let top_queries: Vec<GscQueryRow> = analytics
            .as_ref()
            .map(|a| a.top_search_queries.clone())
            .unwrap_or_default();

        // The crawl is the heaviest step and needs the GSC rows, so it runs
        // after the parallel stage rather than inside it.
        tracing::info!("[REPORT] {} [STAGE 2/4] Crawling {}", report_id, website_url);
        let crawl = self
            .crawler
            .crawl_site(
                website_url,
                CrawlOptions {
                    gsc_pages: gsc_pages.clone(),
                    max_pages: None,
                },
            )
            .await;

        tracing::info!(
            "[REPORT] {} [STAGE 3/4] Generating recommendations",
            report_id
        );
        let prompt = tips::build_prompt(&TipsContext {
            brand_name: &config.brand_name,
            language: &config.language,
            description: config.description.as_deref(),
            strategic_plan: config.strategic_plan.as_deref(),
            crawl: &crawl,
            mention_score,
            serp_score,
            top_queries: &top_queries,
            gsc_pages: &gsc_pages,
        });
        let schema = tips::ai_tips_response_schema();
        let ai_tips = match self
            .tips
            .generate_structured(&prompt, &schema, tips::DEFAULT_TEMPERATURE)
            .await
        {
            Ok(response) => Some(response),
            Err(e) => {
                // Recommendation failure never fails the report.
                tracing::warn!(
                    "[REPORT] {} tip generation failed, continuing without tips: {:#}",
                    report_id,
                    e
                );
                None
            }
        };

        tracing::info!("[REPORT] {} [STAGE 4/4] Finalizing", report_id);
        let seo_score = crawl.aggregated.avg_seo_score;
        let llmo_score = crawl.aggregated.avg_llmo_score;
        let overall = overall_score(seo_score, llmo_score, mention_score, serp_score);
        let gsc_insights = build_gsc_insights(&top_queries, &gsc_pages);

        let patch = ReportPatch {
            status: Some(ReportStatus::Completed),
            overall_score: Some(overall),
            seo_score: Some(seo_score),
            llmo_score: Some(llmo_score),
            geo_score: Some(mention_score),
            serp_score: Some(serp_score),
            pages_audited: Some(crawl.pages_audited as i64),
            seo_audit_data: Some(crawl),
            geo_data,
            serp_data,
            gsc_insights: Some(gsc_insights),
            ai_tips,
            error_message: None,
            generated_at: Some(Utc::now()),
        };
        self.reports
            .update_report(report_id, &patch)
            .await
            .context("Failed to finalize report")?;

        tracing::info!(
            "[REPORT] {} completed in {:?} (overall score {})",
            report_id,
            started.elapsed(),
            overall
        );
        Ok(())
    }
}

/// Weighted composite of the four axis scores.
fn overall_score(seo: u8, llmo: u8, mention: u8, serp: u8) -> u8 {
    let weighted = f64::from(seo) * WEIGHT_SEO
        + f64::from(llmo) * WEIGHT_LLMO
        + f64::from(mention) * WEIGHT_MENTION
        + f64::from(serp) * WEIGHT_SERP;
    weighted.round() as u8
}

/// Search presence score from the raw scan counters: sentiment ratio
/// weighted against average result importance, clamped to [0, 100].
fn serp_presence_score(scan: &SerpScan) -> u8 {
    let denominator = if scan.total_results > 0 {
        scan.total_results as f64
    } else {
        1.0
    };
    let positive_ratio = scan.positive_count as f64 / denominator;
    let score = (positive_ratio * 100.0 * SERP_WEIGHT_SENTIMENT
        + scan.avg_importance * 100.0 * SERP_WEIGHT_IMPORTANCE)
        .round();
    score.clamp(0.0, 100.0) as u8
}

fn build_gsc_insights(
    top_queries: &[GscQueryRow],
    gsc_pages: &[GscPageRow],
) -> serde_json::Value {
    json!({
        "top_queries": top_queries,
        "top_pages": gsc_pages,
        "low_ctr_pages": tips::low_ctr_pages(gsc_pages),
    })
}
