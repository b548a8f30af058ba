//! Collaborator interfaces the engine depends on.
//!
//! Each trait is a narrow seam around an external subsystem: the report
//! store, the configuration store, the search-console sync, the two brand
//! scanners, and the text generator. Production code plugs in the sqlx
//! repositories and the Gemini client; tests plug in fakes.

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::models::{
    AiTipsResponse, BrandConfig, BrandReport, MentionScan, ReportPatch, SearchAnalytics, SerpScan,
};

#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Create a report row in `running` state and return its id.
    async fn create_report(&self, config_id: &str) -> Result<String>;

    /// Apply a patch to a report row.
    async fn update_report(&self, report_id: &str, patch: &ReportPatch) -> Result<()>;

    /// Newest completed report for a configuration.
    async fn find_latest_completed(&self, config_id: &str) -> Result<Option<BrandReport>>;

    /// Newest still-running report for a configuration.
    async fn find_running(&self, config_id: &str) -> Result<Option<BrandReport>>;
}

#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn get_config(&self, config_id: &str) -> Result<Option<BrandConfig>>;
}

#[async_trait]
pub trait SearchConsoleProvider: Send + Sync {
    /// Previously-synced query/page performance rows for an organization.
    /// The engine never fetches search-console data itself.
    async fn latest_analytics(&self, organization_id: &str) -> Result<Option<SearchAnalytics>>;
}

#[async_trait]
pub trait MentionScanStore: Send + Sync {
    async fn latest_completed_scan(&self, config_id: &str) -> Result<Option<MentionScan>>;
}

#[async_trait]
pub trait SerpScanStore: Send + Sync {
    async fn latest_completed_scan(&self, config_id: &str) -> Result<Option<SerpScan>>;
}

#[async_trait]
pub trait TipGenerator: Send + Sync {
    /// Generate a tip set constrained to `schema`. Errors (transport,
    /// validation, timeout) are recoverable for the caller: a report
    /// completes without tips.
    async fn generate_structured(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
        temperature: f32,
    ) -> Result<AiTipsResponse>;
}
