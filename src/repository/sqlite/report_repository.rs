//! Brand report repository.
//!
//! Rows are created in `running` state and patched exactly once into a
//! terminal state. Structured payloads (crawl data, scan metadata, tips)
//! are stored as serialized JSON columns.
//!
//! Note: Uses runtime SQL (not compile-time checked) so the crate builds
//! without a database at hand.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::domain::models::{BrandReport, ReportPatch, ReportStatus};
use crate::service::providers::ReportStore;

pub struct SqliteReportStore {
    pool: SqlitePool,
}

impl SqliteReportStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportStore for SqliteReportStore {
    async fn create_report(&self, config_id: &str) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO brand_reports (id, config_id, status, created_at)
            VALUES (?, ?, 'running', ?)
            "#,
        )
        .bind(&id)
        .bind(config_id)
        .bind(&now)
        .execute(&self.pool)
        .await
        .context("Failed to create report")?;

        tracing::info!("Created report {} for config {}", id, config_id);
        Ok(id)
    }

    async fn update_report(&self, report_id: &str, patch: &ReportPatch) -> Result<()> {
        let seo_audit_data = patch
            .seo_audit_data
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .context("Failed to serialize crawl data")?;
        let geo_data = patch
            .geo_data
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .context("Failed to serialize mention data")?;
        let serp_data = patch
            .serp_data
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .context("Failed to serialize search presence data")?;
        let gsc_insights = patch
            .gsc_insights
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .context("Failed to serialize GSC insights")?;
        let ai_tips = patch
            .ai_tips
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .context("Failed to serialize tips")?;

        sqlx::query(
            r#"
            UPDATE brand_reports SET
                status = COALESCE(?, status),
                overall_score = COALESCE(?, overall_score),
                seo_score = COALESCE(?, seo_score),
                llmo_score = COALESCE(?, llmo_score),
                geo_score = COALESCE(?, geo_score),
                serp_score = COALESCE(?, serp_score),
                pages_audited = COALESCE(?, pages_audited),
                seo_audit_data = COALESCE(?, seo_audit_data),
                geo_data = COALESCE(?, geo_data),
                serp_data = COALESCE(?, serp_data),
                gsc_insights = COALESCE(?, gsc_insights),
                ai_tips = COALESCE(?, ai_tips),
                error_message = COALESCE(?, error_message),
                generated_at = COALESCE(?, generated_at)
            WHERE id = ?
            "#,
        )
        .bind(patch.status.as_ref().map(|s| s.as_str()))
        .bind(patch.overall_score.map(i64::from))
        .bind(patch.seo_score.map(i64::from))
        .bind(patch.llmo_score.map(i64::from))
        .bind(patch.geo_score.map(i64::from))
        .bind(patch.serp_score.map(i64::from))
        .bind(patch.pages_audited)
        .bind(seo_audit_data)
        .bind(geo_data)
        .bind(serp_data)
        .bind(gsc_insights)
        .bind(ai_tips)
        .bind(&patch.error_message)
        .bind(patch.generated_at.map(|t| t.to_rfc3339()))
        .bind(report_id)
        .execute(&self.pool)
        .await
        .context("Failed to update report")?;

        if let Some(status) = &patch.status {
            tracing::info!("Updated report {} to status: {}", report_id, status.as_str());
        }
        Ok(())
    }

    async fn find_latest_completed(&self, config_id: &str) -> Result<Option<BrandReport>> {
        self.find_by_status(config_id, ReportStatus::Completed).await
    }

    async fn find_running(&self, config_id: &str) -> Result<Option<BrandReport>> {
        self.find_by_status(config_id, ReportStatus::Running).await
    }
}

impl SqliteReportStore {
    async fn find_by_status(
        &self,
        config_id: &str,
        status: ReportStatus,
    ) -> Result<Option<BrandReport>> {
        let row = sqlx::query(
            r#"
            SELECT
                id, config_id, status, overall_score, seo_score, llmo_score,
                geo_score, serp_score, pages_audited, seo_audit_data,
                geo_data, serp_data, gsc_insights, ai_tips, error_message,
                generated_at, created_at
            FROM brand_reports
            WHERE config_id = ? AND status = ?
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(config_id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch report")?;

        Ok(row.map(|row| row_to_report(&row)))
    }
}

fn row_to_report(row: &sqlx::sqlite::SqliteRow) -> BrandReport {
    BrandReport {
        id: row.get("id"),
        config_id: row.get("config_id"),
        status: ReportStatus::parse(row.get::<&str, _>("status")),
        overall_score: get_score(row, "overall_score"),
        seo_score: get_score(row, "seo_score"),
        llmo_score: get_score(row, "llmo_score"),
        geo_score: get_score(row, "geo_score"),
        serp_score: get_score(row, "serp_score"),
        pages_audited: row.get("pages_audited"),
        seo_audit_data: get_json(row, "seo_audit_data"),
        geo_data: get_json(row, "geo_data"),
        serp_data: get_json(row, "serp_data"),
        gsc_insights: get_json(row, "gsc_insights"),
        ai_tips: get_json(row, "ai_tips"),
        error_message: row.get("error_message"),
        generated_at: row
            .get::<Option<&str>, _>("generated_at")
            .map(parse_datetime),
        created_at: parse_datetime(row.get("created_at")),
    }
}

fn get_score(row: &sqlx::sqlite::SqliteRow, column: &str) -> Option<u8> {
    row.get::<Option<i64>, _>(column)
        .map(|v| v.clamp(0, 100) as u8)
}

fn get_json<T: serde::de::DeserializeOwned>(
    row: &sqlx::sqlite::SqliteRow,
    column: &str,
) -> Option<T> {
    row.get::<Option<String>, _>(column)
        .and_then(|raw| serde_json::from_str(&raw).ok())
}

fn parse_datetime(s: &str) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;
    use crate::domain::models::{CrawlAggregates, SiteCrawlResult};
    use std::time::Duration;

    async fn store() -> SqliteReportStore {
        SqliteReportStore::new(connect_in_memory().await.unwrap())
    }

    fn completed_patch(overall: u8) -> ReportPatch {
        ReportPatch {
            status: Some(ReportStatus::Completed),
            overall_score: Some(overall),
            seo_score: Some(80),
            llmo_score: Some(60),
            geo_score: Some(50),
            serp_score: Some(40),
            pages_audited: Some(3),
            seo_audit_data: Some(SiteCrawlResult {
                sitemap_url: Some("https://s.com/sitemap.xml".to_string()),
                pages_discovered: 5,
                pages_audited: 3,
                pages: vec![],
                aggregated: CrawlAggregates::default(),
            }),
            geo_data: None,
            serp_data: None,
            gsc_insights: Some(serde_json::json!({"top_queries": []})),
            ai_tips: None,
            error_message: None,
            generated_at: Some(Utc::now()),
        }
    }

    #[tokio::test]
    async fn created_report_is_running() {
        let store = store().await;
        let id = store.create_report("cfg").await.unwrap();

        let running = store.find_running("cfg").await.unwrap().unwrap();
        assert_eq!(running.id, id);
        assert_eq!(running.status, ReportStatus::Running);
        assert!(running.overall_score.is_none());
        assert!(store.find_latest_completed("cfg").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn completed_patch_roundtrips() {
        let store = store().await;
        let id = store.create_report("cfg").await.unwrap();
        store.update_report(&id, &completed_patch(61)).await.unwrap();

        assert!(store.find_running("cfg").await.unwrap().is_none());
        let report = store.find_latest_completed("cfg").await.unwrap().unwrap();
        assert_eq!(report.overall_score, Some(61));
        assert_eq!(report.pages_audited, Some(3));
        let crawl = report.seo_audit_data.unwrap();
        assert_eq!(crawl.pages_discovered, 5);
        assert!(report.generated_at.is_some());
    }

    #[tokio::test]
    async fn latest_completed_is_newest() {
        let store = store().await;
        let first = store.create_report("cfg").await.unwrap();
        store
            .update_report(&first, &completed_patch(10))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = store.create_report("cfg").await.unwrap();
        store
            .update_report(&second, &completed_patch(90))
            .await
            .unwrap();

        let latest = store.find_latest_completed("cfg").await.unwrap().unwrap();
        assert_eq!(latest.id, second);
        assert_eq!(latest.overall_score, Some(90));
    }

    #[tokio::test]
    async fn failed_reports_are_not_completed() {
        let store = store().await;
        let id = store.create_report("cfg").await.unwrap();
        store
            .update_report(&id, &ReportPatch::failed("crawl exploded"))
            .await
            .unwrap();

        assert!(store.find_running("cfg").await.unwrap().is_none());
        assert!(store.find_latest_completed("cfg").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lookups_are_scoped_by_config() {
        let store = store().await;
        let id = store.create_report("cfg-a").await.unwrap();
        store.update_report(&id, &completed_patch(42)).await.unwrap();

        assert!(store.find_latest_completed("cfg-b").await.unwrap().is_none());
        assert!(store
            .find_latest_completed("cfg-a")
            .await
            .unwrap()
            .is_some());
    }
}
