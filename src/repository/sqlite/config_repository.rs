//! Brand configuration repository.
//!
//! Configuration CRUD belongs to the web layer; the engine only reads.
//! `create` exists for hosts and tests that seed configurations directly.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::domain::models::BrandConfig;
use crate::service::providers::ConfigStore;

pub struct SqliteConfigStore {
    pool: SqlitePool,
}

impl SqliteConfigStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a configuration row.
    pub async fn create(&self, config: &BrandConfig) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO brand_configs (
                id, organization_id, brand_name, website_url,
                language, description, strategic_plan, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&config.id)
        .bind(&config.organization_id)
        .bind(&config.brand_name)
        .bind(&config.website_url)
        .bind(&config.language)
        .bind(&config.description)
        .bind(&config.strategic_plan)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to create config")?;

        tracing::info!("Created config {} ({})", config.id, config.brand_name);
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for SqliteConfigStore {
    async fn get_config(&self, config_id: &str) -> Result<Option<BrandConfig>> {
        let row = sqlx::query(
            r#"
            SELECT id, organization_id, brand_name, website_url,
                   language, description, strategic_plan
            FROM brand_configs
            WHERE id = ?
            "#,
        )
        .bind(config_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch config")?;

        Ok(row.map(|row| BrandConfig {
            id: row.get("id"),
            organization_id: row.get("organization_id"),
            brand_name: row.get("brand_name"),
            website_url: row.get("website_url"),
            language: row.get("language"),
            description: row.get("description"),
            strategic_plan: row.get("strategic_plan"),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;

    fn config(id: &str) -> BrandConfig {
        BrandConfig {
            id: id.to_string(),
            organization_id: "org".to_string(),
            brand_name: "Acme".to_string(),
            website_url: Some("https://acme.test".to_string()),
            language: "it".to_string(),
            description: Some("widgets".to_string()),
            strategic_plan: None,
        }
    }

    #[tokio::test]
    async fn create_and_fetch_roundtrip() {
        let store = SqliteConfigStore::new(connect_in_memory().await.unwrap());
        store.create(&config("cfg-1")).await.unwrap();

        let found = store.get_config("cfg-1").await.unwrap().unwrap();
        assert_eq!(found.brand_name, "Acme");
        assert_eq!(found.website_url.as_deref(), Some("https://acme.test"));
        assert_eq!(found.language, "it");
        assert!(found.strategic_plan.is_none());
    }

    #[tokio::test]
    async fn unknown_config_is_none() {
        let store = SqliteConfigStore::new(connect_in_memory().await.unwrap());
        assert!(store.get_config("missing").await.unwrap().is_none());
    }
}
