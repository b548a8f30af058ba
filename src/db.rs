//! SQLite pool construction and embedded schema.

use anyhow::{Context, Result};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::time::Duration;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS brand_configs (
    id TEXT PRIMARY KEY,
    organization_id TEXT NOT NULL,
    brand_name TEXT NOT NULL,
    website_url TEXT,
    language TEXT NOT NULL DEFAULT 'en',
    description TEXT,
    strategic_plan TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS brand_reports (
    id TEXT PRIMARY KEY,
    config_id TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'running',
    overall_score INTEGER,
    seo_score INTEGER,
    llmo_score INTEGER,
    geo_score INTEGER,
    serp_score INTEGER,
    pages_audited INTEGER,
    seo_audit_data TEXT,
    geo_data TEXT,
    serp_data TEXT,
    gsc_insights TEXT,
    ai_tips TEXT,
    error_message TEXT,
    generated_at TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_brand_reports_config_created
    ON brand_reports (config_id, created_at DESC)
"#;

/// Configure SQLite pragmas per connection.
async fn configure_sqlite_pragmas(conn: &mut sqlx::SqliteConnection) -> Result<(), sqlx::Error> {
    use sqlx::Executor;

    conn.execute("PRAGMA journal_mode = WAL").await?;
    conn.execute("PRAGMA synchronous = NORMAL").await?;
    conn.execute("PRAGMA busy_timeout = 5000").await?;
    conn.execute("PRAGMA foreign_keys = ON").await?;

    Ok(())
}

/// Connect to a SQLite database and ensure the schema exists.
/// `database_url` is a sqlx URL, e.g. `sqlite://reports.db?mode=rwc`.
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                configure_sqlite_pragmas(conn).await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await
        .context(format!("failed to connect to database at {}", database_url))?;

    init_schema(&pool).await?;
    tracing::info!("Database initialized at {}", database_url);
    Ok(pool)
}

/// In-memory database for tests. A single connection keeps every query on
/// the same in-memory instance.
pub async fn connect_in_memory() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .context("failed to create in-memory database")?;
    init_schema(&pool).await?;
    Ok(pool)
}

async fn init_schema(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA.split(';') {
        let statement = statement.trim();
        if statement.is_empty() {
            continue;
        }
        sqlx::query(statement)
            .execute(pool)
            .await
            .context("failed to apply schema statement")?;
    }
    Ok(())
}
