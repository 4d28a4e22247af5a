use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::store::sqlite::SqliteStore;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let store = SqliteStore::open(&config.db.path).await?;
    store.pool().close().await;
    Ok(())
}

/// Create every table and index. Safe to run repeatedly.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    // Create tracking ledger
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS file_tracking (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            provider TEXT NOT NULL,
            filename TEXT NOT NULL,
            processed_at INTEGER NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('processing', 'success', 'failed')),
            records_processed INTEGER NOT NULL DEFAULT 0,
            error_message TEXT,
            content_sha256 TEXT,
            UNIQUE(provider, filename)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create canonical record store
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS platform_information (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file_tracking_id INTEGER NOT NULL,
            timestamp INTEGER NOT NULL,
            owner_id TEXT,
            project TEXT,
            tag TEXT,
            label TEXT,
            developer_id TEXT,
            task_number TEXT,
            environment TEXT,
            user_story TEXT,
            task_point INTEGER NOT NULL DEFAULT 0,
            sprint TEXT,
            provider TEXT NOT NULL,
            FOREIGN KEY (file_tracking_id) REFERENCES file_tracking(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_file_tracking_provider ON file_tracking(provider)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_file_tracking_status ON file_tracking(status)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_file_tracking_processed_at ON file_tracking(processed_at DESC)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_platform_information_provider ON platform_information(provider)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
