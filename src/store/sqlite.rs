//! SQLite-backed [`Store`] implementation.
//!
//! Entries live in `file_tracking`, records in `platform_information`.
//! Timestamps are stored as Unix milliseconds.

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqliteConnection, SqlitePool};

use super::{check_finalize, Claim, Store, RELEASED_BY_OPERATOR};
use crate::migrate::apply_schema;
use crate::models::{
    CanonicalRecord, Label, ProcessStatus, Provider, StatusCounts, TrackingEntry,
};

const ENTRY_COLUMNS: &str = "id, provider, filename, processed_at, status, records_processed, error_message, content_sha256";

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the database at `path`, creating the file, its parent
    /// directories and the schema as needed.
    ///
    /// `platform_information.file_tracking_id` references `file_tracking`,
    /// so connections enforce foreign keys.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating database directory {}", parent.display()))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| format!("opening database {}", path.display()))?;

        apply_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Apply a finalize `UPDATE` guarded on `status = 'processing'`; when it
    /// matches nothing, decide between idempotent repeat and conflict.
    async fn finalize(
        &self,
        entry: &TrackingEntry,
        target: ProcessStatus,
        record_count: u64,
        error: Option<&str>,
    ) -> Result<TrackingEntry> {
        let mut conn = self.pool.acquire().await?;
        let applied = mark_terminal(&mut conn, entry.id, target, record_count, error).await?;
        let current = fetch_by_id(&mut conn, entry.id).await?;
        if !applied {
            check_finalize(&current, target)?;
        }
        Ok(current)
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn millis_to_utc(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

fn entry_from_row(row: &SqliteRow) -> Result<TrackingEntry> {
    let provider: String = row.try_get("provider")?;
    let status: String = row.try_get("status")?;
    let records_processed: i64 = row.try_get("records_processed")?;
    Ok(TrackingEntry {
        id: row.try_get("id")?,
        provider: provider.parse()?,
        filename: row.try_get("filename")?,
        processed_at: millis_to_utc(row.try_get("processed_at")?),
        status: ProcessStatus::parse(&status)
            .ok_or_else(|| anyhow!("unknown tracking status in database: {}", status))?,
        records_processed: records_processed.max(0) as u64,
        error_message: row.try_get("error_message")?,
        content_sha256: row.try_get("content_sha256")?,
    })
}

fn record_from_row(row: &SqliteRow) -> Result<CanonicalRecord> {
    let provider: String = row.try_get("provider")?;
    let label: Option<String> = row.try_get("label")?;
    let label = match label {
        Some(tag) => Some(
            Label::from_normalized(&tag)
                .ok_or_else(|| anyhow!("unknown label in database: {}", tag))?,
        ),
        None => None,
    };
    Ok(CanonicalRecord {
        ingested_at: millis_to_utc(row.try_get("timestamp")?),
        owner_id: row.try_get("owner_id")?,
        project: row.try_get("project")?,
        tag: row.try_get("tag")?,
        label,
        developer_id: row.try_get("developer_id")?,
        task_number: row.try_get("task_number")?,
        environment: row.try_get("environment")?,
        user_story: row.try_get("user_story")?,
        task_point: row.try_get("task_point")?,
        sprint: row.try_get("sprint")?,
        provider: provider.parse()?,
    })
}

async fn fetch_by_id(conn: &mut SqliteConnection, id: i64) -> Result<TrackingEntry> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM file_tracking WHERE id = ?",
        ENTRY_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| anyhow!("tracking entry {} not found", id))?;
    entry_from_row(&row)
}

async fn fetch_by_name(
    conn: &mut SqliteConnection,
    provider: Provider,
    filename: &str,
) -> Result<Option<TrackingEntry>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM file_tracking WHERE provider = ? AND filename = ?",
        ENTRY_COLUMNS
    ))
    .bind(provider.as_str())
    .bind(filename)
    .fetch_optional(&mut *conn)
    .await?;
    row.as_ref().map(entry_from_row).transpose()
}

/// Returns whether the row was still `processing` and has been updated.
async fn mark_terminal(
    conn: &mut SqliteConnection,
    id: i64,
    target: ProcessStatus,
    record_count: u64,
    error: Option<&str>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE file_tracking
        SET status = ?, records_processed = ?, error_message = ?, processed_at = ?
        WHERE id = ? AND status = 'processing'
        "#,
    )
    .bind(target.as_str())
    .bind(record_count as i64)
    .bind(error)
    .bind(now_millis())
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

#[async_trait]
impl Store for SqliteStore {
    async fn has_succeeded(&self, provider: Provider, filename: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT COUNT(*) > 0 FROM file_tracking WHERE provider = ? AND filename = ? AND status = 'success'",
        )
        .bind(provider.as_str())
        .bind(filename)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn claim(
        &self,
        provider: Provider,
        filename: &str,
        content_sha256: Option<&str>,
    ) -> Result<Claim> {
        let mut tx = self.pool.begin().await?;

        // Only a `failed` row may be re-opened; the WHERE makes the upsert a
        // no-op for `success` and `processing`.
        let result = sqlx::query(
            r#"
            INSERT INTO file_tracking (provider, filename, processed_at, status, records_processed, error_message, content_sha256)
            VALUES (?, ?, ?, 'processing', 0, NULL, ?)
            ON CONFLICT(provider, filename) DO UPDATE SET
                processed_at = excluded.processed_at,
                status = 'processing',
                records_processed = 0,
                error_message = NULL,
                content_sha256 = excluded.content_sha256
            WHERE file_tracking.status = 'failed'
            "#,
        )
        .bind(provider.as_str())
        .bind(filename)
        .bind(now_millis())
        .bind(content_sha256)
        .execute(&mut *tx)
        .await?;

        let entry = fetch_by_name(&mut tx, provider, filename)
            .await?
            .ok_or_else(|| anyhow!("tracking entry vanished for {}/{}", provider, filename))?;
        tx.commit().await?;

        if result.rows_affected() > 0 {
            return Ok(Claim::Acquired(entry));
        }
        match entry.status {
            ProcessStatus::Success => Ok(Claim::AlreadySucceeded(entry)),
            ProcessStatus::Processing => Ok(Claim::InFlight(entry)),
            ProcessStatus::Failed => bail!(
                "claim of failed entry {}/{} was not applied",
                provider,
                filename
            ),
        }
    }

    async fn commit_records(
        &self,
        entry: &TrackingEntry,
        records: &[CanonicalRecord],
    ) -> Result<TrackingEntry> {
        let mut tx = self.pool.begin().await?;

        let applied = mark_terminal(
            &mut tx,
            entry.id,
            ProcessStatus::Success,
            records.len() as u64,
            None,
        )
        .await?;
        if !applied {
            bail!(
                "cannot commit records for {}/{}: entry is no longer processing",
                entry.provider,
                entry.filename
            );
        }

        for record in records {
            sqlx::query(
                r#"
                INSERT INTO platform_information (file_tracking_id, timestamp, owner_id, project, tag, label, developer_id, task_number, environment, user_story, task_point, sprint, provider)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(entry.id)
            .bind(record.ingested_at.timestamp_millis())
            .bind(&record.owner_id)
            .bind(&record.project)
            .bind(&record.tag)
            .bind(record.label.map(|l| l.as_str()))
            .bind(&record.developer_id)
            .bind(&record.task_number)
            .bind(&record.environment)
            .bind(&record.user_story)
            .bind(record.task_point)
            .bind(&record.sprint)
            .bind(record.provider.as_str())
            .execute(&mut *tx)
            .await
            .with_context(|| format!("inserting record into platform_information for {}", entry.filename))?;
        }

        let committed = fetch_by_id(&mut tx, entry.id).await?;
        tx.commit().await?;
        Ok(committed)
    }

    async fn finalize_success(
        &self,
        entry: &TrackingEntry,
        record_count: u64,
    ) -> Result<TrackingEntry> {
        self.finalize(entry, ProcessStatus::Success, record_count, None)
            .await
    }

    async fn finalize_failure(&self, entry: &TrackingEntry, error: &str) -> Result<TrackingEntry> {
        self.finalize(entry, ProcessStatus::Failed, 0, Some(error))
            .await
    }

    async fn release(&self, provider: Provider, filename: &str) -> Result<Option<TrackingEntry>> {
        let mut conn = self.pool.acquire().await?;
        let Some(entry) = fetch_by_name(&mut conn, provider, filename).await? else {
            return Ok(None);
        };
        if entry.status != ProcessStatus::Processing {
            bail!(
                "{}/{} is {}, only processing entries can be released",
                provider,
                filename,
                entry.status
            );
        }
        drop(conn);
        self.finalize(&entry, ProcessStatus::Failed, 0, Some(RELEASED_BY_OPERATOR))
            .await
            .map(Some)
    }

    async fn statistics(&self, provider: Provider) -> Result<StatusCounts> {
        let rows = sqlx::query(
            "SELECT status, COUNT(*) AS n FROM file_tracking WHERE provider = ? GROUP BY status",
        )
        .bind(provider.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut counts = StatusCounts::default();
        for row in &rows {
            let status: String = row.try_get("status")?;
            let n: i64 = row.try_get("n")?;
            match ProcessStatus::parse(&status) {
                Some(ProcessStatus::Success) => counts.success = n as u64,
                Some(ProcessStatus::Failed) => counts.failed = n as u64,
                Some(ProcessStatus::Processing) => counts.processing = n as u64,
                None => bail!("unknown tracking status in database: {}", status),
            }
        }
        Ok(counts)
    }

    async fn latest(&self, provider: Provider) -> Result<Option<TrackingEntry>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM file_tracking WHERE provider = ? ORDER BY processed_at DESC, id DESC LIMIT 1",
            ENTRY_COLUMNS
        ))
        .bind(provider.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(entry_from_row).transpose()
    }

    async fn stale_processing(
        &self,
        provider: Provider,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<TrackingEntry>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM file_tracking WHERE provider = ? AND status = 'processing' AND processed_at < ? ORDER BY processed_at ASC, id ASC",
            ENTRY_COLUMNS
        ))
        .bind(provider.as_str())
        .bind(older_than.timestamp_millis())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(entry_from_row).collect()
    }

    async fn entry(&self, provider: Provider, filename: &str) -> Result<Option<TrackingEntry>> {
        let mut conn = self.pool.acquire().await?;
        fetch_by_name(&mut conn, provider, filename).await
    }

    async fn records(&self, provider: Provider) -> Result<Vec<CanonicalRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT timestamp, owner_id, project, tag, label, developer_id, task_number,
                   environment, user_story, task_point, sprint, provider
            FROM platform_information
            WHERE provider = ?
            ORDER BY id ASC
            "#,
        )
        .bind(provider.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(record_from_row).collect()
    }
}
