//! Ingestion orchestration.
//!
//! Drives each snapshot file through claim → transform → store → finalize:
//!
//! ```text
//! Discovered ─▶ Claimed ─▶ (Transforming) ─▶ Stored + success
//!                  │
//!                  └──────────────────────▶ failed
//! ```
//!
//! Records and the `success` transition commit together
//! ([`Store::commit_records`]); any error before that point finalizes the
//! entry as `failed`. Whether the error then reaches the caller depends on
//! the process-wide [`FailureMode`].

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::{Config, FailureMode, IntakeConfig, LoaderConfig};
use crate::error::LoaderError;
use crate::models::{Provider, TrackingEntry};
use crate::scanner::{self, PendingFile};
use crate::store::sqlite::SqliteStore;
use crate::store::{Claim, Store};
use crate::tabular::{self, SnapshotReader};
use crate::transform::{transform, TransformOutcome};

/// The ingestion orchestrator.
///
/// Holds one async lock per provider so scans of the same provider never
/// overlap, even when triggered concurrently.
pub struct Loader {
    store: Arc<dyn Store>,
    intake: IntakeConfig,
    settings: LoaderConfig,
    scan_locks: [Mutex<()>; Provider::ALL.len()],
}

impl Loader {
    pub fn new(store: Arc<dyn Store>, config: &Config) -> Self {
        Self {
            store,
            intake: config.intake.clone(),
            settings: config.loader.clone(),
            scan_locks: std::array::from_fn(|_| Mutex::new(())),
        }
    }

    /// Open the configured SQLite database and build a loader on it.
    pub async fn open(config: &Config) -> Result<Self> {
        let store = SqliteStore::open(&config.db.path).await?;
        Ok(Self::new(Arc::new(store), config))
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn failure_mode(&self) -> FailureMode {
        self.settings.failure_mode
    }

    fn scan_lock(&self, provider: Provider) -> &Mutex<()> {
        &self.scan_locks[provider as usize]
    }

    /// Files the next scan of `provider` would process, without processing
    /// them.
    pub async fn pending(&self, provider: Provider) -> Result<Vec<PendingFile>, LoaderError> {
        scanner::scan(
            provider,
            &self.intake.provider_dir(provider),
            self.store.as_ref(),
        )
        .await
    }

    /// Process one file, applying the failure mode.
    ///
    /// Returns the number of records stored. `DuplicateFile` and
    /// `StuckProcessing` are always returned as errors; other failures are
    /// returned in strict mode and become `Ok(0)` in lenient mode.
    pub async fn process_file(&self, provider: Provider, path: &Path) -> Result<u64, LoaderError> {
        let _guard = self.scan_lock(provider).lock().await;
        match self.attempt(provider, path).await {
            Err(err) if !err.is_skip() && self.settings.failure_mode == FailureMode::Lenient => {
                warn!(%provider, path = %path.display(), error = %err, "skipping failed file");
                Ok(0)
            }
            other => other,
        }
    }

    /// Process every pending file for `provider` in filename order.
    ///
    /// Returns the total number of records stored.
    pub async fn scan_provider(&self, provider: Provider) -> Result<u64, LoaderError> {
        let _guard = self.scan_lock(provider).lock().await;
        info!(%provider, "scanning and processing files");

        let files = self.pending(provider).await?;
        if files.is_empty() {
            info!(%provider, "no new files to process");
            return Ok(0);
        }

        let mut total_records = 0u64;
        let mut succeeded = 0u64;
        let mut failed = 0u64;
        let mut skipped = 0u64;

        for file in &files {
            match self.attempt(provider, &file.path).await {
                Ok(n) => {
                    total_records += n;
                    succeeded += 1;
                }
                Err(err @ LoaderError::DuplicateFile { .. }) => {
                    debug!(%provider, filename = %file.filename, error = %err, "skipping already processed file");
                    skipped += 1;
                }
                Err(err @ LoaderError::StuckProcessing { .. }) => {
                    warn!(%provider, filename = %file.filename, error = %err, "skipping file stuck in processing; run `loader release` to retry it");
                    skipped += 1;
                }
                Err(err) => {
                    failed += 1;
                    if self.settings.failure_mode == FailureMode::Strict {
                        return Err(err);
                    }
                    warn!(%provider, filename = %file.filename, error = %err, "skipping failed file");
                }
            }
        }

        info!(
            %provider,
            files = files.len(),
            succeeded,
            failed,
            skipped,
            records = total_records,
            "completed provider scan"
        );

        Ok(total_records)
    }

    /// Scan every enabled provider in the fixed provider order.
    ///
    /// Returns the grand total of records stored.
    pub async fn scan_all(&self) -> Result<u64, LoaderError> {
        info!("scanning and processing all providers");

        let mut total_records = 0u64;
        for provider in self.intake.enabled_providers() {
            match self.scan_provider(provider).await {
                Ok(n) => total_records += n,
                Err(err) => {
                    error!(%provider, error = %err, "error processing provider");
                    if self.settings.failure_mode == FailureMode::Strict {
                        return Err(err);
                    }
                }
            }
        }

        info!(records = total_records, "completed processing all providers");
        Ok(total_records)
    }

    /// One attempt at a file, without the failure-mode policy. Callers must
    /// hold the provider's scan lock.
    async fn attempt(&self, provider: Provider, path: &Path) -> Result<u64, LoaderError> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| LoaderError::parse(&path.display().to_string(), "path has no file name"))?;

        info!(%provider, %filename, snapshot = ?scanner::snapshot_time(&filename), "processing file");

        // Re-checked here because the file may have completed since the scan.
        if self
            .store
            .has_succeeded(provider, &filename)
            .await
            .map_err(LoaderError::ledger)?
        {
            return Err(LoaderError::DuplicateFile { provider, filename });
        }

        // An unreadable file still gets claimed so its failure is recorded.
        let digest = tabular::file_sha256(path).ok();
        let claim = self
            .store
            .claim(provider, &filename, digest.as_deref())
            .await
            .map_err(LoaderError::ledger)?;
        let entry = match claim {
            Claim::Acquired(entry) => entry,
            Claim::AlreadySucceeded(_) => {
                return Err(LoaderError::DuplicateFile { provider, filename });
            }
            Claim::InFlight(entry) => {
                return Err(LoaderError::StuckProcessing {
                    provider,
                    filename,
                    since: entry.processed_at,
                });
            }
        };

        match self.load(&entry, path).await {
            Ok(committed) => {
                info!(
                    %provider,
                    %filename,
                    records = committed.records_processed,
                    "successfully processed file"
                );
                Ok(committed.records_processed)
            }
            Err(err) => {
                error!(%provider, %filename, error = %err, "failed to process file");
                match self.store.finalize_failure(&entry, &err.to_string()).await {
                    Ok(_) => Err(err),
                    Err(ledger_err) => {
                        error!(%provider, %filename, error = %ledger_err, "could not mark file as failed");
                        Err(LoaderError::ledger(ledger_err))
                    }
                }
            }
        }
    }

    /// Read, transform, cap, and commit one claimed file.
    async fn load(&self, entry: &TrackingEntry, path: &Path) -> Result<TrackingEntry, LoaderError> {
        let provider = entry.provider;
        let filename = entry.filename.as_str();
        let cap = self.settings.max_records_per_file;

        let reader = SnapshotReader::open(path, self.intake.delimiter_byte())
            .map_err(|e| LoaderError::parse(filename, e))?;

        let ingested_at = Utc::now();
        let mut records = Vec::new();
        let mut rows = 0u64;
        let mut quarantined = 0u64;
        let mut over_cap = 0u64;

        for (i, row) in reader.enumerate() {
            let row = row.map_err(|e| LoaderError::parse(filename, e))?;
            rows += 1;
            match transform(provider, &row, ingested_at) {
                TransformOutcome::Record(record) => {
                    if records.len() < cap {
                        records.push(record);
                    } else {
                        over_cap += 1;
                    }
                }
                TransformOutcome::Quarantined { raw_label } => {
                    quarantined += 1;
                    warn!(%provider, %filename, row = i + 1, label = %raw_label, "skipping row with invalid label");
                }
            }
        }

        debug!(%provider, %filename, rows, quarantined, "transformed rows");
        if over_cap > 0 {
            warn!(
                %provider,
                %filename,
                records = records.len() as u64 + over_cap,
                limit = cap,
                "file exceeds record limit, keeping the first {} records",
                cap
            );
        }

        self.store
            .commit_records(entry, &records)
            .await
            .map_err(|e| LoaderError::storage(filename, e))
    }
}
