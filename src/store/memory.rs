//! In-memory [`Store`] implementation for tests and embedding.
//!
//! A single `Mutex` guards entries and records together, which gives
//! [`Store::commit_records`] its all-or-nothing behavior for free.

use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{check_finalize, Claim, Store, RELEASED_BY_OPERATOR};
use crate::models::{CanonicalRecord, ProcessStatus, Provider, StatusCounts, TrackingEntry};

#[derive(Default)]
struct Inner {
    entries: Vec<TrackingEntry>,
    records: Vec<(i64, CanonicalRecord)>,
    next_id: i64,
}

impl Inner {
    fn find(&self, provider: Provider, filename: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.provider == provider && e.filename == filename)
    }

    fn by_id(&mut self, id: i64) -> Result<&mut TrackingEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| anyhow!("tracking entry {} not found", id))
    }

    fn finalize(
        &mut self,
        id: i64,
        target: ProcessStatus,
        record_count: u64,
        error: Option<&str>,
    ) -> Result<TrackingEntry> {
        let entry = self.by_id(id)?;
        if check_finalize(entry, target)? {
            entry.status = target;
            entry.records_processed = record_count;
            entry.error_message = error.map(str::to_string);
            entry.processed_at = Utc::now();
        }
        Ok(entry.clone())
    }
}

/// In-memory store for tests and embedding.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn has_succeeded(&self, provider: Provider, filename: &str) -> Result<bool> {
        let inner = self.lock()?;
        Ok(inner
            .find(provider, filename)
            .is_some_and(|i| inner.entries[i].status == ProcessStatus::Success))
    }

    async fn claim(
        &self,
        provider: Provider,
        filename: &str,
        content_sha256: Option<&str>,
    ) -> Result<Claim> {
        let mut inner = self.lock()?;
        let now = Utc::now();

        if let Some(i) = inner.find(provider, filename) {
            let entry = &mut inner.entries[i];
            return Ok(match entry.status {
                ProcessStatus::Success => Claim::AlreadySucceeded(entry.clone()),
                ProcessStatus::Processing => Claim::InFlight(entry.clone()),
                ProcessStatus::Failed => {
                    entry.status = ProcessStatus::Processing;
                    entry.processed_at = now;
                    entry.records_processed = 0;
                    entry.error_message = None;
                    entry.content_sha256 = content_sha256.map(str::to_string);
                    Claim::Acquired(entry.clone())
                }
            });
        }

        inner.next_id += 1;
        let entry = TrackingEntry {
            id: inner.next_id,
            provider,
            filename: filename.to_string(),
            processed_at: now,
            status: ProcessStatus::Processing,
            records_processed: 0,
            error_message: None,
            content_sha256: content_sha256.map(str::to_string),
        };
        inner.entries.push(entry.clone());
        Ok(Claim::Acquired(entry))
    }

    async fn commit_records(
        &self,
        entry: &TrackingEntry,
        records: &[CanonicalRecord],
    ) -> Result<TrackingEntry> {
        let mut inner = self.lock()?;
        if inner.by_id(entry.id)?.status != ProcessStatus::Processing {
            bail!(
                "cannot commit records for {}/{}: entry is no longer processing",
                entry.provider,
                entry.filename
            );
        }
        let committed = inner.finalize(entry.id, ProcessStatus::Success, records.len() as u64, None)?;
        inner
            .records
            .extend(records.iter().cloned().map(|r| (entry.id, r)));
        Ok(committed)
    }

    async fn finalize_success(
        &self,
        entry: &TrackingEntry,
        record_count: u64,
    ) -> Result<TrackingEntry> {
        self.lock()?
            .finalize(entry.id, ProcessStatus::Success, record_count, None)
    }

    async fn finalize_failure(&self, entry: &TrackingEntry, error: &str) -> Result<TrackingEntry> {
        self.lock()?
            .finalize(entry.id, ProcessStatus::Failed, 0, Some(error))
    }

    async fn release(&self, provider: Provider, filename: &str) -> Result<Option<TrackingEntry>> {
        let mut inner = self.lock()?;
        let Some(i) = inner.find(provider, filename) else {
            return Ok(None);
        };
        let entry = &inner.entries[i];
        if entry.status != ProcessStatus::Processing {
            bail!(
                "{}/{} is {}, only processing entries can be released",
                provider,
                filename,
                entry.status
            );
        }
        let id = entry.id;
        inner
            .finalize(id, ProcessStatus::Failed, 0, Some(RELEASED_BY_OPERATOR))
            .map(Some)
    }

    async fn statistics(&self, provider: Provider) -> Result<StatusCounts> {
        let inner = self.lock()?;
        let mut counts = StatusCounts::default();
        for entry in inner.entries.iter().filter(|e| e.provider == provider) {
            match entry.status {
                ProcessStatus::Success => counts.success += 1,
                ProcessStatus::Failed => counts.failed += 1,
                ProcessStatus::Processing => counts.processing += 1,
            }
        }
        Ok(counts)
    }

    async fn latest(&self, provider: Provider) -> Result<Option<TrackingEntry>> {
        let inner = self.lock()?;
        Ok(inner
            .entries
            .iter()
            .filter(|e| e.provider == provider)
            .max_by_key(|e| (e.processed_at, e.id))
            .cloned())
    }

    async fn stale_processing(
        &self,
        provider: Provider,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<TrackingEntry>> {
        let inner = self.lock()?;
        let mut stale: Vec<TrackingEntry> = inner
            .entries
            .iter()
            .filter(|e| {
                e.provider == provider
                    && e.status == ProcessStatus::Processing
                    && e.processed_at < older_than
            })
            .cloned()
            .collect();
        stale.sort_by_key(|e| (e.processed_at, e.id));
        Ok(stale)
    }

    async fn entry(&self, provider: Provider, filename: &str) -> Result<Option<TrackingEntry>> {
        let inner = self.lock()?;
        Ok(inner.find(provider, filename).map(|i| inner.entries[i].clone()))
    }

    async fn records(&self, provider: Provider) -> Result<Vec<CanonicalRecord>> {
        let inner = self.lock()?;
        Ok(inner
            .records
            .iter()
            .filter(|(_, r)| r.provider == provider)
            .map(|(_, r)| r.clone())
            .collect())
    }
}
