//! Storage abstraction: the tracking ledger plus the canonical record sink.
//!
//! The [`Store`] trait covers every storage operation the orchestrator and
//! reporter need, enabling pluggable backends (SQLite for the binary,
//! in-memory for tests and embedding).
//!
//! The ledger and the record sink live behind one trait because a file's
//! records and its `success` transition must commit together: see
//! [`Store::commit_records`].
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;
pub mod sqlite;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{CanonicalRecord, ProcessStatus, Provider, StatusCounts, TrackingEntry};

/// Error text written by [`Store::release`].
pub const RELEASED_BY_OPERATOR: &str = "released by operator";

/// Result of [`Store::claim`].
#[derive(Debug, Clone, PartialEq)]
pub enum Claim {
    /// A fresh or previously-failed entry is now `processing` and owned by
    /// the caller.
    Acquired(TrackingEntry),
    /// The file already reached `success`; nothing was changed.
    AlreadySucceeded(TrackingEntry),
    /// Another attempt left the entry in `processing`; nothing was changed.
    InFlight(TrackingEntry),
}

/// Abstract storage backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`has_succeeded`](Store::has_succeeded) | Scanner/orchestrator pre-check |
/// | [`claim`](Store::claim) | Atomically open a `processing` entry |
/// | [`commit_records`](Store::commit_records) | Append a batch and finalize `success` in one transaction |
/// | [`finalize_success`](Store::finalize_success) | Mark a claimed entry `success` |
/// | [`finalize_failure`](Store::finalize_failure) | Mark a claimed entry `failed` |
/// | [`release`](Store::release) | Operator recovery for a stuck entry |
/// | [`statistics`](Store::statistics) | Entry counts by status |
/// | [`latest`](Store::latest) | Most recent entry for a provider |
/// | [`stale_processing`](Store::stale_processing) | Entries stuck in `processing` |
/// | [`entry`](Store::entry) | Look up one `(provider, filename)` entry |
/// | [`records`](Store::records) | Read back stored canonical records |
#[async_trait]
pub trait Store: Send + Sync {
    /// Whether a `success` entry exists for the pair.
    async fn has_succeeded(&self, provider: Provider, filename: &str) -> Result<bool>;

    /// Create a `processing` entry, or re-open a `failed` one.
    ///
    /// Entries that are `success` or still `processing` are returned
    /// untouched via [`Claim::AlreadySucceeded`] / [`Claim::InFlight`].
    async fn claim(
        &self,
        provider: Provider,
        filename: &str,
        content_sha256: Option<&str>,
    ) -> Result<Claim>;

    /// Append `records` and finalize `entry` as `success` with
    /// `records.len()` as its count. Either both happen or neither does.
    async fn commit_records(
        &self,
        entry: &TrackingEntry,
        records: &[CanonicalRecord],
    ) -> Result<TrackingEntry>;

    /// Transition a claimed entry to `success`. A no-op if it already is.
    async fn finalize_success(
        &self,
        entry: &TrackingEntry,
        record_count: u64,
    ) -> Result<TrackingEntry>;

    /// Transition a claimed entry to `failed`. A no-op if it already is.
    async fn finalize_failure(&self, entry: &TrackingEntry, error: &str) -> Result<TrackingEntry>;

    /// Move a `processing` entry to `failed` so the next scan retries it.
    ///
    /// Returns `None` when there is no entry for the pair. Fails if the
    /// entry is not `processing`.
    async fn release(&self, provider: Provider, filename: &str) -> Result<Option<TrackingEntry>>;

    async fn statistics(&self, provider: Provider) -> Result<StatusCounts>;

    /// Most recently timestamped entry regardless of status.
    async fn latest(&self, provider: Provider) -> Result<Option<TrackingEntry>>;

    /// `processing` entries whose timestamp is before `older_than`, oldest
    /// first.
    async fn stale_processing(
        &self,
        provider: Provider,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<TrackingEntry>>;

    async fn entry(&self, provider: Provider, filename: &str) -> Result<Option<TrackingEntry>>;

    /// Stored canonical records for a provider, in insertion order.
    async fn records(&self, provider: Provider) -> Result<Vec<CanonicalRecord>>;
}

/// Decide what a finalize call does given the entry's current status.
///
/// Returns `true` when the transition should be applied, `false` when it is
/// an idempotent repeat, and an error when the entry already holds the other
/// terminal state.
pub(crate) fn check_finalize(current: &TrackingEntry, target: ProcessStatus) -> Result<bool> {
    match current.status {
        ProcessStatus::Processing => Ok(true),
        status if status == target => Ok(false),
        status => bail!(
            "cannot mark {}/{} as {}: entry is already {}",
            current.provider,
            current.filename,
            target,
            status
        ),
    }
}
