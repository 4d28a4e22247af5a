//! Error taxonomy for file and scan processing.
//!
//! Row-level problems never appear here: a row with an unrecognized label
//! is an expected outcome and is modeled as
//! [`TransformOutcome::Quarantined`](crate::transform::TransformOutcome).

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::Provider;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum LoaderError {
    /// The file already has a `success` tracking entry. Callers treat this
    /// as a skip, not a failure.
    #[error("file already processed successfully: {provider}/{filename}")]
    DuplicateFile { provider: Provider, filename: String },

    /// The file has an entry that is still `processing`, usually left behind
    /// by a crash mid-file. Needs `loader release` before it is retried.
    #[error("file is stuck in processing since {since}: {provider}/{filename}")]
    StuckProcessing {
        provider: Provider,
        filename: String,
        since: DateTime<Utc>,
    },

    #[error("failed to parse {filename}: {source}")]
    ParseFailure {
        filename: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to store records from {filename}: {source}")]
    StorageFailure {
        filename: String,
        #[source]
        source: BoxError,
    },

    #[error("tracking ledger error: {0}")]
    Ledger(#[source] BoxError),

    #[error("failed to scan intake directory for {provider}: {source}")]
    Intake {
        provider: Provider,
        #[source]
        source: BoxError,
    },

    #[error("unknown provider: '{0}'. Must be github, jira, or clickup.")]
    UnknownProvider(String),
}

impl LoaderError {
    pub fn parse(filename: &str, source: impl Into<BoxError>) -> Self {
        LoaderError::ParseFailure {
            filename: filename.to_string(),
            source: source.into(),
        }
    }

    pub fn storage(filename: &str, source: impl Into<BoxError>) -> Self {
        LoaderError::StorageFailure {
            filename: filename.to_string(),
            source: source.into(),
        }
    }

    pub fn ledger(source: impl Into<BoxError>) -> Self {
        LoaderError::Ledger(source.into())
    }

    /// Expected per-file outcomes that a provider scan skips without
    /// counting them against the failure policy.
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            LoaderError::DuplicateFile { .. } | LoaderError::StuckProcessing { .. }
        )
    }
}
