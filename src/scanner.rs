//! Intake directory scanning.
//!
//! Finds snapshot files named `{provider}_{yyyy}_{MM}_{dd}T{HH}_{mm}_{ss}`
//! in a provider's intake directory and drops the ones the ledger already
//! marks `success`. The fixed-width timestamp makes lexicographic filename
//! order the same as chronological order, which is the order returned.

use anyhow::Result;
use chrono::NaiveDateTime;
use globset::{Glob, GlobMatcher};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::LoaderError;
use crate::models::Provider;
use crate::store::Store;

const TIMESTAMP_GLOB: &str = "[0-9][0-9][0-9][0-9]_[0-9][0-9]_[0-9][0-9]T[0-9][0-9]_[0-9][0-9]_[0-9][0-9]";

/// A file the orchestrator should process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub provider: Provider,
    pub filename: String,
    pub path: PathBuf,
}

/// Matcher for `provider`'s snapshot filenames. Matches whole names only.
pub fn filename_matcher(provider: Provider) -> Result<GlobMatcher> {
    let glob = Glob::new(&format!("{}_{}", provider.as_str(), TIMESTAMP_GLOB))?;
    Ok(glob.compile_matcher())
}

/// Timestamp encoded in a snapshot filename, e.g.
/// `jira_2024_08_22T13_30_00` → `2024-08-22 13:30:00`.
pub fn snapshot_time(filename: &str) -> Option<NaiveDateTime> {
    let (_, stamp) = filename.split_once('_')?;
    NaiveDateTime::parse_from_str(stamp, "%Y_%m_%dT%H_%M_%S").ok()
}

/// Candidate files in `dir`, in filename order, excluding successes.
///
/// A missing directory yields an empty list. Directory errors surface as
/// [`LoaderError::Intake`], ledger lookups as [`LoaderError::Ledger`].
pub async fn scan(
    provider: Provider,
    dir: &Path,
    store: &dyn Store,
) -> Result<Vec<PendingFile>, LoaderError> {
    let matched = list_snapshot_files(provider, dir).map_err(|source| LoaderError::Intake {
        provider,
        source: source.into(),
    })?;
    let found = matched.len();

    let mut pending = Vec::with_capacity(found);
    for file in matched {
        if store
            .has_succeeded(provider, &file.filename)
            .await
            .map_err(LoaderError::ledger)?
        {
            debug!(%provider, filename = %file.filename, "file already processed");
            continue;
        }
        pending.push(file);
    }

    info!(%provider, found, pending = pending.len(), "scanned intake directory");
    Ok(pending)
}

/// Snapshot files directly inside `dir` whose names match `provider`'s
/// pattern, sorted by name. Ledger state is not consulted.
pub fn list_snapshot_files(provider: Provider, dir: &Path) -> Result<Vec<PendingFile>> {
    if !dir.is_dir() {
        debug!(%provider, dir = %dir.display(), "intake directory does not exist");
        return Ok(Vec::new());
    }

    let matcher = filename_matcher(provider)?;
    let mut files = Vec::new();

    let walker = WalkDir::new(dir).min_depth(1).max_depth(1);
    for entry in walker {
        let entry = entry?;
        // Resolves symlinks; dangling links are skipped.
        if !entry.path().is_file() {
            continue;
        }

        let filename = entry.file_name().to_string_lossy().to_string();
        if !matcher.is_match(&filename) {
            debug!(%provider, %filename, "skipping file with unexpected name");
            continue;
        }

        files.push(PendingFile {
            provider,
            filename,
            path: entry.path().to_path_buf(),
        });
    }

    // Sort for deterministic (chronological) ordering
    files.sort_by(|a, b| a.filename.cmp(&b.filename));

    Ok(files)
}
