//! Row transformation: one raw provider row → one canonical record.
//!
//! Everything here is pure. The caller supplies the ingestion timestamp so
//! one file's records share a single stamp and tests stay deterministic.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::models::{CanonicalRecord, Label, Provider};
use crate::schema::RawRow;

/// Result of transforming a single row.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformOutcome {
    Record(CanonicalRecord),
    /// The row carried a non-empty label outside the known categories.
    /// The row is dropped; the file continues.
    Quarantined { raw_label: String },
}

/// Outcome of label normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelMatch {
    /// Empty or absent label.
    Unset,
    Known(Label),
    Unknown,
}

/// Normalize `raw` and match it against the nine categories.
///
/// Trims, lower-cases, and joins internal whitespace runs with `_`, so
/// `" Good  First Issue "` matches [`Label::GoodFirstIssue`].
pub fn normalize_label(raw: Option<&str>) -> LabelMatch {
    let Some(raw) = raw else {
        return LabelMatch::Unset;
    };
    let lowered = raw.trim().to_lowercase();
    if lowered.is_empty() {
        return LabelMatch::Unset;
    }
    let normalized = lowered.split_whitespace().collect::<Vec<_>>().join("_");
    match Label::from_normalized(&normalized) {
        Some(label) => LabelMatch::Known(label),
        None => LabelMatch::Unknown,
    }
}

/// Parse a points cell. Null, blank, and unparseable input all become 0.
pub fn parse_points(raw: Option<&str>) -> i32 {
    let Some(value) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return 0;
    };
    match value.parse::<i32>() {
        Ok(n) => n,
        Err(_) => {
            debug!(value, "invalid integer value, defaulting to 0");
            0
        }
    }
}

/// Convert one raw row from `provider` into a canonical record, or a
/// quarantine signal.
pub fn transform(provider: Provider, row: &RawRow, ingested_at: DateTime<Utc>) -> TransformOutcome {
    let m = provider.mapping();

    let label = match normalize_label(row.get(m.label)) {
        LabelMatch::Unset => None,
        LabelMatch::Known(label) => Some(label),
        LabelMatch::Unknown => {
            return TransformOutcome::Quarantined {
                raw_label: row.get(m.label).unwrap_or_default().to_string(),
            };
        }
    };

    TransformOutcome::Record(CanonicalRecord {
        ingested_at,
        owner_id: row.text(m.owner_id),
        project: row.text(m.project),
        tag: row.text(m.tag),
        label,
        developer_id: row.text(m.developer_id),
        task_number: row.text(m.task_number),
        environment: row.text(m.environment),
        user_story: row.text(m.user_story),
        task_point: parse_points(row.get(m.task_point)),
        sprint: row.text(m.sprint),
        provider,
    })
}
