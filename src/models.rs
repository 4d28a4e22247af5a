//! Core data models used throughout the loader.
//!
//! These types represent the providers, canonical records, and tracking
//! entries that flow through the scan → transform → store pipeline.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LoaderError;

/// Upstream system that produced a snapshot file.
///
/// The declaration order is the fixed enumeration order used by
/// all-provider scans and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    GitHub,
    Jira,
    ClickUp,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::GitHub, Provider::Jira, Provider::ClickUp];

    /// Lowercase tag used in filenames, directories, and the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::GitHub => "github",
            Provider::Jira => "jira",
            Provider::ClickUp => "clickup",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = LoaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Provider::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| LoaderError::UnknownProvider(s.to_string()))
    }
}

/// The nine recognized work-item categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Bug,
    Documentation,
    Duplicate,
    Enhancement,
    GoodFirstIssue,
    HelpWanted,
    Invalid,
    Question,
    Wontfix,
}

impl Label {
    pub const ALL: [Label; 9] = [
        Label::Bug,
        Label::Documentation,
        Label::Duplicate,
        Label::Enhancement,
        Label::GoodFirstIssue,
        Label::HelpWanted,
        Label::Invalid,
        Label::Question,
        Label::Wontfix,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Bug => "bug",
            Label::Documentation => "documentation",
            Label::Duplicate => "duplicate",
            Label::Enhancement => "enhancement",
            Label::GoodFirstIssue => "good_first_issue",
            Label::HelpWanted => "help_wanted",
            Label::Invalid => "invalid",
            Label::Question => "question",
            Label::Wontfix => "wontfix",
        }
    }

    /// Match an already-normalized value (`good_first_issue`) against the
    /// known categories, ignoring ASCII case.
    pub fn from_normalized(value: &str) -> Option<Label> {
        Label::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Lifecycle state of a [`TrackingEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    Processing,
    Success,
    Failed,
}

impl ProcessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessStatus::Processing => "processing",
            ProcessStatus::Success => "success",
            ProcessStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<ProcessStatus> {
        match value {
            "processing" => Some(ProcessStatus::Processing),
            "success" => Some(ProcessStatus::Success),
            "failed" => Some(ProcessStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One normalized unit of work-item activity, independent of its provider.
///
/// Produced only by [`crate::transform::transform`]; never mutated after
/// it has been stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalRecord {
    pub ingested_at: DateTime<Utc>,
    pub owner_id: Option<String>,
    pub project: Option<String>,
    pub tag: Option<String>,
    pub label: Option<Label>,
    pub developer_id: Option<String>,
    pub task_number: Option<String>,
    pub environment: Option<String>,
    pub user_story: Option<String>,
    pub task_point: i32,
    pub sprint: Option<String>,
    pub provider: Provider,
}

/// Durable processing record for one `(provider, filename)` pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackingEntry {
    pub id: i64,
    pub provider: Provider,
    pub filename: String,
    pub processed_at: DateTime<Utc>,
    pub status: ProcessStatus,
    pub records_processed: u64,
    pub error_message: Option<String>,
    pub content_sha256: Option<String>,
}

/// Per-provider entry counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub success: u64,
    pub failed: u64,
    pub processing: u64,
}

impl StatusCounts {
    pub fn total(&self) -> u64 {
        self.success + self.failed + self.processing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_parse_is_case_insensitive() {
        assert_eq!("GitHub".parse::<Provider>().unwrap(), Provider::GitHub);
        assert_eq!(" jira ".parse::<Provider>().unwrap(), Provider::Jira);
        assert_eq!("CLICKUP".parse::<Provider>().unwrap(), Provider::ClickUp);
        assert!(matches!(
            "trello".parse::<Provider>(),
            Err(LoaderError::UnknownProvider(_))
        ));
    }

    #[test]
    fn provider_serde_uses_lowercase_tags() {
        let json = serde_json::to_string(&Provider::ALL).unwrap();
        assert_eq!(json, r#"["github","jira","clickup"]"#);
    }

    #[test]
    fn label_roundtrips_through_tag() {
        for label in Label::ALL {
            assert_eq!(Label::from_normalized(label.as_str()), Some(label));
        }
        assert_eq!(Label::from_normalized("HELP_WANTED"), Some(Label::HelpWanted));
        assert_eq!(Label::from_normalized("help wanted"), None);
    }

    #[test]
    fn status_parse() {
        assert_eq!(ProcessStatus::parse("failed"), Some(ProcessStatus::Failed));
        assert_eq!(ProcessStatus::parse("FAILED"), None);
    }
}
