//! Provider column mappings.
//!
//! Each provider exports the same facts under different header names. A
//! [`SchemaMapping`] names, for one provider, the raw column that feeds each
//! canonical attribute. The tables are compile-time constants reached via
//! [`Provider::mapping`]; nothing registers or mutates them at runtime.
//!
//! | canonical      | github        | jira         | clickup          |
//! |----------------|---------------|--------------|------------------|
//! | `owner_id`     | `manager_id`  | `manager_id` | `owner_id`       |
//! | `project`      | `projects`    | `projects`   | `project`        |
//! | `tag`          | `assignee`    | `assignee`   | `tag`            |
//! | `label`        | `label`       | `label`      | `label`          |
//! | `developer_id` | `devloper_id` | `employeeID` | `worker_id`      |
//! | `task_number`  | `issue`       | `issue`      | `task`           |
//! | `environment`  | `environment` | `env`        | `pr_env`         |
//! | `user_story`   | `user_story`  | `user_story` | `user_story`     |
//! | `task_point`   | `point`       | `point`      | `day`            |
//! | `sprint`       | `sprint`      | `sprint`     | `currant_sprint` |

use std::collections::HashMap;

use crate::models::Provider;

/// Raw column names feeding each canonical attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaMapping {
    pub owner_id: &'static str,
    pub project: &'static str,
    pub tag: &'static str,
    pub label: &'static str,
    pub developer_id: &'static str,
    pub task_number: &'static str,
    pub environment: &'static str,
    pub user_story: &'static str,
    /// The numeric "points" column.
    pub task_point: &'static str,
    pub sprint: &'static str,
}

// `devloper_id` and `currant_sprint` are the actual upstream header spellings.

pub const GITHUB: SchemaMapping = SchemaMapping {
    owner_id: "manager_id",
    project: "projects",
    tag: "assignee",
    label: "label",
    developer_id: "devloper_id",
    task_number: "issue",
    environment: "environment",
    user_story: "user_story",
    task_point: "point",
    sprint: "sprint",
};

pub const JIRA: SchemaMapping = SchemaMapping {
    owner_id: "manager_id",
    project: "projects",
    tag: "assignee",
    label: "label",
    developer_id: "employeeID",
    task_number: "issue",
    environment: "env",
    user_story: "user_story",
    task_point: "point",
    sprint: "sprint",
};

pub const CLICKUP: SchemaMapping = SchemaMapping {
    owner_id: "owner_id",
    project: "project",
    tag: "tag",
    label: "label",
    developer_id: "worker_id",
    task_number: "task",
    environment: "pr_env",
    user_story: "user_story",
    task_point: "day",
    sprint: "currant_sprint",
};

impl Provider {
    pub fn mapping(&self) -> &'static SchemaMapping {
        match self {
            Provider::GitHub => &GITHUB,
            Provider::Jira => &JIRA,
            Provider::ClickUp => &CLICKUP,
        }
    }
}

impl SchemaMapping {
    /// All mapped column names, in canonical attribute order.
    pub fn columns(&self) -> [&'static str; 10] {
        [
            self.owner_id,
            self.project,
            self.tag,
            self.label,
            self.developer_id,
            self.task_number,
            self.environment,
            self.user_story,
            self.task_point,
            self.sprint,
        ]
    }
}

/// One data row keyed by its header names.
///
/// Cells are stored as read; blank-handling belongs to the transformer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    fields: HashMap<String, String>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    /// The cell for `column`, trimmed, or `None` when absent or blank.
    pub fn text(&self, column: &str) -> Option<String> {
        self.get(column)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}
