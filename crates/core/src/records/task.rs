//! Agency tasks.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{require_non_empty, require_one_of, Record};
use crate::error::CoreError;
use crate::grouping::GroupMeta;
use crate::tables::DomainTable;

pub const VALID_PRIORITIES: &[&str] = &["low", "medium", "high", "urgent"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

fn default_status() -> String {
    "todo".to_string()
}

fn default_priority() -> String {
    "medium".to_string()
}

impl Task {
    /// A medium-priority task with a fresh id.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: crate::types::new_record_id(),
            title: title.into(),
            description: None,
            client_id: None,
            assignee: None,
            status: default_status(),
            priority: default_priority(),
            due_date: None,
        }
    }
}

impl Record for Task {
    const ENTITY: &'static str = "task";
    const TABLE: DomainTable = DomainTable::Tasks;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn label(&self) -> &str {
        &self.title
    }

    fn validate(&self) -> Result<(), CoreError> {
        require_non_empty("Task title", &self.title)?;
        require_one_of("priority", &self.priority, VALID_PRIORITIES)
    }

    fn default_group(&self) -> Option<GroupMeta> {
        Some(GroupMeta::new("todo", "To do"))
    }
}
