//! Content calendar items, grouped by publish month.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{require_non_empty, Record};
use crate::error::CoreError;
use crate::grouping::{month_group, GroupMeta};
use crate::tables::DomainTable;

/// Group id for items without a publish date.
pub const UNSCHEDULED_GROUP: &str = "unscheduled";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub publish_date: Option<NaiveDate>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub asset_url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_status() -> String {
    "draft".to_string()
}

impl Record for ContentItem {
    const ENTITY: &'static str = "content item";
    const TABLE: DomainTable = DomainTable::ContentItems;

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
        require_non_empty("Content title", &self.title)
    }

    fn default_group(&self) -> Option<GroupMeta> {
        Some(match self.publish_date {
            Some(date) => month_group(date),
            None => GroupMeta::new(UNSCHEDULED_GROUP, "Unscheduled"),
        })
    }
}
