//! Google Business Profile (GMB) posts, grouped by location.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{require_non_empty, require_one_of, Record};
use crate::error::CoreError;
use crate::grouping::{named_group, GroupMeta};
use crate::tables::DomainTable;

pub const VALID_POST_TYPES: &[&str] = &["update", "offer", "event"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmbPost {
    #[serde(default)]
    pub id: String,
    pub location_name: String,
    #[serde(default = "default_post_type")]
    pub post_type: String,
    pub summary: String,
    #[serde(default)]
    pub call_to_action: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub scheduled_for: Option<NaiveDate>,
}

fn default_post_type() -> String {
    "update".to_string()
}

fn default_status() -> String {
    "draft".to_string()
}

impl Record for GmbPost {
    const ENTITY: &'static str = "GMB post";
    const TABLE: DomainTable = DomainTable::GmbPosts;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn label(&self) -> &str {
        &self.summary
    }

    fn validate(&self) -> Result<(), CoreError> {
        require_non_empty("Location name", &self.location_name)?;
        require_non_empty("Post summary", &self.summary)?;
        require_one_of("post type", &self.post_type, VALID_POST_TYPES)
    }

    fn default_group(&self) -> Option<GroupMeta> {
        Some(named_group(&self.location_name, "Unassigned location"))
    }
}
