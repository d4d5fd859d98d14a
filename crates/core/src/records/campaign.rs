//! Paid ad campaigns, grouped by platform.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{require_non_empty, require_non_negative, Record};
use crate::error::CoreError;
use crate::grouping::{named_group, GroupMeta};
use crate::tables::DomainTable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub client_id: Option<String>,
    pub platform: String,
    #[serde(default)]
    pub objective: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub budget: f64,
    #[serde(default)]
    pub spend: f64,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

fn default_status() -> String {
    "planned".to_string()
}

impl Campaign {
    /// Remaining budget; negative when overspent.
    pub fn remaining_budget(&self) -> f64 {
        self.budget - self.spend
    }
}

impl Record for Campaign {
    const ENTITY: &'static str = "campaign";
    const TABLE: DomainTable = DomainTable::AdCampaigns;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn label(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), CoreError> {
        require_non_empty("Campaign name", &self.name)?;
        require_non_empty("Campaign platform", &self.platform)?;
        require_non_negative("Budget", self.budget)?;
        require_non_negative("Spend", self.spend)?;
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(CoreError::Validation(format!(
                    "Campaign end date {end} is before start date {start}"
                )));
            }
        }
        Ok(())
    }

    fn default_group(&self) -> Option<GroupMeta> {
        Some(named_group(&self.platform, "Other"))
    }
}
