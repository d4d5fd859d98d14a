//! Agency clients.

use serde::{Deserialize, Serialize};

use super::{require_email, require_non_empty, require_non_negative, Record};
use crate::error::CoreError;
use crate::grouping::GroupMeta;
use crate::tables::DomainTable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub monthly_retainer: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_status() -> String {
    "active".to_string()
}

impl Record for Client {
    const ENTITY: &'static str = "client";
    const TABLE: DomainTable = DomainTable::Clients;

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
        require_non_empty("Client name", &self.name)?;
        if let Some(email) = &self.email {
            require_email("Client email", email)?;
        }
        if let Some(retainer) = self.monthly_retainer {
            require_non_negative("Monthly retainer", retainer)?;
        }
        Ok(())
    }

    fn default_group(&self) -> Option<GroupMeta> {
        Some(GroupMeta::new("active", "Active clients"))
    }
}
