//! Stored client credentials (social accounts, ad managers, hosting).
//!
//! The secret travels in the payload; list views only ever see
//! [`Credential::masked`] copies.

use serde::{Deserialize, Serialize};

use super::{require_non_empty, Record};
use crate::error::CoreError;
use crate::grouping::GroupMeta;
use crate::tables::DomainTable;

/// Placeholder shown instead of a stored secret.
pub const MASKED_SECRET: &str = "********";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    #[serde(default)]
    pub id: String,
    pub service: String,
    pub login: String,
    pub secret: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Credential {
    /// Copy with the secret replaced by [`MASKED_SECRET`].
    pub fn masked(&self) -> Self {
        Self {
            secret: MASKED_SECRET.to_string(),
            ..self.clone()
        }
    }
}

impl Record for Credential {
    const ENTITY: &'static str = "credential";
    const TABLE: DomainTable = DomainTable::Credentials;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn label(&self) -> &str {
        &self.service
    }

    fn validate(&self) -> Result<(), CoreError> {
        require_non_empty("Service", &self.service)?;
        require_non_empty("Login", &self.login)
    }

    fn default_group(&self) -> Option<GroupMeta> {
        Some(match self.client_id.as_deref().filter(|c| !c.trim().is_empty()) {
            Some(client_id) => GroupMeta::new(client_id, client_id),
            None => GroupMeta::new("general", "General"),
        })
    }
}
