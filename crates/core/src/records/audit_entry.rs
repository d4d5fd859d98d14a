//! Audit log entries, grouped by UTC day. Append-only.

use serde::{Deserialize, Serialize};

use super::{require_non_empty, Record};
use crate::error::CoreError;
use crate::grouping::GroupMeta;
use crate::tables::DomainTable;
use crate::types::Timestamp;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    #[serde(default)]
    pub id: String,
    pub timestamp: Timestamp,
    #[serde(default)]
    pub actor_id: Option<String>,
    #[serde(default)]
    pub actor_name: Option<String>,
    pub action_type: String,
    #[serde(default)]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub details: serde_json::Value,
    #[serde(default)]
    pub integrity_hash: Option<String>,
}

impl Record for AuditEntry {
    const ENTITY: &'static str = "audit entry";
    const TABLE: DomainTable = DomainTable::AuditLogs;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn label(&self) -> &str {
        &self.action_type
    }

    fn validate(&self) -> Result<(), CoreError> {
        require_non_empty("Audit action type", &self.action_type)
    }

    fn default_group(&self) -> Option<GroupMeta> {
        Some(GroupMeta {
            id: self.timestamp.format("%Y-%m-%d").to_string(),
            name: self.timestamp.format("%-d %B %Y").to_string(),
            color: None,
            is_expanded: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn groups_by_day_collapsed() {
        let entry = AuditEntry {
            id: "a".into(),
            timestamp: chrono::Utc.with_ymd_and_hms(2026, 10, 9, 14, 30, 0).unwrap(),
            actor_id: None,
            actor_name: None,
            action_type: "login".into(),
            entity_type: None,
            entity_id: None,
            details: serde_json::Value::Null,
            integrity_hash: None,
        };
        let group = entry.default_group().unwrap();
        assert_eq!(group.id, "2026-10-09");
        assert_eq!(group.name, "9 October 2026");
        assert!(!group.is_expanded);
    }
}
