//! Board configuration: status options and column layout, grouped by board
//! (e.g. `content`, `tasks`, `campaigns`).

use serde::{Deserialize, Serialize};

use super::{require_non_empty, Record};
use crate::error::CoreError;
use crate::tables::DomainTable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusOption {
    #[serde(default)]
    pub id: String,
    pub label: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub sort_order: i32,
}

fn default_color() -> String {
    "#9e9e9e".to_string()
}

fn is_hex_color(value: &str) -> bool {
    let Some(digits) = value.strip_prefix('#') else {
        return false;
    };
    matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit())
}

impl Record for StatusOption {
    const ENTITY: &'static str = "status option";
    const TABLE: DomainTable = DomainTable::StatusOptions;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn validate(&self) -> Result<(), CoreError> {
        require_non_empty("Status label", &self.label)?;
        if !is_hex_color(&self.color) {
            return Err(CoreError::Validation(format!(
                "Status color '{}' must be a hex color like #1e88e5",
                self.color
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardColumn {
    #[serde(default)]
    pub id: String,
    pub key: String,
    pub label: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub width: Option<u32>,
}

fn default_visible() -> bool {
    true
}

impl Record for BoardColumn {
    const ENTITY: &'static str = "board column";
    const TABLE: DomainTable = DomainTable::BoardColumns;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn validate(&self) -> Result<(), CoreError> {
        require_non_empty("Column key", &self.key)?;
        require_non_empty("Column label", &self.label)
    }
}
