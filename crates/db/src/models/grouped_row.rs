//! Row model shared by every grouped-row table.

use agency_core::grouping::{GroupMeta, StoredRow};
use agency_core::types::Timestamp;
use serde::Serialize;
use sqlx::FromRow;

/// A row from any of the domain tables (`clients`, `content_items`, ...).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GroupedRow {
    pub id: i64,
    pub item_id: String,
    pub group_id: String,
    pub group_name: String,
    pub group_color: Option<String>,
    pub is_expanded: bool,
    pub position: i32,
    pub item_data: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<GroupedRow> for StoredRow {
    fn from(row: GroupedRow) -> Self {
        StoredRow {
            item_id: row.item_id,
            group: GroupMeta {
                id: row.group_id,
                name: row.group_name,
                color: row.group_color,
                is_expanded: row.is_expanded,
            },
            position: row.position,
            item_data: row.item_data,
        }
    }
}
