//! The seam between collections and whatever stores the rows.

use std::fmt;
use std::sync::Arc;

use agency_core::grouping::{GroupMeta, StoredRow};
use agency_core::tables::DomainTable;
use async_trait::async_trait;

use crate::error::SyncError;

/// One remote mutation. Rows are addressed by `(group_id, item_id)`.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Insert(StoredRow),
    /// Overwrite the rows keyed by `(group_id, item_id)`; `row` may name a
    /// different group when an item is moved.
    Update {
        group_id: String,
        item_id: String,
        row: StoredRow,
    },
    Delete {
        group_id: String,
        item_id: String,
    },
    /// Rewrite the group metadata carried by every row of a group.
    UpdateGroup(GroupMeta),
}

impl fmt::Display for WriteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteOp::Insert(row) => write!(f, "insert of {}/{}", row.group.id, row.item_id),
            WriteOp::Update {
                group_id, item_id, ..
            } => write!(f, "update of {group_id}/{item_id}"),
            WriteOp::Delete { group_id, item_id } => write!(f, "delete of {group_id}/{item_id}"),
            WriteOp::UpdateGroup(group) => write!(f, "group update of {}", group.id),
        }
    }
}

/// A remote table of grouped rows.
#[async_trait]
pub trait RemoteTable: Send + Sync {
    fn table(&self) -> DomainTable;

    /// Every row, in insertion order.
    async fn fetch_all(&self) -> Result<Vec<StoredRow>, SyncError>;

    async fn apply(&self, op: &WriteOp) -> Result<(), SyncError>;

    /// Cheap reachability check.
    async fn ping(&self) -> Result<(), SyncError>;
}

/// Hands out the [`RemoteTable`] for each domain table of one datastore.
pub trait TableSource: Send + Sync {
    fn open(&self, table: DomainTable) -> Arc<dyn RemoteTable>;
}
