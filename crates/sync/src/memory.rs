//! In-process backend.
//!
//! Used by the `memory` datastore setting for local demos and by tests, which
//! can inject fetch and write failures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use agency_core::grouping::StoredRow;
use agency_core::tables::DomainTable;
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::SyncError;
use crate::remote::{RemoteTable, TableSource, WriteOp};

pub struct MemoryTable {
    table: DomainTable,
    rows: Mutex<Vec<StoredRow>>,
    failing_fetches: AtomicU32,
    failing_writes: AtomicU32,
}

impl MemoryTable {
    pub fn new(table: DomainTable) -> Self {
        Self::with_rows(table, Vec::new())
    }

    pub fn with_rows(table: DomainTable, rows: Vec<StoredRow>) -> Self {
        Self {
            table,
            rows: Mutex::new(rows),
            failing_fetches: AtomicU32::new(0),
            failing_writes: AtomicU32::new(0),
        }
    }

    /// Snapshot of the stored rows in insertion order.
    pub fn rows(&self) -> Vec<StoredRow> {
        self.rows.lock().clone()
    }

    /// Append a row without going through a collection.
    pub fn push_row(&self, row: StoredRow) {
        self.rows.lock().push(row);
    }

    /// Make the next `count` fetches fail with [`SyncError::Unavailable`].
    pub fn fail_next_fetches(&self, count: u32) {
        self.failing_fetches.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` write attempts fail with
    /// [`SyncError::Unavailable`]. Retries count as attempts.
    pub fn fail_next_writes(&self, count: u32) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl RemoteTable for MemoryTable {
    fn table(&self) -> DomainTable {
        self.table
    }

    async fn fetch_all(&self) -> Result<Vec<StoredRow>, SyncError> {
        if Self::take_failure(&self.failing_fetches) {
            return Err(SyncError::Unavailable(format!(
                "injected fetch failure on {}",
                self.table
            )));
        }
        Ok(self.rows())
    }

    async fn apply(&self, op: &WriteOp) -> Result<(), SyncError> {
        if Self::take_failure(&self.failing_writes) {
            return Err(SyncError::Unavailable(format!(
                "injected write failure on {}",
                self.table
            )));
        }

        let mut rows = self.rows.lock();
        match op {
            WriteOp::Insert(row) => rows.push(row.clone()),
            WriteOp::Update {
                group_id,
                item_id,
                row,
            } => {
                for stored in rows
                    .iter_mut()
                    .filter(|r| &r.group.id == group_id && &r.item_id == item_id)
                {
                    *stored = row.clone();
                }
            }
            WriteOp::Delete { group_id, item_id } => {
                rows.retain(|r| !(&r.group.id == group_id && &r.item_id == item_id));
            }
            WriteOp::UpdateGroup(group) => {
                for stored in rows.iter_mut().filter(|r| r.group.id == group.id) {
                    stored.group = group.clone();
                }
            }
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), SyncError> {
        Ok(())
    }
}

/// One [`MemoryTable`] per domain table.
pub struct MemorySource {
    tables: HashMap<DomainTable, Arc<MemoryTable>>,
}

impl MemorySource {
    pub fn new() -> Self {
        let tables = DomainTable::ALL
            .into_iter()
            .map(|table| (table, Arc::new(MemoryTable::new(table))))
            .collect();
        Self { tables }
    }

    /// Direct handle to a table, for seeding and inspection.
    pub fn table(&self, table: DomainTable) -> Arc<MemoryTable> {
        match self.tables.get(&table) {
            Some(existing) => Arc::clone(existing),
            None => Arc::new(MemoryTable::new(table)),
        }
    }
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl TableSource for MemorySource {
    fn open(&self, table: DomainTable) -> Arc<dyn RemoteTable> {
        self.table(table)
    }
}
