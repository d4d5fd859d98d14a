//! Direct Postgres backend over [`GroupedRowRepo`].

use std::sync::Arc;

use agency_core::grouping::StoredRow;
use agency_core::tables::DomainTable;
use agency_db::repositories::GroupedRowRepo;
use agency_db::DbPool;
use async_trait::async_trait;

use crate::error::SyncError;
use crate::remote::{RemoteTable, TableSource, WriteOp};

pub struct PgTable {
    pool: DbPool,
    table: DomainTable,
}

impl PgTable {
    pub fn new(pool: DbPool, table: DomainTable) -> Self {
        Self { pool, table }
    }
}

#[async_trait]
impl RemoteTable for PgTable {
    fn table(&self) -> DomainTable {
        self.table
    }

    async fn fetch_all(&self) -> Result<Vec<StoredRow>, SyncError> {
        let rows = GroupedRowRepo::list(&self.pool, self.table).await?;
        Ok(rows.into_iter().map(StoredRow::from).collect())
    }

    async fn apply(&self, op: &WriteOp) -> Result<(), SyncError> {
        match op {
            WriteOp::Insert(row) => {
                GroupedRowRepo::insert(&self.pool, self.table, row).await?;
            }
            WriteOp::Update {
                group_id,
                item_id,
                row,
            } => {
                let touched =
                    GroupedRowRepo::update_item(&self.pool, self.table, group_id, item_id, row)
                        .await?;
                if touched == 0 {
                    tracing::warn!(table = %self.table, %group_id, %item_id, "Update matched no rows");
                }
            }
            WriteOp::Delete { group_id, item_id } => {
                GroupedRowRepo::delete_item(&self.pool, self.table, group_id, item_id).await?;
            }
            WriteOp::UpdateGroup(group) => {
                GroupedRowRepo::update_group(&self.pool, self.table, group).await?;
            }
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), SyncError> {
        agency_db::health_check(&self.pool).await?;
        Ok(())
    }
}

/// Opens [`PgTable`]s sharing one connection pool.
pub struct PgSource {
    pool: DbPool,
}

impl PgSource {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl TableSource for PgSource {
    fn open(&self, table: DomainTable) -> Arc<dyn RemoteTable> {
        Arc::new(PgTable::new(self.pool.clone(), table))
    }
}
