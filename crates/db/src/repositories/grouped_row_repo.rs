//! Repository for the grouped-row tables.
//!
//! The table is chosen by [`DomainTable`], a closed enum, so its name is safe
//! to interpolate into the SQL text. All values are bound.

use agency_core::grouping::{GroupMeta, StoredRow};
use agency_core::tables::DomainTable;
use sqlx::PgPool;

use crate::models::grouped_row::GroupedRow;

/// Column list shared across queries.
const COLUMNS: &str = "id, item_id, group_id, group_name, group_color, is_expanded, \
                       position, item_data, created_at, updated_at";

/// Provides row operations for any grouped-row table.
pub struct GroupedRowRepo;

impl GroupedRowRepo {
    /// List every row of `table` in insertion order.
    pub async fn list(pool: &PgPool, table: DomainTable) -> Result<Vec<GroupedRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM {table} ORDER BY id ASC");
        sqlx::query_as::<_, GroupedRow>(&query).fetch_all(pool).await
    }

    /// Insert a row, returning the created row.
    pub async fn insert(
        pool: &PgPool,
        table: DomainTable,
        row: &StoredRow,
    ) -> Result<GroupedRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO {table}
                (item_id, group_id, group_name, group_color, is_expanded, position, item_data)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GroupedRow>(&query)
            .bind(&row.item_id)
            .bind(&row.group.id)
            .bind(&row.group.name)
            .bind(&row.group.color)
            .bind(row.group.is_expanded)
            .bind(row.position)
            .bind(&row.item_data)
            .fetch_one(pool)
            .await
    }

    /// Overwrite every row keyed by `(group_id, item_id)` with `row`, which may
    /// carry a different group. Returns the number of rows touched.
    pub async fn update_item(
        pool: &PgPool,
        table: DomainTable,
        group_id: &str,
        item_id: &str,
        row: &StoredRow,
    ) -> Result<u64, sqlx::Error> {
        let query = format!(
            "UPDATE {table} SET
                item_id = $3,
                group_id = $4,
                group_name = $5,
                group_color = $6,
                is_expanded = $7,
                position = $8,
                item_data = $9
             WHERE group_id = $1 AND item_id = $2"
        );
        let result = sqlx::query(&query)
            .bind(group_id)
            .bind(item_id)
            .bind(&row.item_id)
            .bind(&row.group.id)
            .bind(&row.group.name)
            .bind(&row.group.color)
            .bind(row.group.is_expanded)
            .bind(row.position)
            .bind(&row.item_data)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete every row keyed by `(group_id, item_id)`.
    pub async fn delete_item(
        pool: &PgPool,
        table: DomainTable,
        group_id: &str,
        item_id: &str,
    ) -> Result<u64, sqlx::Error> {
        let query = format!("DELETE FROM {table} WHERE group_id = $1 AND item_id = $2");
        let result = sqlx::query(&query)
            .bind(group_id)
            .bind(item_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Rewrite the group metadata carried by every row of the group.
    pub async fn update_group(
        pool: &PgPool,
        table: DomainTable,
        group: &GroupMeta,
    ) -> Result<u64, sqlx::Error> {
        let query = format!(
            "UPDATE {table} SET group_name = $2, group_color = $3, is_expanded = $4
             WHERE group_id = $1"
        );
        let result = sqlx::query(&query)
            .bind(&group.id)
            .bind(&group.name)
            .bind(&group.color)
            .bind(group.is_expanded)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
