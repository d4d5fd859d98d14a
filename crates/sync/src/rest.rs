//! Backend for the hosted PostgREST gateway.
//!
//! Tables live under `{base_url}/rest/v1/{table}`. Every request carries the
//! project key both as the `apikey` header and as a bearer token. Rows are
//! addressed with `eq.` filters on `group_id` and `item_id`.

use std::sync::Arc;
use std::time::Duration;

use agency_core::grouping::{GroupMeta, StoredRow};
use agency_core::tables::DomainTable;
use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::remote::{RemoteTable, TableSource, WriteOp};

/// Columns requested on every read, in the order rows are stored.
const SELECT_COLUMNS: &str =
    "item_id,group_id,group_name,group_color,is_expanded,position,item_data";

#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

/// Wire shape of a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestRow {
    pub item_id: String,
    pub group_id: String,
    pub group_name: String,
    #[serde(default)]
    pub group_color: Option<String>,
    pub is_expanded: bool,
    pub position: i32,
    pub item_data: String,
}

impl From<&StoredRow> for RestRow {
    fn from(row: &StoredRow) -> Self {
        Self {
            item_id: row.item_id.clone(),
            group_id: row.group.id.clone(),
            group_name: row.group.name.clone(),
            group_color: row.group.color.clone(),
            is_expanded: row.group.is_expanded,
            position: row.position,
            item_data: row.item_data.clone(),
        }
    }
}

impl From<RestRow> for StoredRow {
    fn from(row: RestRow) -> Self {
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

#[derive(Serialize)]
struct GroupPatch<'a> {
    group_name: &'a str,
    group_color: Option<&'a str>,
    is_expanded: bool,
}

pub struct RestTable {
    client: reqwest::Client,
    config: Arc<RestConfig>,
    table: DomainTable,
}

impl RestTable {
    fn url(&self) -> String {
        format!(
            "{}/rest/v1/{}",
            self.config.base_url.trim_end_matches('/'),
            self.table
        )
    }

    fn request(&self, method: Method) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.url())
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
    }

    fn keyed(&self, method: Method, group_id: &str, item_id: &str) -> reqwest::RequestBuilder {
        self.request(method).query(&[
            ("group_id", format!("eq.{group_id}")),
            ("item_id", format!("eq.{item_id}")),
        ])
    }

    /// Returns the response unchanged on success, or
    /// [`SyncError::Rejected`] with the status and body text.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, SyncError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(SyncError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl RemoteTable for RestTable {
    fn table(&self) -> DomainTable {
        self.table
    }

    async fn fetch_all(&self) -> Result<Vec<StoredRow>, SyncError> {
        let response = self
            .request(Method::GET)
            .query(&[("select", SELECT_COLUMNS), ("order", "id.asc")])
            .send()
            .await?;
        let rows: Vec<RestRow> = Self::ensure_success(response).await?.json().await?;
        Ok(rows.into_iter().map(StoredRow::from).collect())
    }

    async fn apply(&self, op: &WriteOp) -> Result<(), SyncError> {
        let request = match op {
            WriteOp::Insert(row) => self.request(Method::POST).json(&RestRow::from(row)),
            WriteOp::Update {
                group_id,
                item_id,
                row,
            } => self
                .keyed(Method::PATCH, group_id, item_id)
                .json(&RestRow::from(row)),
            WriteOp::Delete { group_id, item_id } => self.keyed(Method::DELETE, group_id, item_id),
            WriteOp::UpdateGroup(group) => self
                .request(Method::PATCH)
                .query(&[("group_id", format!("eq.{}", group.id))])
                .json(&GroupPatch {
                    group_name: &group.name,
                    group_color: group.color.as_deref(),
                    is_expanded: group.is_expanded,
                }),
        };
        let response = request
            .header("Prefer", "return=minimal")
            .send()
            .await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), SyncError> {
        let response = self
            .request(Method::GET)
            .query(&[("select", "item_id"), ("limit", "1")])
            .send()
            .await?;
        Self::ensure_success(response).await?;
        Ok(())
    }
}

/// Opens [`RestTable`]s sharing one HTTP client.
pub struct RestSource {
    client: reqwest::Client,
    config: Arc<RestConfig>,
}

impl RestSource {
    pub fn new(config: RestConfig) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }
}

impl TableSource for RestSource {
    fn open(&self, table: DomainTable) -> Arc<dyn RemoteTable> {
        Arc::new(RestTable {
            client: self.client.clone(),
            config: Arc::clone(&self.config),
            table,
        })
    }
}
