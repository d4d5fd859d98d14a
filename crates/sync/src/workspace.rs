//! Every collection the back-office works with, opened against one
//! datastore.

use std::sync::Arc;

use agency_core::records::{
    BoardColumn, Campaign, Client, ContentItem, Credential, GmbPost, Record,
    StatusOption, Task, UserAccount,
};
use agency_core::tables::DomainTable;
use agency_events::EventBus;
use serde::Serialize;

use crate::audit::AuditTrail;
use crate::collection::{Collection, LoadReport};
use crate::error::SyncError;
use crate::remote::TableSource;
use crate::writer::RetryPolicy;

#[derive(Clone)]
pub struct Workspace {
    pub clients: Collection<Client>,
    pub content: Collection<ContentItem>,
    pub tasks: Collection<Task>,
    pub campaigns: Collection<Campaign>,
    pub gmb_posts: Collection<GmbPost>,
    pub credentials: Collection<Credential>,
    pub statuses: Collection<StatusOption>,
    pub columns: Collection<BoardColumn>,
    pub users: Collection<UserAccount>,
    pub audit: AuditTrail,
}

/// Per-table outcome of [`Workspace::load_all`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadSummary {
    pub loaded: Vec<LoadReport>,
    pub failed: Vec<FailedLoad>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedLoad {
    pub table: DomainTable,
    pub error: String,
}

impl LoadSummary {
    fn push(&mut self, table: DomainTable, result: Result<LoadReport, SyncError>) {
        match result {
            Ok(report) => self.loaded.push(report),
            Err(e) => self.failed.push(FailedLoad {
                table,
                error: e.to_string(),
            }),
        }
    }
}

fn open<T: Record>(
    source: &dyn TableSource,
    bus: &Arc<EventBus>,
    policy: &RetryPolicy,
) -> Collection<T> {
    Collection::new(source.open(T::TABLE), Arc::clone(bus), policy.clone())
}

impl Workspace {
    /// Open empty collections; call [`load_all`](Self::load_all) to fill them.
    pub fn open(source: &dyn TableSource, bus: Arc<EventBus>, policy: RetryPolicy) -> Self {
        Self {
            clients: open(source, &bus, &policy),
            content: open(source, &bus, &policy),
            tasks: open(source, &bus, &policy),
            campaigns: open(source, &bus, &policy),
            gmb_posts: open(source, &bus, &policy),
            credentials: open(source, &bus, &policy),
            statuses: open(source, &bus, &policy),
            columns: open(source, &bus, &policy),
            users: open(source, &bus, &policy),
            audit: AuditTrail::new(open(source, &bus, &policy)),
        }
    }

    /// Load every table. A failing table keeps its previous contents and does
    /// not stop the others.
    pub async fn load_all(&self) -> LoadSummary {
        let mut summary = LoadSummary::default();
        summary.push(DomainTable::Clients, self.clients.load().await);
        summary.push(DomainTable::ContentItems, self.content.load().await);
        summary.push(DomainTable::Tasks, self.tasks.load().await);
        summary.push(DomainTable::AdCampaigns, self.campaigns.load().await);
        summary.push(DomainTable::GmbPosts, self.gmb_posts.load().await);
        summary.push(DomainTable::Credentials, self.credentials.load().await);
        summary.push(DomainTable::StatusOptions, self.statuses.load().await);
        summary.push(DomainTable::BoardColumns, self.columns.load().await);
        summary.push(DomainTable::UserAccounts, self.users.load().await);
        summary.push(DomainTable::AuditLogs, self.audit.load().await);
        summary
    }

    /// Wait for every table's queued writes.
    pub async fn flush_all(&self) {
        self.clients.flush().await;
        self.content.flush().await;
        self.tasks.flush().await;
        self.campaigns.flush().await;
        self.gmb_posts.flush().await;
        self.credentials.flush().await;
        self.statuses.flush().await;
        self.columns.flush().await;
        self.users.flush().await;
        self.audit.collection().flush().await;
    }

    /// Reachability of the datastore, checked through the user table.
    pub async fn ping(&self) -> Result<(), SyncError> {
        self.users.ping().await
    }
}
