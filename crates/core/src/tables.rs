//! The closed set of remote tables the back-office reads and writes.
//!
//! Table names are only ever produced from [`DomainTable::as_str`], so they
//! are safe to interpolate into SQL and REST paths.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainTable {
    Clients,
    ContentItems,
    Tasks,
    AdCampaigns,
    GmbPosts,
    Credentials,
    StatusOptions,
    BoardColumns,
    AuditLogs,
    UserAccounts,
}

impl DomainTable {
    pub const ALL: [DomainTable; 10] = [
        DomainTable::Clients,
        DomainTable::ContentItems,
        DomainTable::Tasks,
        DomainTable::AdCampaigns,
        DomainTable::GmbPosts,
        DomainTable::Credentials,
        DomainTable::StatusOptions,
        DomainTable::BoardColumns,
        DomainTable::AuditLogs,
        DomainTable::UserAccounts,
    ];

    /// Physical table name.
    pub fn as_str(self) -> &'static str {
        match self {
            DomainTable::Clients => "clients",
            DomainTable::ContentItems => "content_items",
            DomainTable::Tasks => "tasks",
            DomainTable::AdCampaigns => "ad_campaigns",
            DomainTable::GmbPosts => "gmb_posts",
            DomainTable::Credentials => "credentials",
            DomainTable::StatusOptions => "status_options",
            DomainTable::BoardColumns => "board_columns",
            DomainTable::AuditLogs => "audit_logs",
            DomainTable::UserAccounts => "user_accounts",
        }
    }
}

impl fmt::Display for DomainTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
