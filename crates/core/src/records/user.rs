//! Back-office user accounts, grouped by role.
//!
//! The payload carries the Argon2id password hash. It is never serialized to
//! API responses; the HTTP layer converts to its own response type.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::{require_email, require_non_empty, Record};
use crate::error::CoreError;
use crate::grouping::GroupMeta;
use crate::roles::{is_valid_role, ROLE_ADMIN, ROLE_MANAGER, ROLE_STAFF};
use crate::tables::DomainTable;
use crate::types::Timestamp;

/// Maximum consecutive failed login attempts before locking the account.
pub const MAX_FAILED_ATTEMPTS: u32 = 5;

/// Duration in minutes to lock an account after exceeding failed attempts.
pub const LOCK_DURATION_MINS: i64 = 15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    #[serde(default)]
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub role: String,
    pub password_hash: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub failed_login_count: u32,
    #[serde(default)]
    pub locked_until: Option<Timestamp>,
    #[serde(default)]
    pub last_login_at: Option<Timestamp>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
}

fn default_active() -> bool {
    true
}

impl UserAccount {
    /// Whether a lock is in effect at `now`.
    pub fn is_locked(&self, now: Timestamp) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }

    /// Count a failed attempt, locking the account once the threshold is
    /// reached. Returns `true` if the account is now locked.
    pub fn register_failed_login(&mut self, now: Timestamp) -> bool {
        self.failed_login_count += 1;
        if self.failed_login_count >= MAX_FAILED_ATTEMPTS {
            self.locked_until = Some(now + Duration::minutes(LOCK_DURATION_MINS));
            return true;
        }
        false
    }

    /// Reset the failure counter and lock, stamping `last_login_at`.
    pub fn register_successful_login(&mut self, now: Timestamp) {
        self.failed_login_count = 0;
        self.locked_until = None;
        self.last_login_at = Some(now);
    }
}

/// Group a role's accounts live in.
pub fn role_group(role: &str) -> GroupMeta {
    let name = match role {
        ROLE_ADMIN => "Admins",
        ROLE_MANAGER => "Managers",
        ROLE_STAFF => "Staff",
        other => other,
    };
    GroupMeta::new(role, name)
}

impl Record for UserAccount {
    const ENTITY: &'static str = "user";
    const TABLE: DomainTable = DomainTable::UserAccounts;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn label(&self) -> &str {
        &self.username
    }

    fn validate(&self) -> Result<(), CoreError> {
        require_non_empty("Username", &self.username)?;
        if self.username.chars().any(char::is_whitespace) {
            return Err(CoreError::Validation(
                "Username must not contain whitespace".into(),
            ));
        }
        require_email("Email", &self.email)?;
        if !is_valid_role(&self.role) {
            return Err(CoreError::Validation(format!(
                "Invalid role '{}'",
                self.role
            )));
        }
        require_non_empty("Password hash", &self.password_hash)
    }

    fn default_group(&self) -> Option<GroupMeta> {
        Some(role_group(&self.role))
    }
}
