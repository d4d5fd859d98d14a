//! Record payloads stored in the `item_data` column of each domain table.
//!
//! Payload keys are camelCase. Every record type implements [`Record`], which
//! ties it to its table and gives the sync and HTTP layers a uniform way to
//! read ids, labels and default groups.

pub mod audit_entry;
pub mod board;
pub mod campaign;
pub mod client;
pub mod content;
pub mod credential;
pub mod gmb;
pub mod task;
pub mod user;

use serde::de::DeserializeOwned;
use serde::Serialize;
use validator::ValidateEmail;

use crate::error::CoreError;
use crate::grouping::GroupMeta;
use crate::tables::DomainTable;

pub use audit_entry::AuditEntry;
pub use board::{BoardColumn, StatusOption};
pub use campaign::Campaign;
pub use client::Client;
pub use content::ContentItem;
pub use credential::Credential;
pub use gmb::GmbPost;
pub use task::Task;
pub use user::UserAccount;

/// A typed row payload.
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Human-readable entity name used in messages (`"content item"`).
    const ENTITY: &'static str;

    /// Table the record lives in.
    const TABLE: DomainTable;

    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);

    /// Short display label used in undo descriptions and audit details.
    fn label(&self) -> &str;

    /// Field-level validation applied before any local mutation.
    fn validate(&self) -> Result<(), CoreError> {
        Ok(())
    }

    /// Group a new record lands in when the caller does not name one.
    fn default_group(&self) -> Option<GroupMeta> {
        None
    }
}

/// Assign a fresh id when the record has none.
pub fn ensure_id<T: Record>(item: &mut T) {
    if item.id().trim().is_empty() {
        item.set_id(crate::types::new_record_id());
    }
}

// ---------------------------------------------------------------------------
// Field checks shared by the record modules
// ---------------------------------------------------------------------------

pub(crate) fn require_non_empty(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

pub(crate) fn require_one_of(field: &str, value: &str, allowed: &[&str]) -> Result<(), CoreError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid {field} '{value}'. Must be one of: {}",
            allowed.join(", ")
        )))
    }
}

#[allow(clippy::ptr_arg)]
pub(crate) fn require_email(field: &str, value: &String) -> Result<(), CoreError> {
    if value.validate_email() {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "{field} '{value}' is not a valid email address"
        )))
    }
}

pub(crate) fn require_non_negative(field: &str, value: f64) -> Result<(), CoreError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "{field} must be a non-negative number"
        )))
    }
}
