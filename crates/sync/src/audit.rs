//! Append-only audit trail with a SHA-256 hash chain.
//!
//! Entries are stored in the `audit_logs` table like any other record,
//! grouped by UTC day. Each entry's `integrity_hash` covers its canonical
//! content plus the previous entry's hash, so editing or deleting a stored
//! entry breaks verification from that point on.

use std::sync::Arc;

use agency_core::audit::{
    action_to_category, canonical_entry_data, compute_integrity_hash, redact_sensitive_fields,
};
use agency_core::error::CoreError;
use agency_core::records::{AuditEntry, Record};
use agency_core::types::{new_record_id, Timestamp};
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::collection::{Collection, LoadReport};
use crate::error::SyncError;

/// Default page size for audit queries.
pub const DEFAULT_AUDIT_LIMIT: i64 = 50;

/// Largest page size a caller may request.
pub const MAX_AUDIT_LIMIT: i64 = 500;

/// What happened, before it is stamped and hashed.
#[derive(Debug, Clone, Default)]
pub struct AuditEvent {
    pub actor_id: Option<String>,
    pub actor_name: Option<String>,
    pub action_type: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub details: serde_json::Value,
}

impl AuditEvent {
    pub fn new(action_type: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            ..Default::default()
        }
    }

    pub fn actor(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.actor_id = Some(id.into());
        self.actor_name = Some(name.into());
        self
    }

    pub fn entity(mut self, entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

/// Filters for [`AuditTrail::query`]. Every filter is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQuery {
    pub actor_id: Option<String>,
    pub action_type: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    /// Log category, see [`agency_core::audit::log_categories`].
    pub category: Option<String>,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
    /// Case-insensitive match against actor name, entity id and details.
    pub search_text: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Newest-first page of matching entries.
#[derive(Debug, Clone, Serialize)]
pub struct AuditPage {
    pub items: Vec<AuditEntry>,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityCheckResult {
    pub verified_entries: usize,
    pub chain_valid: bool,
    /// Id of the first entry whose hash does not match.
    pub first_break: Option<String>,
}

/// Hash and timestamp of the newest entry.
#[derive(Debug, Clone)]
struct ChainTip {
    hash: Option<String>,
    timestamp: Timestamp,
}

#[derive(Clone)]
pub struct AuditTrail {
    entries: Collection<AuditEntry>,
    /// Guards appends as well as tracking the tip.
    tip: Arc<Mutex<Option<ChainTip>>>,
}

impl AuditTrail {
    /// The collection must be empty; use [`AuditTrail::load`] to read
    /// existing entries.
    pub fn new(entries: Collection<AuditEntry>) -> Self {
        Self {
            entries,
            tip: Arc::new(Mutex::new(None)),
        }
    }

    /// For flushing. Reloads go through [`AuditTrail::load`] so the chain
    /// tip follows the stored entries.
    pub fn collection(&self) -> &Collection<AuditEntry> {
        &self.entries
    }

    /// Reload the stored entries and take the newest one as the chain tip.
    pub async fn load(&self) -> Result<LoadReport, SyncError> {
        let report = self.entries.load().await?;
        let newest = self.entries.items().into_iter().max_by_key(|e| e.timestamp);
        *self.tip.lock() = newest.map(|e| ChainTip {
            hash: e.integrity_hash,
            timestamp: e.timestamp,
        });
        Ok(report)
    }

    /// Stamp, redact, chain and store an event.
    pub fn append(&self, event: AuditEvent) -> Result<AuditEntry, CoreError> {
        let mut tip = self.tip.lock();
        let prev_hash = tip.as_ref().and_then(|t| t.hash.clone());
        // Keep the chain order equal to timestamp order.
        let now = Utc::now();
        let timestamp = match tip.as_ref() {
            Some(last) if last.timestamp >= now => last.timestamp + chrono::Duration::microseconds(1),
            _ => now,
        };

        let mut entry = AuditEntry {
            id: new_record_id(),
            timestamp,
            actor_id: event.actor_id,
            actor_name: event.actor_name,
            action_type: event.action_type,
            entity_type: event.entity_type,
            entity_id: event.entity_id,
            details: redact_sensitive_fields(&event.details),
            integrity_hash: None,
        };
        entry.integrity_hash = Some(compute_integrity_hash(
            prev_hash.as_deref(),
            &canonical_entry_data(&entry),
        ));

        let group = entry
            .default_group()
            .ok_or_else(|| CoreError::Internal("Audit entries must have a day group".into()))?;
        let placed = self.entries.add(group, entry)?;
        *tip = Some(ChainTip {
            hash: placed.item.integrity_hash.clone(),
            timestamp: placed.item.timestamp,
        });
        drop(tip);
        tracing::debug!(
            action_type = %placed.item.action_type,
            entity_id = placed.item.entity_id.as_deref().unwrap_or(""),
            "Audit entry appended"
        );
        Ok(placed.item)
    }

    /// Append, logging instead of failing. For callers whose own operation
    /// has already succeeded.
    pub fn record(&self, event: AuditEvent) {
        let action_type = event.action_type.clone();
        if let Err(e) = self.append(event) {
            tracing::error!(%action_type, error = %e, "Failed to append audit entry");
        }
    }

    pub fn query(&self, query: &AuditQuery) -> AuditPage {
        let needle = query
            .search_text
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let matching: Vec<AuditEntry> = self
            .chronological()
            .into_iter()
            .rev()
            .filter(|e| matches_opt(&query.actor_id, e.actor_id.as_deref()))
            .filter(|e| matches_opt(&query.action_type, Some(&e.action_type)))
            .filter(|e| matches_opt(&query.entity_type, e.entity_type.as_deref()))
            .filter(|e| matches_opt(&query.entity_id, e.entity_id.as_deref()))
            .filter(|e| {
                query
                    .category
                    .as_deref()
                    .is_none_or(|c| action_to_category(&e.action_type) == c)
            })
            .filter(|e| query.from.is_none_or(|from| e.timestamp >= from))
            .filter(|e| query.to.is_none_or(|to| e.timestamp <= to))
            .filter(|e| needle.as_deref().is_none_or(|n| mentions(e, n)))
            .collect();

        let total = matching.len();
        let limit = clamp(query.limit, DEFAULT_AUDIT_LIMIT, MAX_AUDIT_LIMIT);
        let offset = query.offset.unwrap_or(0).max(0) as usize;
        let items = matching.into_iter().skip(offset).take(limit).collect();
        AuditPage { items, total }
    }

    /// Walk the chain oldest-first and report the first mismatch.
    pub fn verify(&self) -> IntegrityCheckResult {
        let mut verified = 0;
        let mut prev_hash: Option<String> = None;
        let mut first_break = None;

        for entry in self.chronological() {
            let expected =
                compute_integrity_hash(prev_hash.as_deref(), &canonical_entry_data(&entry));
            if entry.integrity_hash.as_deref() != Some(expected.as_str()) {
                first_break = Some(entry.id.clone());
                break;
            }
            verified += 1;
            prev_hash = entry.integrity_hash;
        }

        IntegrityCheckResult {
            verified_entries: verified,
            chain_valid: first_break.is_none(),
            first_break,
        }
    }

    fn chronological(&self) -> Vec<AuditEntry> {
        let mut entries = self.entries.items();
        entries.sort_by_key(|e| e.timestamp);
        entries
    }
}

fn matches_opt(filter: &Option<String>, value: Option<&str>) -> bool {
    filter.as_deref().is_none_or(|f| value == Some(f))
}

fn mentions(entry: &AuditEntry, needle: &str) -> bool {
    let haystacks = [
        entry.actor_name.as_deref().unwrap_or(""),
        entry.entity_id.as_deref().unwrap_or(""),
        entry.action_type.as_str(),
    ];
    haystacks.iter().any(|h| h.to_lowercase().contains(needle))
        || entry.details.to_string().to_lowercase().contains(needle)
}

fn clamp(limit: Option<i64>, default: i64, max: i64) -> usize {
    limit.unwrap_or(default).max(1).min(max) as usize
}

#[cfg(test)]
mod tests {
    use agency_core::audit::action_types;
    use agency_core::grouping::encode_row;
    use agency_core::tables::DomainTable;
    use agency_events::EventBus;
    use serde_json::json;

    use super::*;
    use crate::memory::MemoryTable;
    use crate::remote::{RemoteTable, WriteOp};
    use crate::writer::RetryPolicy;

    fn trail() -> (Arc<MemoryTable>, AuditTrail) {
        let table = Arc::new(MemoryTable::new(DomainTable::AuditLogs));
        let entries = Collection::new(
            table.clone(),
            Arc::new(EventBus::default()),
            RetryPolicy::no_retry(),
        );
        (table, AuditTrail::new(entries))
    }

    #[tokio::test]
    async fn appended_entries_form_a_valid_chain() {
        let (_, trail) = trail();
        let first = trail
            .append(AuditEvent::new(action_types::LOGIN).actor("u1", "alice"))
            .unwrap();
        let second = trail
            .append(AuditEvent::new(action_types::ENTITY_CREATE).entity("task", "t1"))
            .unwrap();

        assert_eq!(
            first.integrity_hash.as_deref(),
            Some(compute_integrity_hash(None, &canonical_entry_data(&first)).as_str())
        );
        assert!(second.timestamp > first.timestamp);

        let result = trail.verify();
        assert!(result.chain_valid);
        assert_eq!(result.verified_entries, 2);
    }

    #[tokio::test]
    async fn redacts_sensitive_details() {
        let (_, trail) = trail();
        let entry = trail
            .append(
                AuditEvent::new(action_types::USER_ADMIN)
                    .details(json!({"username": "bob", "password": "hunter2"})),
            )
            .unwrap();
        assert_eq!(entry.details["password"], "[REDACTED]");
        assert_eq!(entry.details["username"], "bob");
    }

    #[tokio::test]
    async fn tampered_entry_breaks_the_chain_after_reload() {
        let (table, trail) = trail();
        trail.append(AuditEvent::new(action_types::LOGIN)).unwrap();
        let target = trail.append(AuditEvent::new(action_types::LOGOUT)).unwrap();
        trail.collection().flush().await;

        // Rewrite the stored payload of the second entry.
        let mut forged = target.clone();
        forged.action_type = action_types::LOGIN.into();
        let group = forged.default_group().unwrap();
        let position = table
            .rows()
            .iter()
            .find(|row| row.item_id == target.id)
            .map(|row| row.position as usize)
            .unwrap();
        table
            .apply(&WriteOp::Update {
                group_id: group.id.clone(),
                item_id: target.id.clone(),
                row: encode_row(&group, &forged, position).unwrap(),
            })
            .await
            .unwrap();
        trail.load().await.unwrap();

        let result = trail.verify();
        assert!(!result.chain_valid);
        assert_eq!(result.verified_entries, 1);
        assert_eq!(result.first_break.as_deref(), Some(target.id.as_str()));
    }

    #[tokio::test]
    async fn append_after_load_continues_the_stored_chain() {
        let (table, first) = trail();
        first.append(AuditEvent::new(action_types::LOGIN)).unwrap();
        let newest = first.append(AuditEvent::new(action_types::LOGOUT)).unwrap();
        first.collection().flush().await;

        let restarted = AuditTrail::new(Collection::new(
            table.clone(),
            Arc::new(EventBus::default()),
            RetryPolicy::no_retry(),
        ));
        restarted.load().await.unwrap();
        let next = restarted
            .append(AuditEvent::new(action_types::LOGIN))
            .unwrap();

        assert!(next.timestamp > newest.timestamp);
        assert_eq!(
            next.integrity_hash.as_deref(),
            Some(
                compute_integrity_hash(
                    newest.integrity_hash.as_deref(),
                    &canonical_entry_data(&next)
                )
                .as_str()
            )
        );
        let result = restarted.verify();
        assert!(result.chain_valid);
        assert_eq!(result.verified_entries, 3);
    }

    #[tokio::test]
    async fn query_filters_and_paginates_newest_first() {
        let (_, trail) = trail();
        trail
            .append(AuditEvent::new(action_types::LOGIN).actor("u1", "alice"))
            .unwrap();
        trail
            .append(AuditEvent::new(action_types::ENTITY_CREATE).actor("u1", "alice"))
            .unwrap();
        trail
            .append(AuditEvent::new(action_types::CREDENTIAL_REVEAL).actor("u2", "bob"))
            .unwrap();

        let all = trail.query(&AuditQuery::default());
        assert_eq!(all.total, 3);
        assert_eq!(all.items[0].action_type, action_types::CREDENTIAL_REVEAL);

        let alice = trail.query(&AuditQuery {
            actor_id: Some("u1".into()),
            limit: Some(1),
            ..Default::default()
        });
        assert_eq!(alice.total, 2);
        assert_eq!(alice.items.len(), 1);
        assert_eq!(alice.items[0].action_type, action_types::ENTITY_CREATE);

        let security = trail.query(&AuditQuery {
            category: Some("security".into()),
            ..Default::default()
        });
        assert_eq!(security.total, 1);

        let search = trail.query(&AuditQuery {
            search_text: Some("BOB".into()),
            ..Default::default()
        });
        assert_eq!(search.total, 1);
    }
}
