//! Audit logging constants and utility functions.
//!
//! Lives in `core` so the sync layer (which appends entries) and the HTTP
//! layer (which queries and verifies them) agree on names and hashing.

use crate::hashing;
use crate::records::AuditEntry;

// ---------------------------------------------------------------------------
// Action type constants
// ---------------------------------------------------------------------------

/// Known action types for audit log entries.
pub mod action_types {
    pub const LOGIN: &str = "login";
    pub const LOGIN_FAILED: &str = "login_failed";
    pub const LOGOUT: &str = "logout";
    pub const ENTITY_CREATE: &str = "entity_create";
    pub const ENTITY_UPDATE: &str = "entity_update";
    pub const ENTITY_DELETE: &str = "entity_delete";
    pub const ENTITY_MOVE: &str = "entity_move";
    pub const GROUP_UPDATE: &str = "group_update";
    pub const UNDO: &str = "undo";
    pub const CREDENTIAL_REVEAL: &str = "credential_reveal";
    pub const USER_ADMIN: &str = "user_admin";
}

/// Known log categories, used for filtering.
pub mod log_categories {
    pub const AUTHENTICATION: &str = "authentication";
    pub const OPERATIONS: &str = "operations";
    pub const SECURITY: &str = "security";
}

/// Map an action type to its log category. Unknown action types default to
/// `"operations"`.
pub fn action_to_category(action_type: &str) -> &'static str {
    match action_type {
        action_types::LOGIN | action_types::LOGIN_FAILED | action_types::LOGOUT => {
            log_categories::AUTHENTICATION
        }
        action_types::CREDENTIAL_REVEAL | action_types::USER_ADMIN => log_categories::SECURITY,
        _ => log_categories::OPERATIONS,
    }
}

// ---------------------------------------------------------------------------
// Integrity hash computation
// ---------------------------------------------------------------------------

/// Known seed value for the first entry in the hash chain.
const CHAIN_SEED: &str = "AGENCY_AUDIT_CHAIN_SEED_V1";

/// Compute the SHA-256 integrity hash for an audit log entry.
///
/// `prev_hash` is the integrity hash of the previous entry, or `None` for the
/// first entry in the chain (which uses a known seed value).
pub fn compute_integrity_hash(prev_hash: Option<&str>, entry_data: &str) -> String {
    let prev = prev_hash.unwrap_or(CHAIN_SEED);
    let combined = format!("{prev}|{entry_data}");
    hashing::sha256_hex(combined.as_bytes())
}

/// Canonical string form of an entry's content; excludes the hash itself.
pub fn canonical_entry_data(entry: &AuditEntry) -> String {
    format!(
        "{}|{}|{}|{}|{}|{}|{}",
        entry.id,
        entry.timestamp.to_rfc3339(),
        entry.actor_id.as_deref().unwrap_or(""),
        entry.action_type,
        entry.entity_type.as_deref().unwrap_or(""),
        entry.entity_id.as_deref().unwrap_or(""),
        entry.details,
    )
}

// ---------------------------------------------------------------------------
// Sensitive field redaction
// ---------------------------------------------------------------------------

/// Fields that should be redacted from audit log details before storage.
pub const SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "token",
    "secret",
    "api_key",
    "apikey",
    "private_key",
    "authorization",
    "credential",
];

/// Redact sensitive keys from a JSON value, recursing into objects and arrays.
///
/// Replaces the value of any key containing one of [`SENSITIVE_FIELDS`]
/// (case-insensitive) with `"[REDACTED]"`.
pub fn redact_sensitive_fields(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut redacted = serde_json::Map::new();
            for (key, val) in map {
                let lower_key = key.to_lowercase();
                if SENSITIVE_FIELDS.iter().any(|f| lower_key.contains(f)) {
                    redacted.insert(
                        key.clone(),
                        serde_json::Value::String("[REDACTED]".to_string()),
                    );
                } else {
                    redacted.insert(key.clone(), redact_sensitive_fields(val));
                }
            }
            serde_json::Value::Object(redacted)
        }
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.iter().map(redact_sensitive_fields).collect())
        }
        other => other.clone(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
