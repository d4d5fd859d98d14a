pub mod admin;
pub mod audit;
pub mod auth;
pub mod credentials;
pub mod notifications;
pub mod records;
pub mod undo;

use agency_sync::AuditEvent;

use crate::middleware::auth::AuthUser;

/// Audit event attributed to the calling user.
pub(crate) fn audit_event(user: &AuthUser, action_type: &str) -> AuditEvent {
    AuditEvent::new(action_type).actor(&user.user_id, &user.username)
}
