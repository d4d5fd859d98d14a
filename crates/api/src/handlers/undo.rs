//! Handlers for the caller's undo stack.

use agency_core::audit::action_types;
use agency_core::undo::{UndoEntry, UndoState};
use agency_events::{Notification, NotificationKind};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::json;

use super::audit_event;
use crate::error::AppResult;
use crate::middleware::rbac::RequireAuth;
use crate::response::DataResponse;
use crate::state::AppState;

/// Snapshot used to render the undo control.
#[derive(Debug, Serialize)]
pub struct UndoStatus {
    pub state: UndoState,
    pub size: usize,
    pub capacity: usize,
    /// Most recent first.
    pub entries: Vec<UndoEntry>,
}

/// Result of `POST /undo`.
#[derive(Debug, Serialize)]
pub struct UndoOutcome {
    /// Description of the reverted action, `None` when the stack was empty.
    pub undone: Option<String>,
    pub remaining: usize,
}

/// GET /api/v1/undo
pub async fn status(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> AppResult<Json<DataResponse<UndoStatus>>> {
    let stack = state.undo.stack_for(&user.user_id);
    Ok(Json(DataResponse {
        data: UndoStatus {
            state: stack.state(),
            size: stack.len(),
            capacity: state.undo.capacity(),
            entries: stack.entries(),
        },
    }))
}

/// POST /api/v1/undo
///
/// Revert the most recent action. An empty stack is a no-op. A failed
/// reversal still consumes the action and is reported as 409.
pub async fn undo(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> AppResult<Json<DataResponse<UndoOutcome>>> {
    let stack = state.undo.stack_for(&user.user_id);

    match stack.undo_most_recent() {
        Ok(undone) => {
            if let Some(description) = &undone {
                tracing::info!(user_id = %user.user_id, action = %description, "Undo applied");
                state.workspace.audit.record(
                    audit_event(&user, action_types::UNDO)
                        .details(json!({ "description": description })),
                );
            }
            Ok(Json(DataResponse {
                data: UndoOutcome {
                    undone,
                    remaining: stack.len(),
                },
            }))
        }
        Err(err) => {
            tracing::warn!(user_id = %user.user_id, error = %err, "Undo failed");
            state.event_bus.publish(Notification::new(
                NotificationKind::UndoFailed,
                err.to_string(),
            ));
            state.workspace.audit.record(
                audit_event(&user, action_types::UNDO).details(json!({
                    "description": err.description,
                    "failed": true,
                })),
            );
            Err(err.into())
        }
    }
}

/// DELETE /api/v1/undo
///
/// Drop the caller's undo history without reverting anything.
pub async fn clear(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> AppResult<StatusCode> {
    state.undo.reset(&user.user_id);
    Ok(StatusCode::NO_CONTENT)
}
