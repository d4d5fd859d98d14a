//! Generic handlers for the grouped record resources.
//!
//! Each resource (`/clients`, `/tasks`, ...) is a [`Collection`] of one
//! [`Record`] type. Every mutation applies locally, records a reversal on the
//! caller's undo stack and appends an audit entry; the remote write happens
//! in the background.

use agency_core::audit::action_types;
use agency_core::error::CoreError;
use agency_core::grouping::{Group, GroupMeta};
use agency_core::records::credential::MASKED_SECRET;
use agency_core::records::{
    BoardColumn, Campaign, Client, ContentItem, Credential, GmbPost, Record, StatusOption, Task,
};
use agency_sync::{Collection, Placed, Workspace};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::audit_event;
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAuth;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Resource binding
// ---------------------------------------------------------------------------

/// Binds a record type to its collection and its client-facing shape.
pub trait Resource: Record {
    fn collection(workspace: &Workspace) -> &Collection<Self>;

    /// Representation sent to clients.
    fn present(&self) -> Self {
        self.clone()
    }

    /// Combine an incoming full replacement with the stored value.
    fn merge(incoming: Self, _existing: &Self) -> Self {
        incoming
    }
}

impl Resource for Client {
    fn collection(workspace: &Workspace) -> &Collection<Self> {
        &workspace.clients
    }
}

impl Resource for ContentItem {
    fn collection(workspace: &Workspace) -> &Collection<Self> {
        &workspace.content
    }
}

impl Resource for Task {
    fn collection(workspace: &Workspace) -> &Collection<Self> {
        &workspace.tasks
    }
}

impl Resource for Campaign {
    fn collection(workspace: &Workspace) -> &Collection<Self> {
        &workspace.campaigns
    }
}

impl Resource for GmbPost {
    fn collection(workspace: &Workspace) -> &Collection<Self> {
        &workspace.gmb_posts
    }
}

impl Resource for StatusOption {
    fn collection(workspace: &Workspace) -> &Collection<Self> {
        &workspace.statuses
    }
}

impl Resource for BoardColumn {
    fn collection(workspace: &Workspace) -> &Collection<Self> {
        &workspace.columns
    }
}

impl Resource for Credential {
    fn collection(workspace: &Workspace) -> &Collection<Self> {
        &workspace.credentials
    }

    fn present(&self) -> Self {
        self.masked()
    }

    /// A masked or blank secret means "unchanged".
    fn merge(mut incoming: Self, existing: &Self) -> Self {
        if incoming.secret.is_empty() || incoming.secret == MASKED_SECRET {
            incoming.secret = existing.secret.clone();
        }
        incoming
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `POST /{resource}`.
#[derive(Debug, Deserialize)]
pub struct CreateRequest<T> {
    /// Target group; defaults to the record's own default group.
    #[serde(default)]
    pub group: Option<GroupMeta>,
    pub item: T,
}

/// Request body for `POST /{resource}/items/{group_id}/{item_id}/move`.
#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub group: GroupMeta,
    /// Index in the target group; clamped to its length.
    pub index: usize,
}

/// Request body for `PATCH /{resource}/groups/{group_id}`.
#[derive(Debug, Default, Deserialize)]
pub struct GroupPatch {
    pub name: Option<String>,
    /// An empty string clears the colour.
    pub color: Option<String>,
    pub is_expanded: Option<bool>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn present_group<T: Resource>(group: Group<T>) -> Group<T> {
    Group {
        items: group.items.iter().map(T::present).collect(),
        meta: group.meta,
    }
}

/// Push a reversal onto the caller's undo stack.
pub(crate) fn record_undo<F>(state: &AppState, user: &AuthUser, description: String, reversal: F)
where
    F: FnOnce() -> Result<(), CoreError> + Send + 'static,
{
    let stack = state.undo.stack_for(&user.user_id);
    if let Some(evicted) = stack.record(description, reversal) {
        tracing::debug!(
            user_id = %user.user_id,
            evicted = %evicted.description,
            "Undo stack full, dropped oldest action"
        );
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/{resource}
///
/// All groups with their items, in display order.
pub async fn list<T: Resource>(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
) -> AppResult<Json<DataResponse<Vec<Group<T>>>>> {
    let groups = T::collection(&state.workspace)
        .groups()
        .into_iter()
        .map(present_group)
        .collect();
    Ok(Json(DataResponse { data: groups }))
}

/// POST /api/v1/{resource}
///
/// Append a record to a group, creating the group when needed.
pub async fn create<T: Resource>(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(input): Json<CreateRequest<T>>,
) -> AppResult<(StatusCode, Json<DataResponse<Placed<T>>>)> {
    let group = input
        .group
        .or_else(|| input.item.default_group())
        .ok_or_else(|| CoreError::Validation(format!("A group is required for a new {}", T::ENTITY)))?;

    let collection = T::collection(&state.workspace).clone();
    let placed = collection.add(group, input.item)?;

    let group_id = placed.group.id.clone();
    let item_id = placed.item.id().to_string();
    record_undo(
        &state,
        &user,
        format!("Create {} '{}'", T::ENTITY, placed.item.label()),
        move || collection.remove(&group_id, &item_id).map(|_| ()),
    );
    state.workspace.audit.record(
        audit_event(&user, action_types::ENTITY_CREATE)
            .entity(T::ENTITY, placed.item.id())
            .details(json!({
                "table": T::TABLE,
                "group": placed.group.id,
                "label": placed.item.label(),
            })),
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: Placed {
                item: placed.item.present(),
                ..placed
            },
        }),
    ))
}

/// PUT /api/v1/{resource}/items/{group_id}/{item_id}
///
/// Replace a record. The path id wins over any id in the body.
pub async fn update<T: Resource>(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path((group_id, item_id)): Path<(String, String)>,
    Json(mut item): Json<T>,
) -> AppResult<Json<DataResponse<T>>> {
    let collection = T::collection(&state.workspace).clone();
    let existing = collection
        .find(&group_id, &item_id)
        .ok_or_else(|| CoreError::not_found(T::ENTITY, item_id.clone()))?;

    item.set_id(item_id.clone());
    let item = T::merge(item, &existing);
    let previous = collection.update(&group_id, item.clone())?;

    let description = format!("Edit {} '{}'", T::ENTITY, previous.label());
    let undo_group = group_id.clone();
    record_undo(&state, &user, description, move || {
        collection.update(&undo_group, previous).map(|_| ())
    });
    state.workspace.audit.record(
        audit_event(&user, action_types::ENTITY_UPDATE)
            .entity(T::ENTITY, &item_id)
            .details(json!({
                "table": T::TABLE,
                "group": group_id,
                "label": item.label(),
            })),
    );

    Ok(Json(DataResponse {
        data: item.present(),
    }))
}

/// DELETE /api/v1/{resource}/items/{group_id}/{item_id}
pub async fn delete<T: Resource>(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path((group_id, item_id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    let collection = T::collection(&state.workspace).clone();
    let removed = collection.remove(&group_id, &item_id)?;

    let label = removed.item.label().to_string();
    record_undo(
        &state,
        &user,
        format!("Delete {} '{label}'", T::ENTITY),
        move || collection.restore(removed).map(|_| ()),
    );
    state.workspace.audit.record(
        audit_event(&user, action_types::ENTITY_DELETE)
            .entity(T::ENTITY, &item_id)
            .details(json!({
                "table": T::TABLE,
                "group": group_id,
                "label": label,
            })),
    );

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/{resource}/items/{group_id}/{item_id}/move
///
/// Move a record within or across groups. Returns the target group.
pub async fn move_item<T: Resource>(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path((group_id, item_id)): Path<(String, String)>,
    Json(input): Json<MoveRequest>,
) -> AppResult<Json<DataResponse<Group<T>>>> {
    let collection = T::collection(&state.workspace).clone();
    let target_id = input.group.id.clone();
    let original = collection.move_item(&group_id, &item_id, input.group, input.index)?;

    let target = collection
        .group(&target_id)
        .ok_or_else(|| CoreError::Internal(format!("Group '{target_id}' vanished after move")))?;
    let label = target
        .items
        .iter()
        .find(|i| i.id() == item_id)
        .map(|i| i.label().to_string())
        .unwrap_or_default();

    let undo_collection = collection.clone();
    let undo_target = target_id.clone();
    let undo_item = item_id.clone();
    let from_group = original.group.id.clone();
    record_undo(
        &state,
        &user,
        format!("Move {} '{label}'", T::ENTITY),
        move || {
            undo_collection
                .move_item(&undo_target, &undo_item, original.group, original.index)
                .map(|_| ())
        },
    );
    state.workspace.audit.record(
        audit_event(&user, action_types::ENTITY_MOVE)
            .entity(T::ENTITY, &item_id)
            .details(json!({
                "table": T::TABLE,
                "from": from_group,
                "to": target_id,
                "index": input.index,
            })),
    );

    Ok(Json(DataResponse {
        data: present_group(target),
    }))
}

/// PATCH /api/v1/{resource}/groups/{group_id}
///
/// Rename, recolour, expand or collapse a group.
pub async fn update_group<T: Resource>(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(group_id): Path<String>,
    Json(patch): Json<GroupPatch>,
) -> AppResult<Json<DataResponse<GroupMeta>>> {
    let collection = T::collection(&state.workspace).clone();
    let current = collection
        .group(&group_id)
        .ok_or_else(|| CoreError::not_found("group", group_id.clone()))?
        .meta;

    let meta = GroupMeta {
        id: current.id.clone(),
        name: patch.name.unwrap_or_else(|| current.name.clone()),
        color: match patch.color {
            Some(color) if color.trim().is_empty() => None,
            Some(color) => Some(color),
            None => current.color.clone(),
        },
        is_expanded: patch.is_expanded.unwrap_or(current.is_expanded),
    };
    let previous = collection.update_group(meta.clone())?;

    record_undo(
        &state,
        &user,
        format!("Update group '{}'", previous.name),
        move || collection.update_group(previous).map(|_| ()),
    );
    state.workspace.audit.record(
        audit_event(&user, action_types::GROUP_UPDATE)
            .entity("group", &group_id)
            .details(json!({
                "table": T::TABLE,
                "name": meta.name,
                "color": meta.color,
                "is_expanded": meta.is_expanded,
            })),
    );

    Ok(Json(DataResponse { data: meta }))
}
