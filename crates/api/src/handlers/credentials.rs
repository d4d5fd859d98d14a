//! Credential reveal. List and edit go through the generic record handlers,
//! which only ever return masked secrets.

use agency_core::audit::action_types;
use agency_core::error::CoreError;
use agency_core::records::Credential;
use axum::extract::{Path, State};
use axum::Json;
use serde_json::json;

use super::audit_event;
use crate::error::AppResult;
use crate::middleware::rbac::RequireManager;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/credentials/items/{group_id}/{item_id}/reveal
///
/// Return the credential with its secret. Every reveal is audited.
pub async fn reveal(
    State(state): State<AppState>,
    RequireManager(user): RequireManager,
    Path((group_id, item_id)): Path<(String, String)>,
) -> AppResult<Json<DataResponse<Credential>>> {
    let credential = state
        .workspace
        .credentials
        .find(&group_id, &item_id)
        .ok_or_else(|| CoreError::not_found("credential", item_id.clone()))?;

    state.workspace.audit.record(
        audit_event(&user, action_types::CREDENTIAL_REVEAL)
            .entity("credential", &item_id)
            .details(json!({
                "service": credential.service,
                "client_id": credential.client_id,
            })),
    );
    tracing::info!(user_id = %user.user_id, credential_id = %item_id, "Credential revealed");

    Ok(Json(DataResponse { data: credential }))
}
