//! Admin-only audit trail endpoints.

use agency_sync::{AuditPage, AuditQuery, IntegrityCheckResult};
use axum::extract::{Query, State};
use axum::Json;

use crate::error::AppResult;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/audit
///
/// Newest-first page of entries matching the query filters.
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<AuditQuery>,
) -> AppResult<Json<DataResponse<AuditPage>>> {
    Ok(Json(DataResponse {
        data: state.workspace.audit.query(&query),
    }))
}

/// GET /api/v1/audit/verify
///
/// Walk the hash chain and report the first broken link.
pub async fn verify(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> AppResult<Json<DataResponse<IntegrityCheckResult>>> {
    let result = state.workspace.audit.verify();
    if !result.chain_valid {
        tracing::warn!(
            requested_by = %admin.username,
            first_break = ?result.first_break,
            "Audit chain integrity check failed"
        );
    }
    Ok(Json(DataResponse { data: result }))
}
