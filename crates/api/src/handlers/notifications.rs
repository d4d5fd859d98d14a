//! Recent load/write/undo failure notifications.

use agency_events::feed::DEFAULT_FEED_CAPACITY;
use agency_events::Notification;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::rbac::RequireAuth;
use crate::response::DataResponse;
use crate::state::AppState;

const DEFAULT_LIMIT: usize = 50;

#[derive(Debug, Default, Deserialize)]
pub struct NotificationParams {
    pub limit: Option<usize>,
}

/// GET /api/v1/notifications
///
/// Newest first.
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Query(params): Query<NotificationParams>,
) -> AppResult<Json<DataResponse<Vec<Notification>>>> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LIMIT)
        .clamp(1, DEFAULT_FEED_CAPACITY);
    Ok(Json(DataResponse {
        data: state.feed.recent(limit),
    }))
}
