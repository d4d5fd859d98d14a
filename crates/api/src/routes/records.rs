//! Route definitions shared by every grouped record resource.

use agency_core::records::Credential;
use axum::routing::{get, patch, post, put};
use axum::Router;

use crate::handlers::credentials;
use crate::handlers::records::{self, Resource};
use crate::state::AppState;

/// Routes mounted at `/{resource}`.
///
/// ```text
/// GET    /                                  -> list
/// POST   /                                  -> create
/// PUT    /items/{group_id}/{item_id}        -> update
/// DELETE /items/{group_id}/{item_id}        -> delete
/// POST   /items/{group_id}/{item_id}/move   -> move_item
/// PATCH  /groups/{group_id}                 -> update_group
/// ```
pub fn router<T: Resource>() -> Router<AppState> {
    Router::new()
        .route("/", get(records::list::<T>).post(records::create::<T>))
        .route(
            "/items/{group_id}/{item_id}",
            put(records::update::<T>).delete(records::delete::<T>),
        )
        .route(
            "/items/{group_id}/{item_id}/move",
            post(records::move_item::<T>),
        )
        .route("/groups/{group_id}", patch(records::update_group::<T>))
}

/// Credential routes: the shared set plus
///
/// ```text
/// GET /items/{group_id}/{item_id}/reveal    -> reveal (manager+)
/// ```
pub fn credential_router() -> Router<AppState> {
    router::<Credential>().route(
        "/items/{group_id}/{item_id}/reveal",
        get(credentials::reveal),
    )
}
