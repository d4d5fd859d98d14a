//! Route definitions for `/undo`.

use axum::routing::get;
use axum::Router;

use crate::handlers::undo;
use crate::state::AppState;

/// ```text
/// GET    /    -> status
/// POST   /    -> undo
/// DELETE /    -> clear
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/",
        get(undo::status).post(undo::undo).delete(undo::clear),
    )
}
