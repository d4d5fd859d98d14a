//! Route definitions for `/audit`.

use axum::routing::get;
use axum::Router;

use crate::handlers::audit;
use crate::state::AppState;

/// ```text
/// GET /          -> list
/// GET /verify    -> verify
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(audit::list))
        .route("/verify", get(audit::verify))
}
