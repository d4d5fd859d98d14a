use axum::routing::get;
use axum::Router;

use crate::handlers::notifications;
use crate::state::AppState;

/// ```text
/// GET /?limit=N    -> list
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(notifications::list))
}
