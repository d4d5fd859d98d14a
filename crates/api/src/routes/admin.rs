//! Route definitions for `/admin`.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin`. All require the admin role.
///
/// ```text
/// GET    /users                          -> list_users
/// POST   /users                          -> create_user
/// PUT    /users/{id}                     -> update_user
/// DELETE /users/{id}                     -> deactivate_user
/// POST   /users/{id}/reset-password      -> reset_password
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route(
            "/users/{id}",
            put(admin::update_user).delete(admin::deactivate_user),
        )
        .route("/users/{id}/reset-password", post(admin::reset_password))
}
