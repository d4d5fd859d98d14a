pub mod admin;
pub mod audit;
pub mod auth;
pub mod health;
pub mod notifications;
pub mod records;
pub mod undo;

use agency_core::records::{
    BoardColumn, Campaign, Client, ContentItem, Credential, GmbPost, StatusOption, Task,
};
use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/login                                      login (public)
/// /auth/logout                                     logout (requires auth)
/// /auth/me                                         current user
///
/// /clients, /content, /tasks, /campaigns,
/// /gmb-posts, /credentials, /statuses, /columns:
///   /                                              list groups, create item
///   /items/{group_id}/{item_id}                    update, delete
///   /items/{group_id}/{item_id}/move               move (POST)
///   /groups/{group_id}                             rename, recolour, collapse (PATCH)
/// /credentials/items/{group_id}/{item_id}/reveal   reveal secret (manager+)
///
/// /undo                                            status, undo (POST), clear (DELETE)
///
/// /audit                                           query (admin only)
/// /audit/verify                                    hash chain check (admin only)
///
/// /admin/users                                     list, create (admin only)
/// /admin/users/{id}                                update, deactivate
/// /admin/users/{id}/reset-password                 reset password
///
/// /notifications                                   recent failures
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/clients", records::router::<Client>())
        .nest("/content", records::router::<ContentItem>())
        .nest("/tasks", records::router::<Task>())
        .nest("/campaigns", records::router::<Campaign>())
        .nest("/gmb-posts", records::router::<GmbPost>())
        .nest("/credentials", records::credential_router())
        .nest("/statuses", records::router::<StatusOption>())
        .nest("/columns", records::router::<BoardColumn>())
        .nest("/undo", undo::router())
        .nest("/audit", audit::router())
        .nest("/admin", admin::router())
        .nest("/notifications", notifications::router())
}
