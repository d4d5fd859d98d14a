//! Admin-only user account management.
//!
//! Accounts live in the `user_accounts` table grouped by role. These
//! operations are audited but not recorded on the undo stack.

use agency_core::audit::action_types;
use agency_core::error::CoreError;
use agency_core::records::user::role_group;
use agency_core::records::UserAccount;
use agency_core::roles::{is_valid_role, ROLE_ADMIN};
use agency_core::types::Timestamp;
use agency_sync::Placed;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::audit_event;
use crate::auth::password::{hash_password, validate_password_strength, MIN_PASSWORD_LENGTH};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Account as shown to admins. Never carries the password hash.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub locked_until: Option<Timestamp>,
    pub last_login_at: Option<Timestamp>,
    pub created_at: Option<Timestamp>,
}

impl From<&UserAccount> for UserResponse {
    fn from(account: &UserAccount) -> Self {
        Self {
            id: account.id.clone(),
            username: account.username.clone(),
            email: account.email.clone(),
            full_name: account.full_name.clone(),
            role: account.role.clone(),
            is_active: account.is_active,
            locked_until: account.locked_until,
            last_login_at: account.last_login_at,
            created_at: account.created_at,
        }
    }
}

/// Request body for `POST /admin/users`.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Request body for `PUT /admin/users/{id}`. Absent fields are unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

/// Request body for `POST /admin/users/{id}/reset-password`.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub new_password: String,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn find_user(state: &AppState, id: &str) -> Result<Placed<UserAccount>, CoreError> {
    state
        .workspace
        .users
        .find_where(|u| u.id == id)
        .ok_or_else(|| CoreError::not_found("user", id))
}

fn check_password(password: &str) -> AppResult<String> {
    validate_password_strength(password, MIN_PASSWORD_LENGTH)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;
    hash_password(password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))
}

fn check_role(role: &str) -> Result<(), CoreError> {
    if is_valid_role(role) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!("Unknown role '{role}'")))
    }
}

/// Admins may not lock themselves out.
fn guard_self(
    admin: &AuthUser,
    target_id: &str,
    deactivating: bool,
    new_role: Option<&str>,
) -> Result<(), CoreError> {
    if admin.user_id != target_id {
        return Ok(());
    }
    if deactivating {
        return Err(CoreError::Validation(
            "You cannot deactivate your own account".into(),
        ));
    }
    if new_role.is_some_and(|role| role != ROLE_ADMIN) {
        return Err(CoreError::Validation(
            "You cannot remove your own admin role".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> AppResult<Json<DataResponse<Vec<UserResponse>>>> {
    let users = state
        .workspace
        .users
        .items()
        .iter()
        .map(UserResponse::from)
        .collect();
    Ok(Json(DataResponse { data: users }))
}

/// POST /api/v1/admin/users
pub async fn create_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<UserResponse>>)> {
    check_role(&input.role)?;
    let username = input.username.trim().to_string();
    if state
        .workspace
        .users
        .find_where(|u| u.username.eq_ignore_ascii_case(&username))
        .is_some()
    {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Username '{username}' is already taken"
        ))));
    }
    let password_hash = check_password(&input.password)?;

    let account = UserAccount {
        id: String::new(),
        username,
        email: input.email.trim().to_string(),
        full_name: input.full_name,
        role: input.role,
        password_hash,
        is_active: true,
        failed_login_count: 0,
        locked_until: None,
        last_login_at: None,
        created_at: Some(Utc::now()),
    };
    let placed = state
        .workspace
        .users
        .add(role_group(&account.role), account)?;
    let created = placed.item;

    state.workspace.audit.record(
        audit_event(&admin, action_types::USER_ADMIN)
            .entity("user", &created.id)
            .details(json!({
                "operation": "create",
                "username": created.username,
                "role": created.role,
            })),
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: UserResponse::from(&created),
        }),
    ))
}

/// PUT /api/v1/admin/users/{id}
///
/// A role change moves the account into the new role's group.
pub async fn update_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    Json(input): Json<UpdateUserRequest>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let Placed { group, item, .. } = find_user(&state, &id)?;
    guard_self(
        &admin,
        &id,
        input.is_active == Some(false),
        input.role.as_deref(),
    )?;
    if let Some(role) = &input.role {
        check_role(role)?;
    }

    let mut updated = item.clone();
    if let Some(email) = input.email {
        updated.email = email.trim().to_string();
    }
    if input.full_name.is_some() {
        updated.full_name = input.full_name;
    }
    if let Some(is_active) = input.is_active {
        updated.is_active = is_active;
    }
    let role_changed = input.role.as_ref().is_some_and(|r| *r != item.role);
    if let Some(role) = input.role {
        updated.role = role;
    }

    let users = &state.workspace.users;
    users.update(&group.id, updated.clone())?;
    if role_changed {
        users.move_item(&group.id, &id, role_group(&updated.role), usize::MAX)?;
    }

    state.workspace.audit.record(
        audit_event(&admin, action_types::USER_ADMIN)
            .entity("user", &id)
            .details(json!({
                "operation": "update",
                "username": updated.username,
                "role": updated.role,
                "previous_role": item.role,
                "is_active": updated.is_active,
            })),
    );

    Ok(Json(DataResponse {
        data: UserResponse::from(&updated),
    }))
}

/// DELETE /api/v1/admin/users/{id}
///
/// Deactivate the account. Rows are kept so audit references stay valid.
pub async fn deactivate_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    guard_self(&admin, &id, true, None)?;
    let Placed { group, mut item, .. } = find_user(&state, &id)?;
    item.is_active = false;
    state.workspace.users.update(&group.id, item.clone())?;

    state.workspace.audit.record(
        audit_event(&admin, action_types::USER_ADMIN)
            .entity("user", &id)
            .details(json!({
                "operation": "deactivate",
                "username": item.username,
            })),
    );
    tracing::info!(admin = %admin.username, username = %item.username, "User deactivated");

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/admin/users/{id}/reset-password
///
/// Set a new password and clear any lockout.
pub async fn reset_password(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    Json(input): Json<ResetPasswordRequest>,
) -> AppResult<StatusCode> {
    let Placed { group, mut item, .. } = find_user(&state, &id)?;
    item.password_hash = check_password(&input.new_password)?;
    item.failed_login_count = 0;
    item.locked_until = None;
    state.workspace.users.update(&group.id, item.clone())?;

    state.workspace.audit.record(
        audit_event(&admin, action_types::USER_ADMIN)
            .entity("user", &id)
            .details(json!({
                "operation": "reset_password",
                "username": item.username,
            })),
    );

    Ok(StatusCode::NO_CONTENT)
}
