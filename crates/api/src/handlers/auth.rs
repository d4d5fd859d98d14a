//! Handlers for the `/auth` resource (login, logout, me).

use agency_core::audit::action_types;
use agency_core::error::CoreError;
use agency_core::records::UserAccount;
use agency_sync::{AuditEvent, Placed};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::audit_event;
use crate::auth::jwt::generate_access_token;
use crate::auth::password::verify_password;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Successful authentication response.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserInfo,
}

/// Public user info embedded in [`AuthResponse`].
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub role: String,
}

impl From<&UserAccount> for UserInfo {
    fn from(account: &UserAccount) -> Self {
        Self {
            id: account.id.clone(),
            username: account.username.clone(),
            email: account.email.clone(),
            full_name: account.full_name.clone(),
            role: account.role.clone(),
        }
    }
}

fn invalid_credentials() -> AppError {
    AppError::Core(CoreError::Unauthorized(
        "Invalid username or password".into(),
    ))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/login
///
/// Authenticate with username + password. Starts the user on an empty undo
/// stack.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let users = &state.workspace.users;
    let audit = &state.workspace.audit;

    // 1. Re-read accounts so lockouts and password resets made elsewhere apply.
    //    When the datastore is unreachable the cached accounts are used.
    users.flush().await;
    if let Err(e) = users.load().await {
        tracing::warn!(error = %e, "Logging in against cached user accounts");
    }

    // 2. Find user by username.
    let username = input.username.trim();
    let Some(Placed {
        group,
        item: mut account,
        ..
    }) = users.find_where(|u| u.username.eq_ignore_ascii_case(username))
    else {
        audit.record(AuditEvent::new(action_types::LOGIN_FAILED).details(json!({
            "username": username,
            "reason": "unknown_user",
        })));
        return Err(invalid_credentials());
    };

    // 3. Check if the account is active.
    if !account.is_active {
        audit.record(
            AuditEvent::new(action_types::LOGIN_FAILED)
                .actor(&account.id, &account.username)
                .details(json!({ "reason": "inactive" })),
        );
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    // 4. Check if the account is temporarily locked.
    let now = Utc::now();
    if account.is_locked(now) {
        audit.record(
            AuditEvent::new(action_types::LOGIN_FAILED)
                .actor(&account.id, &account.username)
                .details(json!({ "reason": "locked" })),
        );
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is temporarily locked. Try again later.".into(),
        )));
    }

    // 5. Verify password.
    let password_valid = verify_password(&input.password, &account.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;

    if !password_valid {
        // 6. On failure: count the attempt, lock once the threshold is reached.
        let locked = account.register_failed_login(now);
        users.update(&group.id, account.clone())?;
        if locked {
            tracing::warn!(username = %account.username, "Account locked after repeated failed logins");
        }
        audit.record(
            AuditEvent::new(action_types::LOGIN_FAILED)
                .actor(&account.id, &account.username)
                .details(json!({
                    "reason": "bad_password",
                    "failed_login_count": account.failed_login_count,
                    "locked": locked,
                })),
        );
        return Err(invalid_credentials());
    }

    // 7. On success: reset failed count, set last_login_at.
    account.register_successful_login(now);
    users.update(&group.id, account.clone())?;

    // 8. Fresh session, fresh undo history.
    state.undo.reset(&account.id);

    let access_token =
        generate_access_token(&account.id, &account.username, &account.role, &state.config.jwt)
            .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    audit.record(
        AuditEvent::new(action_types::LOGIN)
            .actor(&account.id, &account.username)
            .details(json!({ "role": account.role })),
    );
    tracing::info!(username = %account.username, role = %account.role, "User logged in");

    Ok(Json(AuthResponse {
        access_token,
        expires_in: state.config.jwt.access_token_expiry_mins * 60,
        user: UserInfo::from(&account),
    }))
}

/// POST /api/v1/auth/logout
///
/// Discard the user's undo stack. Returns 204 No Content.
pub async fn logout(State(state): State<AppState>, auth_user: AuthUser) -> AppResult<StatusCode> {
    state.undo.remove(&auth_user.user_id);
    state
        .workspace
        .audit
        .record(audit_event(&auth_user, action_types::LOGOUT));
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/me
pub async fn me(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<UserInfo>>> {
    let account = state
        .workspace
        .users
        .find_where(|u| u.id == auth_user.user_id)
        .ok_or_else(|| CoreError::not_found("user", auth_user.user_id.clone()))?
        .item;

    Ok(Json(DataResponse {
        data: UserInfo::from(&account),
    }))
}
