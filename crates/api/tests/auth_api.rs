//! HTTP-level integration tests for login, logout, lockout and RBAC.

mod common;

use agency_core::roles::{ROLE_MANAGER, ROLE_STAFF};
use agency_core::tables::DomainTable;
use axum::http::StatusCode;
use common::{
    admin_token, body_json, build_test_app, create_user, delete_auth, get, get_auth, login,
    post_auth, post_json, ADMIN_PASSWORD, ADMIN_USERNAME, USER_PASSWORD,
};
use serde_json::json;

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

#[tokio::test]
async fn login_success_returns_token_and_user() {
    let t = build_test_app().await;

    let body = json!({ "username": ADMIN_USERNAME, "password": ADMIN_PASSWORD });
    let response = post_json(&t.app, "/api/v1/auth/login", body).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["access_token"].is_string());
    assert_eq!(json["expires_in"], 3600);
    assert_eq!(json["user"]["username"], ADMIN_USERNAME);
    assert_eq!(json["user"]["role"], "admin");
    assert!(json["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn username_match_is_case_insensitive() {
    let t = build_test_app().await;
    login(&t.app, "ADMIN", ADMIN_PASSWORD).await;
}

#[tokio::test]
async fn wrong_password_returns_401() {
    let t = build_test_app().await;

    let body = json!({ "username": ADMIN_USERNAME, "password": "not-the-password" });
    let response = post_json(&t.app, "/api/v1/auth/login", body).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn unknown_user_returns_401() {
    let t = build_test_app().await;

    let body = json!({ "username": "ghost", "password": "whatever" });
    let response = post_json(&t.app, "/api/v1/auth/login", body).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn deactivated_user_returns_403() {
    let t = build_test_app().await;
    let user_id = create_user(&t.state, "leaver", ROLE_STAFF).await;
    let token = admin_token(&t.app).await;

    let response = delete_auth(&t.app, &format!("/api/v1/admin/users/{user_id}"), &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let body = json!({ "username": "leaver", "password": USER_PASSWORD });
    let response = post_json(&t.app, "/api/v1/auth/login", body).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn repeated_failures_lock_the_account() {
    let t = build_test_app().await;
    create_user(&t.state, "clumsy", ROLE_STAFF).await;

    for _ in 0..5 {
        let body = json!({ "username": "clumsy", "password": "wrong-password!" });
        let response = post_json(&t.app, "/api/v1/auth/login", body).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    // Correct password is refused while the lock is in effect.
    let body = json!({ "username": "clumsy", "password": USER_PASSWORD });
    let response = post_json(&t.app, "/api/v1/auth/login", body).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn login_uses_cached_accounts_when_datastore_read_fails() {
    let t = build_test_app().await;
    t.source
        .table(DomainTable::UserAccounts)
        .fail_next_fetches(1);

    let token = login(&t.app, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    assert!(!token.is_empty());
}

#[tokio::test]
async fn failed_attempts_are_written_back() {
    let t = build_test_app().await;
    create_user(&t.state, "typo", ROLE_STAFF).await;

    for _ in 0..2 {
        let body = json!({ "username": "typo", "password": "wrong-password!" });
        post_json(&t.app, "/api/v1/auth/login", body).await;
    }
    t.state.workspace.flush_all().await;

    let rows = t.source.table(DomainTable::UserAccounts).rows();
    let row = rows
        .iter()
        .find(|r| r.item_data.contains("\"typo\""))
        .expect("user row should exist");
    let payload: serde_json::Value = serde_json::from_str(&row.item_data).unwrap();
    assert_eq!(payload["failedLoginCount"], 2);
}

#[tokio::test]
async fn admin_reset_password_clears_lockout() {
    let t = build_test_app().await;
    let user_id = create_user(&t.state, "locked", ROLE_STAFF).await;
    for _ in 0..5 {
        let body = json!({ "username": "locked", "password": "wrong-password!" });
        post_json(&t.app, "/api/v1/auth/login", body).await;
    }

    let token = admin_token(&t.app).await;
    let response = common::post_json_auth(
        &t.app,
        &format!("/api/v1/admin/users/{user_id}/reset-password"),
        json!({ "new_password": "a-brand-new-password" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    login(&t.app, "locked", "a-brand-new-password").await;
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[tokio::test]
async fn me_returns_current_user() {
    let t = build_test_app().await;
    create_user(&t.state, "maria", ROLE_MANAGER).await;
    let token = login(&t.app, "maria", USER_PASSWORD).await;

    let response = get_auth(&t.app, "/api/v1/auth/me", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["username"], "maria");
    assert_eq!(json["data"]["role"], "manager");
}

#[tokio::test]
async fn logout_returns_204() {
    let t = build_test_app().await;
    let token = admin_token(&t.app).await;

    let response = post_auth(&t.app, "/api/v1/auth/logout", &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

// ---------------------------------------------------------------------------
// RBAC
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_token_returns_401() {
    let t = build_test_app().await;

    let response = get(&t.app, "/api/v1/tasks").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn garbage_token_returns_401() {
    let t = build_test_app().await;

    let response = get_auth(&t.app, "/api/v1/tasks", "not-a-jwt").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn staff_cannot_reach_admin_routes() {
    let t = build_test_app().await;
    create_user(&t.state, "sam", ROLE_STAFF).await;
    let token = login(&t.app, "sam", USER_PASSWORD).await;

    let response = get_auth(&t.app, "/api/v1/admin/users", &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = get_auth(&t.app, "/api/v1/audit", &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
