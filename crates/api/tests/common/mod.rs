#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use agency_api::auth::jwt::JwtConfig;
use agency_api::bootstrap;
use agency_api::config::{BootstrapAdmin, DatastoreConfig, ServerConfig};
use agency_api::router::build_app_router;
use agency_api::state::AppState;
use agency_core::records::user::role_group;
use agency_core::records::UserAccount;
use agency_sync::memory::MemorySource;
use agency_sync::RetryPolicy;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "correct-horse-battery";
pub const USER_PASSWORD: &str = "staff-password-123";

/// Build a test `ServerConfig` with safe defaults and the in-memory backend.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-for-integration-tests".to_string(),
            access_token_expiry_mins: 60,
        },
        datastore: DatastoreConfig::Memory,
        retry: RetryPolicy::no_retry(),
        undo_capacity: 10,
        bootstrap_admin: Some(BootstrapAdmin {
            username: ADMIN_USERNAME.to_string(),
            email: "admin@agency.local".to_string(),
            password: ADMIN_PASSWORD.to_string(),
        }),
    }
}

/// A running app over fresh in-memory tables.
pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    /// Handle on the tables behind `state`, for seeding and failure injection.
    pub source: MemorySource,
}

/// Build the full application router with the bootstrap admin in place.
pub async fn build_test_app() -> TestApp {
    let config = test_config();
    let source = MemorySource::new();
    let state = AppState::new(config.clone(), &source);

    state.workspace.load_all().await;
    if let Some(admin) = &config.bootstrap_admin {
        bootstrap::ensure_admin(&state.workspace, admin)
            .await
            .expect("bootstrap admin should be created");
    }

    let app = build_app_router(state.clone(), &config);
    TestApp { app, state, source }
}

/// Add an account directly to the user collection. Password is
/// [`USER_PASSWORD`].
pub async fn create_user(state: &AppState, username: &str, role: &str) -> String {
    let account = UserAccount {
        id: String::new(),
        username: username.to_string(),
        email: format!("{username}@agency.test"),
        full_name: None,
        role: role.to_string(),
        password_hash: agency_api::auth::password::hash_password(USER_PASSWORD)
            .expect("hashing should succeed"),
        is_active: true,
        failed_login_count: 0,
        locked_until: None,
        last_login_at: None,
        created_at: None,
    };
    let placed = state
        .workspace
        .users
        .add(role_group(role), account)
        .expect("user creation should succeed");
    state.workspace.users.flush().await;
    placed.item.id
}

/// Log in via the API and return the access token.
pub async fn login(app: &Router, username: &str, password: &str) -> String {
    let body = serde_json::json!({ "username": username, "password": password });
    let response = post_json(app, "/api/v1/auth/login", body).await;
    assert_eq!(response.status(), StatusCode::OK, "login should succeed");
    let json = body_json(response).await;
    json["access_token"]
        .as_str()
        .expect("access_token must be a string")
        .to_string()
}

pub async fn admin_token(app: &Router) -> String {
    login(app, ADMIN_USERNAME, ADMIN_PASSWORD).await
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone()
        .oneshot(request)
        .await
        .expect("request should be handled")
}

fn json_request(
    method: &str,
    uri: &str,
    body: serde_json::Value,
    token: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request should build")
}

fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request should build")
}

pub async fn get(app: &Router, uri: &str) -> Response {
    send(app, empty_request("GET", uri, None)).await
}

pub async fn get_auth(app: &Router, uri: &str, token: &str) -> Response {
    send(app, empty_request("GET", uri, Some(token))).await
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response {
    send(app, json_request("POST", uri, body, None)).await
}

pub async fn post_json_auth(
    app: &Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    send(app, json_request("POST", uri, body, Some(token))).await
}

pub async fn post_auth(app: &Router, uri: &str, token: &str) -> Response {
    send(app, empty_request("POST", uri, Some(token))).await
}

pub async fn put_json_auth(
    app: &Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    send(app, json_request("PUT", uri, body, Some(token))).await
}

pub async fn patch_json_auth(
    app: &Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    send(app, json_request("PATCH", uri, body, Some(token))).await
}

pub async fn delete_auth(app: &Router, uri: &str, token: &str) -> Response {
    send(app, empty_request("DELETE", uri, Some(token))).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be valid JSON")
}
