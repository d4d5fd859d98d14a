//! HTTP-level integration tests for the audit trail endpoints.

mod common;

use agency_core::tables::DomainTable;
use agency_sync::{RemoteTable, WriteOp};
use axum::http::StatusCode;
use common::{admin_token, body_json, build_test_app, get_auth, post_json, post_json_auth};
use serde_json::json;

#[tokio::test]
async fn logins_and_mutations_are_recorded_newest_first() {
    let t = build_test_app().await;
    let token = admin_token(&t.app).await;
    post_json_auth(
        &t.app,
        "/api/v1/tasks",
        json!({ "item": { "title": "Audited" } }),
        &token,
    )
    .await;

    let response = get_auth(&t.app, "/api/v1/audit", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    let items = json["data"]["items"].as_array().unwrap();
    assert_eq!(items[0]["actionType"], "entity_create");
    assert_eq!(items[0]["entityType"], "task");
    assert_eq!(items[0]["actorName"], "admin");
    assert_eq!(items[1]["actionType"], "login");
    // Bootstrap, login, create.
    assert_eq!(json["data"]["total"], 3);
}

#[tokio::test]
async fn query_filters_by_category_and_text() {
    let t = build_test_app().await;
    let body = json!({ "username": "admin", "password": "definitely-wrong" });
    post_json(&t.app, "/api/v1/auth/login", body).await;
    let token = admin_token(&t.app).await;

    let json = body_json(
        get_auth(&t.app, "/api/v1/audit?category=authentication", &token).await,
    )
    .await;
    let actions: Vec<&str> = json["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["actionType"].as_str().unwrap())
        .collect();
    assert_eq!(actions, ["login", "login_failed"]);

    let json = body_json(
        get_auth(&t.app, "/api/v1/audit?search_text=BAD_PASSWORD", &token).await,
    )
    .await;
    assert_eq!(json["data"]["total"], 1);
}

#[tokio::test]
async fn limit_and_offset_page_results() {
    let t = build_test_app().await;
    let token = admin_token(&t.app).await;
    for i in 0..4 {
        post_json_auth(
            &t.app,
            "/api/v1/tasks",
            json!({ "item": { "title": format!("Task {i}") } }),
            &token,
        )
        .await;
    }

    let json = body_json(
        get_auth(&t.app, "/api/v1/audit?action_type=entity_create&limit=2&offset=1", &token).await,
    )
    .await;
    assert_eq!(json["data"]["total"], 4);
    let items = json["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["details"]["label"], "Task 2");
}

#[tokio::test]
async fn credential_reveal_is_audited_without_the_secret() {
    let t = build_test_app().await;
    let token = admin_token(&t.app).await;
    let body = json!({
        "item": { "service": "Facebook Ads", "login": "ads@acme.test", "secret": "s3cret-value" }
    });
    let created = body_json(post_json_auth(&t.app, "/api/v1/credentials", body, &token).await).await;
    let group_id = created["data"]["group"]["id"].as_str().unwrap();
    let item_id = created["data"]["item"]["id"].as_str().unwrap();

    get_auth(
        &t.app,
        &format!("/api/v1/credentials/items/{group_id}/{item_id}/reveal"),
        &token,
    )
    .await;

    let json = body_json(
        get_auth(&t.app, "/api/v1/audit?action_type=credential_reveal", &token).await,
    )
    .await;
    assert_eq!(json["data"]["total"], 1);
    assert_eq!(json["data"]["items"][0]["entityId"], item_id);

    let everything = body_json(get_auth(&t.app, "/api/v1/audit?limit=500", &token).await).await;
    assert!(!everything.to_string().contains("s3cret-value"));
}

#[tokio::test]
async fn verify_reports_intact_chain() {
    let t = build_test_app().await;
    let token = admin_token(&t.app).await;

    let response = get_auth(&t.app, "/api/v1/audit/verify", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["chain_valid"], true);
    assert_eq!(json["data"]["verified_entries"], 2);
    assert!(json["data"]["first_break"].is_null());
}

#[tokio::test]
async fn verify_detects_tampering_after_reload() {
    let t = build_test_app().await;
    let token = admin_token(&t.app).await;
    t.state.workspace.flush_all().await;

    // Rewrite the login entry's actor behind the trail's back.
    let table = t.source.table(DomainTable::AuditLogs);
    let mut row = table
        .rows()
        .into_iter()
        .find(|r| r.item_data.contains("\"login\""))
        .expect("login entry should be stored");
    let mut payload: serde_json::Value = serde_json::from_str(&row.item_data).unwrap();
    payload["actorId"] = json!("mallory");
    row.item_data = payload.to_string();
    let op = WriteOp::Update {
        group_id: row.group.id.clone(),
        item_id: row.item_id.clone(),
        row: row.clone(),
    };
    table.apply(&op).await.unwrap();

    t.state.workspace.audit.load().await.unwrap();

    let json = body_json(get_auth(&t.app, "/api/v1/audit/verify", &token).await).await;
    assert_eq!(json["data"]["chain_valid"], false);
    assert_eq!(json["data"]["first_break"], row.item_id.as_str());
}
