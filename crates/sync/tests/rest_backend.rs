//! Drives `RestTable` against a minimal in-process PostgREST stand-in.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use agency_core::grouping::{GroupMeta, StoredRow};
use agency_core::tables::DomainTable;
use agency_sync::rest::{RestConfig, RestRow, RestSource};
use agency_sync::{RemoteTable, SyncError, TableSource, WriteOp};
use assert_matches::assert_matches;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use parking_lot::Mutex;

const API_KEY: &str = "test-anon-key";

type Rows = Arc<Mutex<Vec<RestRow>>>;

fn authorized(headers: &HeaderMap) -> bool {
    let bearer = format!("Bearer {API_KEY}");
    headers.get("apikey").and_then(|v| v.to_str().ok()) == Some(API_KEY)
        && headers.get("authorization").and_then(|v| v.to_str().ok()) == Some(bearer.as_str())
}

fn filter(params: &HashMap<String, String>, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.strip_prefix("eq."))
        .map(str::to_string)
}

fn matches(row: &RestRow, params: &HashMap<String, String>) -> bool {
    filter(params, "group_id").is_none_or(|g| row.group_id == g)
        && filter(params, "item_id").is_none_or(|i| row.item_id == i)
}

async fn list(
    State(rows): State<Rows>,
    Path(table): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Vec<RestRow>>, StatusCode> {
    if !authorized(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    if table != "tasks" {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(rows.lock().clone()))
}

async fn insert(
    State(rows): State<Rows>,
    headers: HeaderMap,
    Json(row): Json<RestRow>,
) -> StatusCode {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED;
    }
    rows.lock().push(row);
    StatusCode::CREATED
}

async fn patch(
    State(rows): State<Rows>,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<serde_json::Value>,
) -> StatusCode {
    let mut rows = rows.lock();
    for row in rows.iter_mut().filter(|r| matches(r, &params)) {
        let mut current = serde_json::to_value(&*row).unwrap();
        if let (Some(target), Some(changes)) = (current.as_object_mut(), body.as_object()) {
            for (key, value) in changes {
                target.insert(key.clone(), value.clone());
            }
        }
        *row = serde_json::from_value(current).unwrap();
    }
    StatusCode::NO_CONTENT
}

async fn delete(
    State(rows): State<Rows>,
    Query(params): Query<HashMap<String, String>>,
) -> StatusCode {
    rows.lock().retain(|r| !matches(r, &params));
    StatusCode::NO_CONTENT
}

async fn spawn_gateway() -> (String, Rows) {
    let rows: Rows = Arc::default();
    let app = Router::new()
        .route(
            "/rest/v1/{table}",
            get(list).post(insert).patch(patch).delete(delete),
        )
        .with_state(rows.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), rows)
}

fn source(base_url: String, api_key: &str) -> RestSource {
    RestSource::new(RestConfig {
        base_url,
        api_key: api_key.to_string(),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

fn row(group: &str, item_id: &str, position: i32) -> StoredRow {
    StoredRow {
        item_id: item_id.into(),
        group: GroupMeta::new(group, group.to_uppercase()),
        position,
        item_data: format!(r#"{{"id":"{item_id}","title":"t"}}"#),
    }
}

#[tokio::test]
async fn writes_and_reads_rows() {
    let (url, _) = spawn_gateway().await;
    let tasks = source(url, API_KEY).open(DomainTable::Tasks);

    tasks.apply(&WriteOp::Insert(row("a", "1", 0))).await.unwrap();
    tasks.apply(&WriteOp::Insert(row("a", "2", 1))).await.unwrap();
    tasks
        .apply(&WriteOp::Update {
            group_id: "a".into(),
            item_id: "1".into(),
            row: row("b", "1", 0),
        })
        .await
        .unwrap();
    tasks
        .apply(&WriteOp::UpdateGroup(
            GroupMeta::new("a", "Renamed").with_color("#00ff00"),
        ))
        .await
        .unwrap();

    let rows = tasks.fetch_all().await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].group.id, "b");
    assert_eq!(rows[1].group.name, "Renamed");
    assert_eq!(rows[1].group.color.as_deref(), Some("#00ff00"));

    tasks
        .apply(&WriteOp::Delete {
            group_id: "b".into(),
            item_id: "1".into(),
        })
        .await
        .unwrap();
    assert_eq!(tasks.fetch_all().await.unwrap().len(), 1);
    assert!(tasks.ping().await.is_ok());
}

#[tokio::test]
async fn wrong_key_is_rejected_permanently() {
    let (url, _) = spawn_gateway().await;
    let tasks = source(url, "wrong").open(DomainTable::Tasks);

    let err = tasks.fetch_all().await.unwrap_err();
    assert_matches!(err, SyncError::Rejected { status: 401, .. });
    assert!(!err.is_transient());
}

#[tokio::test]
async fn unreachable_gateway_is_transient() {
    let tasks = source("http://127.0.0.1:9".into(), API_KEY).open(DomainTable::Tasks);
    let err = tasks.ping().await.unwrap_err();
    assert_matches!(err, SyncError::Http(_));
    assert!(err.is_transient());
}
