use std::sync::{Arc, Mutex};

use axum::extract::Json;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post, put};
use axum::Router;
use serde_json::{json, Value};

use ktm_dashboard::http::HttpClient;
use ktm_dashboard::taskade::TaskadeClient;
use ktm_dashboard::{AppError, RunConfig};

const TITLE: &str = "KTM Train Status Live Update";

fn test_config() -> RunConfig {
    RunConfig {
        feed_url: String::new(),
        taskade_base_url: String::new(),
        taskade_api_token: "secret-token".to_owned(),
        taskade_project_id: "p1".to_owned(),
        taskade_task_id: None,
        http_timeout_seconds: 5,
        max_retries: 2,
        retry_backoff: 0.01,
    }
}

async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    format!("http://{addr}")
}

fn client_for(base: &str) -> TaskadeClient {
    let http = HttpClient::new(&test_config()).expect("http client");
    TaskadeClient::new(http, base, "secret-token").expect("taskade client")
}

#[tokio::test]
async fn create_task_sends_bearer_auth_and_parses_the_created_id() {
    let seen: Arc<Mutex<Option<(String, Value)>>> = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&seen);
    let router = Router::new().route(
        "/projects/p1/tasks",
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let sink = Arc::clone(&sink);
            async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_owned();
                *sink.lock().expect("lock") = Some((auth, body));
                (StatusCode::CREATED, Json(json!({ "item": [{ "id": "task-1" }] })))
            }
        }),
    );
    let base = spawn(router).await;

    let created = client_for(&base)
        .create_task("p1", "report body", TITLE)
        .await
        .expect("create succeeds");
    assert_eq!(created.as_deref(), Some("task-1"));

    let (auth, body) = seen.lock().expect("lock").clone().expect("request captured");
    assert_eq!(auth, "Bearer secret-token");
    assert_eq!(body["tasks"][0]["placement"], "afterbegin");
    assert_eq!(body["tasks"][0]["contentType"], "text/markdown");
    assert_eq!(body["tasks"][0]["content"], "report body");
    assert_eq!(body["tasks"][0]["title"], TITLE);
}

#[tokio::test]
async fn create_task_without_an_id_path_returns_none_not_an_error() {
    let router = Router::new().route(
        "/projects/p1/tasks",
        post(|| async { (StatusCode::OK, Json(json!({ "ok": true }))) }),
    );
    let base = spawn(router).await;

    let created = client_for(&base)
        .create_task("p1", "report body", TITLE)
        .await
        .expect("missing id path is degraded, not fatal");
    assert_eq!(created, None);
}

#[tokio::test]
async fn create_task_rejects_an_unexpected_status() {
    let router = Router::new().route(
        "/projects/p1/tasks",
        post(|| async { (StatusCode::FORBIDDEN, "nope") }),
    );
    let base = spawn(router).await;

    let err = client_for(&base)
        .create_task("p1", "report body", TITLE)
        .await
        .expect_err("403 must fail");
    assert!(matches!(err, AppError::Upsert(_)));
    assert!(err.to_string().contains("403"));
}

#[tokio::test]
async fn update_task_accepts_204_and_sends_the_content() {
    let seen: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&seen);
    let router = Router::new().route(
        "/tasks/task-1",
        put(move |Json(body): Json<Value>| {
            let sink = Arc::clone(&sink);
            async move {
                *sink.lock().expect("lock") = Some(body);
                StatusCode::NO_CONTENT
            }
        }),
    );
    let base = spawn(router).await;

    client_for(&base)
        .update_task("task-1", "fresh content")
        .await
        .expect("update succeeds");

    let body = seen.lock().expect("lock").clone().expect("request captured");
    assert_eq!(body, json!({ "content": "fresh content" }));
}

#[tokio::test]
async fn update_task_rejects_an_unexpected_status() {
    let router = Router::new().route(
        "/tasks/task-1",
        put(|| async { (StatusCode::NOT_FOUND, "gone") }),
    );
    let base = spawn(router).await;

    let err = client_for(&base)
        .update_task("task-1", "fresh content")
        .await
        .expect_err("404 must fail");
    assert!(matches!(err, AppError::Upsert(_)));
}

#[tokio::test]
async fn list_tasks_accepts_an_items_object() {
    let router = Router::new().route(
        "/projects/p1/tasks",
        get(|| async {
            Json(json!({ "items": [
                { "id": "a", "title": "Groceries" },
                { "id": "b", "title": TITLE },
            ] }))
        }),
    );
    let base = spawn(router).await;

    let tasks = client_for(&base).list_tasks("p1").await.expect("list succeeds");
    assert_eq!(tasks.len(), 2);
}

#[tokio::test]
async fn list_tasks_treats_an_unknown_shape_as_empty() {
    let router = Router::new().route(
        "/projects/p1/tasks",
        get(|| async { Json(json!({ "data": { "nested": true } })) }),
    );
    let base = spawn(router).await;

    let tasks = client_for(&base).list_tasks("p1").await.expect("list succeeds");
    assert!(tasks.is_empty());
}

#[tokio::test]
async fn find_task_by_title_returns_the_dashboard_task() {
    let router = Router::new().route(
        "/projects/p1/tasks",
        get(|| async {
            Json(json!([
                { "id": "a", "title": "Groceries" },
                { "id": "b", "title": "ktm train status live update" },
            ]))
        }),
    );
    let base = spawn(router).await;

    let found = client_for(&base)
        .find_task_by_title("p1", TITLE)
        .await
        .expect("find succeeds")
        .expect("task matched");
    assert_eq!(found.usable_id(), Some("b"));
}

#[tokio::test]
async fn find_task_by_title_returns_none_when_nothing_matches() {
    let router = Router::new().route(
        "/projects/p1/tasks",
        get(|| async { Json(json!([{ "id": "a", "title": "Groceries" }])) }),
    );
    let base = spawn(router).await;

    let found = client_for(&base)
        .find_task_by_title("p1", TITLE)
        .await
        .expect("find succeeds");
    assert!(found.is_none());
}
