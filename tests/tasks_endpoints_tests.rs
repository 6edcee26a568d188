use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tasks_server::task::PostgresTaskRepository;
use tasks_server::task::api::TaskState;
use tasks_server::web::create_router;
use testcontainers_modules::{postgres, testcontainers};
use tower::ServiceExt;

mod common;

pub struct TestContext {
    #[allow(dead_code)] // container is kept to ensure it's not dropped
    pub container: testcontainers::ContainerAsync<postgres::Postgres>,
    pub db: DatabaseConnection,
}

async fn setup() -> anyhow::Result<TestContext> {
    // Allow multiple calls to init for tests.
    let _ = tracing_subscriber::fmt().try_init();
    let container = common::setup_container().await?;
    let db = common::setup_db(&container).await?;
    Ok(TestContext { db, container })
}

fn app(db: DatabaseConnection) -> Router {
    create_router(TaskState {
        repository: Arc::new(PostgresTaskRepository::new(db)),
    })
}

fn json_request(method: Method, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn task_lifecycle_end_to_end() {
    let state = setup().await.expect("Failed to setup test context");
    let app = app(state.db);

    // Create a task; it must come back pending with a fresh ID.
    let create = json_request(
        Method::POST,
        "/tasks",
        r#"{"title":"Buy milk","description":""}"#,
    );
    let response = app.clone().oneshot(create).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/json"
    );
    let created = response_json(response).await;
    assert_eq!(created["task"]["status"], "pending");
    let id = created["task"]["id"].as_i64().unwrap();
    assert!(id > 0);

    // Complete it.
    let update = json_request(
        Method::POST,
        &format!("/tasks/{}", id),
        r#"{"status":"completed"}"#,
    );
    let response = app.clone().oneshot(update).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = response_json(response).await;
    assert_eq!(updated["task"]["status"], "completed");

    // The listing reflects the completed task.
    let list = Request::builder()
        .uri("/tasks")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(list).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed = response_json(response).await;
    let tasks = listed["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["id"].as_i64().unwrap(), id);
    assert_eq!(tasks[0]["status"], "completed");

    // A bogus status is rejected and the stored task keeps its status.
    let bogus = json_request(
        Method::POST,
        &format!("/tasks/{}", id),
        r#"{"status":"bogus"}"#,
    );
    let response = app.clone().oneshot(bogus).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let list = Request::builder()
        .uri("/tasks")
        .body(Body::empty())
        .unwrap();
    let listed = response_json(app.clone().oneshot(list).await.unwrap()).await;
    assert_eq!(listed["tasks"][0]["status"], "completed");
}

#[tokio::test]
async fn created_task_carries_rfc3339_timestamps() {
    let state = setup().await.expect("Failed to setup test context");
    let app = app(state.db);

    let create = json_request(Method::POST, "/tasks", r#"{"title":"Timestamped"}"#);
    let created = response_json(app.oneshot(create).await.unwrap()).await;

    for key in ["createdAt", "updatedAt"] {
        let raw = created["task"][key].as_str().expect("timestamp missing");
        chrono::DateTime::parse_from_rfc3339(raw).expect("timestamp not RFC 3339");
    }
}

#[tokio::test]
async fn completing_a_task_moves_updated_at_forward() {
    let state = setup().await.expect("Failed to setup test context");
    let app = app(state.db);

    let create = json_request(Method::POST, "/tasks", r#"{"title":"Clocked"}"#);
    let created = response_json(app.clone().oneshot(create).await.unwrap()).await;
    let id = created["task"]["id"].as_i64().unwrap();

    let update = json_request(
        Method::POST,
        &format!("/tasks/{}", id),
        r#"{"status":"completed"}"#,
    );
    let updated = response_json(app.oneshot(update).await.unwrap()).await;

    let created_at =
        chrono::DateTime::parse_from_rfc3339(updated["task"]["createdAt"].as_str().unwrap())
            .unwrap();
    let updated_at =
        chrono::DateTime::parse_from_rfc3339(updated["task"]["updatedAt"].as_str().unwrap())
            .unwrap();
    assert!(updated_at > created_at);
}

#[tokio::test]
async fn empty_title_is_rejected_and_nothing_is_stored() {
    let state = setup().await.expect("Failed to setup test context");
    let app = app(state.db);

    let create = json_request(Method::POST, "/tasks", r#"{"title":""}"#);
    let response = app.clone().oneshot(create).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let list = Request::builder()
        .uri("/tasks")
        .body(Body::empty())
        .unwrap();
    let listed = response_json(app.oneshot(list).await.unwrap()).await;
    assert_eq!(listed["tasks"], serde_json::json!([]));
}

#[tokio::test]
async fn updating_unknown_task_answers_not_found() {
    let state = setup().await.expect("Failed to setup test context");
    let app = app(state.db);

    let update = json_request(Method::POST, "/tasks/999", r#"{"status":"completed"}"#);
    let response = app.oneshot(update).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response_json(response).await;
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn health_check_answers_ok_over_the_full_router() {
    let state = setup().await.expect("Failed to setup test context");
    let app = app(state.db);

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"OK");
}
