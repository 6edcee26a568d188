use crate::task::{InvalidTaskStatus, Task, TaskRepository, TaskRepositoryError, TaskStatus};
use axum::{
    Json, Router,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared handler state: the repository behind its capability interface.
#[derive(Clone)]
pub struct TaskState {
    pub repository: Arc<dyn TaskRepository>,
}

/// JSON representation of a Task for API responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskJson {
    id: i32,
    title: String,
    description: String,
    status: String,
    #[serde(rename = "createdAt")]
    created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    updated_at: DateTime<Utc>,
}

impl From<Task> for TaskJson {
    fn from(task: Task) -> Self {
        Self {
            id: task.id(),
            title: task.title().to_string(),
            description: task.description().to_string(),
            status: task.status().to_string(),
            created_at: task.created_at(),
            updated_at: task.updated_at(),
        }
    }
}

/// Envelope for endpoints returning a single task.
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    task: TaskJson,
}

/// Envelope for the task listing endpoint.
#[derive(Debug, Serialize)]
pub struct TasksResponse {
    tasks: Vec<TaskJson>,
}

/// JSON request payload for creating a task.
#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    title: String,
    #[serde(default)]
    description: String,
}

/// JSON request payload for updating a task's status.
#[derive(Debug, Deserialize)]
pub struct UpdateTaskStatusRequest {
    status: String,
}

/// JSON response body for API errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Error type for task handler operations.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents rejected input: bad JSON, an empty title, a non-numeric ID,
    /// or a status outside the enumeration.
    #[error("{0}")]
    Validation(String),
    /// Represents a task not found by ID.
    #[error("Task with ID {0} not found")]
    NotFound(i32),
    /// Represents a storage failure; the message carries the driver error.
    #[error("Storage error: {0}")]
    Storage(TaskRepositoryError),
}

impl From<TaskRepositoryError> for ApiError {
    fn from(err: TaskRepositoryError) -> Self {
        match err {
            TaskRepositoryError::TaskNotFound(id) => ApiError::NotFound(id),
            other => ApiError::Storage(other),
        }
    }
}

impl From<InvalidTaskStatus> for ApiError {
    fn from(err: InvalidTaskStatus) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status_code, error_code) = match &self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Storage(err) => {
                tracing::error!("Storage error while handling request: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR")
            }
        };
        let body = ErrorResponse {
            error: error_code.to_string(),
            message: self.to_string(),
        };
        (status_code, Json(body)).into_response()
    }
}

/// Handler for POST /tasks.
///
/// Validates that the title is non-empty before touching storage; the status
/// of a new task is always `pending`, whatever the client sent.
#[tracing::instrument(skip(state, payload))]
pub async fn create_task_handler(
    State(state): State<TaskState>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskResponse>), ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        ApiError::Validation(format!("Error parsing request body: {}", rejection))
    })?;

    if request.title.is_empty() {
        return Err(ApiError::Validation("title is required".to_string()));
    }

    let task = state
        .repository
        .create_task(request.title, request.description)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(TaskResponse { task: task.into() }),
    ))
}

/// Handler for GET /tasks. Returns every task ordered by ascending ID.
#[tracing::instrument(skip(state))]
pub async fn get_tasks_handler(
    State(state): State<TaskState>,
) -> Result<Json<TasksResponse>, ApiError> {
    let tasks = state.repository.get_all_tasks().await?;
    Ok(Json(TasksResponse {
        tasks: tasks.into_iter().map(TaskJson::from).collect(),
    }))
}

/// Handler for POST /tasks/{id}.
///
/// The status string is validated against the enumeration before any
/// repository call; an unknown ID maps to 404.
#[tracing::instrument(skip(state, payload))]
pub async fn update_task_status_handler(
    State(state): State<TaskState>,
    path: Result<Path<i32>, PathRejection>,
    payload: Result<Json<UpdateTaskStatusRequest>, JsonRejection>,
) -> Result<Json<TaskResponse>, ApiError> {
    let Path(id) =
        path.map_err(|rejection| ApiError::Validation(format!("Invalid task ID: {}", rejection)))?;
    let Json(request) = payload.map_err(|rejection| {
        ApiError::Validation(format!("Error parsing request body: {}", rejection))
    })?;
    let status: TaskStatus = request.status.parse()?;

    let task = state.repository.update_task_status(id, status).await?;
    Ok(Json(TaskResponse { task: task.into() }))
}

/// Creates and returns the tasks API router.
pub fn create_task_router(state: TaskState) -> Router {
    Router::new()
        .route("/tasks", get(get_tasks_handler).post(create_task_handler))
        .route("/tasks/{id}", post(update_task_status_handler))
        .with_state(state)
}
