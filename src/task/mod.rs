use crate::entities::task;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::*;
use std::str::FromStr;

pub mod api;

/// The two states a task can be in. Persisted as lowercase text.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum TaskStatus {
    Pending,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a recognized task status.
#[derive(Debug, thiserror::Error)]
#[error("Invalid status value '{0}'. Must be either 'pending' or 'completed'")]
pub struct InvalidTaskStatus(pub String);

impl FromStr for TaskStatus {
    type Err = InvalidTaskStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(InvalidTaskStatus(other.to_string())),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Task {
    id: i32,
    title: String,
    description: String,
    status: TaskStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(
        id: i32,
        title: String,
        description: String,
        status: TaskStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title,
            description,
            status,
            created_at,
            updated_at,
        }
    }

    /// Returns the ID of the task.
    pub fn id(&self) -> i32 {
        self.id
    }

    /// Returns the title of the task.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description of the task.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the status of the task.
    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the creation timestamp of the task.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the timestamp of the last status update.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Error type for task repository operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskRepositoryError {
    /// Represents a task not found error.
    #[error("Task with ID {0} not found")]
    TaskNotFound(i32),
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    /// Represents a stored status column holding a value outside the enumeration.
    #[error("Task {0} has malformed status '{1}' in storage")]
    MalformedStatus(i32, String),
}

impl TryFrom<task::Model> for Task {
    type Error = TaskRepositoryError;

    fn try_from(model: task::Model) -> Result<Self, Self::Error> {
        let status = TaskStatus::from_str(&model.status)
            .map_err(|_| TaskRepositoryError::MalformedStatus(model.id, model.status.clone()))?;
        Ok(Task::new(
            model.id,
            model.title,
            model.description,
            status,
            model.created_at.with_timezone(&Utc),
            model.updated_at.with_timezone(&Utc),
        ))
    }
}

/// Capability interface over task persistence. The production implementation
/// is [`PostgresTaskRepository`]; tests substitute a mock or in-memory fake.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Inserts a new task with status forced to `pending` and returns the
    /// persisted record, including the generated ID and timestamps.
    async fn create_task(
        &self,
        title: String,
        description: String,
    ) -> Result<Task, TaskRepositoryError>;

    /// Fetches a single task by its primary key.
    async fn get_task_by_id(&self, id: i32) -> Result<Task, TaskRepositoryError>;

    /// Sets the status of the task with the given ID and bumps `updated_at`.
    async fn update_task_status(
        &self,
        id: i32,
        status: TaskStatus,
    ) -> Result<Task, TaskRepositoryError>;

    /// Returns all tasks ordered by ascending ID; an empty list is not an error.
    async fn get_all_tasks(&self) -> Result<Vec<Task>, TaskRepositoryError>;

    /// Deletes every task and returns the number of rows removed.
    /// Maintenance-only; not reachable through the HTTP surface.
    async fn delete_all_tasks(&self) -> Result<u64, TaskRepositoryError>;
}

/// Production repository backed by Postgres through sea-orm.
pub struct PostgresTaskRepository {
    db: DatabaseConnection,
}

impl PostgresTaskRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TaskRepository for PostgresTaskRepository {
    /// Creates a new task in the database.
    ///
    /// The status is always `pending` and both timestamps are set to now,
    /// regardless of what the caller supplied upstream. The row is re-read
    /// after the insert so the caller sees exactly what was persisted.
    #[tracing::instrument(skip(self))]
    async fn create_task(
        &self,
        title: String,
        description: String,
    ) -> Result<Task, TaskRepositoryError> {
        let now = Utc::now().fixed_offset();
        let active_model = task::ActiveModel {
            title: ActiveValue::Set(title),
            description: ActiveValue::Set(description),
            status: ActiveValue::Set(TaskStatus::Pending.to_string()),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
            ..Default::default()
        };
        let created_model = active_model.insert(&self.db).await?;
        self.get_task_by_id(created_model.id).await
    }

    #[tracing::instrument(skip(self))]
    async fn get_task_by_id(&self, id: i32) -> Result<Task, TaskRepositoryError> {
        let model = task::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(TaskRepositoryError::TaskNotFound(id))?;
        Task::try_from(model)
    }

    /// Updates the status of a task by its ID.
    ///
    /// Fails with [`TaskRepositoryError::TaskNotFound`] when no row matches.
    /// `updated_at` is bumped alongside the status; title and description are
    /// immutable after creation.
    #[tracing::instrument(skip(self))]
    async fn update_task_status(
        &self,
        id: i32,
        status: TaskStatus,
    ) -> Result<Task, TaskRepositoryError> {
        let task_to_update = task::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(TaskRepositoryError::TaskNotFound(id))?;

        let mut active_model: task::ActiveModel = task_to_update.into();
        active_model.status = ActiveValue::Set(status.to_string());
        active_model.updated_at = ActiveValue::Set(Utc::now().fixed_offset());
        let updated_model = active_model.update(&self.db).await?;

        self.get_task_by_id(updated_model.id).await
    }

    #[tracing::instrument(skip(self))]
    async fn get_all_tasks(&self) -> Result<Vec<Task>, TaskRepositoryError> {
        task::Entity::find()
            .order_by_asc(task::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Task::try_from)
            .collect()
    }

    #[tracing::instrument(skip(self))]
    async fn delete_all_tasks(&self) -> Result<u64, TaskRepositoryError> {
        let result = task::Entity::delete_many().exec(&self.db).await?;
        Ok(result.rows_affected)
    }
}
