use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Lifecycle state of a task.
///
/// Stored as a PostgreSQL enum; the string values below are the wire and
/// database representation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "task_status")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskStatus {
    #[sea_orm(string_value = "todo")]
    Todo,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "done")]
    Done,
}

/// A task with its searchable text and lifecycle status.
///
/// The embedding vector is internal search state and is never serialized
/// into API responses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    #[serde(skip)]
    #[schema(ignore)]
    pub embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating a task.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateTask {
    #[validate(length(min = 1, max = 255, message = "title must be 1-255 characters"))]
    pub title: String,

    /// Free-form text; the sole input to the embedding provider.
    #[validate(length(min = 1, message = "description must not be empty"))]
    pub description: String,

    pub status: TaskStatus,
}

/// Request body for partially updating a task.
///
/// All fields are optional, but at least one must be supplied.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateTask {
    #[validate(length(min = 1, max = 255, message = "title must be 1-255 characters"))]
    pub title: Option<String>,

    #[validate(length(min = 1, message = "description must not be empty"))]
    pub description: Option<String>,

    pub status: Option<TaskStatus>,
}

impl UpdateTask {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.status.is_none()
    }
}

/// Result of an update, reporting whether the stored embedding was
/// recomputed from the new description or left stale.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TaskUpdate {
    pub task: Task,
    pub embedding_refreshed: bool,
}

/// Query parameters for semantic search.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct SearchQuery {
    /// Natural-language query text
    pub q: String,
    /// Number of results to return (1-50, default 3)
    pub k: Option<usize>,
}

/// A search result: the matching task plus its L2 distance from the query.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SearchHit {
    #[serde(flatten)]
    pub task: Task,
    pub distance: f64,
}
