use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;
use uuid::Uuid;

pub type TaskResult<T> = Result<T, TaskError>;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Update requires at least one field")]
    NoFieldsSupplied,

    #[error("Task not found: {0}")]
    NotFound(Uuid),

    #[error("Embedding provider unavailable; task was not created")]
    EmbeddingRequired,

    #[error("Search is unavailable; embedding provider did not respond")]
    SearchUnavailable,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<TaskError> for AppError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::Validation(msg) => AppError::BadRequest(msg),
            TaskError::NoFieldsSupplied => AppError::BadRequest(err.to_string()),
            TaskError::NotFound(id) => AppError::NotFound(format!("Task not found: {}", id)),
            TaskError::EmbeddingRequired | TaskError::SearchUnavailable => {
                AppError::ServiceUnavailable(err.to_string())
            }
            TaskError::Database(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for TaskError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}
