use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use axum_helpers::{
    UuidPath, ValidatedJson,
    errors::responses::{
        BadRequestUuidResponse, BadRequestValidationResponse, InternalServerErrorResponse,
        NotFoundResponse, ServiceUnavailableResponse,
    },
};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::embedding::EmbeddingClient;
use crate::error::TaskResult;
use crate::models::{CreateTask, SearchHit, SearchQuery, Task, TaskStatus, TaskUpdate, UpdateTask};
use crate::repository::TaskRepository;
use crate::service::TaskService;

const TAG: &str = "tasks";

/// OpenAPI documentation for the Tasks API
#[derive(OpenApi)]
#[openapi(
    paths(
        list_tasks,
        create_task,
        get_task,
        update_task,
        delete_task,
        search_tasks,
    ),
    components(
        schemas(Task, TaskStatus, CreateTask, UpdateTask, TaskUpdate, SearchHit),
        responses(
            NotFoundResponse,
            BadRequestValidationResponse,
            BadRequestUuidResponse,
            ServiceUnavailableResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = TAG, description = "Task management and semantic search endpoints")
    )
)]
pub struct ApiDoc;

/// Create the task router with all HTTP endpoints
pub fn router<R, E>(service: TaskService<R, E>) -> Router
where
    R: TaskRepository + 'static,
    E: EmbeddingClient + 'static,
{
    let shared_service = Arc::new(service);

    Router::new()
        .route("/", get(list_tasks).post(create_task))
        .route("/search", get(search_tasks))
        .route(
            "/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .with_state(shared_service)
}

/// List all tasks
#[utoipa::path(
    get,
    path = "",
    tag = TAG,
    responses(
        (status = 200, description = "List of tasks", body = Vec<Task>),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_tasks<R: TaskRepository, E: EmbeddingClient>(
    State(service): State<Arc<TaskService<R, E>>>,
) -> TaskResult<Json<Vec<Task>>> {
    let tasks = service.get_all_tasks().await?;
    Ok(Json(tasks))
}

/// Create a new task
///
/// The description is embedded synchronously; when the embedding provider
/// is unavailable the task is not created and 503 is returned.
#[utoipa::path(
    post,
    path = "",
    tag = TAG,
    request_body = CreateTask,
    responses(
        (status = 201, description = "Task created successfully", body = Task),
        (status = 400, response = BadRequestValidationResponse),
        (status = 503, response = ServiceUnavailableResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_task<R: TaskRepository, E: EmbeddingClient>(
    State(service): State<Arc<TaskService<R, E>>>,
    ValidatedJson(input): ValidatedJson<CreateTask>,
) -> TaskResult<impl IntoResponse> {
    let task = service.create_task(input).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// Get a task by ID
#[utoipa::path(
    get,
    path = "/{id}",
    tag = TAG,
    params(
        ("id" = Uuid, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task found", body = Task),
        (status = 400, response = BadRequestUuidResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_task<R: TaskRepository, E: EmbeddingClient>(
    State(service): State<Arc<TaskService<R, E>>>,
    UuidPath(id): UuidPath,
) -> TaskResult<Json<Task>> {
    let task = service.get_task(id).await?;
    Ok(Json(task))
}

/// Update a task
///
/// Text changes are always persisted. If the description changed but the
/// embedding provider is down, the response still succeeds with
/// `embedding_refreshed: false` and the old vector stays in place.
#[utoipa::path(
    put,
    path = "/{id}",
    tag = TAG,
    params(
        ("id" = Uuid, Path, description = "Task ID")
    ),
    request_body = UpdateTask,
    responses(
        (status = 200, description = "Task updated successfully", body = TaskUpdate),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn update_task<R: TaskRepository, E: EmbeddingClient>(
    State(service): State<Arc<TaskService<R, E>>>,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<UpdateTask>,
) -> TaskResult<Json<TaskUpdate>> {
    let update = service.update_task(id, input).await?;
    Ok(Json(update))
}

/// Delete a task
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = TAG,
    params(
        ("id" = Uuid, Path, description = "Task ID")
    ),
    responses(
        (status = 204, description = "Task deleted successfully"),
        (status = 400, response = BadRequestUuidResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn delete_task<R: TaskRepository, E: EmbeddingClient>(
    State(service): State<Arc<TaskService<R, E>>>,
    UuidPath(id): UuidPath,
) -> TaskResult<impl IntoResponse> {
    service.delete_task(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Semantic search over task descriptions
#[utoipa::path(
    get,
    path = "/search",
    tag = TAG,
    params(SearchQuery),
    responses(
        (status = 200, description = "Nearest tasks, closest first", body = Vec<SearchHit>),
        (status = 400, response = BadRequestValidationResponse),
        (status = 503, response = ServiceUnavailableResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn search_tasks<R: TaskRepository, E: EmbeddingClient>(
    State(service): State<Arc<TaskService<R, E>>>,
    Query(query): Query<SearchQuery>,
) -> TaskResult<Json<Vec<SearchHit>>> {
    let hits = service.search_tasks(&query.q, query.k).await?;
    let hits = hits
        .into_iter()
        .map(|(task, distance)| SearchHit { task, distance })
        .collect();
    Ok(Json(hits))
}
