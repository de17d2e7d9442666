//! OpenAPI documentation configuration

use utoipa::OpenApi;

/// Combined OpenAPI documentation for the Tasks API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tasks API",
        version = "0.1.0",
        description = "Task management with semantic search over descriptions"
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    nest(
        (path = "/api/tasks", api = domain_tasks::ApiDoc)
    ),
    tags(
        (name = "tasks", description = "Task management and semantic search endpoints")
    )
)]
pub struct ApiDoc;
