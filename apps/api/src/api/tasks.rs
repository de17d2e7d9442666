//! Tasks API routes

use axum::Router;
use domain_tasks::{HttpEmbeddingClient, PgTaskRepository, TaskService, handlers};

use crate::state::AppState;

/// Create the tasks router
pub fn router(state: &AppState) -> Router {
    let repository = PgTaskRepository::new(state.db.clone());
    let embedder = HttpEmbeddingClient::new(state.config.embedding.clone());
    let service = TaskService::new(repository, embedder);
    handlers::router(service)
}
