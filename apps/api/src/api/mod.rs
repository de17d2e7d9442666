//! API routes module

pub mod health;
pub mod tasks;

use axum::Router;

use crate::state::AppState;

/// Create all API routes
pub fn routes(state: &AppState) -> Router {
    Router::new()
        .nest("/tasks", tasks::router(state))
        .merge(health::router(state.clone()))
}
