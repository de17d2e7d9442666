//! Readiness endpoint
//!
//! Liveness (`/health`) is served at the root by `health_router`; this
//! module adds `/ready`, which actually pings the database.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use axum_helpers::server::run_health_checks;
use serde_json::Value;

use crate::state::AppState;

async fn ready(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    run_health_checks(vec![(
        "postgres",
        Box::pin(async {
            database::postgres::check_health(&state.db)
                .await
                .map_err(|e| e.to_string())
        }),
    )])
    .await
}

pub fn router(state: AppState) -> Router {
    Router::new().route("/ready", get(ready)).with_state(state)
}
