//! Tasks API - task repository with semantic search

use axum_helpers::server::{close_postgres, create_production_app, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use database::postgres::{connect_from_config_with_retry, run_migrations};
use std::time::Duration;
use tracing::info;

mod api;
mod config;
mod openapi;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    info!("Connecting to PostgreSQL");
    let db = connect_from_config_with_retry(config.database.clone(), None).await?;

    run_migrations::<migration::Migrator>(&db, config.app.name).await?;

    let state = AppState {
        config: config.clone(),
        db: db.clone(),
    };

    // Build REST router
    let api_routes = api::routes(&state);
    let router = axum_helpers::create_router::<openapi::ApiDoc>(api_routes).await?;
    let app = router.merge(health_router(state.config.app.clone()));

    info!(
        "Starting Tasks API on port {} (embedding provider: {})",
        state.config.server.port, state.config.embedding.base_url
    );

    create_production_app(app, &state.config.server, Duration::from_secs(30), {
        let db = db.clone();
        async move {
            close_postgres(db, "tasks-api").await;
        }
    })
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Tasks API shutdown complete");
    Ok(())
}
