pub mod health;
pub mod workspaces;

use crate::{
    api_docs::ApiDoc, auth::auth_middleware, config::Config, provision::ProvisionLauncher,
    state::AppState,
};
use axum::{middleware, routing::get, Json, Router};
use portal_orchestrator::Notifier;
use portal_provisioner::ProvisionRunner;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;

pub async fn create_app(
    pool: SqlitePool,
    notifier: Arc<dyn Notifier>,
    runner: Arc<ProvisionRunner>,
    config: &Config,
) -> anyhow::Result<Router> {
    let launcher = ProvisionLauncher::new(runner, config);
    let state = AppState::new(pool, notifier, launcher);

    // Allow CORS for local development (frontend on different port)
    let cors = CorsLayer::permissive();

    let app = Router::new()
        .merge(health::routes()) // Health routes don't need auth
        .route("/api-docs/openapi.json", get(openapi_spec))
        .merge(workspaces::usage_routes()) // Authenticated by workspace api key
        .merge(
            workspaces::routes().layer(middleware::from_fn(auth_middleware)), // User auth for the rest
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

async fn openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
