use anyhow::Result;
use portal_api::{create_app, Config};
use portal_orchestrator::db::{create_pool, run_migrations};
use portal_orchestrator::{LogNotifier, Notifier, WorkspaceStore};
use portal_provisioner::{ProvisionRunner, SimulatedCloud};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter("portal_api=debug,portal_orchestrator=debug,portal_provisioner=debug,tower_http=debug")
        .init();

    info!("Starting portal-api service...");

    // Load configuration
    let config = Config::from_env();
    info!(
        "Configuration loaded: bind_addr={}, db_path={}",
        config.bind_addr,
        config.db_path.display()
    );

    // Create pool and run migrations
    let pool = create_pool(&config.db_path).await?;
    info!("Running database migrations...");
    run_migrations(&pool).await?;
    info!("Migrations complete");

    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);

    // The vendor backends are deployment-specific; the simulated cloud
    // stands in until one is wired up, so executions complete locally.
    let cloud = Arc::new(SimulatedCloud);
    let runner = Arc::new(ProvisionRunner::new(
        WorkspaceStore::new(pool.clone()),
        notifier.clone(),
        cloud.clone(),
        cloud.clone(),
        cloud,
        config.provisioner_config(),
    ));

    // Create app
    let app = create_app(pool, notifier, runner, &config).await?;

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Listening on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
