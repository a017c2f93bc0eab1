//! Common test utilities and helpers for portal-api tests

#![allow(dead_code)]

use axum::Router;
use portal_api::Config;
use portal_orchestrator::test_utils::MemoryNotifier;
use portal_orchestrator::{
    CreateWorkspaceRequest, ProvisioningGrant, RequestStatus, WorkspaceRecord, WorkspaceStore,
    WorkspaceType,
};
use portal_provisioner::{ProvisionRunner, ProvisionerConfig, SimulatedCloud};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

pub const TEST_API_KEY: &str = "wk-test-key";

/// Helper to create an in-memory test database with migrations
pub async fn create_test_db() -> SqlitePool {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    // Run migrations from portal-orchestrator
    sqlx::migrate!("../portal-orchestrator/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

/// Provisioner bounds tight enough for tests
pub fn fast_provisioner_config() -> ProvisionerConfig {
    ProvisionerConfig {
        command_wait: Duration::from_millis(1),
        poll_max_attempts: 10,
        deploy_poll_interval: Duration::from_millis(1),
        deploy_budget: Duration::from_millis(20),
        ..ProvisionerConfig::default()
    }
}

pub struct TestApp {
    pub app: Router,
    pub pool: SqlitePool,
    pub store: WorkspaceStore,
    pub notifier: Arc<MemoryNotifier>,
}

/// Build a test app against the simulated cloud backend
pub async fn spawn_test_app() -> TestApp {
    let pool = create_test_db().await;
    let notifier = Arc::new(MemoryNotifier::new());

    let cloud = Arc::new(SimulatedCloud);
    let runner = Arc::new(ProvisionRunner::new(
        WorkspaceStore::new(pool.clone()),
        notifier.clone(),
        cloud.clone(),
        cloud.clone(),
        cloud,
        fast_provisioner_config(),
    ));

    spawn_test_app_with_runner(pool, notifier, runner).await
}

/// Build a test app around a caller-supplied runner (e.g. failing backends)
pub async fn spawn_test_app_with_runner(
    pool: SqlitePool,
    notifier: Arc<MemoryNotifier>,
    runner: Arc<ProvisionRunner>,
) -> TestApp {
    let config = Config::default();

    let app = portal_api::create_app(pool.clone(), notifier.clone(), runner, &config)
        .await
        .expect("Failed to create test app");

    TestApp {
        app,
        store: WorkspaceStore::new(pool.clone()),
        pool,
        notifier,
    }
}

/// Fixture: a pending workspace record
pub async fn fixture_workspace(
    store: &WorkspaceStore,
    owner: &str,
    workspace_type: WorkspaceType,
) -> WorkspaceRecord {
    store
        .create(CreateWorkspaceRequest {
            owner_id: owner.to_string(),
            workspace_type,
        })
        .await
        .expect("Failed to create fixture workspace")
}

/// Fixture: a workspace that finished the provisioning handshake, with an
/// api key and notification channel attached
pub async fn fixture_provisioned_workspace(
    store: &WorkspaceStore,
    owner: &str,
    workspace_type: WorkspaceType,
) -> WorkspaceRecord {
    let record = fixture_workspace(store, owner, workspace_type).await;

    store
        .begin_provisioning(
            &record.owner_id,
            &record.workspace_id,
            ProvisioningGrant {
                api_key: TEST_API_KEY.to_string(),
                notification_channel: format!("workspace-topic-{}", record.workspace_id),
                account_id: "123456789012".to_string(),
                credits_amount: None,
            },
        )
        .await
        .expect("Failed to begin provisioning for fixture")
}

/// Poll the record status until it matches or the deadline passes
pub async fn wait_for_status(
    store: &WorkspaceStore,
    workspace_id: &str,
    status: RequestStatus,
) -> WorkspaceRecord {
    for _ in 0..200 {
        let record = store
            .get_by_workspace_id(workspace_id)
            .await
            .expect("Failed to get workspace");

        if record.request_status == status {
            return record;
        }

        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    panic!("Workspace {workspace_id} never reached {status:?}");
}

/// Helper to extract JSON body from axum response
pub async fn extract_json_body<T>(response: axum::response::Response) -> T
where
    T: serde::de::DeserializeOwned,
{
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");

    serde_json::from_slice(&body).expect("Failed to deserialize JSON")
}
