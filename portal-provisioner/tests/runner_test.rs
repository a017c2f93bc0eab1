//! Integration tests for the provisioning execution driver
//!
//! Exercises the full chain against scripted in-memory clients: success,
//! per-task failures, deploy idempotence, and the bounded polling loop.

use async_trait::async_trait;
use portal_orchestrator::test_utils::{create_test_db, FailingNotifier, MemoryNotifier};
use portal_orchestrator::{
    CreateWorkspaceRequest, ProvisioningGrant, RequestStatus, WorkspaceStore, WorkspaceType,
};
use portal_provisioner::{
    AccountClient, AccountOutput, AccountRequest, ChainState, CommandClient, CommandSubmission,
    CommandTarget, ExecutionContext, FailureHandler, ProvisionRunner, ProvisionerConfig,
    StackClient, StackLaunch, StackSpec, StackStatus, SuccessHandler,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct StaticAccounts;

#[async_trait]
impl AccountClient for StaticAccounts {
    async fn create_account(&self, request: &AccountRequest) -> anyhow::Result<AccountOutput> {
        Ok(AccountOutput {
            account_id: request
                .account_id
                .clone()
                .unwrap_or_else(|| "210987654321".to_string()),
        })
    }
}

struct FailingAccounts;

#[async_trait]
impl AccountClient for FailingAccounts {
    async fn create_account(&self, _request: &AccountRequest) -> anyhow::Result<AccountOutput> {
        Err(anyhow::anyhow!("account vendor rejected the request"))
    }
}

/// Stack backend scripted with a launch result and a status sequence; once
/// the sequence is drained every further poll reports Complete.
struct ScriptedStacks {
    launch: StackLaunch,
    statuses: Mutex<VecDeque<StackStatus>>,
}

impl ScriptedStacks {
    fn new(launch: StackLaunch, statuses: Vec<StackStatus>) -> Self {
        Self {
            launch,
            statuses: Mutex::new(statuses.into()),
        }
    }
}

#[async_trait]
impl StackClient for ScriptedStacks {
    async fn create_stack(&self, _spec: &StackSpec) -> anyhow::Result<StackLaunch> {
        Ok(self.launch)
    }

    async fn stack_status(&self, _stack_name: &str) -> anyhow::Result<StackStatus> {
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(StackStatus::Complete))
    }
}

struct FailingStacks;

#[async_trait]
impl StackClient for FailingStacks {
    async fn create_stack(&self, _spec: &StackSpec) -> anyhow::Result<StackLaunch> {
        Err(anyhow::anyhow!("stack template rejected"))
    }

    async fn stack_status(&self, _stack_name: &str) -> anyhow::Result<StackStatus> {
        Ok(StackStatus::Failed)
    }
}

/// Command backend scripted with raw status strings; drained polls report
/// Success.
struct ScriptedCommands {
    statuses: Mutex<VecDeque<&'static str>>,
}

impl ScriptedCommands {
    fn new(statuses: Vec<&'static str>) -> Self {
        Self {
            statuses: Mutex::new(statuses.into()),
        }
    }
}

#[async_trait]
impl CommandClient for ScriptedCommands {
    async fn send_command(&self, target: &CommandTarget) -> anyhow::Result<CommandSubmission> {
        Ok(CommandSubmission {
            command_id: "cmd-test".to_string(),
            instance_id: target.instance_id.clone(),
        })
    }

    async fn command_status(&self, _command_id: &str, _instance_id: &str) -> anyhow::Result<String> {
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or("Success")
            .to_string())
    }
}

fn fast_config() -> ProvisionerConfig {
    ProvisionerConfig {
        command_wait: Duration::from_millis(1),
        poll_max_attempts: 10,
        deploy_poll_interval: Duration::from_millis(1),
        deploy_budget: Duration::from_millis(10),
        ..ProvisionerConfig::default()
    }
}

fn account_request() -> AccountRequest {
    AccountRequest {
        account_name: "Workspace test".to_string(),
        account_email: "root_test@workspaces.example.org".to_string(),
        region: "us-east-1".to_string(),
        account_id: Some("123456789012".to_string()),
    }
}

/// Create a provisioning-status record wired with an api key and channel,
/// returning (store, workspace_id).
async fn provisioning_fixture() -> (WorkspaceStore, String) {
    let pool = create_test_db().await;
    let store = WorkspaceStore::new(pool);

    let record = store
        .create(CreateWorkspaceRequest {
            owner_id: "alice@example.org".to_string(),
            workspace_type: WorkspaceType::Credits,
        })
        .await
        .expect("Failed to create workspace");

    let record = store
        .begin_provisioning(
            &record.owner_id,
            &record.workspace_id,
            ProvisioningGrant {
                api_key: "key-test".to_string(),
                notification_channel: format!("workspace-topic-{}", record.workspace_id),
                account_id: "123456789012".to_string(),
                credits_amount: None,
            },
        )
        .await
        .expect("Failed to begin provisioning");

    let id = record.workspace_id.clone();
    (store, id)
}

fn runner(
    store: &WorkspaceStore,
    notifier: &Arc<MemoryNotifier>,
    accounts: impl AccountClient + 'static,
    stacks: impl StackClient + 'static,
    commands: impl CommandClient + 'static,
) -> ProvisionRunner {
    ProvisionRunner::new(
        store.clone(),
        notifier.clone(),
        Arc::new(accounts),
        Arc::new(stacks),
        Arc::new(commands),
        fast_config(),
    )
}

#[tokio::test]
async fn test_successful_execution_activates_workspace() {
    let (store, workspace_id) = provisioning_fixture().await;
    let notifier = Arc::new(MemoryNotifier::new());

    let runner = runner(
        &store,
        &notifier,
        StaticAccounts,
        ScriptedStacks::new(StackLaunch::Started, vec![StackStatus::InProgress]),
        ScriptedCommands::new(vec!["InProgress", "InProgress"]),
    );

    let ctx = ExecutionContext::new(&workspace_id, "key-test", account_request());
    let terminal = runner.run(ctx).await;

    assert_eq!(terminal, ChainState::Succeeded);

    let record = store
        .get_by_workspace_id(&workspace_id)
        .await
        .expect("Failed to get workspace");
    assert_eq!(record.request_status, RequestStatus::Active);
    assert_eq!(record.account_id.as_deref(), Some("123456789012"));

    let published = notifier.published();
    assert_eq!(published.len(), 1);
    assert!(published[0].subject.contains("Successfully provisioned"));
    assert_eq!(
        published[0].attribute("workspace_id"),
        Some(workspace_id.as_str())
    );
}

#[tokio::test]
async fn test_account_creation_failure_marks_workspace_failed() {
    let (store, workspace_id) = provisioning_fixture().await;
    let notifier = Arc::new(MemoryNotifier::new());

    let runner = runner(
        &store,
        &notifier,
        FailingAccounts,
        ScriptedStacks::new(StackLaunch::Started, vec![]),
        ScriptedCommands::new(vec![]),
    );

    let ctx = ExecutionContext::new(&workspace_id, "key-test", account_request());
    let terminal = runner.run(ctx).await;

    assert_eq!(terminal, ChainState::Failed);

    let record = store
        .get_by_workspace_id(&workspace_id)
        .await
        .expect("Failed to get workspace");
    assert_eq!(record.request_status, RequestStatus::Failed);

    let published = notifier.published();
    assert_eq!(published.len(), 1);
    assert!(published[0].subject.contains("Error provisioning"));
    assert!(published[0].message.contains("account vendor rejected"));
}

#[tokio::test]
async fn test_deploy_failure_marks_workspace_failed() {
    let (store, workspace_id) = provisioning_fixture().await;
    let notifier = Arc::new(MemoryNotifier::new());

    let runner = runner(
        &store,
        &notifier,
        StaticAccounts,
        FailingStacks,
        ScriptedCommands::new(vec![]),
    );

    let ctx = ExecutionContext::new(&workspace_id, "key-test", account_request());
    let terminal = runner.run(ctx).await;

    assert_eq!(terminal, ChainState::Failed);

    let record = store
        .get_by_workspace_id(&workspace_id)
        .await
        .expect("Failed to get workspace");
    assert_eq!(record.request_status, RequestStatus::Failed);
    assert!(notifier.published()[0].message.contains("stack template rejected"));
}

#[tokio::test]
async fn test_existing_stack_counts_as_deployed() {
    let (store, workspace_id) = provisioning_fixture().await;
    let notifier = Arc::new(MemoryNotifier::new());

    let runner = runner(
        &store,
        &notifier,
        StaticAccounts,
        ScriptedStacks::new(StackLaunch::AlreadyExists, vec![]),
        ScriptedCommands::new(vec![]),
    );

    let ctx = ExecutionContext::new(&workspace_id, "key-test", account_request());
    let terminal = runner.run(ctx).await;

    assert_eq!(terminal, ChainState::Succeeded);

    let record = store
        .get_by_workspace_id(&workspace_id)
        .await
        .expect("Failed to get workspace");
    assert_eq!(record.request_status, RequestStatus::Active);
}

#[tokio::test]
async fn test_stack_never_completing_times_out() {
    let (store, workspace_id) = provisioning_fixture().await;
    let notifier = Arc::new(MemoryNotifier::new());

    // Budget of 10ms at 1ms polls: the scripted backend stays InProgress
    // far past the attempt budget.
    let runner = runner(
        &store,
        &notifier,
        StaticAccounts,
        ScriptedStacks::new(StackLaunch::Started, vec![StackStatus::InProgress; 100]),
        ScriptedCommands::new(vec![]),
    );

    let ctx = ExecutionContext::new(&workspace_id, "key-test", account_request());
    let terminal = runner.run(ctx).await;

    assert_eq!(terminal, ChainState::Failed);

    let record = store
        .get_by_workspace_id(&workspace_id)
        .await
        .expect("Failed to get workspace");
    assert_eq!(record.request_status, RequestStatus::Failed);
    assert!(notifier.published()[0].message.contains("timed out"));
}

#[tokio::test]
async fn test_remote_command_failure_marks_workspace_failed() {
    let (store, workspace_id) = provisioning_fixture().await;
    let notifier = Arc::new(MemoryNotifier::new());

    let runner = runner(
        &store,
        &notifier,
        StaticAccounts,
        ScriptedStacks::new(StackLaunch::Started, vec![]),
        ScriptedCommands::new(vec!["InProgress", "Failed"]),
    );

    let ctx = ExecutionContext::new(&workspace_id, "key-test", account_request());
    let terminal = runner.run(ctx).await;

    assert_eq!(terminal, ChainState::Failed);

    let record = store
        .get_by_workspace_id(&workspace_id)
        .await
        .expect("Failed to get workspace");
    assert_eq!(record.request_status, RequestStatus::Failed);
    assert!(notifier.published()[0]
        .message
        .contains("remote command execution failed"));
}

#[tokio::test]
async fn test_command_polling_is_bounded() {
    let (store, workspace_id) = provisioning_fixture().await;
    let notifier = Arc::new(MemoryNotifier::new());

    let mut config = fast_config();
    config.poll_max_attempts = 3;

    let runner = ProvisionRunner::new(
        store.clone(),
        notifier.clone(),
        Arc::new(StaticAccounts),
        Arc::new(ScriptedStacks::new(StackLaunch::Started, vec![])),
        Arc::new(ScriptedCommands::new(vec!["InProgress"; 100])),
        config,
    );

    let ctx = ExecutionContext::new(&workspace_id, "key-test", account_request());
    let terminal = runner.run(ctx).await;

    assert_eq!(terminal, ChainState::Failed);
    assert!(notifier.published()[0]
        .message
        .contains("timed out polling remote command status"));
}

#[tokio::test]
async fn test_success_handler_is_idempotent() {
    let (store, workspace_id) = provisioning_fixture().await;
    let notifier = Arc::new(MemoryNotifier::new());

    let handler = SuccessHandler::new(store.clone(), notifier.clone());
    let ctx = ExecutionContext::new(&workspace_id, "key-test", account_request());

    handler.handle(&ctx).await;
    handler.handle(&ctx).await;

    let record = store
        .get_by_workspace_id(&workspace_id)
        .await
        .expect("Failed to get workspace");
    assert_eq!(record.request_status, RequestStatus::Active);

    // Repeat invocation may duplicate the notification but never the
    // transition.
    assert_eq!(notifier.published().len(), 2);
}

#[tokio::test]
async fn test_failure_handler_is_idempotent() {
    let (store, workspace_id) = provisioning_fixture().await;
    let notifier = Arc::new(MemoryNotifier::new());

    let handler = FailureHandler::new(store.clone(), notifier.clone());
    let mut ctx = ExecutionContext::new(&workspace_id, "key-test", account_request());
    ctx.error = Some("stack template rejected".to_string());

    handler.handle(&ctx).await;
    handler.handle(&ctx).await;

    let record = store
        .get_by_workspace_id(&workspace_id)
        .await
        .expect("Failed to get workspace");
    assert_eq!(record.request_status, RequestStatus::Failed);
}

#[tokio::test]
async fn test_publish_failures_are_swallowed() {
    let (store, workspace_id) = provisioning_fixture().await;

    let handler = SuccessHandler::new(store.clone(), Arc::new(FailingNotifier));
    let ctx = ExecutionContext::new(&workspace_id, "key-test", account_request());

    // The status write is the correctness contract; a dead channel only
    // costs the notification.
    handler.handle(&ctx).await;

    let record = store
        .get_by_workspace_id(&workspace_id)
        .await
        .expect("Failed to get workspace");
    assert_eq!(record.request_status, RequestStatus::Active);
}

#[tokio::test]
async fn test_handlers_tolerate_missing_workspace_handle() {
    let (store, workspace_id) = provisioning_fixture().await;
    let notifier = Arc::new(MemoryNotifier::new());

    let mut ctx = ExecutionContext::new(&workspace_id, "key-test", account_request());
    ctx.workspace = None;

    SuccessHandler::new(store.clone(), notifier.clone())
        .handle(&ctx)
        .await;
    FailureHandler::new(store.clone(), notifier.clone())
        .handle(&ctx)
        .await;

    // Neither handler touched the record or published anything.
    let record = store
        .get_by_workspace_id(&workspace_id)
        .await
        .expect("Failed to get workspace");
    assert_eq!(record.request_status, RequestStatus::Provisioning);
    assert!(notifier.published().is_empty());
}
