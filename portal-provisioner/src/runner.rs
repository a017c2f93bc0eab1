//! Execution driver for the provisioning chain.
//!
//! One runner is shared by every execution; each `run` call owns its
//! context and walks the chain until a terminal state, performing the side
//! effect each step names and feeding the resulting event back into the
//! transition function. Task ordering is strict: a step's remote side
//! effect has durably completed (or failed) before the next step starts.

use crate::chain::{
    self, ChainEvent, ChainPolicy, ChainState, Effect, COMMAND_POLL_TIMED_OUT,
    REMOTE_COMMAND_FAILED,
};
use crate::clients::{
    AccountClient, CommandClient, CommandTarget, StackClient, StackLaunch, StackSpec, StackStatus,
};
use crate::context::{DeployOutcome, ExecutionContext};
use crate::error::ProvisionError;
use crate::handlers::{FailureHandler, SuccessHandler};
use crate::poller::{classify_command_status, CommandStatus};
use anyhow::anyhow;
use portal_orchestrator::{Notifier, WorkspaceStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Stack deployed into every member account.
pub const INFRA_STACK_NAME: &str = "workspace-infrastructure";

#[derive(Debug, Clone)]
pub struct ProvisionerConfig {
    /// Delay between remote command status polls.
    pub command_wait: Duration,
    /// Status polls allowed before the execution fails.
    pub poll_max_attempts: u32,
    /// Delay between stack status polls during deployment.
    pub deploy_poll_interval: Duration,
    /// Total wait budget for the stack to reach a terminal state.
    pub deploy_budget: Duration,
    /// Managed instance the post-deploy command batch runs on.
    pub admin_instance_id: String,
    pub working_directory: String,
    pub bootstrap_commands: Vec<String>,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            command_wait: Duration::from_secs(15),
            poll_max_attempts: 80,
            deploy_poll_interval: Duration::from_secs(10),
            deploy_budget: Duration::from_secs(300),
            admin_instance_id: "i-admin-vm".to_string(),
            working_directory: String::new(),
            bootstrap_commands: vec![
                "./setup-workspace.sh".to_string(),
                "./verify-workspace.sh".to_string(),
            ],
        }
    }
}

impl ProvisionerConfig {
    fn chain_policy(&self) -> ChainPolicy {
        ChainPolicy {
            command_wait: self.command_wait,
            poll_max_attempts: self.poll_max_attempts,
        }
    }
}

pub struct ProvisionRunner {
    store: WorkspaceStore,
    notifier: Arc<dyn Notifier>,
    accounts: Arc<dyn AccountClient>,
    stacks: Arc<dyn StackClient>,
    commands: Arc<dyn CommandClient>,
    config: ProvisionerConfig,
}

impl ProvisionRunner {
    pub fn new(
        store: WorkspaceStore,
        notifier: Arc<dyn Notifier>,
        accounts: Arc<dyn AccountClient>,
        stacks: Arc<dyn StackClient>,
        commands: Arc<dyn CommandClient>,
        config: ProvisionerConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            accounts,
            stacks,
            commands,
            config,
        }
    }

    /// Drive one execution to a terminal state and run its outcome handler.
    pub async fn run(&self, mut ctx: ExecutionContext) -> ChainState {
        info!(execution = %ctx.execution_name, "Starting provisioning execution");

        let policy = self.config.chain_policy();
        let mut step = chain::initial();

        while let Some(effect) = step.effect.clone() {
            let event = self.perform(&effect, &mut ctx).await;
            step = chain::transition(&policy, &step.next, &event);

            if step.next == ChainState::Failed && ctx.error.is_none() {
                ctx.error = Some(describe_failure(&event));
            }
        }

        match step.next {
            ChainState::Succeeded => {
                SuccessHandler::new(self.store.clone(), self.notifier.clone())
                    .handle(&ctx)
                    .await;
            }
            ChainState::Failed => {
                FailureHandler::new(self.store.clone(), self.notifier.clone())
                    .handle(&ctx)
                    .await;
            }
            // The loop only stops on a missing effect, which transition()
            // produces for terminal states alone.
            _ => {}
        }

        step.next
    }

    async fn perform(&self, effect: &Effect, ctx: &mut ExecutionContext) -> ChainEvent {
        match effect {
            Effect::CreateAccount => {
                match self.accounts.create_account(&ctx.account_request).await {
                    Ok(output) => {
                        info!(account_id = %output.account_id, "Member account ready");
                        ctx.account_output = Some(output.clone());
                        ChainEvent::AccountCreated(output)
                    }
                    Err(e) => ChainEvent::TaskFailed(format!("create account failed: {e}")),
                }
            }

            Effect::DeployInfra => match self.deploy(ctx).await {
                Ok(outcome) => {
                    ctx.deploy_result = Some(outcome.clone());
                    ChainEvent::InfraDeployed(outcome)
                }
                Err(e) => ChainEvent::TaskFailed(e.to_string()),
            },

            Effect::SubmitCommand => {
                let target = CommandTarget {
                    instance_id: self.config.admin_instance_id.clone(),
                    working_directory: self.config.working_directory.clone(),
                    commands: self.config.bootstrap_commands.clone(),
                };

                match self.commands.send_command(&target).await {
                    Ok(submission) => {
                        info!(command_id = %submission.command_id, "Submitted remote command");
                        ctx.command_polling = Some(submission.clone());
                        ChainEvent::CommandSubmitted(submission)
                    }
                    Err(e) => ChainEvent::TaskFailed(format!("submit command failed: {e}")),
                }
            }

            Effect::Wait(duration) => {
                sleep(*duration).await;
                ChainEvent::WaitElapsed
            }

            Effect::CheckCommand => {
                let Some(submission) = ctx.command_polling.clone() else {
                    return ChainEvent::TaskFailed("no submitted command to poll".to_string());
                };

                match self
                    .commands
                    .command_status(&submission.command_id, &submission.instance_id)
                    .await
                {
                    Ok(raw) => ChainEvent::StatusChecked(classify_command_status(&raw)),
                    Err(e) => ChainEvent::TaskFailed(format!("command status check failed: {e}")),
                }
            }
        }
    }

    /// Deploy the member-account infrastructure stack and wait for it to
    /// reach a terminal state within the configured budget. A stack that
    /// already exists counts as success so re-provisioning stays idempotent.
    async fn deploy(&self, ctx: &mut ExecutionContext) -> Result<DeployOutcome, ProvisionError> {
        const TASK: &str = "deploy infrastructure";

        let workspace = ctx.workspace.clone().ok_or_else(|| ProvisionError::Task {
            task: TASK,
            source: anyhow!("missing workspace handle in execution context"),
        })?;

        // Record the member account on the workspace before touching it.
        if let Some(output) = &ctx.account_output {
            self.store
                .set_account_id(&workspace.workspace_id, &output.account_id)
                .await
                .map_err(|e| ProvisionError::Task {
                    task: TASK,
                    source: e.into(),
                })?;
        }

        let mut parameters = vec![
            ("WorkspaceId".to_string(), workspace.workspace_id.clone()),
            ("ApiKey".to_string(), workspace.api_key.clone()),
        ];
        if let Some(output) = &ctx.account_output {
            parameters.push(("AccountId".to_string(), output.account_id.clone()));
        }

        let spec = StackSpec {
            stack_name: INFRA_STACK_NAME.to_string(),
            parameters,
        };

        let launch = self
            .stacks
            .create_stack(&spec)
            .await
            .map_err(|e| ProvisionError::Task {
                task: TASK,
                source: e,
            })?;

        if launch == StackLaunch::AlreadyExists {
            warn!(
                workspace_id = %workspace.workspace_id,
                "Infrastructure stack already exists, treating as deployed"
            );
            return Ok(DeployOutcome {
                already_existed: true,
            });
        }

        let interval = self.config.deploy_poll_interval;
        let max_attempts = (self.config.deploy_budget.as_millis()
            / interval.as_millis().max(1))
        .max(1);

        for _ in 0..max_attempts {
            sleep(interval).await;

            let status = self
                .stacks
                .stack_status(INFRA_STACK_NAME)
                .await
                .map_err(|e| ProvisionError::Task {
                    task: TASK,
                    source: e,
                })?;

            match status {
                StackStatus::Complete => {
                    return Ok(DeployOutcome {
                        already_existed: false,
                    })
                }
                StackStatus::Failed => {
                    return Err(ProvisionError::Task {
                        task: TASK,
                        source: anyhow!("infrastructure stack creation failed"),
                    })
                }
                StackStatus::InProgress => {}
            }
        }

        Err(ProvisionError::Timeout("infrastructure stack creation"))
    }
}

fn describe_failure(event: &ChainEvent) -> String {
    match event {
        ChainEvent::TaskFailed(message) => message.clone(),
        ChainEvent::StatusChecked(CommandStatus::Failed) => REMOTE_COMMAND_FAILED.to_string(),
        ChainEvent::StatusChecked(CommandStatus::Pending) => COMMAND_POLL_TIMED_OUT.to_string(),
        _ => "provisioning failed".to_string(),
    }
}
