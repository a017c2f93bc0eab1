//! Local development backend.
//!
//! Stands in for the vendor account/stack/command APIs when the service
//! runs without cloud credentials: every call succeeds immediately with
//! deterministic output, so the full chain can be exercised end to end on a
//! laptop.

use crate::clients::{
    AccountClient, CommandClient, CommandTarget, StackClient, StackLaunch, StackSpec, StackStatus,
};
use crate::context::{AccountOutput, AccountRequest, CommandSubmission};
use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

pub struct SimulatedCloud;

#[async_trait]
impl AccountClient for SimulatedCloud {
    async fn create_account(&self, request: &AccountRequest) -> anyhow::Result<AccountOutput> {
        let account_id = request
            .account_id
            .clone()
            .unwrap_or_else(|| format!("{:012}", Uuid::new_v4().as_u128() % 1_000_000_000_000));

        info!(account_name = %request.account_name, %account_id, "Simulated account creation");

        Ok(AccountOutput { account_id })
    }
}

#[async_trait]
impl StackClient for SimulatedCloud {
    async fn create_stack(&self, spec: &StackSpec) -> anyhow::Result<StackLaunch> {
        info!(stack_name = %spec.stack_name, "Simulated stack launch");

        Ok(StackLaunch::Started)
    }

    async fn stack_status(&self, _stack_name: &str) -> anyhow::Result<StackStatus> {
        Ok(StackStatus::Complete)
    }
}

#[async_trait]
impl CommandClient for SimulatedCloud {
    async fn send_command(&self, target: &CommandTarget) -> anyhow::Result<CommandSubmission> {
        info!(
            instance_id = %target.instance_id,
            commands = target.commands.len(),
            "Simulated command submission"
        );

        Ok(CommandSubmission {
            command_id: Uuid::new_v4().to_string(),
            instance_id: target.instance_id.clone(),
        })
    }

    async fn command_status(&self, _command_id: &str, _instance_id: &str) -> anyhow::Result<String> {
        Ok("Success".to_string())
    }
}
