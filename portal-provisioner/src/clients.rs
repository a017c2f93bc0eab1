//! Client traits for the external collaborators the chain drives.
//!
//! Account creation, infrastructure stacks, and remote command execution
//! are remote vendor APIs; the runner only sees these seams.

use crate::context::{AccountOutput, AccountRequest, CommandSubmission};
use async_trait::async_trait;

/// Parameters for one infrastructure stack deployment.
#[derive(Debug, Clone)]
pub struct StackSpec {
    pub stack_name: String,
    pub parameters: Vec<(String, String)>,
}

/// Result of asking the backend to launch a stack. An already-existing
/// stack is not an error; re-provisioning must be able to pass through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackLaunch {
    Started,
    AlreadyExists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackStatus {
    InProgress,
    Complete,
    Failed,
}

/// A shell command batch addressed to a managed instance.
#[derive(Debug, Clone)]
pub struct CommandTarget {
    pub instance_id: String,
    pub working_directory: String,
    pub commands: Vec<String>,
}

#[async_trait]
pub trait AccountClient: Send + Sync {
    async fn create_account(&self, request: &AccountRequest) -> anyhow::Result<AccountOutput>;
}

#[async_trait]
pub trait StackClient: Send + Sync {
    async fn create_stack(&self, spec: &StackSpec) -> anyhow::Result<StackLaunch>;

    async fn stack_status(&self, stack_name: &str) -> anyhow::Result<StackStatus>;
}

#[async_trait]
pub trait CommandClient: Send + Sync {
    async fn send_command(&self, target: &CommandTarget) -> anyhow::Result<CommandSubmission>;

    /// Raw backend status string for a submitted command; the poller
    /// classifies it.
    async fn command_status(&self, command_id: &str, instance_id: &str) -> anyhow::Result<String>;
}
