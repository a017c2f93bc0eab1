//! Per-execution data bag.
//!
//! One [`ExecutionContext`] is built when a provisioning request is
//! accepted, threaded through the task chain by the runner, and dropped when
//! the execution reaches a terminal state. Step outputs accumulate under
//! their own slots; a task only ever reads the slots its inputs declare.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of the workspace being provisioned plus the api key issued for
/// it. Carried separately so the terminal handlers can degrade gracefully
/// when an execution was started without one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceHandle {
    pub workspace_id: String,
    pub api_key: String,
}

/// Input parameters for the member-account creation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRequest {
    pub account_name: String,
    pub account_email: String,
    pub region: String,
    /// Pre-assigned member account, when the request carries one.
    pub account_id: Option<String>,
}

/// Output of the account creation task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountOutput {
    pub account_id: String,
}

/// Output of the infrastructure deployment task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployOutcome {
    pub already_existed: bool,
}

/// Handle for polling a submitted remote command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandSubmission {
    pub command_id: String,
    pub instance_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub execution_name: String,
    pub workspace: Option<WorkspaceHandle>,
    pub account_request: AccountRequest,
    pub account_output: Option<AccountOutput>,
    pub deploy_result: Option<DeployOutcome>,
    pub command_polling: Option<CommandSubmission>,
    pub error: Option<String>,
}

impl ExecutionContext {
    pub fn new(workspace_id: &str, api_key: &str, account_request: AccountRequest) -> Self {
        Self {
            execution_name: format!("create-{}_{}", workspace_id, Uuid::new_v4()),
            workspace: Some(WorkspaceHandle {
                workspace_id: workspace_id.to_string(),
                api_key: api_key.to_string(),
            }),
            account_request,
            account_output: None,
            deploy_result: None,
            command_polling: None,
            error: None,
        }
    }

    pub fn workspace_id(&self) -> Option<&str> {
        self.workspace.as_ref().map(|w| w.workspace_id.as_str())
    }
}
