//! Provisioning execution engine
//!
//! This crate drives the asynchronous provisioning of a workspace: an
//! explicit task-chain state machine (create account, deploy
//! infrastructure, run remote commands), a bounded polling loop for the
//! long-running remote command, and the terminal success/failure handlers
//! that settle the workspace record and notify its channel.

pub mod chain;
pub mod clients;
pub mod context;
pub mod error;
pub mod handlers;
pub mod poller;
pub mod runner;
pub mod simulated;

pub use chain::{ChainEvent, ChainPolicy, ChainState, Effect, Step};
pub use clients::{
    AccountClient, CommandClient, CommandTarget, StackClient, StackLaunch, StackSpec, StackStatus,
};
pub use context::{
    AccountOutput, AccountRequest, CommandSubmission, DeployOutcome, ExecutionContext,
    WorkspaceHandle,
};
pub use error::ProvisionError;
pub use handlers::{FailureHandler, SuccessHandler};
pub use poller::{classify_command_status, CommandStatus, PollState};
pub use runner::{ProvisionRunner, ProvisionerConfig};
pub use simulated::SimulatedCloud;
