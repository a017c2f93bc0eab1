//! Provisioning task chain.
//!
//! The chain is an explicit state machine: a tagged state enum plus a pure
//! `transition` function from `(state, event)` to the next state and the
//! side effect the driver must perform. Every task failure, whatever the
//! cause, routes to the terminal `Failed` state; there is no per-error
//! retry policy inside an execution.

use crate::context::{AccountOutput, CommandSubmission, DeployOutcome};
use crate::poller::{CommandStatus, PollState};
use std::time::Duration;

/// Error tag recorded when the remote command reaches a terminal failure.
pub const REMOTE_COMMAND_FAILED: &str = "remote command execution failed";

/// Error tag recorded when the polling loop exhausts its attempt budget.
pub const COMMAND_POLL_TIMED_OUT: &str = "timed out polling remote command status";

/// Tunable bounds for the chain. The poll attempt cap bounds the command
/// polling loop, which the workflow this replaces left unbounded.
#[derive(Debug, Clone)]
pub struct ChainPolicy {
    pub command_wait: Duration,
    pub poll_max_attempts: u32,
}

impl Default for ChainPolicy {
    fn default() -> Self {
        Self {
            command_wait: Duration::from_secs(15),
            poll_max_attempts: 80,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainState {
    CreateAccount,
    DeployInfra,
    RunCommands(PollState),
    Succeeded,
    Failed,
}

impl ChainState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChainState::Succeeded | ChainState::Failed)
    }
}

#[derive(Debug, Clone)]
pub enum ChainEvent {
    AccountCreated(AccountOutput),
    InfraDeployed(DeployOutcome),
    CommandSubmitted(CommandSubmission),
    WaitElapsed,
    StatusChecked(CommandStatus),
    TaskFailed(String),
}

/// Side effect the driver performs to produce the next event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    CreateAccount,
    DeployInfra,
    SubmitCommand,
    Wait(Duration),
    CheckCommand,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub next: ChainState,
    pub effect: Option<Effect>,
}

/// Entry point of every execution.
pub fn initial() -> Step {
    Step {
        next: ChainState::CreateAccount,
        effect: Some(Effect::CreateAccount),
    }
}

pub fn transition(policy: &ChainPolicy, state: &ChainState, event: &ChainEvent) -> Step {
    // Terminal states absorb every event, so replaying a finished
    // execution's events cannot restart it.
    if state.is_terminal() {
        return Step {
            next: state.clone(),
            effect: None,
        };
    }

    match (state, event) {
        (_, ChainEvent::TaskFailed(_)) => fail(),

        (ChainState::CreateAccount, ChainEvent::AccountCreated(_)) => Step {
            next: ChainState::DeployInfra,
            effect: Some(Effect::DeployInfra),
        },

        (ChainState::DeployInfra, ChainEvent::InfraDeployed(_)) => Step {
            next: ChainState::RunCommands(PollState::Submit),
            effect: Some(Effect::SubmitCommand),
        },

        (ChainState::RunCommands(PollState::Submit), ChainEvent::CommandSubmitted(_)) => Step {
            next: ChainState::RunCommands(PollState::Wait { attempts: 0 }),
            effect: Some(Effect::Wait(policy.command_wait)),
        },

        (ChainState::RunCommands(PollState::Wait { attempts }), ChainEvent::WaitElapsed) => Step {
            next: ChainState::RunCommands(PollState::Check {
                attempts: *attempts,
            }),
            effect: Some(Effect::CheckCommand),
        },

        (
            ChainState::RunCommands(PollState::Check { .. }),
            ChainEvent::StatusChecked(CommandStatus::Success),
        ) => Step {
            next: ChainState::Succeeded,
            effect: None,
        },

        (
            ChainState::RunCommands(PollState::Check { .. }),
            ChainEvent::StatusChecked(CommandStatus::Failed),
        ) => fail(),

        (
            ChainState::RunCommands(PollState::Check { attempts }),
            ChainEvent::StatusChecked(CommandStatus::Pending),
        ) => {
            let attempts = attempts + 1;
            if attempts >= policy.poll_max_attempts {
                fail()
            } else {
                Step {
                    next: ChainState::RunCommands(PollState::Wait { attempts }),
                    effect: Some(Effect::Wait(policy.command_wait)),
                }
            }
        }

        // An event the current state does not expect is a driver bug; treat
        // it like any other task failure rather than wedging the execution.
        _ => fail(),
    }
}

fn fail() -> Step {
    Step {
        next: ChainState::Failed,
        effect: None,
    }
}
