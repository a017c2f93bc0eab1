//! Remote command polling sub-machine.
//!
//! Submit -> Wait -> CheckStatus -> {Wait | Succeed | Fail}. Each poll is a
//! fresh status query carrying forward the command/instance pair; nothing is
//! held open between polls. The loop is bounded by the chain policy's
//! maximum attempt count and fails the execution when exhausted.

use serde::{Deserialize, Serialize};

/// Position inside the polling loop. `attempts` counts completed status
/// checks that came back still-pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PollState {
    Submit,
    Wait { attempts: u32 },
    Check { attempts: u32 },
}

/// Poller-visible classification of a remote command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandStatus {
    Pending,
    Success,
    Failed,
}

/// Map a raw remote execution status onto the three poller states. Anything
/// not terminal (queued, in progress, delayed, unknown) keeps polling.
pub fn classify_command_status(raw: &str) -> CommandStatus {
    match raw {
        "Success" => CommandStatus::Success,
        "Cancelled" | "Cancelling" | "TimedOut" | "Failed" => CommandStatus::Failed,
        _ => CommandStatus::Pending,
    }
}
