//! Workspace record orchestration business logic
//!
//! This crate contains the record store, the usage-limit evaluation logic,
//! and the notification seam for the workspace portal. It is consumed by the
//! portal-api HTTP service and by the portal-provisioner execution driver.

pub mod db;
pub mod error;
pub mod limits;
pub mod notify;
pub mod test_utils;
pub mod trigger;
pub mod workspace;

pub use error::{OrchestratorError, Result};
pub use limits::{evaluate_crossing, Crossing};
pub use notify::{LogNotifier, Notification, Notifier, PublishError};
pub use workspace::{
    CreateWorkspaceRequest, ProvisioningGrant, RequestStatus, UsageWrite, WorkspaceRecord,
    WorkspaceStore, WorkspaceSummary, WorkspaceType,
};
