//! Terminal outcome handlers.
//!
//! Both handlers are safe to invoke more than once for the same execution:
//! the status write is an absolute assignment and the notification is at
//! worst duplicated. A missing workspace handle downgrades the handler to
//! log-only; it never aborts.

use crate::context::ExecutionContext;
use portal_orchestrator::{Notification, Notifier, RequestStatus, WorkspaceStore};
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct SuccessHandler {
    store: WorkspaceStore,
    notifier: Arc<dyn Notifier>,
}

impl SuccessHandler {
    pub fn new(store: WorkspaceStore, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    pub async fn handle(&self, ctx: &ExecutionContext) {
        let Some(workspace_id) = ctx.workspace_id() else {
            warn!(
                execution = %ctx.execution_name,
                "No workspace id in execution context, skipping record update"
            );
            return;
        };

        let record = match self
            .store
            .set_status_by_workspace_id(workspace_id, RequestStatus::Active)
            .await
        {
            Ok(record) => record,
            Err(e) => {
                error!("Failed to mark workspace {} active: {}", workspace_id, e);
                return;
            }
        };

        info!("Workspace {} provisioned successfully", workspace_id);

        if let Some(channel) = &record.notification_channel {
            let notification = Notification::new(
                channel,
                format!("Successfully provisioned workspace {}", workspace_id),
                format!(
                    "Successfully provisioned workspace account for request {}",
                    workspace_id
                ),
            )
            .with_attribute("workspace_id", workspace_id)
            .with_attribute("owner_id", &record.owner_id);

            if let Err(e) = self.notifier.publish(notification).await {
                warn!("Failed to publish success notification: {}", e);
            }
        }
    }
}

pub struct FailureHandler {
    store: WorkspaceStore,
    notifier: Arc<dyn Notifier>,
}

impl FailureHandler {
    pub fn new(store: WorkspaceStore, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    pub async fn handle(&self, ctx: &ExecutionContext) {
        let Some(workspace_id) = ctx.workspace_id() else {
            warn!(
                execution = %ctx.execution_name,
                "No workspace id in execution context, skipping record update"
            );
            return;
        };

        let record = match self
            .store
            .set_status_by_workspace_id(workspace_id, RequestStatus::Failed)
            .await
        {
            Ok(record) => Some(record),
            Err(e) => {
                error!("Failed to mark workspace {} failed: {}", workspace_id, e);
                None
            }
        };

        let error = ctx.error.as_deref().unwrap_or("unknown error");
        error!("Provisioning workspace {} failed: {}", workspace_id, error);

        let channel = record.and_then(|r| r.notification_channel);
        if let Some(channel) = channel {
            let notification = Notification::new(
                &channel,
                format!("Error provisioning workspace for request {}", workspace_id),
                format!(
                    "Error provisioning workspace for request {}.\nError: {}",
                    workspace_id, error
                ),
            )
            .with_attribute("workspace_id", workspace_id);

            if let Err(e) = self.notifier.publish(notification).await {
                warn!("Failed to publish failure notification: {}", e);
            }
        }
    }
}
