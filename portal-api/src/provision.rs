//! Provision request orchestration.
//!
//! Accepting a provision request happens synchronously: issue an api key
//! and a notification channel, flip the record into provisioning, then hand
//! an execution context to the runner on a spawned task. The caller only
//! ever sees the synchronous acceptance; later failures surface through the
//! record status.

use crate::config::Config;
use portal_orchestrator::{WorkspaceRecord, WorkspaceType};
use portal_provisioner::{AccountRequest, ExecutionContext, ProvisionRunner};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub fn generate_api_key() -> String {
    format!("wk-{}", Uuid::new_v4().simple())
}

pub fn notification_channel_name(workspace_id: &str) -> String {
    format!("workspace-topic-{}", workspace_id)
}

#[derive(Clone)]
pub struct ProvisionLauncher {
    runner: Arc<ProvisionRunner>,
    region: String,
    email_domain: String,
    direct_pay_email_domain: String,
}

impl ProvisionLauncher {
    pub fn new(runner: Arc<ProvisionRunner>, config: &Config) -> Self {
        Self {
            runner,
            region: config.region.clone(),
            email_domain: config.email_domain.clone(),
            direct_pay_email_domain: config.direct_pay_email_domain.clone(),
        }
    }

    /// Spawn the provisioning chain for a record that was just moved into
    /// provisioning status.
    pub fn start(&self, record: &WorkspaceRecord) {
        let api_key = record.api_key.clone().unwrap_or_default();
        let ctx = ExecutionContext::new(
            &record.workspace_id,
            &api_key,
            self.account_request(record),
        );

        info!(
            workspace_id = %record.workspace_id,
            execution = %ctx.execution_name,
            "Starting provisioning execution"
        );

        let runner = self.runner.clone();
        tokio::spawn(async move {
            runner.run(ctx).await;
        });
    }

    fn account_request(&self, record: &WorkspaceRecord) -> AccountRequest {
        let domain = match record.workspace_type {
            WorkspaceType::DirectPay => &self.direct_pay_email_domain,
            _ => &self.email_domain,
        };

        AccountRequest {
            account_name: format!("Workspace {}", record.workspace_id),
            account_email: format!("root_{}@{}", record.workspace_id, domain),
            region: self.region.clone(),
            account_id: record.account_id.clone(),
        }
    }
}
