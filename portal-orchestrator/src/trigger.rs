//! Usage status trigger.
//!
//! After a hard-limit crossing fires, the record's status is re-derived
//! from the stored totals: strictly above the hard limit means
//! `above-limit`, otherwise the workspace drops back to `active`. This runs
//! on the usage-update path only and is orthogonal to the provisioning
//! lifecycle.

use crate::error::Result;
use crate::workspace::{RequestStatus, WorkspaceRecord, WorkspaceStore};
use tracing::info;

pub async fn apply_usage_status(
    store: &WorkspaceStore,
    record: &WorkspaceRecord,
) -> Result<WorkspaceRecord> {
    let status = if record.total_usage > record.hard_limit {
        RequestStatus::AboveLimit
    } else {
        RequestStatus::Active
    };

    info!(
        workspace_id = %record.workspace_id,
        ?status,
        "Re-deriving request status from usage total"
    );

    store
        .set_status(&record.owner_id, &record.workspace_id, status)
        .await?;

    store.get(&record.owner_id, &record.workspace_id).await
}
