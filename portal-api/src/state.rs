use crate::provision::ProvisionLauncher;
use portal_orchestrator::{Notifier, WorkspaceStore};
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: WorkspaceStore,
    pub notifier: Arc<dyn Notifier>,
    pub launcher: ProvisionLauncher,
}

impl AppState {
    pub fn new(pool: SqlitePool, notifier: Arc<dyn Notifier>, launcher: ProvisionLauncher) -> Self {
        Self {
            store: WorkspaceStore::new(pool),
            notifier,
            launcher,
        }
    }
}
