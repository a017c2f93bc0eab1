use crate::notify::{Notification, Notifier, PublishError};
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::sync::Mutex;

/// Helper to create an in-memory test database with migrations applied
pub async fn create_test_db() -> SqlitePool {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

/// Notifier that records published notifications for assertions
#[derive(Default)]
pub struct MemoryNotifier {
    published: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<Notification> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn publish(&self, notification: Notification) -> Result<(), PublishError> {
        self.published.lock().unwrap().push(notification);
        Ok(())
    }
}

/// Notifier whose publishes always fail, for exercising best-effort paths
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn publish(&self, _notification: Notification) -> Result<(), PublishError> {
        Err(PublishError("channel unavailable".to_string()))
    }
}
