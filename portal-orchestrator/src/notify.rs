//! Notification channel seam.
//!
//! Delivery transport (email fan-out, topic subscriptions) lives outside
//! this service; components only hand a [`Notification`] to a [`Notifier`].
//! Publishing is best-effort everywhere: callers log failures and move on,
//! the underlying record write is already committed.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
#[error("notification publish failed: {0}")]
pub struct PublishError(pub String);

/// A structured notification addressed to a workspace's channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub channel: String,
    pub subject: String,
    pub message: String,
    pub attributes: Vec<(String, String)>,
}

impl Notification {
    pub fn new(channel: impl Into<String>, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            subject: subject.into(),
            message: message.into(),
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Attribute value by key, if present
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, notification: Notification) -> Result<(), PublishError>;
}

/// Default notifier: writes the notification to the service log. Used when
/// no delivery backend is wired up.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn publish(&self, notification: Notification) -> Result<(), PublishError> {
        info!(
            channel = %notification.channel,
            subject = %notification.subject,
            "Publishing notification"
        );
        info!("{}", notification.message);

        Ok(())
    }
}
