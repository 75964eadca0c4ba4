//! Outbound user notifications.
//!
//! Notifications are best-effort: the request path never waits on delivery
//! and delivery failure never changes a reported outcome. The coordinator
//! spawns dispatch and logs failures at `warn`.

pub mod sms;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;
use tracing::info;

pub use sms::{SmsConfig, SmsGateway};

/// Notification delivery failures.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Transport failure reaching the gateway.
    #[error("notification transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The gateway answered with a non-success status.
    #[error("notification gateway returned {status}: {body}")]
    Gateway { status: u16, body: String },
}

/// Fire-and-forget message delivery to an invoice owner.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn notify(&self, destination: &str, message: &str) -> Result<(), NotifyError>;
}

/// Dispatcher used when no SMS gateway is configured; logs instead of
/// sending so local development works without credentials.
pub struct LogOnlyDispatcher;

#[async_trait]
impl NotificationDispatcher for LogOnlyDispatcher {
    async fn notify(&self, destination: &str, message: &str) -> Result<(), NotifyError> {
        info!(destination, message, "notification (no SMS gateway configured)");
        Ok(())
    }
}
