//! Admin notification port.
//!
//! The host bot owns the messaging channel; the gateway only needs to send a
//! plain-text tip to each configured admin once it has been enabled.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from delivering a message to a single admin.
#[derive(Debug, Clone, Error)]
pub enum NotifyError {
    /// The recipient is unknown to the host or cannot be messaged.
    #[error("Recipient {0} is not reachable")]
    Unreachable(String),

    /// The host failed to deliver the message.
    #[error("Failed to send message: {0}")]
    SendFailed(String),
}

/// Message-sending capability provided by the host, keyed by admin id.
#[async_trait]
pub trait AdminNotifier: Send + Sync {
    /// Send `text` to the admin identified by `admin`.
    async fn send_text(&self, admin: &str, text: &str) -> Result<(), NotifyError>;
}
