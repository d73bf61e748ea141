//! Admin notifier used when no bot host is present.

use async_trait::async_trait;
use oaibridge_core::{AdminNotifier, NotifyError};
use tracing::info;

/// Writes each admin notification to the log instead of a chat channel.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl AdminNotifier for LogNotifier {
    async fn send_text(&self, admin: &str, text: &str) -> Result<(), NotifyError> {
        info!(admin = %admin, "Admin notification: {text}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_notifier_always_succeeds() {
        assert!(LogNotifier.send_text("admin-1", "ready").await.is_ok());
    }
}
