//! Outbound notification seam. Delivery (SMTP, provider API) lives behind
//! [`NotificationSink`]; the auth flow only hands over recipient, kind and token.

use async_trait::async_trait;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    EmailVerification,
    PasswordReset,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::EmailVerification => "email_verification",
            NotificationKind::PasswordReset => "password_reset",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub recipient: String,
    pub kind: NotificationKind,
    pub token: String,
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Errors are logged by the caller and never reach the client.
    async fn send(&self, notification: &Notification) -> anyhow::Result<()>;
}

/// Development sink: logs instead of delivering.
#[derive(Debug, Clone, Default)]
pub struct LogNotificationSink;

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn send(&self, notification: &Notification) -> anyhow::Result<()> {
        info!(
            recipient = %notification.recipient,
            kind = notification.kind.as_str(),
            "notification send stub"
        );
        debug!(token = %notification.token, "notification token");
        Ok(())
    }
}
