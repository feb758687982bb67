//! # Notification Transport Seam
//!
//! The engine never talks to an email provider directly; it renders content
//! and hands an [`EmailMessage`] to whatever [`Notifier`] was injected.
//! Production wires a real transport, tests wire recorders, and the
//! [`LogNotifier`] default just writes the message to the log, which is
//! enough for local development.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

// =============================================================================
// Message
// =============================================================================

/// A fully rendered notification, ready for transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Transport failure.
#[derive(Debug, Clone, Error)]
#[error("notifier error: {0}")]
pub struct NotifyError(pub String);

/// Result type for notification attempts.
pub type NotifyResult = Result<(), NotifyError>;

// =============================================================================
// Notifier Trait
// =============================================================================

/// Async email transport.
///
/// Implementations must be cheap to call concurrently; the engine holds one
/// instance behind an `Arc` for its whole lifetime.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers a discount notification to a referrer.
    async fn notify_referrer(&self, message: &EmailMessage) -> NotifyResult;

    /// Delivers a correction after a notification was reset. Defaults to
    /// the same channel as regular notifications.
    async fn notify_correction(&self, message: &EmailMessage) -> NotifyResult {
        self.notify_referrer(message).await
    }
}

// =============================================================================
// Log Notifier
// =============================================================================

/// Development notifier: logs the message instead of sending it.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_referrer(&self, message: &EmailMessage) -> NotifyResult {
        info!(
            to = %message.to,
            subject = %message.subject,
            "email notification (log transport)"
        );
        Ok(())
    }
}

// =============================================================================
// Test Doubles
// =============================================================================

#[cfg(test)]
pub(crate) mod doubles {
    use super::*;
    use std::sync::Mutex;

    /// Records every message it is asked to deliver.
    #[derive(Debug, Default)]
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<EmailMessage>>,
        pub corrections: Mutex<Vec<EmailMessage>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify_referrer(&self, message: &EmailMessage) -> NotifyResult {
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }

        async fn notify_correction(&self, message: &EmailMessage) -> NotifyResult {
            self.corrections.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    /// Fails every delivery.
    #[derive(Debug, Default)]
    pub struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn notify_referrer(&self, _message: &EmailMessage) -> NotifyResult {
            Err(NotifyError("smtp connection refused".to_string()))
        }
    }

    /// Never answers; used to exercise the timeout path.
    #[derive(Debug, Default)]
    pub struct HangingNotifier;

    #[async_trait]
    impl Notifier for HangingNotifier {
        async fn notify_referrer(&self, _message: &EmailMessage) -> NotifyResult {
            std::future::pending::<()>().await;
            unreachable!()
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_notifier_accepts_everything() {
        let notifier = LogNotifier;
        let message = EmailMessage {
            to: "anna@example.com".to_string(),
            subject: "You earned a discount".to_string(),
            body: "...".to_string(),
        };
        assert!(notifier.notify_referrer(&message).await.is_ok());
        assert!(notifier.notify_correction(&message).await.is_ok());
    }
}
