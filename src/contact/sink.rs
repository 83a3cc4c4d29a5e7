//! Delivery targets for accepted contact submissions.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use super::submission::ContactSubmission;

/// Delivery failures.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("delivery target unavailable: {0}")]
    Unavailable(String),
}

/// Confirmation returned by a sink after it accepted a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    /// Human-readable confirmation shown to the sender
    pub message: String,
}

/// Something that accepts contact submissions.
#[async_trait]
pub trait ContactSink: Send + Sync {
    async fn deliver(&self, submission: &ContactSubmission) -> Result<DeliveryReceipt, DeliveryError>;
}

/// Writes submissions to the log instead of sending mail.
#[derive(Debug, Clone)]
pub struct LogSink {
    recipient: String,
}

impl LogSink {
    pub fn new(recipient: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
        }
    }
}

#[async_trait]
impl ContactSink for LogSink {
    async fn deliver(&self, submission: &ContactSubmission) -> Result<DeliveryReceipt, DeliveryError> {
        info!(
            id = %submission.id,
            recipient = %self.recipient,
            name = %submission.name,
            email = %submission.email,
            message = %submission.message,
            "Contact form submission received (no mail transport configured)"
        );

        Ok(DeliveryReceipt {
            message: "Message received (no mail transport configured - logged)".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::ContactRequest;

    #[tokio::test]
    async fn test_log_sink_accepts_submission() {
        let request = ContactRequest {
            name: Some("Grace".to_string()),
            email: Some("grace@example.com".to_string()),
            message: Some("Please get in touch about OCR.".to_string()),
        };
        let submission = ContactSubmission::from_request(&request, 5000).unwrap();

        let sink = LogSink::new("mail@imagetotext.net");
        let receipt = tokio_test::assert_ok!(sink.deliver(&submission).await);
        assert!(receipt.message.starts_with("Message received"));
    }
}
