//! Contact form handling: validation plus delivery through a mail provider.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::infra::error::InfraError;

const MAX_NAME_CHARS: usize = 120;
const MAX_MESSAGE_CHARS: usize = 5_000;

/// One message sent to the mail provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactMessage {
    pub sender_name: String,
    pub reply_to: String,
    pub body: String,
}

/// Raw form payload as it arrives over HTTP.
#[derive(Debug, Clone, Deserialize)]
pub struct ContactSubmission {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ContactError {
    #[error("{0}")]
    Validation(String),
    #[error("mail delivery failed")]
    Delivery(#[source] InfraError),
}

/// Delivery seam. The production implementation talks to Resend; tests drop
/// in a recording double.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn deliver(&self, message: &ContactMessage) -> Result<(), InfraError>;
}

pub struct ContactService {
    mailer: Arc<dyn Mailer>,
}

impl ContactService {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }

    /// Validate a submission and hand it to the mail provider. One attempt,
    /// no retries: the client is told to try again instead.
    pub async fn submit(&self, submission: ContactSubmission) -> Result<(), ContactError> {
        let message = validate(&submission)?;

        self.mailer
            .deliver(&message)
            .await
            .map_err(ContactError::Delivery)?;

        info!(
            target = "application::contact",
            reply_to = %message.reply_to,
            "contact message delivered"
        );
        Ok(())
    }
}

fn validate(submission: &ContactSubmission) -> Result<ContactMessage, ContactError> {
    let name = submission.name.trim();
    let email = submission.email.trim();
    let message = submission.message.trim();

    if name.is_empty() {
        return Err(ContactError::Validation("name must not be empty".into()));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(ContactError::Validation(format!(
            "name must be at most {MAX_NAME_CHARS} characters"
        )));
    }
    if !plausible_email(email) {
        return Err(ContactError::Validation(
            "email address is not valid".into(),
        ));
    }
    if message.is_empty() {
        return Err(ContactError::Validation("message must not be empty".into()));
    }
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ContactError::Validation(format!(
            "message must be at most {MAX_MESSAGE_CHARS} characters"
        )));
    }

    Ok(ContactMessage {
        sender_name: name.to_string(),
        reply_to: email.to_string(),
        body: message.to_string(),
    })
}

/// Shape check only: one `@` with a dotted domain after it. The provider is
/// the real authority on deliverability.
fn plausible_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.contains('.')
        && !value.contains(char::is_whitespace)
        && !domain.contains('@')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingMailer {
        sent: Mutex<Vec<ContactMessage>>,
        fail: bool,
    }

    impl RecordingMailer {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
                fail,
            })
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn deliver(&self, message: &ContactMessage) -> Result<(), InfraError> {
            if self.fail {
                return Err(InfraError::upstream("resend", "boom"));
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    fn submission(name: &str, email: &str, message: &str) -> ContactSubmission {
        ContactSubmission {
            name: name.to_string(),
            email: email.to_string(),
            message: message.to_string(),
        }
    }

    #[tokio::test]
    async fn valid_submission_is_delivered_trimmed() {
        let mailer = RecordingMailer::new(false);
        let service = ContactService::new(mailer.clone());

        service
            .submit(submission("  Ada  ", "ada@example.com", "  Hi there  "))
            .await
            .expect("submit");

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].sender_name, "Ada");
        assert_eq!(sent[0].body, "Hi there");
    }

    #[tokio::test]
    async fn bad_email_is_rejected_before_delivery() {
        let mailer = RecordingMailer::new(false);
        let service = ContactService::new(mailer.clone());

        for email in ["", "not-an-email", "a@b", "two@@example.com", "a b@c.com"] {
            let err = service
                .submit(submission("Ada", email, "Hello"))
                .await
                .expect_err("rejected");
            assert!(matches!(err, ContactError::Validation(_)), "{email}");
        }
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let service = ContactService::new(RecordingMailer::new(false));
        let err = service
            .submit(submission("Ada", "ada@example.com", "   "))
            .await
            .expect_err("rejected");
        assert!(matches!(err, ContactError::Validation(_)));
    }

    #[tokio::test]
    async fn provider_failure_maps_to_delivery_error() {
        let service = ContactService::new(RecordingMailer::new(true));
        let err = service
            .submit(submission("Ada", "ada@example.com", "Hello"))
            .await
            .expect_err("delivery failure");
        assert!(matches!(err, ContactError::Delivery(_)));
    }
}
