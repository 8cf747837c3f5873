//! Outbound email through the Resend HTTP API.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::application::contact::{ContactMessage, Mailer};
use crate::infra::error::InfraError;

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

pub struct ResendMailer {
    client: reqwest::Client,
    api_key: String,
    from_address: String,
    to_address: String,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: String,
    text: String,
    reply_to: &'a str,
}

impl ResendMailer {
    pub fn new(client: reqwest::Client, api_key: String, from: String, to: String) -> Self {
        Self {
            client,
            api_key,
            from_address: from,
            to_address: to,
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn deliver(&self, message: &ContactMessage) -> Result<(), InfraError> {
        let payload = SendRequest {
            from: &self.from_address,
            to: [&self.to_address],
            subject: format!("Contact form: {}", message.sender_name),
            text: format!(
                "From: {} <{}>\n\n{}",
                message.sender_name, message.reply_to, message.body
            ),
            reply_to: &message.reply_to,
        };

        let response = self
            .client
            .post(RESEND_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|err| InfraError::upstream("resend", err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InfraError::upstream(
                "resend",
                format!("status {status}: {body}"),
            ));
        }

        debug!(target = "infra::email", "mail accepted by provider");
        Ok(())
    }
}
