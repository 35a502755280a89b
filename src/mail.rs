use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, instrument};

use crate::config::MailConfig;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EmailMessage {
    pub subject: String,
    pub html: String,
    pub to: String,
    pub from: String,
    pub reply_to: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> anyhow::Result<()>;
}

/// Hands messages to an HTTP email relay as JSON.
pub struct HttpRelayMailer {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl HttpRelayMailer {
    pub fn new(url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            api_key,
        }
    }
}

#[async_trait]
impl Mailer for HttpRelayMailer {
    #[instrument(skip(self, message), fields(to = %message.to, subject = %message.subject))]
    async fn send(&self, message: EmailMessage) -> anyhow::Result<()> {
        let mut req = self.client.post(&self.url).json(&message);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        req.send()
            .await
            .context("mail relay request")?
            .error_for_status()
            .context("mail relay rejected message")?;
        info!("email sent");
        Ok(())
    }
}

/// Used when no relay is configured: the message is only logged.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> anyhow::Result<()> {
        info!(to = %message.to, subject = %message.subject, "mail relay not configured; email not delivered");
        Ok(())
    }
}

pub fn from_config(cfg: &MailConfig) -> Arc<dyn Mailer> {
    match &cfg.relay_url {
        Some(url) => Arc::new(HttpRelayMailer::new(url.clone(), cfg.api_key.clone())),
        None => Arc::new(LogMailer),
    }
}
