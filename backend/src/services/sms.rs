//! Outbound SMS delivery.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tokio::task::JoinSet;

use crate::config::SmsConfig;

#[derive(Debug, Error)]
pub enum SmsError {
    #[error("recipient phone number is empty")]
    EmptyRecipient,
    #[error("SMS provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("SMS provider rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("SMS send task aborted: {0}")]
    Aborted(String),
}

/// Capability to deliver one text message to one phone number.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send(&self, to: &str, body: &str) -> Result<(), SmsError>;
}

/// Outcome of a single recipient within a broadcast.
#[derive(Debug)]
pub struct DeliveryReport {
    pub recipient: String,
    pub result: Result<(), SmsError>,
}

impl DeliveryReport {
    pub fn is_delivered(&self) -> bool {
        self.result.is_ok()
    }
}

/// Sends `body` to every recipient concurrently, one task each.
///
/// A failing recipient never affects the others. Reports come back in
/// recipient order.
pub async fn broadcast(
    sender: Arc<dyn SmsSender>,
    recipients: &[String],
    body: &str,
) -> Vec<DeliveryReport> {
    let mut tasks = JoinSet::new();
    for (index, recipient) in recipients.iter().enumerate() {
        let sender = Arc::clone(&sender);
        let recipient = recipient.clone();
        let body = body.to_string();
        tasks.spawn(async move {
            let result = sender.send(&recipient, &body).await;
            (index, result)
        });
    }

    let mut results: Vec<Option<Result<(), SmsError>>> =
        recipients.iter().map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => results[index] = Some(result),
            Err(err) => tracing::warn!(error = %err, "SMS send task did not complete"),
        }
    }

    recipients
        .iter()
        .zip(results)
        .map(|(recipient, result)| DeliveryReport {
            recipient: recipient.clone(),
            result: result.unwrap_or_else(|| Err(SmsError::Aborted(recipient.clone()))),
        })
        .collect()
}

/// Twilio-compatible REST sender.
pub struct TwilioSmsSender {
    client: Client,
    messages_url: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl TwilioSmsSender {
    pub fn new(config: &SmsConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent("lifeline-backend/1.0")
            .timeout(Duration::from_secs(config.request_timeout_seconds.max(1)))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to initialize HTTP client: {}", e))?;

        let messages_url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            config.api_base_url.trim_end_matches('/'),
            config.account_sid
        );

        Ok(Self {
            client,
            messages_url,
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from_number: config.from_number.clone(),
        })
    }

    pub fn messages_url(&self) -> &str {
        &self.messages_url
    }
}

#[async_trait]
impl SmsSender for TwilioSmsSender {
    async fn send(&self, to: &str, body: &str) -> Result<(), SmsError> {
        if to.trim().is_empty() {
            return Err(SmsError::EmptyRecipient);
        }

        let response = self
            .client
            .post(&self.messages_url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", self.from_number.as_str()), ("Body", body)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SmsError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(to, "SMS accepted by provider");
        Ok(())
    }
}

/// Sender used when delivery is disabled or the provider is not configured.
#[derive(Debug, Default, Clone)]
pub struct LogOnlySmsSender;

#[async_trait]
impl SmsSender for LogOnlySmsSender {
    async fn send(&self, to: &str, body: &str) -> Result<(), SmsError> {
        if to.trim().is_empty() {
            return Err(SmsError::EmptyRecipient);
        }
        tracing::info!(to, body, "SMS delivery skipped; message logged only");
        Ok(())
    }
}

/// Picks the sender matching the SMS configuration.
pub fn sender_from_config(config: &SmsConfig) -> anyhow::Result<Arc<dyn SmsSender>> {
    if config.skip_send {
        tracing::info!("SMS_SKIP_SEND is set; outbound SMS will be logged only");
        return Ok(Arc::new(LogOnlySmsSender));
    }
    if !config.is_configured() {
        tracing::warn!("SMS provider credentials missing; outbound SMS will be logged only");
        return Ok(Arc::new(LogOnlySmsSender));
    }
    Ok(Arc::new(TwilioSmsSender::new(config)?))
}
