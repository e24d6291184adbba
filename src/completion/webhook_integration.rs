//! Webhook completion integration.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use thiserror::Error;

use super::integration::CompletionIntegration;
use super::COMPLETION_EVENT;
use crate::config::WebhookConfig;
use crate::effects::CompletionRecord;

#[derive(Error, Debug)]
enum DeliveryError {
    #[error("webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("webhook returned {0}")]
    Status(StatusCode),
}

/// Posts each completion to a configured HTTP endpoint.
///
/// Transient failures (connection errors, timeouts, 429 and 5xx) are
/// retried with exponential backoff.
pub struct WebhookIntegration {
    name: String,
    url: String,
    token: Option<String>,
    enabled: bool,
    max_retries: usize,
    base_delay: Duration,
    client: Client,
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    event: &'a str,
    /// ISO 8601 timestamp
    timestamp: String,
    data: &'a CompletionRecord,
}

impl WebhookIntegration {
    pub fn new(config: &WebhookConfig) -> Result<Self> {
        let name = config.name.clone().unwrap_or_else(|| "webhook".to_string());

        let token = match config.token_env.as_deref() {
            Some(token_env) if !token_env.is_empty() => {
                let token = std::env::var(token_env).unwrap_or_default();
                if token.is_empty() {
                    tracing::warn!(
                        webhook = %name,
                        env_var = token_env,
                        "Bearer token environment variable is not set or empty"
                    );
                    None
                } else {
                    Some(token)
                }
            }
            _ => None,
        };

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            name,
            url: config.url.clone(),
            token,
            enabled: config.enabled,
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(500),
            client,
        })
    }

    fn retry_strategy(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_max_delay(self.base_delay * 8)
            .with_max_times(self.max_retries)
    }

    fn should_retry(err: &DeliveryError) -> bool {
        match err {
            DeliveryError::Transport(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            DeliveryError::Status(status) => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
        }
    }

    async fn post(&self, payload: &WebhookPayload<'_>) -> Result<StatusCode, DeliveryError> {
        let mut request = self.client.post(&self.url).json(payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(status)
        } else {
            Err(DeliveryError::Status(status))
        }
    }
}

#[async_trait]
impl CompletionIntegration for WebhookIntegration {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn send(&self, record: &CompletionRecord) -> Result<()> {
        let payload = WebhookPayload {
            event: COMPLETION_EVENT,
            timestamp: Utc::now().to_rfc3339(),
            data: record,
        };

        let status = (|| self.post(&payload))
            .retry(self.retry_strategy())
            .when(Self::should_retry)
            .notify(|err, dur| {
                tracing::warn!(
                    webhook = %self.name,
                    error = %err,
                    "Retrying webhook after {:?}",
                    dur
                );
            })
            .await?;

        tracing::debug!(
            webhook = %self.name,
            completion_id = %record.completion_id,
            status = %status,
            "Webhook delivered successfully"
        );
        Ok(())
    }
}
