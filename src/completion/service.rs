//! Central completion service that dispatches records to all integrations.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinHandle;

use super::integration::CompletionIntegration;
use super::journal_integration::JournalIntegration;
use super::os_integration::OsIntegration;
use super::webhook_integration::WebhookIntegration;
use crate::config::Config;
use crate::effects::{CompletionRecord, CompletionSink};

/// Central completion dispatcher.
///
/// Each enabled integration receives the record on its own task; the
/// caller never waits on delivery. [`CompletionService::flush`] lets the
/// process wait for in-flight deliveries before exiting.
pub struct CompletionService {
    integrations: Vec<Arc<dyn CompletionIntegration>>,
    enabled: bool,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl CompletionService {
    pub fn from_config(config: &Config) -> Result<Self> {
        let completion = &config.completion;
        let mut integrations: Vec<Arc<dyn CompletionIntegration>> = Vec::new();

        if completion.journal {
            integrations.push(Arc::new(JournalIntegration::new(config.journal_path(), true)));
        }

        integrations.push(Arc::new(OsIntegration::new(&completion.os)));

        if let Some(ref webhook_config) = completion.webhook {
            if webhook_config.enabled && !webhook_config.url.is_empty() {
                match WebhookIntegration::new(webhook_config) {
                    Ok(webhook) => integrations.push(Arc::new(webhook)),
                    Err(e) => {
                        tracing::warn!(
                            webhook = webhook_config.name.as_deref().unwrap_or("unnamed"),
                            error = %e,
                            "Failed to create webhook integration"
                        );
                    }
                }
            }
        }

        Ok(Self::with_integrations(integrations, completion.enabled))
    }

    pub fn with_integrations(
        integrations: Vec<Arc<dyn CompletionIntegration>>,
        enabled: bool,
    ) -> Self {
        Self {
            integrations,
            enabled,
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn disabled() -> Self {
        Self::with_integrations(Vec::new(), false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn integration_count(&self) -> usize {
        self.integrations.len()
    }

    /// Dispatch a record to all enabled integrations.
    ///
    /// Needs a tokio runtime; without one the record is logged and dropped.
    pub fn dispatch(&self, record: &CompletionRecord) {
        if !self.enabled {
            return;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(
                completion_id = %record.completion_id,
                "No tokio runtime available for completion delivery"
            );
            return;
        };

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.retain(|task| !task.is_finished());

        for integration in &self.integrations {
            if !integration.is_enabled() {
                continue;
            }
            let integration = integration.clone();
            let record = record.clone();

            pending.push(handle.spawn(async move {
                if let Err(e) = integration.send(&record).await {
                    tracing::warn!(
                        integration = %integration.name(),
                        completion_id = %record.completion_id,
                        error = %e,
                        "Completion delivery failed"
                    );
                }
            }));
        }
    }

    /// Wait up to `timeout` for in-flight deliveries to finish.
    pub async fn flush(&self, timeout: Duration) {
        let tasks: Vec<_> = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        if tasks.is_empty() {
            return;
        }

        let count = tasks.len();
        let all = async {
            for task in tasks {
                let _ = task.await;
            }
        };
        if tokio::time::timeout(timeout, all).await.is_err() {
            tracing::warn!(tasks = count, "Gave up waiting for completion delivery");
        }
    }
}

impl CompletionSink for CompletionService {
    fn record_completion(&self, record: &CompletionRecord) {
        tracing::info!(
            completion_id = %record.completion_id,
            selector = %record.primary_selector,
            steps = record.steps,
            "Session completed"
        );
        self.dispatch(record);
    }
}
