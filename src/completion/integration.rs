//! Completion integration trait definition.

use anyhow::Result;
use async_trait::async_trait;

use crate::effects::CompletionRecord;

/// Trait for completion integrations.
///
/// Each integration (journal, OS notification, webhook) implements this
/// trait to receive the record of a finished session.
#[async_trait]
pub trait CompletionIntegration: Send + Sync {
    /// Integration name (for logging)
    fn name(&self) -> &str;

    fn is_enabled(&self) -> bool;

    /// Deliver one completion record.
    ///
    /// Errors are logged by the service and never reach the stepper.
    async fn send(&self, record: &CompletionRecord) -> Result<()>;
}
