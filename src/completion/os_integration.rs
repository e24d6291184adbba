//! Desktop notification on completion.

use anyhow::Result;
use async_trait::async_trait;

use super::desktop::DesktopNotice;
use super::integration::CompletionIntegration;
use crate::config::OsNotificationConfig;
use crate::effects::CompletionRecord;

/// Shows a [`DesktopNotice`] through `notify-rust` on Linux and
/// `mac-notification-sys` on macOS. Display errors are logged, not returned.
pub struct OsIntegration {
    enabled: bool,
    sound: bool,
}

impl OsIntegration {
    pub fn new(config: &OsNotificationConfig) -> Self {
        Self {
            enabled: config.enabled,
            sound: config.sound,
        }
    }
}

#[async_trait]
impl CompletionIntegration for OsIntegration {
    fn name(&self) -> &str {
        "os"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn send(&self, record: &CompletionRecord) -> Result<()> {
        let notice = DesktopNotice::for_record(record);

        if let Err(e) = notice.show(self.sound) {
            tracing::warn!(
                integration = "os",
                completion_id = %record.completion_id,
                error = %e,
                "Failed to send OS notification"
            );
        }

        Ok(())
    }
}
