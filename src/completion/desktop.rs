//! Desktop notice shown when a session completes.

use anyhow::Result;

use crate::effects::CompletionRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopNotice {
    pub title: String,
    /// Prayed sets, e.g. "Joyful, Glorious"
    pub subtitle: String,
    pub body: String,
}

impl DesktopNotice {
    pub fn for_record(record: &CompletionRecord) -> Self {
        let subtitle = record
            .selectors
            .iter()
            .map(|key| capitalize(key))
            .collect::<Vec<_>>()
            .join(", ");

        let body = match record.duration_seconds() / 60 {
            0 => format!("{} steps prayed", record.steps),
            minutes => format!("{} steps prayed in {minutes} min", record.steps),
        };

        Self {
            title: "Rosary Complete".to_string(),
            subtitle,
            body,
        }
    }

    /// Hand the notice to the platform notification daemon
    #[cfg(target_os = "linux")]
    pub fn show(&self, _sound: bool) -> Result<()> {
        // freedesktop has no subtitle line
        let body = if self.subtitle.is_empty() {
            self.body.clone()
        } else {
            format!("{}\n{}", self.subtitle, self.body)
        };

        notify_rust::Notification::new()
            .appname("rosary")
            .summary(&self.title)
            .body(&body)
            .show()?;
        Ok(())
    }

    #[cfg(target_os = "macos")]
    pub fn show(&self, sound: bool) -> Result<()> {
        let mut notification = mac_notification_sys::Notification::new();
        notification
            .title(&self.title)
            .subtitle(&self.subtitle)
            .message(&self.body);
        if sound {
            notification.sound("default");
        }
        notification.send()?;
        Ok(())
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    pub fn show(&self, _sound: bool) -> Result<()> {
        tracing::info!(title = %self.title, subtitle = %self.subtitle, "{}", self.body);
        Ok(())
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
