//! Completion delivery for finished sessions.
//!
//! A completed session produces one [`crate::effects::CompletionRecord`]. The
//! [`CompletionService`] fans it out to every enabled integration
//! (journal file, OS notification, webhook) without blocking the stepper.

#[cfg(test)]
use crate::effects::CompletionRecord;

mod desktop;
mod integration;
mod journal_integration;
mod os_integration;
mod service;
mod webhook_integration;

pub use desktop::DesktopNotice;
pub use integration::CompletionIntegration;
pub use journal_integration::{JournalEntry, JournalIntegration};
pub use os_integration::OsIntegration;
pub use service::CompletionService;
pub use webhook_integration::WebhookIntegration;

/// Event name carried in webhook payloads and journal lines
pub const COMPLETION_EVENT: &str = "session.completed";

#[cfg(test)]
pub(crate) fn sample_record() -> CompletionRecord {
    use chrono::{TimeZone, Utc};

    let started_at = Utc.with_ymd_and_hms(2026, 10, 17, 7, 0, 0).unwrap();
    CompletionRecord {
        completion_id: uuid::Uuid::new_v4(),
        primary_selector: "joyful".into(),
        selectors: vec!["joyful".into()],
        steps: 82,
        started_at,
        completed_at: started_at + chrono::Duration::minutes(21),
        resumed: false,
    }
}
