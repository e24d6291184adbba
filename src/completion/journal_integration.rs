//! Append-only JSON Lines journal of completed sessions.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use super::integration::CompletionIntegration;
use super::COMPLETION_EVENT;
use crate::effects::CompletionRecord;

/// One line of `completions.jsonl`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub event: String,
    pub recorded_at: DateTime<Utc>,
    #[serde(flatten)]
    pub record: CompletionRecord,
}

pub struct JournalIntegration {
    path: PathBuf,
    enabled: bool,
}

impl JournalIntegration {
    pub fn new(path: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            path: path.into(),
            enabled,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every well-formed entry in the journal, oldest first.
    ///
    /// A missing journal is an empty history. Lines that fail to parse are
    /// skipped with a warning.
    pub fn history(path: &Path) -> Result<Vec<JournalEntry>> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read journal {}", path.display()))
            }
        };

        let mut entries = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<JournalEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!(
                    path = %path.display(),
                    line = line_no + 1,
                    error = %e,
                    "Skipping malformed journal line"
                ),
            }
        }
        Ok(entries)
    }
}

#[async_trait]
impl CompletionIntegration for JournalIntegration {
    fn name(&self) -> &str {
        "journal"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn send(&self, record: &CompletionRecord) -> Result<()> {
        let entry = JournalEntry {
            event: COMPLETION_EVENT.to_string(),
            recorded_at: Utc::now(),
            record: record.clone(),
        };
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create journal directory")?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open journal {}", self.path.display()))?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        tracing::debug!(
            path = %self.path.display(),
            completion_id = %record.completion_id,
            "Completion journaled"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::sample_record;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_send_appends_lines() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("completions.jsonl");
        let journal = JournalIntegration::new(&path, true);

        let first = sample_record();
        let second = sample_record();
        journal.send(&first).await.unwrap();
        journal.send(&second).await.unwrap();

        let entries = JournalIntegration::history(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].event, "session.completed");
        assert_eq!(entries[0].record, first);
        assert_eq!(entries[1].record.completion_id, second.completion_id);
    }

    #[test]
    fn test_history_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let entries = JournalIntegration::history(&temp_dir.path().join("none.jsonl")).unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_history_skips_malformed_lines() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("completions.jsonl");
        std::fs::write(&path, "not json\n\n").unwrap();

        let journal = JournalIntegration::new(&path, true);
        journal.send(&sample_record()).await.unwrap();

        let entries = JournalIntegration::history(&path).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_journal_line_is_flat() {
        let entry = JournalEntry {
            event: COMPLETION_EVENT.to_string(),
            recorded_at: Utc::now(),
            record: sample_record(),
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["primary_selector"], "joyful");
        assert_eq!(value["steps"], 82);
    }
}
