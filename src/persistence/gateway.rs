//! Session gateway: mirrors the last session snapshot into a key-value
//! store and applies the expiry policy on the way back out.
//!
//! Every storage failure stops here. `load` degrades to "nothing saved",
//! `save` and `clear` degrade to no-ops, and the in-memory session stays
//! authoritative either way.

use std::sync::Arc;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::clock::Clock;
use super::store::KeyValueStore;
use crate::sequence::Selector;

/// Storage key for user preferences
pub const PREFERENCES_KEY: &str = "preferences";

/// The persisted subset of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSnapshot<S> {
    /// Position in the rebuilt sequence
    pub current_index: usize,
    /// Selectors that rebuild the sequence
    pub parametrization: Vec<S>,
    /// Epoch milliseconds of the write
    pub saved_at: i64,
}

impl<S> PersistedSnapshot<S> {
    /// Age of the snapshot relative to `now_millis`, saturating at the
    /// `i64` bounds
    pub fn age_millis(&self, now_millis: i64) -> i64 {
        now_millis.saturating_sub(self.saved_at)
    }
}

/// Per-user toggles that outlive a single session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Preferences {
    #[serde(default = "default_haptics")]
    pub haptics: bool,
}

fn default_haptics() -> bool {
    true
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            haptics: default_haptics(),
        }
    }
}

pub struct SessionGateway {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    key: String,
    max_age_millis: i64,
}

impl SessionGateway {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        key: impl Into<String>,
        max_age: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            key: key.into(),
            max_age_millis: i64::try_from(max_age.as_millis()).unwrap_or(i64::MAX),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn max_age_millis(&self) -> i64 {
        self.max_age_millis
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Overwrite the stored snapshot, stamping it with the current time.
    ///
    /// Returns the timestamp written, or `None` when the store refused the
    /// write.
    pub fn save<S: Selector>(&self, current_index: usize, parametrization: &[S]) -> Option<i64> {
        let snapshot = PersistedSnapshot {
            current_index,
            parametrization: parametrization.to_vec(),
            saved_at: self.clock.now_millis(),
        };

        let json = match serde_json::to_string(&snapshot) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize session snapshot");
                return None;
            }
        };

        match self.store.set(&self.key, &json) {
            Ok(()) => {
                tracing::debug!(
                    key = %self.key,
                    index = current_index,
                    saved_at = snapshot.saved_at,
                    "Session snapshot saved"
                );
                Some(snapshot.saved_at)
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Session snapshot not saved");
                None
            }
        }
    }

    /// Read the stored snapshot if it exists, parses, and is still fresh.
    ///
    /// Malformed and expired snapshots are removed so they are not
    /// offered again. A snapshot exactly `max_age` old is still valid.
    pub fn load<S: Selector>(&self) -> Option<PersistedSnapshot<S>> {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Session snapshot unreadable");
                return None;
            }
        };

        let snapshot: PersistedSnapshot<S> = match serde_json::from_str(&raw) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Discarding malformed session snapshot");
                self.clear();
                return None;
            }
        };

        let Some(age) = self.clock.now_millis().checked_sub(snapshot.saved_at) else {
            tracing::warn!(
                key = %self.key,
                saved_at = snapshot.saved_at,
                "Discarding session snapshot with an impossible timestamp"
            );
            self.clear();
            return None;
        };
        if age > self.max_age_millis {
            tracing::info!(
                key = %self.key,
                age_ms = age,
                max_age_ms = self.max_age_millis,
                "Discarding expired session snapshot"
            );
            self.clear();
            return None;
        }

        Some(snapshot)
    }

    pub fn clear(&self) {
        match self.store.remove(&self.key) {
            Ok(()) => tracing::debug!(key = %self.key, "Session snapshot cleared"),
            Err(e) => tracing::warn!(key = %self.key, error = %e, "Session snapshot not cleared"),
        }
    }

    /// Stored preferences, or defaults when absent or unreadable
    pub fn load_preferences(&self) -> Preferences {
        match self.store.get(PREFERENCES_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Ignoring malformed preferences");
                Preferences::default()
            }),
            Ok(None) => Preferences::default(),
            Err(e) => {
                tracing::warn!(error = %e, "Preferences unreadable");
                Preferences::default()
            }
        }
    }

    pub fn save_preferences(&self, preferences: &Preferences) {
        let result = serde_json::to_string(preferences)
            .map_err(|e| e.to_string())
            .and_then(|json| {
                self.store
                    .set(PREFERENCES_KEY, &json)
                    .map_err(|e| e.to_string())
            });
        if let Err(e) = result {
            tracing::warn!(error = %e, "Preferences not saved");
        }
    }
}
