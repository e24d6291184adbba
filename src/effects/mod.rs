//! Side-effect ports requested by the stepper.
//!
//! Each port is best-effort and fails independently. [`SideEffects`] owns
//! the request policy (idempotent keep-awake acquisition, release only
//! while held, haptics behind a user toggle) and absorbs every port error,
//! so a missing platform feature is indistinguishable from a feature that
//! was not needed.

mod haptics;
mod keep_awake;
pub mod recording;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use haptics::{NoopHaptics, TerminalBell};
pub use keep_awake::{InhibitorKeepAwake, NoopKeepAwake};

#[derive(Error, Debug)]
pub enum EffectError {
    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),

    #[error("{feature} request failed: {message}")]
    Failed {
        feature: &'static str,
        message: String,
    },
}

/// Keeps the display awake while a session is active
pub trait KeepAwake: Send + Sync {
    fn acquire(&self) -> Result<(), EffectError>;

    fn release(&self);
}

/// Short physical (or audible) cue on navigation
pub trait Haptics: Send + Sync {
    fn pulse(&self) -> Result<(), EffectError>;

    /// `false` for ports that can never produce a cue
    fn is_available(&self) -> bool {
        true
    }
}

/// Receives exactly one record per completed session.
///
/// Called synchronously from the terminal transition; implementations must
/// not block and must absorb their own delivery failures.
pub trait CompletionSink: Send + Sync {
    fn record_completion(&self, record: &CompletionRecord);
}

/// What the completion sink learns about a finished session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub completion_id: Uuid,
    /// Key of the first selector of the parametrization
    pub primary_selector: String,
    pub selectors: Vec<String>,
    pub steps: usize,
    /// Start of the run that finished; the resume time for resumed sessions
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// The run continued a saved snapshot, so the duration covers only the
    /// time since resuming
    #[serde(default)]
    pub resumed: bool,
}

impl CompletionRecord {
    pub fn duration_seconds(&self) -> u64 {
        self.completed_at
            .signed_duration_since(self.started_at)
            .num_seconds()
            .max(0) as u64
    }
}

/// Sink that drops every record
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCompletionSink;

impl CompletionSink for NoopCompletionSink {
    fn record_completion(&self, record: &CompletionRecord) {
        tracing::debug!(
            completion_id = %record.completion_id,
            "Completion recorded without a sink"
        );
    }
}

pub struct SideEffects {
    keep_awake: Box<dyn KeepAwake>,
    haptics: Box<dyn Haptics>,
    completion: Arc<dyn CompletionSink>,
    keep_awake_enabled: bool,
    haptics_enabled: bool,
    awake_held: bool,
}

impl SideEffects {
    pub fn new(
        keep_awake: Box<dyn KeepAwake>,
        haptics: Box<dyn Haptics>,
        completion: Arc<dyn CompletionSink>,
    ) -> Self {
        Self {
            keep_awake,
            haptics,
            completion,
            keep_awake_enabled: true,
            haptics_enabled: true,
            awake_held: false,
        }
    }

    /// Ports that do nothing (headless commands and tests)
    pub fn noop() -> Self {
        Self::new(
            Box::new(NoopKeepAwake),
            Box::new(NoopHaptics),
            Arc::new(NoopCompletionSink),
        )
    }

    pub fn with_keep_awake_enabled(mut self, enabled: bool) -> Self {
        self.keep_awake_enabled = enabled;
        self
    }

    /// Effective toggle: the user's choice, and a port that can pulse
    pub fn haptics_enabled(&self) -> bool {
        self.haptics_enabled && self.haptics_available()
    }

    pub fn haptics_available(&self) -> bool {
        self.haptics.is_available()
    }

    pub fn set_haptics_enabled(&mut self, enabled: bool) {
        self.haptics_enabled = enabled;
    }

    /// Whether the engine believes it currently holds the keep-awake
    pub fn holds_keep_awake(&self) -> bool {
        self.awake_held
    }

    /// Acquire keep-awake unless already held
    pub fn request_keep_awake(&mut self) {
        if !self.keep_awake_enabled || self.awake_held {
            return;
        }
        match self.keep_awake.acquire() {
            Ok(()) => {
                self.awake_held = true;
                tracing::debug!("Keep-awake acquired");
            }
            Err(e) => tracing::debug!(error = %e, "Keep-awake unavailable"),
        }
    }

    pub fn release_keep_awake(&mut self) {
        if self.awake_held {
            self.keep_awake.release();
            self.awake_held = false;
            tracing::debug!("Keep-awake released");
        }
    }

    /// The host went to the background. The port is released as well, so
    /// no acquisition outlives the engine's belief that it holds one.
    pub fn keep_awake_revoked(&mut self) {
        if self.awake_held {
            self.keep_awake.release();
            self.awake_held = false;
            tracing::debug!("Keep-awake revoked by host");
        }
    }

    pub fn pulse(&self) {
        if !self.haptics_enabled() {
            return;
        }
        if let Err(e) = self.haptics.pulse() {
            tracing::debug!(error = %e, "Haptic pulse skipped");
        }
    }

    pub fn record_completion(&self, record: &CompletionRecord) {
        self.completion.record_completion(record);
    }
}

impl Drop for SideEffects {
    fn drop(&mut self) {
        self.release_keep_awake();
    }
}

#[cfg(test)]
mod tests {
    use super::recording::{RecordingHaptics, RecordingKeepAwake};
    use super::*;

    fn effects(awake: &RecordingKeepAwake, haptics: &RecordingHaptics) -> SideEffects {
        SideEffects::new(
            Box::new(awake.clone()),
            Box::new(haptics.clone()),
            Arc::new(NoopCompletionSink),
        )
    }

    #[test]
    fn test_keep_awake_acquired_once() {
        let awake = RecordingKeepAwake::new();
        let mut effects = effects(&awake, &RecordingHaptics::new());

        effects.request_keep_awake();
        effects.request_keep_awake();
        assert_eq!(awake.acquired(), 1);
        assert!(effects.holds_keep_awake());

        effects.release_keep_awake();
        effects.release_keep_awake();
        assert_eq!(awake.released(), 1);
        assert!(!effects.holds_keep_awake());
    }

    #[test]
    fn test_keep_awake_reacquired_after_revocation() {
        let awake = RecordingKeepAwake::new();
        let mut effects = effects(&awake, &RecordingHaptics::new());

        effects.request_keep_awake();
        effects.keep_awake_revoked();
        assert!(!awake.is_held());
        assert_eq!(awake.released(), 1);

        effects.request_keep_awake();
        assert_eq!(awake.acquired(), 2);
        assert!(awake.is_held());
    }

    #[test]
    fn test_unsupported_keep_awake_is_silent() {
        let awake = RecordingKeepAwake::unsupported();
        let mut effects = effects(&awake, &RecordingHaptics::new());

        effects.request_keep_awake();
        assert!(!effects.holds_keep_awake());
        effects.release_keep_awake();
        assert_eq!(awake.released(), 0);
    }

    #[test]
    fn test_disabled_keep_awake_never_acquires() {
        let awake = RecordingKeepAwake::new();
        let mut effects = effects(&awake, &RecordingHaptics::new()).with_keep_awake_enabled(false);

        effects.request_keep_awake();
        assert_eq!(awake.acquired(), 0);
    }

    #[test]
    fn test_pulse_respects_toggle() {
        let haptics = RecordingHaptics::new();
        let mut effects = effects(&RecordingKeepAwake::new(), &haptics);

        effects.pulse();
        effects.set_haptics_enabled(false);
        effects.pulse();
        assert_eq!(haptics.pulses(), 1);
    }

    #[test]
    fn test_failing_haptics_are_absorbed() {
        let haptics = RecordingHaptics::failing();
        let effects = effects(&RecordingKeepAwake::new(), &haptics);
        effects.pulse();
        assert_eq!(haptics.pulses(), 0);
    }

    #[test]
    fn test_drop_releases_keep_awake() {
        let awake = RecordingKeepAwake::new();
        {
            let mut effects = effects(&awake, &RecordingHaptics::new());
            effects.request_keep_awake();
        }
        assert_eq!(awake.released(), 1);
    }

    #[test]
    fn test_completion_duration() {
        let started_at = Utc::now();
        let record = CompletionRecord {
            completion_id: Uuid::new_v4(),
            primary_selector: "joyful".into(),
            selectors: vec!["joyful".into()],
            steps: 82,
            started_at,
            completed_at: started_at + chrono::Duration::seconds(1200),
            resumed: false,
        };
        assert_eq!(record.duration_seconds(), 1200);
    }
}
