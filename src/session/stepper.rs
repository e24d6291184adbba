//! The stepper state machine: `Idle → Active(index) → Completed`.
//!
//! Transitions are synchronous and apply to the in-memory state first. The
//! snapshot write, haptic pulse and completion record follow, and none of
//! them can undo or block the transition that requested them.

use chrono::{DateTime, Utc};

use super::{Phase, Position, SessionState, StepOutcome, VisibleStep};
use crate::effects::{CompletionRecord, SideEffects};
use crate::persistence::{Preferences, SessionGateway};
use crate::progress::{self, Progress};
use crate::sequence::{Selector, Sequence, SequenceError, SequenceShape};

struct LoadedSession<S> {
    sequence: Sequence<S>,
    state: SessionState<S>,
}

/// Owns one session: its sequence, its state and the ports it drives.
///
/// There is no shared "current session"; the presentation layer is handed
/// the stepper it should drive.
pub struct Stepper<S> {
    shape: SequenceShape,
    gateway: SessionGateway,
    effects: SideEffects,
    session: Option<LoadedSession<S>>,
}

impl<S: Selector> Stepper<S> {
    /// Create an idle stepper. The haptics toggle comes from stored
    /// preferences.
    pub fn new(shape: SequenceShape, gateway: SessionGateway, mut effects: SideEffects) -> Self {
        let preferences = gateway.load_preferences();
        effects.set_haptics_enabled(preferences.haptics);

        Self {
            shape,
            gateway,
            effects,
            session: None,
        }
    }

    pub fn shape(&self) -> SequenceShape {
        self.shape
    }

    pub fn gateway(&self) -> &SessionGateway {
        &self.gateway
    }

    pub fn phase(&self) -> Phase {
        match &self.session {
            None => Phase::Idle,
            Some(session) if session.state.completed => Phase::Completed,
            Some(_) => Phase::Active,
        }
    }

    pub fn sequence(&self) -> Option<&Sequence<S>> {
        self.session.as_ref().map(|s| &s.sequence)
    }

    pub fn state(&self) -> Option<&SessionState<S>> {
        self.session.as_ref().map(|s| &s.state)
    }

    /// Position class of the current index while active
    pub fn position(&self) -> Option<Position> {
        self.active()
            .map(|s| Position::of(s.state.current_index, s.sequence.len()))
    }

    /// Build the sequence for `selectors` and enter `Active(0)`.
    ///
    /// Replaces any session already loaded. On an invalid parametrization
    /// the stepper is left untouched.
    pub fn start(&mut self, selectors: &[S]) -> Result<(), SequenceError> {
        let sequence = Sequence::build(selectors, self.shape)?;

        tracing::info!(
            selectors = ?selectors,
            steps = sequence.len(),
            "Starting session"
        );

        self.session = Some(LoadedSession {
            sequence,
            state: SessionState::new(selectors.to_vec(), 0, self.now()),
        });
        self.commit();
        self.effects.request_keep_awake();
        Ok(())
    }

    /// Step forward; from the last step this is the terminal transition.
    pub fn advance(&mut self) -> StepOutcome {
        let Some(session) = self.active_mut() else {
            return StepOutcome::Ignored;
        };

        let from = session.state.current_index;
        if from < session.sequence.last_index() {
            session.state.current_index = from + 1;
            self.commit();
            self.effects.pulse();
            return StepOutcome::Moved { from, to: from + 1 };
        }

        // Terminal: the in-memory state flips before any effect runs
        session.state.completed = true;
        let started_at = session.state.started_at;
        let selectors: Vec<String> = session
            .state
            .parametrization
            .iter()
            .map(|s| s.key().to_string())
            .collect();
        let steps = session.sequence.len();
        let session_id = session.state.session_id;
        let resumed = session.state.resumed;

        tracing::info!(%session_id, steps, resumed, "Session completed");

        self.gateway.clear();
        self.effects.release_keep_awake();
        self.effects.pulse();

        let record = CompletionRecord {
            completion_id: session_id,
            primary_selector: selectors.first().cloned().unwrap_or_default(),
            selectors,
            steps,
            started_at,
            completed_at: self.now(),
            resumed,
        };
        self.effects.record_completion(&record);

        StepOutcome::Completed
    }

    /// Step back; ignored on the first step.
    pub fn retreat(&mut self) -> StepOutcome {
        let Some(session) = self.active_mut() else {
            return StepOutcome::Ignored;
        };

        let from = session.state.current_index;
        if from == 0 {
            return StepOutcome::Unchanged;
        }

        session.state.current_index = from - 1;
        self.commit();
        self.effects.pulse();
        StepOutcome::Moved { from, to: from - 1 }
    }

    /// Jump to `index`, clamped into the sequence.
    ///
    /// Jumping to the current index still refreshes the snapshot timestamp.
    pub fn jump_to(&mut self, index: usize) -> StepOutcome {
        let Some(session) = self.active_mut() else {
            return StepOutcome::Ignored;
        };

        let from = session.state.current_index;
        let to = index.min(session.sequence.last_index());
        session.state.current_index = to;
        self.commit();

        if from == to {
            return StepOutcome::Unchanged;
        }
        self.effects.pulse();
        StepOutcome::Moved { from, to }
    }

    /// Drop the session from memory and storage and return to `Idle`
    pub fn reset(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::info!(session_id = %session.state.session_id, "Session reset");
        }
        self.gateway.clear();
        self.effects.release_keep_awake();
    }

    /// Restore a saved session, if a fresh and consistent one exists.
    ///
    /// Only legal from `Idle`. The sequence is rebuilt from the stored
    /// parametrization; a snapshot whose index does not fit the rebuilt
    /// sequence is discarded.
    pub fn try_resume(&mut self) -> bool {
        if self.session.is_some() {
            return false;
        }

        let Some(snapshot) = self.gateway.load::<S>() else {
            return false;
        };

        let sequence = match Sequence::build(&snapshot.parametrization, self.shape) {
            Ok(sequence) => sequence,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding snapshot with unusable parametrization");
                self.gateway.clear();
                return false;
            }
        };

        if snapshot.current_index >= sequence.len() {
            tracing::warn!(
                index = snapshot.current_index,
                steps = sequence.len(),
                "Discarding snapshot positioned outside its sequence"
            );
            self.gateway.clear();
            return false;
        }

        tracing::info!(
            index = snapshot.current_index,
            selectors = ?snapshot.parametrization,
            "Resuming session"
        );

        let mut state = SessionState::new(snapshot.parametrization, snapshot.current_index, self.now());
        state.saved_at = Some(snapshot.saved_at);
        state.resumed = true;
        self.session = Some(LoadedSession { sequence, state });
        self.commit();
        self.effects.request_keep_awake();
        true
    }

    /// Host visibility changed. Hidden hosts lose the keep-awake; it is
    /// requested again on return while a session is active.
    pub fn visibility_changed(&mut self, visible: bool) {
        if !visible {
            self.effects.keep_awake_revoked();
        } else if self.phase() == Phase::Active {
            self.effects.request_keep_awake();
        }
    }

    pub fn haptics_enabled(&self) -> bool {
        self.effects.haptics_enabled()
    }

    /// Whether the installed haptics port can pulse at all
    pub fn haptics_available(&self) -> bool {
        self.effects.haptics_available()
    }

    /// Store the user's toggle. Ignored when no haptics port is installed,
    /// so the saved preference survives a run with the bell turned off.
    pub fn set_haptics_enabled(&mut self, enabled: bool) {
        if !self.haptics_available() {
            return;
        }
        self.effects.set_haptics_enabled(enabled);
        self.gateway
            .save_preferences(&Preferences { haptics: enabled });
    }

    pub fn holds_keep_awake(&self) -> bool {
        self.effects.holds_keep_awake()
    }

    pub fn visible_step(&self) -> Option<VisibleStep<'_, S>> {
        let session = self.active()?;
        let index = session.state.current_index;
        let step = session.sequence.get(index)?;

        Some(VisibleStep {
            index,
            total: session.sequence.len(),
            step,
            ordinal: progress::ordinal_within_group(&session.sequence, index),
            position: Position::of(index, session.sequence.len()),
        })
    }

    /// Bead layout and percentage; also available once completed
    pub fn progress(&self) -> Option<Progress> {
        let session = self.session.as_ref()?;
        let index = session.state.current_index;
        let total = session.sequence.len();

        Some(Progress {
            layout: progress::project(&session.sequence, index),
            current_index: index,
            total,
            percentage: progress::percentage(index, total, session.state.completed),
            completed: session.state.completed,
        })
    }

    fn active(&self) -> Option<&LoadedSession<S>> {
        self.session.as_ref().filter(|s| !s.state.completed)
    }

    fn active_mut(&mut self) -> Option<&mut LoadedSession<S>> {
        self.session.as_mut().filter(|s| !s.state.completed)
    }

    /// Mirror the current state into storage
    fn commit(&mut self) {
        if let Some(session) = self.session.as_mut() {
            let saved = self
                .gateway
                .save(session.state.current_index, &session.state.parametrization);
            if let Some(saved_at) = saved {
                session.state.saved_at = Some(saved_at);
            }
        }
    }

    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.gateway.now_millis()).unwrap_or_else(Utc::now)
    }
}
