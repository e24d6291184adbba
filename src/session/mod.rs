//! Session state and the stepper that drives it.

mod stepper;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::sequence::StepDescriptor;

pub use stepper::Stepper;

/// Lifecycle phase of a stepper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No sequence loaded
    Idle,
    Active,
    /// Terminal: the last step was advanced past
    Completed,
}

/// Where the current index sits inside an active sequence.
///
/// Not a separate state; it only decides which transitions do something.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    First,
    Interior,
    Last,
}

impl Position {
    fn of(index: usize, len: usize) -> Self {
        if index == 0 {
            Position::First
        } else if index + 1 >= len {
            Position::Last
        } else {
            Position::Interior
        }
    }
}

/// Result of one stepper transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Moved { from: usize, to: usize },
    /// Enabled transition that left the index where it was
    Unchanged,
    /// The terminal transition fired
    Completed,
    /// Transition not enabled in the current phase
    Ignored,
}

/// Mutable record of one session. Only the stepper writes to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState<S> {
    session_id: Uuid,
    parametrization: Vec<S>,
    current_index: usize,
    completed: bool,
    saved_at: Option<i64>,
    started_at: DateTime<Utc>,
    resumed: bool,
}

impl<S> SessionState<S> {
    fn new(parametrization: Vec<S>, current_index: usize, started_at: DateTime<Utc>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            parametrization,
            current_index,
            completed: false,
            saved_at: None,
            started_at,
            resumed: false,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn parametrization(&self) -> &[S] {
        &self.parametrization
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    /// Epoch millis of the last successful snapshot write
    pub fn saved_at(&self) -> Option<i64> {
        self.saved_at
    }

    /// Start of this run; for a resumed session, the time of the resume
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Whether this run continued a saved snapshot
    pub fn resumed(&self) -> bool {
        self.resumed
    }
}

/// The step the presentation layer should show
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleStep<'a, S> {
    pub index: usize,
    pub total: usize,
    pub step: &'a StepDescriptor<S>,
    /// 1-based ordinal for repeated prayers
    pub ordinal: Option<u32>,
    pub position: Position,
}
