//! Recording ports for tests and dry runs.
//!
//! Clones share their counters, so a test keeps one handle and moves the
//! other into the engine.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{CompletionRecord, CompletionSink, EffectError, Haptics, KeepAwake};

#[derive(Debug, Clone, Default)]
pub struct RecordingKeepAwake {
    acquired: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
    held: Arc<AtomicBool>,
    unsupported: bool,
}

impl RecordingKeepAwake {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unsupported() -> Self {
        Self {
            unsupported: true,
            ..Self::default()
        }
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Acquired and not yet released, like a running inhibitor process
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }
}

impl KeepAwake for RecordingKeepAwake {
    fn acquire(&self) -> Result<(), EffectError> {
        if self.unsupported {
            return Err(EffectError::Unsupported("keep-awake"));
        }
        self.acquired.fetch_add(1, Ordering::SeqCst);
        self.held.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn release(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
        self.held.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingHaptics {
    pulses: Arc<AtomicUsize>,
    failing: bool,
}

impl RecordingHaptics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn pulses(&self) -> usize {
        self.pulses.load(Ordering::SeqCst)
    }
}

impl Haptics for RecordingHaptics {
    fn pulse(&self) -> Result<(), EffectError> {
        if self.failing {
            return Err(EffectError::Failed {
                feature: "haptics",
                message: "vibration motor offline".into(),
            });
        }
        self.pulses.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    records: Arc<Mutex<Vec<CompletionRecord>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<CompletionRecord> {
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl CompletionSink for RecordingSink {
    fn record_completion(&self, record: &CompletionRecord) {
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(record.clone());
    }
}
