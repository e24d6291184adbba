use std::io::Write;

use super::{EffectError, Haptics};

/// Terminal stand-in for a vibration motor: rings the bell
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalBell;

impl Haptics for TerminalBell {
    fn pulse(&self) -> Result<(), EffectError> {
        let mut out = std::io::stdout();
        out.write_all(b"\x07")
            .and_then(|()| out.flush())
            .map_err(|e| EffectError::Failed {
                feature: "haptics",
                message: e.to_string(),
            })
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHaptics;

impl Haptics for NoopHaptics {
    fn pulse(&self) -> Result<(), EffectError> {
        Ok(())
    }

    fn is_available(&self) -> bool {
        false
    }
}
