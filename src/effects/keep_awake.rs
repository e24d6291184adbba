//! Keep-awake via the platform's idle inhibitor.
//!
//! - Linux: `systemd-inhibit --what=idle sleep infinity`
//! - macOS: `caffeinate -d -i`
//!
//! The inhibitor lives as long as its child process, so acquiring spawns it
//! and releasing kills it.

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Mutex;

use super::{EffectError, KeepAwake};

const FEATURE: &str = "keep-awake";

pub struct InhibitorKeepAwake {
    program: Option<PathBuf>,
    args: Vec<&'static str>,
    child: Mutex<Option<Child>>,
}

impl InhibitorKeepAwake {
    /// Locate the platform inhibitor on PATH
    pub fn detect() -> Self {
        let (name, args) = Self::platform_command();
        let program = name.and_then(|name| which::which(name).ok());

        match &program {
            Some(path) => tracing::debug!(path = %path.display(), "Found idle inhibitor"),
            None => tracing::debug!("No idle inhibitor available"),
        }

        Self {
            program,
            args,
            child: Mutex::new(None),
        }
    }

    pub fn is_supported(&self) -> bool {
        self.program.is_some()
    }

    #[cfg(target_os = "linux")]
    fn platform_command() -> (Option<&'static str>, Vec<&'static str>) {
        (
            Some("systemd-inhibit"),
            vec![
                "--what=idle",
                "--who=rosary",
                "--why=Guided prayer in progress",
                "sleep",
                "infinity",
            ],
        )
    }

    #[cfg(target_os = "macos")]
    fn platform_command() -> (Option<&'static str>, Vec<&'static str>) {
        (Some("caffeinate"), vec!["-d", "-i"])
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    fn platform_command() -> (Option<&'static str>, Vec<&'static str>) {
        (None, Vec::new())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Child>> {
        self.child
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl KeepAwake for InhibitorKeepAwake {
    fn acquire(&self) -> Result<(), EffectError> {
        let program = self
            .program
            .as_ref()
            .ok_or(EffectError::Unsupported(FEATURE))?;

        let mut slot = self.lock();

        // Still running from an earlier request: nothing to do
        if let Some(child) = slot.as_mut() {
            if matches!(child.try_wait(), Ok(None)) {
                return Ok(());
            }
        }

        let child = Command::new(program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| EffectError::Failed {
                feature: FEATURE,
                message: e.to_string(),
            })?;

        tracing::debug!(pid = child.id(), "Idle inhibitor started");
        *slot = Some(child);
        Ok(())
    }

    fn release(&self) {
        if let Some(mut child) = self.lock().take() {
            if let Err(e) = child.kill() {
                tracing::debug!(error = %e, "Idle inhibitor already exited");
            }
            let _ = child.wait();
        }
    }
}

impl Drop for InhibitorKeepAwake {
    fn drop(&mut self) {
        self.release();
    }
}

/// Keep-awake for hosts without an inhibitor
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopKeepAwake;

impl KeepAwake for NoopKeepAwake {
    fn acquire(&self) -> Result<(), EffectError> {
        Err(EffectError::Unsupported(FEATURE))
    }

    fn release(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_reports_unsupported() {
        assert!(matches!(
            NoopKeepAwake.acquire(),
            Err(EffectError::Unsupported("keep-awake"))
        ));
    }

    #[test]
    fn test_missing_program_reports_unsupported() {
        let keep_awake = InhibitorKeepAwake {
            program: None,
            args: Vec::new(),
            child: Mutex::new(None),
        };
        assert!(!keep_awake.is_supported());
        assert!(matches!(
            keep_awake.acquire(),
            Err(EffectError::Unsupported(_))
        ));
        keep_awake.release();
    }
}
