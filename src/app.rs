use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::content::ContentResolver;
use crate::sequence::Selector;
use crate::session::{Phase, StepOutcome, Stepper};
use crate::ui::{self, Action, ScreenView, TerminalGuard};

const TICK_RATE: Duration = Duration::from_millis(250);

/// Longest step number accepted after `g`
const MAX_JUMP_DIGITS: usize = 6;

/// Interactive session: owns the stepper for as long as the screen is up
pub struct SessionApp<S: Selector> {
    stepper: Stepper<S>,
    content: Box<dyn ContentResolver>,
    /// Selectors used when a new session is started from `Idle`
    selectors: Vec<S>,
    jump_input: Option<String>,
    show_help: bool,
    status: Option<String>,
    should_quit: bool,
}

impl<S: Selector> SessionApp<S> {
    pub fn new(stepper: Stepper<S>, content: Box<dyn ContentResolver>, selectors: Vec<S>) -> Self {
        Self {
            stepper,
            content,
            selectors,
            jump_input: None,
            show_help: false,
            status: None,
            should_quit: false,
        }
    }

    pub fn stepper(&self) -> &Stepper<S> {
        &self.stepper
    }

    pub fn into_stepper(self) -> Stepper<S> {
        self.stepper
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn view(&self) -> ScreenView {
        let mut view = ScreenView::build(&self.stepper, self.content.as_ref());
        view.jump_input.clone_from(&self.jump_input);
        view.status.clone_from(&self.status);
        view
    }

    pub fn run(&mut self) -> Result<()> {
        let _guard = TerminalGuard::new()?;
        let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
        terminal.clear()?;

        while !self.should_quit {
            let view = self.view();
            let show_help = self.show_help;
            terminal.draw(|f| ui::render(f, &view, show_help))?;

            if event::poll(TICK_RATE)? {
                let event = event::read()?;
                self.handle_event(event);
            }
        }

        Ok(())
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key.code),
            Event::FocusGained => self.stepper.visibility_changed(true),
            Event::FocusLost => self.stepper.visibility_changed(false),
            _ => {}
        }
    }

    pub fn handle_key(&mut self, code: KeyCode) {
        self.status = None;

        if let Some(digits) = self.jump_input.as_mut() {
            match code {
                KeyCode::Char(c) if c.is_ascii_digit() => {
                    if digits.len() < MAX_JUMP_DIGITS {
                        digits.push(c);
                    }
                }
                KeyCode::Backspace => {
                    digits.pop();
                }
                KeyCode::Enter => {
                    let digits = self.jump_input.take().unwrap_or_default();
                    self.commit_jump(&digits);
                }
                KeyCode::Esc => self.jump_input = None,
                _ => {}
            }
            return;
        }

        let Some(action) = ui::action_for(code) else {
            return;
        };

        match action {
            Action::Advance => self.advance(),
            Action::Retreat => {
                self.stepper.retreat();
            }
            Action::First => {
                self.stepper.jump_to(0);
            }
            Action::Last => {
                self.stepper.jump_to(usize::MAX);
            }
            Action::BeginJump => {
                if self.stepper.phase() == Phase::Active {
                    self.jump_input = Some(String::new());
                }
            }
            Action::ToggleHaptics if !self.stepper.haptics_available() => {
                self.status = Some("Bell is turned off in the configuration".to_string());
            }
            Action::ToggleHaptics => {
                let enabled = !self.stepper.haptics_enabled();
                self.stepper.set_haptics_enabled(enabled);
                self.status = Some(format!("Bell {}", if enabled { "on" } else { "off" }));
            }
            Action::Reset => {
                self.stepper.reset();
                self.status = Some("Session cleared".to_string());
            }
            Action::ToggleHelp => self.show_help = !self.show_help,
            Action::Quit => {
                if self.show_help {
                    self.show_help = false;
                } else {
                    self.should_quit = true;
                }
            }
        }
    }

    fn advance(&mut self) {
        match self.stepper.phase() {
            Phase::Idle => {
                if let Err(e) = self.stepper.start(&self.selectors) {
                    self.status = Some(e.to_string());
                }
            }
            Phase::Active => {
                if self.stepper.advance() == StepOutcome::Completed {
                    tracing::info!("Session finished from the terminal");
                }
            }
            // A finished session only leaves through reset
            Phase::Completed => {}
        }
    }

    /// Steps are shown 1-based; `0` goes to the first step
    fn commit_jump(&mut self, digits: &str) {
        if let Ok(step) = digits.parse::<usize>() {
            self.stepper.jump_to(step.saturating_sub(1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Catalog;
    use crate::effects::recording::{RecordingHaptics, RecordingKeepAwake};
    use crate::effects::{Haptics, NoopCompletionSink, NoopHaptics, SideEffects};
    use crate::persistence::{ManualClock, MemoryStore, SessionGateway};
    use crate::sequence::{Mystery, SequenceShape};
    use crossterm::event::{KeyEvent, KeyModifiers};
    use std::sync::Arc;

    fn app_with(awake: &RecordingKeepAwake) -> SessionApp<Mystery> {
        app_with_ports(awake, Box::new(RecordingHaptics::new()))
    }

    fn app_with_ports(awake: &RecordingKeepAwake, haptics: Box<dyn Haptics>) -> SessionApp<Mystery> {
        let gateway = SessionGateway::new(
            Arc::new(MemoryStore::new()),
            Arc::new(ManualClock::at(1_000_000)),
            "session",
            Duration::from_secs(12 * 3600),
        );
        let effects = SideEffects::new(
            Box::new(awake.clone()),
            haptics,
            Arc::new(NoopCompletionSink),
        );
        let stepper = Stepper::new(SequenceShape::default(), gateway, effects);
        SessionApp::new(stepper, Box::new(Catalog::default()), vec![Mystery::Joyful])
    }

    fn app() -> SessionApp<Mystery> {
        app_with(&RecordingKeepAwake::new())
    }

    fn index(app: &SessionApp<Mystery>) -> usize {
        app.stepper().state().map(|s| s.current_index()).unwrap()
    }

    #[test]
    fn test_enter_starts_from_idle() {
        let mut app = app();
        assert_eq!(app.stepper().phase(), Phase::Idle);

        app.handle_key(KeyCode::Enter);
        assert_eq!(app.stepper().phase(), Phase::Active);
        assert_eq!(index(&app), 0);
    }

    #[test]
    fn test_navigation_keys() {
        let mut app = app();
        app.handle_key(KeyCode::Enter);

        app.handle_key(KeyCode::Right);
        app.handle_key(KeyCode::Char(' '));
        app.handle_key(KeyCode::Char('n'));
        assert_eq!(index(&app), 3);

        app.handle_key(KeyCode::Left);
        app.handle_key(KeyCode::Char('p'));
        assert_eq!(index(&app), 1);

        app.handle_key(KeyCode::End);
        assert_eq!(index(&app), 81);

        app.handle_key(KeyCode::Home);
        assert_eq!(index(&app), 0);
    }

    #[test]
    fn test_jump_input() {
        let mut app = app();
        app.handle_key(KeyCode::Enter);

        app.handle_key(KeyCode::Char('g'));
        app.handle_key(KeyCode::Char('4'));
        app.handle_key(KeyCode::Char('2'));
        assert_eq!(app.view().jump_input.as_deref(), Some("42"));

        app.handle_key(KeyCode::Enter);
        assert_eq!(index(&app), 41);
        assert!(app.view().jump_input.is_none());
    }

    #[test]
    fn test_jump_beyond_end_clamps() {
        let mut app = app();
        app.handle_key(KeyCode::Enter);

        app.handle_key(KeyCode::Char('g'));
        for c in "999".chars() {
            app.handle_key(KeyCode::Char(c));
        }
        app.handle_key(KeyCode::Enter);
        assert_eq!(index(&app), 81);
    }

    #[test]
    fn test_jump_cancel_keeps_position() {
        let mut app = app();
        app.handle_key(KeyCode::Enter);
        app.handle_key(KeyCode::Right);

        app.handle_key(KeyCode::Char('g'));
        app.handle_key(KeyCode::Char('5'));
        app.handle_key(KeyCode::Esc);
        assert_eq!(index(&app), 1);
        assert!(!app.should_quit());
    }

    #[test]
    fn test_completion_needs_reset_before_restart() {
        let mut app = app();
        app.handle_key(KeyCode::Enter);
        app.handle_key(KeyCode::End);
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.stepper().phase(), Phase::Completed);

        app.handle_key(KeyCode::Enter);
        assert_eq!(app.stepper().phase(), Phase::Completed);

        app.handle_key(KeyCode::Char('r'));
        assert_eq!(app.stepper().phase(), Phase::Idle);
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.stepper().phase(), Phase::Active);
    }

    #[test]
    fn test_toggle_haptics_reports_status() {
        let mut app = app();
        app.handle_key(KeyCode::Char('h'));
        assert!(!app.stepper().haptics_enabled());
        assert_eq!(app.view().status.as_deref(), Some("Bell off"));

        app.handle_key(KeyCode::Char('h'));
        assert!(app.stepper().haptics_enabled());
    }

    #[test]
    fn test_toggle_without_bell_is_ignored() {
        let mut app = app_with_ports(&RecordingKeepAwake::new(), Box::new(NoopHaptics));
        assert!(!app.stepper().haptics_available());
        assert!(!app.stepper().haptics_enabled());
        assert_eq!(app.view().haptics, None);

        app.handle_key(KeyCode::Char('h'));
        assert!(!app.stepper().haptics_enabled());
        assert_eq!(
            app.view().status.as_deref(),
            Some("Bell is turned off in the configuration")
        );
    }

    #[test]
    fn test_quit_closes_help_first() {
        let mut app = app();
        app.handle_key(KeyCode::Char('?'));
        app.handle_key(KeyCode::Esc);
        assert!(!app.should_quit());

        app.handle_key(KeyCode::Char('q'));
        assert!(app.should_quit());
    }

    #[test]
    fn test_focus_events_drive_keep_awake() {
        let awake = RecordingKeepAwake::new();
        let mut app = app_with(&awake);
        app.handle_key(KeyCode::Enter);
        assert_eq!(awake.acquired(), 1);

        app.handle_event(Event::FocusLost);
        assert!(!app.stepper().holds_keep_awake());

        app.handle_event(Event::FocusGained);
        assert!(app.stepper().holds_keep_awake());
        assert_eq!(awake.acquired(), 2);
    }

    #[test]
    fn test_key_release_is_ignored() {
        let mut app = app();
        let mut release = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;

        app.handle_event(Event::Key(release));
        assert_eq!(app.stepper().phase(), Phase::Idle);
    }
}
