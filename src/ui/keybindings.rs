//! Keyboard shortcuts of the session screen.
//!
//! Single source for both key dispatch and the help overlay.

use crossterm::event::KeyCode;

/// What a key press asks the session to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Advance,
    Retreat,
    First,
    Last,
    /// Start typing a step number to jump to
    BeginJump,
    ToggleHaptics,
    Reset,
    ToggleHelp,
    Quit,
}

#[derive(Debug, Clone)]
pub struct Shortcut {
    pub keys: &'static [KeyCode],
    pub action: Action,
    pub description: &'static str,
}

impl Shortcut {
    /// Format keys for display (e.g., "→/Space/Enter/n")
    pub fn key_display(&self) -> String {
        self.keys
            .iter()
            .map(format_keycode)
            .collect::<Vec<_>>()
            .join("/")
    }
}

fn format_keycode(key: &KeyCode) -> String {
    match key {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Left => "←".to_string(),
        KeyCode::Right => "→".to_string(),
        KeyCode::Home => "Home".to_string(),
        KeyCode::End => "End".to_string(),
        KeyCode::Backspace => "Backspace".to_string(),
        _ => format!("{:?}", key),
    }
}

pub static SHORTCUTS: &[Shortcut] = &[
    Shortcut {
        keys: &[
            KeyCode::Right,
            KeyCode::Char(' '),
            KeyCode::Enter,
            KeyCode::Char('n'),
        ],
        action: Action::Advance,
        description: "Next prayer",
    },
    Shortcut {
        keys: &[KeyCode::Left, KeyCode::Backspace, KeyCode::Char('p')],
        action: Action::Retreat,
        description: "Previous prayer",
    },
    Shortcut {
        keys: &[KeyCode::Home],
        action: Action::First,
        description: "First prayer",
    },
    Shortcut {
        keys: &[KeyCode::End],
        action: Action::Last,
        description: "Last prayer",
    },
    Shortcut {
        keys: &[KeyCode::Char('g')],
        action: Action::BeginJump,
        description: "Go to step number",
    },
    Shortcut {
        keys: &[KeyCode::Char('h')],
        action: Action::ToggleHaptics,
        description: "Toggle bell",
    },
    Shortcut {
        keys: &[KeyCode::Char('r')],
        action: Action::Reset,
        description: "Reset session",
    },
    Shortcut {
        keys: &[KeyCode::Char('?')],
        action: Action::ToggleHelp,
        description: "Toggle help",
    },
    Shortcut {
        keys: &[KeyCode::Char('q'), KeyCode::Esc],
        action: Action::Quit,
        description: "Quit (progress is kept)",
    },
];

/// Look up the action bound to `key`
pub fn action_for(key: KeyCode) -> Option<Action> {
    SHORTCUTS
        .iter()
        .find(|shortcut| shortcut.keys.contains(&key))
        .map(|shortcut| shortcut.action)
}
