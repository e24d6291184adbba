//! Terminal presentation of a session.

pub mod keybindings;
pub mod session_screen;
mod terminal_guard;

pub use keybindings::{action_for, Action, SHORTCUTS};
pub use session_screen::{render, ScreenView};
pub use terminal_guard::{install_panic_hook, TerminalGuard};
