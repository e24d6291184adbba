//! Rosary - guided, resumable prayer sessions
//!
//! The engine (sequence, session, progress, persistence) is independent of
//! the terminal; `app` and `ui` present it, `completion` and `effects`
//! carry its side effects to the host.

pub mod app;
pub mod completion;
pub mod config;
pub mod content;
pub mod effects;
pub mod logging;
pub mod persistence;
pub mod progress;
pub mod sequence;
pub mod session;
pub mod ui;
