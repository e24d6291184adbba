//! Durable mirror of the active session.
//!
//! The storage medium is abstracted behind [`KeyValueStore`] so the gateway
//! can run against a state directory in the CLI and against an in-memory
//! store with failure injection in tests.

mod clock;
mod gateway;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use gateway::{PersistedSnapshot, Preferences, SessionGateway, PREFERENCES_KEY};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
