//! macro-app library entry point.
//!
//! Everything the `macro-app` binary needs besides platform wiring lives
//! here so it can be exercised from tests with mock hooks and transports:
//!
//! - **`application::session`** – the recording/playback controller and the
//!   hotkey command loop.
//! - **`infrastructure::storage`** – the TOML preferences file and macro file
//!   persistence.

pub mod application;
pub mod infrastructure;

pub use application::session::{
    bind_hotkeys, run_commands, Command, MacroSession, RecordingToggle, SessionError,
    COMMAND_CHANNEL_CAPACITY,
};
pub use infrastructure::storage::config::{AppConfig, ConfigError};
pub use infrastructure::storage::macro_store::MacroFileError;
