//! macro-recorder library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/` and
//! the application crate share the same module tree.
//!
//! # What does the recorder do?
//!
//! 1. Installs low-level keyboard and pointer hooks (`WH_KEYBOARD_LL`,
//!    `WH_MOUSE_LL` on Windows) on a dedicated message-loop thread.
//! 2. Drops anything the player itself injected (see
//!    [`macro_core::INJECTION_SIGNATURE`]).
//! 3. Applies the capture policy (pointer-move sampling, wheel notches, key
//!    names) and accumulates a timestamped [`macro_core::EventStream`].
//! 4. Independently, watches the keyboard for configured hotkeys and runs
//!    their callbacks off the hook thread.

/// Application layer: recording session and hotkey dispatcher.
pub mod application;

/// Infrastructure layer: OS hook adapters.
pub mod infrastructure;

pub use application::hotkeys::{HotkeyDispatcher, HotkeyError};
pub use application::record_macro::{CapturePolicy, Recorder, MOVE_SAMPLE_INTERVAL};
pub use infrastructure::input_capture::{
    CaptureError, HookSet, InputSource, RawInputEvent, RawInputKind,
};
