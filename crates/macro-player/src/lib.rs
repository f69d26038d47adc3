//! macro-player library entry point.
//!
//! # What does the player do?
//!
//! 1. Walks an [`macro_core::EventStream`] and waits until each event's
//!    (speed-scaled) offset from the start of the pass.
//! 2. Converts the event into one or more synthetic input units, mapping
//!    pointer positions into the normalized `0..=65535` virtual-desktop
//!    frame and stamping every unit with [`macro_core::INJECTION_SIGNATURE`].
//! 3. Hands the units to an [`InputTransport`] (`SendInput` or the legacy
//!    `mouse_event`/`keybd_event` pair on Windows).
//! 4. Repeats the pass as configured, and reports exactly once when done.

/// Application layer: synthesis and the playback scheduler.
pub mod application;

/// Infrastructure layer: injection transports and desktop metrics.
pub mod infrastructure;

pub use application::inject_input::{
    synthesize, InjectionError, InputTransport, SyntheticInput, SyntheticKind,
};
pub use application::play_macro::{
    PlaybackEngine, PlaybackOptions, PlaybackOutcome, PlaybackReport, PASS_GAP,
};
pub use application::resolve_desktop::{virtual_desktop, DesktopMetrics, DesktopMetricsError};
