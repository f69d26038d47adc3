//! Input capture infrastructure.
//!
//! On Windows, this installs low-level keyboard and/or mouse hooks
//! (`WH_KEYBOARD_LL`, `WH_MOUSE_LL`) on a dedicated Win32 message loop
//! thread.  Raw events are placed into an `mpsc` channel and consumed by a
//! worker owned by the application layer.
//!
//! # Windows-Specific Implementation
//!
//! The hook callbacks must complete within the system's `LowLevelHooksTimeout`
//! or Windows silently removes the hook.  The callbacks therefore do nothing
//! but filter injected input, copy the hook struct into a [`RawInputEvent`]
//! and send it.
//!
//! # Testability
//!
//! The [`InputSource`] trait allows unit tests to inject synthetic events
//! without requiring Windows hooks; see [`mock::MockInputSource`].

use std::sync::mpsc;
use std::time::Instant;

use macro_core::{MouseButton, INJECTION_SIGNATURE};

pub mod mock;

#[cfg(target_os = "windows")]
pub mod windows;

/// What a raw hook callback observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawInputKind {
    /// A key (or system key, e.g. with Alt held) was pressed.
    KeyDown {
        /// Windows Virtual Key code.
        vk_code: u32,
    },
    /// A key was released.
    KeyUp { vk_code: u32 },
    /// The cursor moved to an absolute screen position.
    MouseMove {
        /// Absolute X in virtual screen coordinates (multi-monitor aware).
        x: i32,
        /// Absolute Y in virtual screen coordinates.
        y: i32,
    },
    /// A pointer button was pressed.
    MouseButtonDown { button: MouseButton, x: i32, y: i32 },
    /// A pointer button was released.
    MouseButtonUp { button: MouseButton, x: i32, y: i32 },
    /// The vertical wheel turned.
    MouseWheel {
        /// Raw delta; positive = away from user, one notch = 120.
        delta: i16,
        x: i32,
        y: i32,
    },
}

/// A raw input event produced by the input capture infrastructure.
#[derive(Debug, Clone)]
pub struct RawInputEvent {
    pub kind: RawInputKind,
    /// The `dwExtraInfo` value carried by the hook struct.
    pub extra_info: usize,
    /// Monotonic time at which the hook callback ran.
    pub captured_at: Instant,
}

impl RawInputEvent {
    pub fn new(kind: RawInputKind, extra_info: usize, captured_at: Instant) -> Self {
        Self {
            kind,
            extra_info,
            captured_at,
        }
    }

    /// A hardware-originated event observed right now.
    pub fn now(kind: RawInputKind) -> Self {
        Self::new(kind, 0, Instant::now())
    }

    /// Returns `true` if this event was synthesized by our own player.
    pub fn is_injected(&self) -> bool {
        INJECTION_SIGNATURE.matches(self.extra_info)
    }
}

/// Which low-level hooks a source installs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookSet {
    pub keyboard: bool,
    pub mouse: bool,
}

impl HookSet {
    /// Keyboard only: what the hotkey dispatcher needs.
    pub const KEYBOARD: HookSet = HookSet {
        keyboard: true,
        mouse: false,
    };
    /// Keyboard and pointer: what a recording needs.
    pub const KEYBOARD_AND_MOUSE: HookSet = HookSet {
        keyboard: true,
        mouse: true,
    };
}

/// Error type for input capture operations.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("could not obtain a module handle for hook installation")]
    NoModuleHandle,
    #[error("failed to install keyboard hook: {0}")]
    KeyboardHookInstallFailed(String),
    #[error("failed to install mouse hook: {0}")]
    MouseHookInstallFailed(String),
    #[error("input source is already running")]
    AlreadyRunning,
    #[error("failed to spawn hook thread: {0}")]
    Thread(String),
    #[error("platform not supported: {0}")]
    UnsupportedPlatform(String),
}

/// Trait abstracting input event production.
///
/// The production implementation uses Windows hooks; tests use
/// [`mock::MockInputSource`].
///
/// Contract: after [`InputSource::stop`] returns, every event the source
/// accepted has been sent and the sending half of the channel has been
/// dropped, so draining the receiver terminates.
pub trait InputSource: Send + Sync {
    /// Installs the hooks and returns a receiver for captured events.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError`] if the hooks cannot be installed; nothing is
    /// left installed in that case.
    fn start(&self) -> Result<mpsc::Receiver<RawInputEvent>, CaptureError>;

    /// Uninstalls the hooks and closes the channel.  Idempotent.
    fn stop(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hardware_event_is_not_injected() {
        let event = RawInputEvent::now(RawInputKind::KeyDown { vk_code: 0x41 });
        assert!(!event.is_injected());
    }

    #[test]
    fn test_event_with_signature_is_injected() {
        let event = RawInputEvent::new(
            RawInputKind::MouseMove { x: 1, y: 1 },
            INJECTION_SIGNATURE.value(),
            Instant::now(),
        );
        assert!(event.is_injected());
    }
}
