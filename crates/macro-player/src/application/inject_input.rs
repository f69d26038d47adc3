//! InjectInputUseCase: translates recorded events into synthetic input.
//!
//! Pointer events are replayed as absolute moves in the normalized virtual
//! desktop frame, followed by the button or wheel change they carry:
//!
//! | Recorded event  | Synthetic units                     |
//! |-----------------|-------------------------------------|
//! | `PointerMove`   | move                                |
//! | `PointerButton` | move, button down/up                |
//! | `PointerScroll` | move, wheel (`notches × 120`)       |
//! | `KeyChange`     | key down/up with the stored VK code |
//!
//! The OS call is made by an [`InputTransport`] implementation injected at
//! construction time.

use macro_core::{
    CoordinateNormalizer, Event, EventKind, MouseButton, INJECTION_SIGNATURE, WHEEL_DELTA,
};
use thiserror::Error;

/// Error type for input injection.
#[derive(Debug, Error)]
pub enum InjectionError {
    /// The OS accepted fewer units than were submitted.
    #[error("only {sent} of {expected} input units were injected")]
    Partial { sent: u32, expected: u32 },
    #[error("virtual key code out of range: {0}")]
    InvalidKeyCode(u32),
    #[error("platform error: {0}")]
    Platform(String),
}

/// One unit of synthetic input, independent of the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticKind {
    /// Absolute move; coordinates are in `0..=65535`.
    MoveAbsolute { nx: i32, ny: i32 },
    Button { button: MouseButton, pressed: bool },
    /// Wheel delta in raw units (120 per notch).
    Wheel { delta: i32 },
    Key { vk_code: u32, pressed: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticInput {
    pub kind: SyntheticKind,
    /// Value placed in `dwExtraInfo`.
    pub extra_info: usize,
}

impl SyntheticInput {
    fn stamped(kind: SyntheticKind) -> Self {
        Self {
            kind,
            extra_info: INJECTION_SIGNATURE.value(),
        }
    }
}

/// Delivers synthetic input to the OS.
///
/// Implementations must deliver the units of one call in order.
#[cfg_attr(test, mockall::automock)]
pub trait InputTransport: Send + Sync {
    /// Injects `inputs` in order.
    ///
    /// # Errors
    ///
    /// Returns [`InjectionError`] if some or all units could not be injected.
    fn send(&self, inputs: &[SyntheticInput]) -> Result<(), InjectionError>;
}

/// Builds the synthetic units for one recorded event.
pub fn synthesize(event: &Event, normalizer: &CoordinateNormalizer) -> Vec<SyntheticInput> {
    let move_to = |x: i32, y: i32| {
        let (nx, ny) = normalizer.normalize(x, y);
        SyntheticInput::stamped(SyntheticKind::MoveAbsolute { nx, ny })
    };

    match &event.kind {
        EventKind::PointerMove { x, y } => vec![move_to(*x, *y)],
        EventKind::PointerButton {
            x,
            y,
            button,
            pressed,
        } => vec![
            move_to(*x, *y),
            SyntheticInput::stamped(SyntheticKind::Button {
                button: *button,
                pressed: *pressed,
            }),
        ],
        EventKind::PointerScroll { x, y, notches, .. } => vec![
            move_to(*x, *y),
            SyntheticInput::stamped(SyntheticKind::Wheel {
                delta: notches.saturating_mul(WHEEL_DELTA),
            }),
        ],
        EventKind::KeyChange {
            vk_code, pressed, ..
        } => vec![SyntheticInput::stamped(SyntheticKind::Key {
            vk_code: *vk_code,
            pressed: *pressed,
        })],
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
