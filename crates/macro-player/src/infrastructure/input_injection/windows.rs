//! Windows input injection.
//!
//! Two transports with identical effects:
//!
//! - [`SendInputTransport`] submits every unit of an event in one
//!   `SendInput` call, so nothing can interleave between the move and the
//!   button change that follows it.
//! - [`LegacyEventTransport`] uses `mouse_event` / `keybd_event`, one call
//!   per unit.  Some older remote-desktop stacks only honour these.
//!
//! Absolute moves use `MOUSEEVENTF_VIRTUALDESK` so the normalized grid spans
//! every monitor rather than just the primary one.

#![cfg(target_os = "windows")]

use macro_core::MouseButton;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    keybd_event, mouse_event, SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE,
    KEYBDINPUT, KEYBD_EVENT_FLAGS, KEYEVENTF_EXTENDEDKEY, KEYEVENTF_KEYUP, MOUSEEVENTF_ABSOLUTE,
    MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP, MOUSEEVENTF_MIDDLEDOWN, MOUSEEVENTF_MIDDLEUP,
    MOUSEEVENTF_MOVE, MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP, MOUSEEVENTF_VIRTUALDESK,
    MOUSEEVENTF_WHEEL, MOUSEINPUT, MOUSE_EVENT_FLAGS, VIRTUAL_KEY,
};

use crate::application::inject_input::{
    InjectionError, InputTransport, SyntheticInput, SyntheticKind,
};

/// Navigation and right-hand modifier keys live on the extended scan-code
/// page and need `KEYEVENTF_EXTENDEDKEY`.
const EXTENDED_VKS: &[u32] = &[
    0x21, 0x22, 0x23, 0x24, 0x25, 0x26, 0x27, 0x28, // nav
    0x2D, 0x2E, // Insert, Delete
    0x5B, 0x5C, // Win keys
    0xA3, 0xA5, // Right Ctrl, Right Alt
];

/// Batched transport built on `SendInput`.
#[derive(Debug, Default)]
pub struct SendInputTransport;

impl SendInputTransport {
    pub fn new() -> Self {
        Self
    }
}

impl InputTransport for SendInputTransport {
    fn send(&self, inputs: &[SyntheticInput]) -> Result<(), InjectionError> {
        let batch = inputs
            .iter()
            .map(to_input)
            .collect::<Result<Vec<INPUT>, InjectionError>>()?;
        if batch.is_empty() {
            return Ok(());
        }

        // SAFETY: every element is a fully initialised INPUT structure.
        let sent = unsafe { SendInput(&batch, std::mem::size_of::<INPUT>() as i32) };
        let expected = batch.len() as u32;
        if sent != expected {
            return Err(InjectionError::Partial { sent, expected });
        }
        Ok(())
    }
}

/// Per-unit transport built on `mouse_event` / `keybd_event`.
#[derive(Debug, Default)]
pub struct LegacyEventTransport;

impl LegacyEventTransport {
    pub fn new() -> Self {
        Self
    }
}

impl InputTransport for LegacyEventTransport {
    fn send(&self, inputs: &[SyntheticInput]) -> Result<(), InjectionError> {
        for input in inputs {
            let extra = input.extra_info;
            match input.kind {
                SyntheticKind::MoveAbsolute { nx, ny } => {
                    // SAFETY: plain value arguments.
                    unsafe { mouse_event(absolute_move_flags(), nx, ny, 0, extra) };
                }
                SyntheticKind::Button { button, pressed } => {
                    // SAFETY: plain value arguments.
                    unsafe { mouse_event(button_flags(button, pressed), 0, 0, 0, extra) };
                }
                SyntheticKind::Wheel { delta } => {
                    // SAFETY: plain value arguments.
                    unsafe { mouse_event(MOUSEEVENTF_WHEEL, 0, 0, delta, extra) };
                }
                SyntheticKind::Key { vk_code, pressed } => {
                    let vk = u8::try_from(vk_code)
                        .map_err(|_| InjectionError::InvalidKeyCode(vk_code))?;
                    // SAFETY: plain value arguments.
                    unsafe { keybd_event(vk, 0, key_flags(vk_code, pressed), extra) };
                }
            }
        }
        Ok(())
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn to_input(input: &SyntheticInput) -> Result<INPUT, InjectionError> {
    let extra = input.extra_info;
    let unit = match input.kind {
        SyntheticKind::MoveAbsolute { nx, ny } => mouse_input(nx, ny, 0, absolute_move_flags(), extra),
        SyntheticKind::Button { button, pressed } => {
            mouse_input(0, 0, 0, button_flags(button, pressed), extra)
        }
        SyntheticKind::Wheel { delta } => mouse_input(0, 0, delta, MOUSEEVENTF_WHEEL, extra),
        SyntheticKind::Key { vk_code, pressed } => {
            let vk = u16::try_from(vk_code)
                .ok()
                .filter(|vk| *vk <= 0xFF)
                .ok_or(InjectionError::InvalidKeyCode(vk_code))?;
            INPUT {
                r#type: INPUT_KEYBOARD,
                Anonymous: INPUT_0 {
                    ki: KEYBDINPUT {
                        wVk: VIRTUAL_KEY(vk),
                        wScan: 0,
                        dwFlags: key_flags(vk_code, pressed),
                        time: 0,
                        dwExtraInfo: extra,
                    },
                },
            }
        }
    };
    Ok(unit)
}

fn mouse_input(dx: i32, dy: i32, data: i32, flags: MOUSE_EVENT_FLAGS, extra: usize) -> INPUT {
    INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT {
                dx,
                dy,
                mouseData: data,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: extra,
            },
        },
    }
}

fn absolute_move_flags() -> MOUSE_EVENT_FLAGS {
    MOUSEEVENTF_MOVE | MOUSEEVENTF_ABSOLUTE | MOUSEEVENTF_VIRTUALDESK
}

fn button_flags(button: MouseButton, pressed: bool) -> MOUSE_EVENT_FLAGS {
    match (button, pressed) {
        (MouseButton::Left, true) => MOUSEEVENTF_LEFTDOWN,
        (MouseButton::Left, false) => MOUSEEVENTF_LEFTUP,
        (MouseButton::Right, true) => MOUSEEVENTF_RIGHTDOWN,
        (MouseButton::Right, false) => MOUSEEVENTF_RIGHTUP,
        (MouseButton::Middle, true) => MOUSEEVENTF_MIDDLEDOWN,
        (MouseButton::Middle, false) => MOUSEEVENTF_MIDDLEUP,
    }
}

fn key_flags(vk_code: u32, pressed: bool) -> KEYBD_EVENT_FLAGS {
    let mut flags = KEYBD_EVENT_FLAGS(0);
    if !pressed {
        flags |= KEYEVENTF_KEYUP;
    }
    if EXTENDED_VKS.contains(&vk_code) {
        flags |= KEYEVENTF_EXTENDEDKEY;
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_up_sets_keyup_flag() {
        assert_eq!(key_flags(0x41, false), KEYEVENTF_KEYUP);
        assert_eq!(key_flags(0x41, true), KEYBD_EVENT_FLAGS(0));
    }

    #[test]
    fn test_arrow_keys_are_extended() {
        assert_eq!(key_flags(0x25, true), KEYEVENTF_EXTENDEDKEY);
    }

    #[test]
    fn test_out_of_range_vk_is_rejected() {
        let input = SyntheticInput {
            kind: SyntheticKind::Key { vk_code: 0x1_00, pressed: true },
            extra_info: 0,
        };
        assert!(matches!(to_input(&input), Err(InjectionError::InvalidKeyCode(0x100))));
    }
}
