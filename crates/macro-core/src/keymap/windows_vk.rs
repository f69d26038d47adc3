//! Windows Virtual Key (VK) code → name tables.
//!
//! Reference: Windows Virtual-Key Codes (winuser.h).
//!
//! VK codes are layout-independent: pressing the key labelled A on any
//! keyboard layout produces `VK_A = 0x41`.  The names below therefore
//! describe logical keys, not physical positions.

const VK_BACK: u32 = 0x08;
const VK_TAB: u32 = 0x09;
const VK_RETURN: u32 = 0x0D;
const VK_SHIFT: u32 = 0x10;
const VK_CONTROL: u32 = 0x11;
const VK_MENU: u32 = 0x12;
const VK_ESCAPE: u32 = 0x1B;
const VK_SPACE: u32 = 0x20;
const VK_LEFT: u32 = 0x25;
const VK_UP: u32 = 0x26;
const VK_RIGHT: u32 = 0x27;
const VK_DOWN: u32 = 0x28;
const VK_DELETE: u32 = 0x2E;
const VK_0: u32 = 0x30;
const VK_9: u32 = 0x39;
const VK_A: u32 = 0x41;
const VK_Z: u32 = 0x5A;
const VK_F1: u32 = 0x70;
const VK_F12: u32 = 0x7B;

/// Returns the lower-case display name stored with recorded key events.
///
/// Codes without a dedicated name render as their decimal value, e.g.
/// `VK_LSHIFT` (0xA0) → `"160"`.
pub fn display_name(vk: u32) -> String {
    match vk {
        VK_SPACE => "space".to_string(),
        VK_RETURN => "enter".to_string(),
        VK_TAB => "tab".to_string(),
        VK_BACK => "backspace".to_string(),
        VK_ESCAPE => "esc".to_string(),
        VK_DELETE => "delete".to_string(),
        VK_SHIFT => "shift".to_string(),
        VK_CONTROL => "ctrl".to_string(),
        VK_MENU => "alt".to_string(),
        VK_LEFT => "left".to_string(),
        VK_UP => "up".to_string(),
        VK_RIGHT => "right".to_string(),
        VK_DOWN => "down".to_string(),
        VK_F1..=VK_F12 => format!("f{}", vk - VK_F1 + 1),
        VK_A..=VK_Z => char_of(vk).to_ascii_lowercase().to_string(),
        VK_0..=VK_9 => char_of(vk).to_string(),
        _ => vk.to_string(),
    }
}

/// Returns the upper-case name the hotkey dispatcher matches on.
///
/// Only function keys, letters and digits have symbolic names; every other
/// code is its decimal value, so a user can still bind e.g. `"19"` (Pause).
pub fn hotkey_name(vk: u32) -> String {
    match vk {
        VK_F1..=VK_F12 => format!("F{}", vk - VK_F1 + 1),
        VK_A..=VK_Z | VK_0..=VK_9 => char_of(vk).to_string(),
        _ => vk.to_string(),
    }
}

fn char_of(vk: u32) -> char {
    // Callers only pass codes in the ASCII letter/digit ranges.
    char::from_u32(vk).unwrap_or('?')
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_for_named_keys() {
        assert_eq!(display_name(0x20), "space");
        assert_eq!(display_name(0x0D), "enter");
        assert_eq!(display_name(0x1B), "esc");
        assert_eq!(display_name(0x12), "alt");
        assert_eq!(display_name(0x28), "down");
    }

    #[test]
    fn test_display_name_letters_are_lower_case() {
        assert_eq!(display_name(0x41), "a");
        assert_eq!(display_name(0x5A), "z");
    }

    #[test]
    fn test_display_name_function_keys() {
        assert_eq!(display_name(0x70), "f1");
        assert_eq!(display_name(0x7B), "f12");
    }

    #[test]
    fn test_display_name_falls_back_to_decimal() {
        assert_eq!(display_name(0xA0), "160");
        // F13 is outside the named range.
        assert_eq!(display_name(0x7C), "124");
    }

    #[test]
    fn test_hotkey_name_is_upper_case() {
        assert_eq!(hotkey_name(0x78), "F9");
        assert_eq!(hotkey_name(0x51), "Q");
        assert_eq!(hotkey_name(0x35), "5");
    }

    #[test]
    fn test_hotkey_name_for_unnamed_key_is_decimal() {
        assert_eq!(hotkey_name(0x20), "32");
        assert_eq!(hotkey_name(0x13), "19");
    }
}
