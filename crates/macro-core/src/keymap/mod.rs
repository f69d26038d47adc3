//! Virtual-key code naming.
//!
//! Two naming schemes are used:
//!
//! - **Display names** (`"space"`, `"a"`, `"f5"`) are stored alongside every
//!   recorded `KeyChange` so a saved macro is readable by humans.
//! - **Hotkey names** (`"F9"`, `"A"`, `"7"`) are what users type into the
//!   configuration and what the hotkey dispatcher matches against.
//!
//! Both are derived from Windows virtual-key codes; see [`windows_vk`].

pub mod windows_vk;

pub use windows_vk::{display_name, hotkey_name};

/// Normalizes a user-supplied hotkey name: trimmed and upper-cased.
///
/// Returns `None` for an empty or all-whitespace name.
pub fn normalize_hotkey_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_trims_and_uppercases() {
        assert_eq!(normalize_hotkey_name("  f9 "), Some("F9".to_string()));
    }

    #[test]
    fn test_normalize_rejects_blank_names() {
        assert_eq!(normalize_hotkey_name(""), None);
        assert_eq!(normalize_hotkey_name(" \t "), None);
    }

    #[test]
    fn test_normalized_name_matches_hook_name() {
        // What the user configures must equal what the hook produces.
        let configured = normalize_hotkey_name("f10").unwrap();
        assert_eq!(configured, hotkey_name(0x79));
    }
}
