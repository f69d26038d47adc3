//! Windows display geometry via `GetSystemMetrics`.

#![cfg(target_os = "windows")]

use macro_core::DesktopRect;
use windows::Win32::UI::WindowsAndMessaging::{
    GetSystemMetrics, SM_CXSCREEN, SM_CXVIRTUALSCREEN, SM_CYSCREEN, SM_CYVIRTUALSCREEN,
    SM_XVIRTUALSCREEN, SM_YVIRTUALSCREEN,
};

use crate::application::resolve_desktop::DesktopMetrics;

/// Queries the live system metrics on every call, so monitor changes between
/// playbacks are picked up.
#[derive(Debug, Default)]
pub struct WindowsDesktopMetrics;

impl WindowsDesktopMetrics {
    pub fn new() -> Self {
        Self
    }
}

impl DesktopMetrics for WindowsDesktopMetrics {
    fn virtual_screen(&self) -> DesktopRect {
        // SAFETY: GetSystemMetrics has no preconditions.
        unsafe {
            DesktopRect::new(
                GetSystemMetrics(SM_XVIRTUALSCREEN),
                GetSystemMetrics(SM_YVIRTUALSCREEN),
                GetSystemMetrics(SM_CXVIRTUALSCREEN),
                GetSystemMetrics(SM_CYVIRTUALSCREEN),
            )
        }
    }

    fn primary_size(&self) -> (i32, i32) {
        // SAFETY: GetSystemMetrics has no preconditions.
        unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) }
    }
}
