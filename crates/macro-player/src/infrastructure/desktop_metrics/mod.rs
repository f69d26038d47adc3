//! Platform display geometry.
//!
//! | Module    | OS      | API used           |
//! |-----------|---------|--------------------|
//! | `windows` | Windows | `GetSystemMetrics` |
//!
//! [`mock::FixedDesktopMetrics`] is always compiled so tests on any platform
//! can use it without a physical display.

pub mod mock;

#[cfg(target_os = "windows")]
pub mod windows;
