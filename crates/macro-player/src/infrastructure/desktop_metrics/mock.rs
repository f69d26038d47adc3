//! Fixed display geometry for tests.

use macro_core::DesktopRect;

use crate::application::resolve_desktop::DesktopMetrics;

/// Reports the geometry it was constructed with.
#[derive(Debug, Clone, Copy)]
pub struct FixedDesktopMetrics {
    pub virtual_screen: DesktopRect,
    pub primary: (i32, i32),
}

impl FixedDesktopMetrics {
    pub fn new(virtual_screen: DesktopRect, primary: (i32, i32)) -> Self {
        Self {
            virtual_screen,
            primary,
        }
    }

    /// A single 1920×1080 monitor at the origin.
    pub fn single_1080p() -> Self {
        Self::new(DesktopRect::new(0, 0, 1920, 1080), (1920, 1080))
    }
}

impl DesktopMetrics for FixedDesktopMetrics {
    fn virtual_screen(&self) -> DesktopRect {
        self.virtual_screen
    }

    fn primary_size(&self) -> (i32, i32) {
        self.primary
    }
}
