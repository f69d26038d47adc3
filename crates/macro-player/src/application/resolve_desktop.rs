//! ResolveDesktop: display geometry for absolute pointer injection.
//!
//! Absolute pointer injection on Windows addresses the whole virtual desktop
//! (every monitor's bounding rectangle) through a `0..=65535` grid.  To map a
//! recorded pixel position onto that grid the player needs the virtual
//! screen's origin and size, plus the primary display size as a fallback for
//! sessions that report an empty virtual screen.

use macro_core::{DesktopRect, VirtualDesktop};
use thiserror::Error;

/// Error type for desktop metric queries.
#[derive(Debug, Error)]
pub enum DesktopMetricsError {
    /// Neither the virtual screen nor the primary display has a usable size.
    #[error("no usable display geometry: virtual screen {virtual_screen:?}, primary {primary_width}x{primary_height}")]
    NoDisplay {
        virtual_screen: DesktopRect,
        primary_width: i32,
        primary_height: i32,
    },
}

/// Source of display geometry.
pub trait DesktopMetrics: Send + Sync {
    /// Bounding rectangle of all monitors, in pixels.
    fn virtual_screen(&self) -> DesktopRect;

    /// Width and height of the primary display, in pixels.
    fn primary_size(&self) -> (i32, i32);
}

/// Resolves the desktop used for absolute injection.
///
/// # Errors
///
/// Returns [`DesktopMetricsError::NoDisplay`] when both the virtual screen
/// and the primary display report a non-positive size.
pub fn virtual_desktop(metrics: &dyn DesktopMetrics) -> Result<VirtualDesktop, DesktopMetricsError> {
    let virtual_screen = metrics.virtual_screen();
    let (primary_width, primary_height) = metrics.primary_size();
    let desktop = VirtualDesktop::from_metrics(virtual_screen, primary_width, primary_height);

    let bounds = desktop.bounds();
    if bounds.width <= 0 || bounds.height <= 0 {
        return Err(DesktopMetricsError::NoDisplay {
            virtual_screen,
            primary_width,
            primary_height,
        });
    }
    Ok(desktop)
}
