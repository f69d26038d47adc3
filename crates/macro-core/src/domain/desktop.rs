//! Virtual-desktop bounds and absolute input coordinate normalization.
//!
//! # Why normalize?
//!
//! Absolute pointer injection on Windows does not take pixels.  With
//! `MOUSEEVENTF_ABSOLUTE | MOUSEEVENTF_VIRTUALDESK` the `dx`/`dy` fields are
//! interpreted on a fixed `0..=65535` grid stretched over the *virtual
//! desktop*: the bounding rectangle of every connected monitor.  That
//! rectangle may start at negative coordinates (a monitor placed left of or
//! above the primary one), so the mapping must subtract the desktop origin
//! before scaling.
//!
//! ```text
//!   pixel x  ─┬─ (x - left) ─── × 65535 / (width - 1) ── round ── clamp ─▶ nx
//!   pixel y  ─┴─ (y - top)  ─── × 65535 / (height - 1) ─ round ── clamp ─▶ ny
//! ```
//!
//! Dividing by `width - 1` maps the last addressable pixel column exactly onto
//! 65535.

/// Upper bound of the normalized absolute coordinate space.
pub const ABSOLUTE_MAX: i32 = 65_535;

/// A screen rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DesktopRect {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl DesktopRect {
    pub const fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    fn is_degenerate(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// The coordinate frame used for absolute pointer injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualDesktop {
    bounds: DesktopRect,
}

impl VirtualDesktop {
    /// Wraps explicit bounds.
    pub const fn new(bounds: DesktopRect) -> Self {
        Self { bounds }
    }

    /// Builds the desktop from platform metrics.
    ///
    /// Some remote-session and headless configurations report an empty
    /// virtual screen; in that case the primary display, anchored at the
    /// origin, is used instead.
    pub fn from_metrics(virtual_screen: DesktopRect, primary_width: i32, primary_height: i32) -> Self {
        if virtual_screen.is_degenerate() {
            Self::new(DesktopRect::new(0, 0, primary_width, primary_height))
        } else {
            Self::new(virtual_screen)
        }
    }

    pub fn bounds(&self) -> DesktopRect {
        self.bounds
    }

    /// Precomputes the scale factors for this desktop.
    pub fn normalizer(&self) -> CoordinateNormalizer {
        CoordinateNormalizer::new(self.bounds)
    }
}

/// Maps pixel positions into the `0..=ABSOLUTE_MAX` injection space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateNormalizer {
    left: i32,
    top: i32,
    x_scale: f64,
    y_scale: f64,
}

impl CoordinateNormalizer {
    pub fn new(bounds: DesktopRect) -> Self {
        let width_range = (bounds.width - 1).max(1);
        let height_range = (bounds.height - 1).max(1);
        Self {
            left: bounds.left,
            top: bounds.top,
            x_scale: f64::from(ABSOLUTE_MAX) / f64::from(width_range),
            y_scale: f64::from(ABSOLUTE_MAX) / f64::from(height_range),
        }
    }

    /// Converts a pixel position to normalized absolute coordinates.
    ///
    /// Positions outside the desktop are clamped to its edges.
    pub fn normalize(&self, x: i32, y: i32) -> (i32, i32) {
        (
            scale(x, self.left, self.x_scale),
            scale(y, self.top, self.y_scale),
        )
    }
}

fn scale(value: i32, origin: i32, factor: f64) -> i32 {
    let scaled = ((f64::from(value) - f64::from(origin)) * factor).round();
    scaled.clamp(0.0, f64::from(ABSOLUTE_MAX)) as i32
}

// ── Tests ─────────────────────────────────────────────────────────────────────
