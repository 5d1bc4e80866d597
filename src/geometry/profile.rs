use super::rect::{Axis, Rect};
use serde::Serialize;
use tracing::warn;

/// Half-open range `[min, max)` of rows or columns used to take a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProfileWindow {
    pub min: u32,
    pub max: u32,
}

impl ProfileWindow {
    pub fn width(&self) -> u32 {
        self.max.saturating_sub(self.min)
    }

    pub fn is_empty(&self) -> bool {
        self.max <= self.min
    }
}

/// Both profile windows for an ROI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProfileWindows {
    /// Columns `[min, max)` along X; the Y profile is taken over these
    pub x: ProfileWindow,
    /// Rows `[min, max)` along Y; the X profile is taken over these
    pub y: ProfileWindow,
}

impl ProfileWindows {
    /// `x_width` is the window width along X, `y_width` along Y
    pub fn for_roi(roi: Rect, x_width: u32, y_width: u32) -> Self {
        Self {
            x: derive_profile_window(roi, Axis::X, x_width),
            y: derive_profile_window(roi, Axis::Y, y_width),
        }
    }
}

/// Window of `requested_width` lines centred on the ROI midpoint along `axis`.
///
/// The width is clamped to the ROI extent on that axis. The midpoint is
/// `origin + size / 2` evaluated in floating point, and both edges are
/// truncated towards zero, so `(0, 3)` with width 1 gives `[1, 2)`.
pub fn derive_profile_window(roi: Rect, axis: Axis, requested_width: u32) -> ProfileWindow {
    let (origin, size) = match axis {
        Axis::X => (roi.origin_x, roi.size_x),
        Axis::Y => (roi.origin_y, roi.size_y),
    };

    let width = if requested_width > size {
        warn!(
            "Truncating {:?} profile width {} to ROI size {}",
            axis, requested_width, size
        );
        size
    } else {
        requested_width
    };

    let mid = (2.0 * origin as f64 + size as f64) / 2.0;
    let half = width as f64 / 2.0;

    ProfileWindow {
        min: truncate(mid - half),
        max: truncate(mid + half),
    }
}

fn truncate(value: f64) -> u32 {
    // `as` truncates towards zero and saturates at the integer bounds
    (value as i64).max(0) as u32
}
