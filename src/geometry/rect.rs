use crate::error::{CcdError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Width and height of a bounding region in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A validated rectangle. Origin is relative to the parent it was validated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rect {
    pub origin_x: u32,
    pub origin_y: u32,
    pub size_x: u32,
    pub size_y: u32,
}

impl Rect {
    pub fn new(origin_x: u32, origin_y: u32, size_x: u32, size_y: u32) -> Self {
        Self {
            origin_x,
            origin_y,
            size_x,
            size_y,
        }
    }

    /// Rectangle covering the whole of `size`
    pub fn full(size: Size) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    pub fn size(&self) -> Size {
        Size::new(self.size_x, self.size_y)
    }

    pub fn end_x(&self) -> u32 {
        self.origin_x + self.size_x
    }

    pub fn end_y(&self) -> u32 {
        self.origin_y + self.size_y
    }

    pub fn is_empty(&self) -> bool {
        self.size_x == 0 || self.size_y == 0
    }

    pub fn fits_within(&self, bound: Size) -> bool {
        self.end_x() <= bound.width && self.end_y() <= bound.height
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{}:{},{}",
            self.origin_x, self.origin_y, self.size_x, self.size_y
        )
    }
}

/// An unvalidated rectangle as supplied by a caller; fields may be negative
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateRect {
    pub origin_x: i64,
    pub origin_y: i64,
    pub size_x: i64,
    pub size_y: i64,
}

impl CandidateRect {
    pub fn new(origin_x: i64, origin_y: i64, size_x: i64, size_y: i64) -> Self {
        Self {
            origin_x,
            origin_y,
            size_x,
            size_y,
        }
    }

    /// Parse the `"x,y:w,h"` grammar used by the command surface
    pub fn parse(command: &str, value: &str) -> Result<Self> {
        let invalid = |reason: &str| CcdError::invalid_parameter(command, value, reason);

        let (origin, size) = value
            .split_once(':')
            .ok_or_else(|| invalid("expected x,y:w,h"))?;
        let (x, y) = parse_pair(origin).ok_or_else(|| invalid("origin must be two integers"))?;
        let (w, h) = parse_pair(size).ok_or_else(|| invalid("size must be two integers"))?;

        Ok(Self::new(x, y, w, h))
    }
}

impl From<Rect> for CandidateRect {
    fn from(rect: Rect) -> Self {
        Self::new(
            rect.origin_x as i64,
            rect.origin_y as i64,
            rect.size_x as i64,
            rect.size_y as i64,
        )
    }
}

/// Parse `"a,b"` into two integers. Fractional values are truncated.
pub(crate) fn parse_pair(text: &str) -> Option<(i64, i64)> {
    let (a, b) = text.split_once(',')?;
    Some((parse_coordinate(a)?, parse_coordinate(b)?))
}

fn parse_coordinate(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(v) = text.parse::<i64>() {
        return Some(v);
    }
    let v = text.parse::<f64>().ok()?;
    v.is_finite().then(|| v.trunc() as i64)
}

/// Which axis a warning applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// A non-fatal adjustment made while validating a rectangle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeometryWarning {
    /// Origin outside `[0, bound)`; replaced with zero
    OriginOutOfRange { axis: Axis, requested: i64 },
    /// Size overran the bound (or was negative); shrunk to `clipped`
    SizeClipped {
        axis: Axis,
        requested: i64,
        clipped: u32,
    },
}

impl fmt::Display for GeometryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryWarning::OriginOutOfRange { axis, requested } => {
                write!(f, "{:?} origin {} out of range - using zero", axis, requested)
            }
            GeometryWarning::SizeClipped {
                axis,
                requested,
                clipped,
            } => write!(
                f,
                "{:?} size {} out of range - using {}",
                axis, requested, clipped
            ),
        }
    }
}

/// Result of validating a candidate against a bound
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validated {
    pub rect: Rect,
    pub warnings: Vec<GeometryWarning>,
}

impl Validated {
    pub fn was_clipped(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Clamp a candidate rectangle into `bound`.
///
/// Each axis is handled independently: an origin outside `[0, bound)` becomes
/// zero, then the size is shrunk so that `origin + size <= bound`. The origin is
/// never moved to make room for the size. Adjustments are reported as warnings.
pub fn validate_rect(candidate: CandidateRect, bound: Size) -> Validated {
    let mut warnings = Vec::new();

    let (origin_x, size_x) = clamp_axis(
        Axis::X,
        candidate.origin_x,
        candidate.size_x,
        bound.width,
        &mut warnings,
    );
    let (origin_y, size_y) = clamp_axis(
        Axis::Y,
        candidate.origin_y,
        candidate.size_y,
        bound.height,
        &mut warnings,
    );

    for warning in &warnings {
        warn!("Geometry clipped to {}x{}: {}", bound.width, bound.height, warning);
    }

    Validated {
        rect: Rect::new(origin_x, origin_y, size_x, size_y),
        warnings,
    }
}

fn clamp_axis(
    axis: Axis,
    origin: i64,
    size: i64,
    bound: u32,
    warnings: &mut Vec<GeometryWarning>,
) -> (u32, u32) {
    let bound = bound as i64;

    let origin = if origin == 0 || (origin > 0 && origin < bound) {
        origin
    } else {
        warnings.push(GeometryWarning::OriginOutOfRange {
            axis,
            requested: origin,
        });
        0
    };

    let available = bound - origin;
    let clipped = size.clamp(0, available);
    if clipped != size {
        warnings.push(GeometryWarning::SizeClipped {
            axis,
            requested: size,
            clipped: clipped as u32,
        });
    }

    (origin as u32, clipped as u32)
}
