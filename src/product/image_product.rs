use crate::geometry::{validate_rect, Rect, Size};
use crate::stats::{compute_statistics, roi_view, Statistics};
use chrono::{DateTime, Utc};
use ndarray::Array2;

/// One completed exposure with its derived statistics.
///
/// Built once per exposure and never mutated; sessions share it behind an
/// `Arc` and replace it wholesale when the next exposure lands.
#[derive(Debug, Clone)]
pub struct ImageProduct {
    /// Frame counter assigned by the session
    pub sequence: u64,
    /// Pixels indexed `[row, column]`
    pub pixels: Array2<u16>,
    pub width: u32,
    pub height: u32,
    pub captured_at: DateTime<Utc>,
    /// Sub-frame the image was read out from, in sensor coordinates
    pub sub_frame: Rect,
    /// ROI the statistics were computed over, relative to the image
    pub roi: Rect,
    pub whole_image_stats: Statistics,
    pub roi_stats: Statistics,
}

impl ImageProduct {
    /// Build a product and compute its statistics.
    ///
    /// `roi` is re-validated against the decoded image because a device may
    /// deliver a frame smaller than the requested sub-frame.
    pub fn new(
        sequence: u64,
        pixels: Array2<u16>,
        captured_at: DateTime<Utc>,
        sub_frame: Rect,
        roi: Rect,
    ) -> Self {
        let (rows, cols) = pixels.dim();
        let size = Size::new(cols as u32, rows as u32);
        let roi = validate_rect(roi.into(), size).rect;

        let whole_image_stats = compute_statistics(pixels.view());
        let roi_stats = compute_statistics(roi_view(&pixels, roi));

        Self {
            sequence,
            width: size.width,
            height: size.height,
            pixels,
            captured_at,
            sub_frame,
            roi,
            whole_image_stats,
            roi_stats,
        }
    }

    /// Copy of this image analysed over a different ROI
    pub fn with_roi(&self, roi: Rect) -> Self {
        Self::new(
            self.sequence,
            self.pixels.clone(),
            self.captured_at,
            self.sub_frame,
            roi,
        )
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Capture time as fractional seconds since the Unix epoch
    pub fn captured_at_epoch(&self) -> f64 {
        self.captured_at.timestamp_millis() as f64 / 1000.0
    }
}
