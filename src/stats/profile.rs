use crate::geometry::{ProfileWindow, Rect};
use ndarray::{s, Array2, ArrayView2};

// Profiles are raw slices, not averages: a window wider than one line
// yields several rows (or columns) rather than their mean.

/// View of the ROI. `roi` must already be validated against `image`.
pub fn roi_view<'a>(image: &'a Array2<u16>, roi: Rect) -> ArrayView2<'a, u16> {
    image.slice(s![
        roi.origin_y as usize..roi.end_y() as usize,
        roi.origin_x as usize..roi.end_x() as usize
    ])
}

/// Full-width rows `rows.min..rows.max`
pub fn extract_x_profile(image: &Array2<u16>, rows: ProfileWindow) -> Array2<u16> {
    let (r0, r1) = clamp_window(rows, image.nrows());
    image.slice(s![r0..r1, ..]).to_owned()
}

/// Full-height columns `cols.min..cols.max`
pub fn extract_y_profile(image: &Array2<u16>, cols: ProfileWindow) -> Array2<u16> {
    let (c0, c1) = clamp_window(cols, image.ncols());
    image.slice(s![.., c0..c1]).to_owned()
}

/// Rows of the X profile restricted to the ROI's columns
pub fn extract_roi_x_profile(image: &Array2<u16>, roi: Rect, rows: ProfileWindow) -> Array2<u16> {
    let (r0, r1) = clamp_window(rows, image.nrows());
    let (c0, c1) = clamp_span(roi.origin_x, roi.end_x(), image.ncols());
    image.slice(s![r0..r1, c0..c1]).to_owned()
}

/// Columns of the Y profile restricted to the ROI's rows
pub fn extract_roi_y_profile(image: &Array2<u16>, roi: Rect, cols: ProfileWindow) -> Array2<u16> {
    let (c0, c1) = clamp_window(cols, image.ncols());
    let (r0, r1) = clamp_span(roi.origin_y, roi.end_y(), image.nrows());
    image.slice(s![r0..r1, c0..c1]).to_owned()
}

fn clamp_window(window: ProfileWindow, len: usize) -> (usize, usize) {
    clamp_span(window.min, window.max, len)
}

fn clamp_span(start: u32, end: u32, len: usize) -> (usize, usize) {
    let end = (end as usize).min(len);
    let start = (start as usize).min(end);
    (start, end)
}
