use super::*;
use crate::geometry::Rect;
use chrono::{TimeZone, Utc};
use ndarray::Array2;

fn ramp(rows: usize, cols: usize) -> Array2<u16> {
    Array2::from_shape_fn((rows, cols), |(r, c)| (r * cols + c) as u16)
}

#[test]
fn test_product_computes_whole_and_roi_stats() {
    let captured_at = Utc.with_ymd_and_hms(2024, 3, 1, 21, 15, 7).unwrap();
    let product = ImageProduct::new(
        1,
        ramp(4, 3),
        captured_at,
        Rect::new(0, 0, 3, 4),
        Rect::new(1, 1, 2, 2),
    );

    assert_eq!(product.width, 3);
    assert_eq!(product.height, 4);
    assert_eq!(product.whole_image_stats.max, 11);
    assert!((product.whole_image_stats.mean - 5.5).abs() < 1e-12);
    // ROI covers 4, 5, 7, 8
    assert_eq!(product.roi_stats.min, 4);
    assert_eq!(product.roi_stats.max, 8);
    assert!((product.roi_stats.mean - 6.0).abs() < 1e-12);
    assert_eq!(product.captured_at_epoch(), captured_at.timestamp() as f64);
}

#[test]
fn test_roi_revalidated_against_smaller_image() {
    let product = ImageProduct::new(
        1,
        ramp(2, 2),
        Utc::now(),
        Rect::new(0, 0, 10, 10),
        Rect::new(1, 0, 10, 10),
    );

    assert_eq!(product.roi, Rect::new(1, 0, 1, 2));
    assert_eq!(product.roi_stats.count, 2);
}

#[test]
fn test_with_roi_keeps_pixels_and_recomputes_roi_stats() {
    let original = ImageProduct::new(
        7,
        ramp(4, 3),
        Utc::now(),
        Rect::new(0, 0, 3, 4),
        Rect::new(0, 0, 3, 4),
    );
    let narrowed = original.with_roi(Rect::new(0, 3, 3, 1));

    assert_eq!(narrowed.sequence, 7);
    assert_eq!(narrowed.captured_at, original.captured_at);
    assert_eq!(narrowed.whole_image_stats, original.whole_image_stats);
    assert_eq!(narrowed.roi_stats.min, 9);
    assert_eq!(narrowed.roi_stats.max, 11);
}
