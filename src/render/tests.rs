use super::*;
use crate::geometry::Rect;
use crate::stats::compute_statistics;
use ndarray::Array2;

const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

fn ramp(rows: usize, cols: usize) -> Array2<u16> {
    Array2::from_shape_fn((rows, cols), |(r, c)| ((r * cols + c) * 64) as u16)
}

#[test]
fn test_fit_within_prefers_width() {
    assert_eq!(fit_within(1200, 400, 600, 400), (600, 200));
    // 1024x768 at width 600 would be 450 high
    assert_eq!(fit_within(1024, 768, 600, 400), (533, 400));
    // Small frames are scaled up
    assert_eq!(fit_within(30, 10, 600, 400), (600, 200));
    assert_eq!(fit_within(0, 10, 600, 400), (0, 0));
}

#[test]
fn test_stretch_uses_full_range() {
    let image = stretch_to_rgb(&ramp(2, 2));
    assert_eq!(image.get_pixel(0, 0)[0], 0);
    assert_eq!(image.get_pixel(1, 1)[0], 255);

    let flat = stretch_to_rgb(&Array2::from_elem((2, 2), 500u16));
    assert_eq!(flat.get_pixel(1, 0)[0], 0);
}

#[test]
fn test_web_image_is_scaled_png() {
    let png = web_image(&ramp(40, 80), 600, 400).unwrap();
    assert!(png.starts_with(PNG_SIGNATURE));

    let decoded = image::load_from_memory(&png).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (600, 300));
}

#[test]
fn test_roi_image_outlines_roi() {
    let png = roi_image(&ramp(20, 20), Rect::new(5, 5, 10, 10), 20, 20).unwrap();
    let decoded = image::load_from_memory(&png).unwrap().to_rgb8();

    assert_eq!(decoded.dimensions(), (20, 20));
    let corner = decoded.get_pixel(5, 5);
    assert!(corner[0] > 200 && corner[1] < 60, "corner is {:?}", corner);
}

#[test]
fn test_full_png_keeps_sixteen_bits() {
    let pixels = ramp(3, 4);
    let png = encode_full_png(&pixels).unwrap();

    let decoded = image::load_from_memory(&png).unwrap();
    let luma = decoded.as_luma16().unwrap();
    assert_eq!(luma.dimensions(), (4, 3));
    assert_eq!(luma.get_pixel(3, 2)[0], pixels[[2, 3]]);
}

#[test]
fn test_empty_image_is_render_error() {
    let result = web_image(&Array2::zeros((0, 0)), 600, 400);
    assert!(matches!(result, Err(crate::error::CcdError::Render { .. })));
}

#[test]
fn test_charts_render_at_fixed_size() {
    let stats = compute_statistics(ramp(8, 8).view());
    for png in [
        histogram_chart(&stats).unwrap(),
        profile_chart(&[1, 5, 3, 9, 2]).unwrap(),
        profile_chart(&[]).unwrap(),
    ] {
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (CHART_WIDTH, CHART_HEIGHT));
    }
}
