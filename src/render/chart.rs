use super::encode_png;
use crate::error::Result;
use crate::stats::{Statistics, HISTOGRAM_BINS};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect as DrawRect;

pub const CHART_WIDTH: u32 = 600;
pub const CHART_HEIGHT: u32 = 400;

const MARGIN: u32 = 20;
const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([0, 0, 0]);
const BAR: Rgb<u8> = Rgb([31, 119, 180]);
const LINE: Rgb<u8> = Rgb([214, 39, 40]);

/// Blank chart with axes. Returns the image and the plot area
/// `(left, top, width, height)`.
fn canvas() -> (RgbImage, (f32, f32, f32, f32)) {
    let mut image = RgbImage::from_pixel(CHART_WIDTH, CHART_HEIGHT, BACKGROUND);
    let left = MARGIN as f32;
    let top = MARGIN as f32;
    let right = (CHART_WIDTH - MARGIN) as f32;
    let bottom = (CHART_HEIGHT - MARGIN) as f32;

    draw_line_segment_mut(&mut image, (left, bottom), (right, bottom), AXIS);
    draw_line_segment_mut(&mut image, (left, top), (left, bottom), AXIS);

    (image, (left, top, right - left, bottom - top))
}

/// Bar chart of the 256 histogram bins
pub fn histogram_chart(stats: &Statistics) -> Result<Vec<u8>> {
    let (mut image, (left, top, width, height)) = canvas();
    let peak = stats.histogram.iter().copied().max().unwrap_or(0);

    if peak > 0 {
        let bar_width = width / HISTOGRAM_BINS as f32;
        for (bin, &count) in stats.histogram.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let bar_height = ((count as f32 / peak as f32) * height).max(1.0);
            let x = left + bin as f32 * bar_width;
            let y = top + height - bar_height;
            let bar = DrawRect::at(x as i32, y as i32)
                .of_size(bar_width.ceil().max(1.0) as u32, bar_height as u32);
            draw_filled_rect_mut(&mut image, bar, BAR);
        }
    }

    encode_png(DynamicImage::ImageRgb8(image))
}

/// Line chart of intensity against position
pub fn profile_chart(values: &[u16]) -> Result<Vec<u8>> {
    let (mut image, (left, top, width, height)) = canvas();

    if values.len() > 1 {
        let min = values.iter().copied().min().unwrap_or(0) as f32;
        let max = values.iter().copied().max().unwrap_or(0) as f32;
        let range = (max - min).max(1.0);
        let step = width / (values.len() - 1) as f32;

        let point = |i: usize, v: u16| {
            (
                left + i as f32 * step,
                top + height - (v as f32 - min) / range * height,
            )
        };

        for (i, pair) in values.windows(2).enumerate() {
            draw_line_segment_mut(&mut image, point(i, pair[0]), point(i + 1, pair[1]), LINE);
        }
    }

    encode_png(DynamicImage::ImageRgb8(image))
}
