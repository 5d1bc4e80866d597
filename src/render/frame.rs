use super::encode_png;
use crate::error::{CcdError, Result};
use crate::geometry::Rect;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageBuffer, Luma, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect as DrawRect;
use ndarray::Array2;
use tracing::trace;

const ROI_COLOUR: Rgb<u8> = Rgb([255, 0, 0]);
const ROI_LINE_WIDTH: i32 = 3;

/// Largest size with the same aspect ratio that fits `max_width x max_height`.
///
/// Scales to the full width first and only falls back to the height limit
/// when the result is too tall.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (0, 0);
    }

    let mut scale = max_width as f64 / width as f64;
    if (height as f64 * scale).round() > max_height as f64 {
        scale = max_height as f64 / height as f64;
    }

    (
        ((width as f64 * scale).round() as u32).max(1),
        ((height as f64 * scale).round() as u32).max(1),
    )
}

/// Linear min..max stretch of 16-bit samples into an 8-bit grey RGB image
pub fn stretch_to_rgb(pixels: &Array2<u16>) -> RgbImage {
    let (rows, cols) = pixels.dim();
    let min = pixels.iter().copied().min().unwrap_or(0) as u32;
    let max = pixels.iter().copied().max().unwrap_or(0) as u32;
    let range = (max - min).max(1);

    RgbImage::from_fn(cols as u32, rows as u32, |x, y| {
        let value = pixels[[y as usize, x as usize]] as u32;
        let grey = ((value - min) * 255 / range) as u8;
        Rgb([grey, grey, grey])
    })
}

fn scale_for_web(image: &RgbImage, max_width: u32, max_height: u32) -> RgbImage {
    let (width, height) = fit_within(image.width(), image.height(), max_width, max_height);
    trace!(
        "Scaling {}x{} image to {}x{}",
        image.width(),
        image.height(),
        width,
        height
    );
    imageops::resize(image, width, height, FilterType::CatmullRom)
}

fn require_pixels(pixels: &Array2<u16>) -> Result<()> {
    if pixels.is_empty() {
        return Err(CcdError::Render {
            details: "image has no pixels".to_string(),
        });
    }
    Ok(())
}

/// Current frame as an 8-bit PNG sized for the web page
pub fn web_image(pixels: &Array2<u16>, max_width: u32, max_height: u32) -> Result<Vec<u8>> {
    require_pixels(pixels)?;
    let scaled = scale_for_web(&stretch_to_rgb(pixels), max_width, max_height);
    encode_png(DynamicImage::ImageRgb8(scaled))
}

/// Like [`web_image`] with the ROI outlined in red before scaling
pub fn roi_image(
    pixels: &Array2<u16>,
    roi: Rect,
    max_width: u32,
    max_height: u32,
) -> Result<Vec<u8>> {
    require_pixels(pixels)?;
    let mut image = stretch_to_rgb(pixels);

    if !roi.is_empty() {
        for inset in 0..ROI_LINE_WIDTH {
            let outline = DrawRect::at(roi.origin_x as i32 - inset, roi.origin_y as i32 - inset)
                .of_size(
                    roi.size_x + 2 * inset as u32,
                    roi.size_y + 2 * inset as u32,
                );
            draw_hollow_rect_mut(&mut image, outline, ROI_COLOUR);
        }
    }

    let scaled = scale_for_web(&image, max_width, max_height);
    encode_png(DynamicImage::ImageRgb8(scaled))
}

/// Full-resolution 16-bit grayscale PNG
pub fn encode_full_png(pixels: &Array2<u16>) -> Result<Vec<u8>> {
    require_pixels(pixels)?;
    let (rows, cols) = pixels.dim();
    let buffer: ImageBuffer<Luma<u16>, Vec<u16>> =
        ImageBuffer::from_raw(cols as u32, rows as u32, pixels.iter().copied().collect())
            .ok_or_else(|| CcdError::Render {
                details: "pixel buffer does not match image size".to_string(),
            })?;
    encode_png(DynamicImage::ImageLuma16(buffer))
}
