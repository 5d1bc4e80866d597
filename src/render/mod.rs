mod chart;
mod frame;
#[cfg(test)]
mod tests;

pub use chart::{histogram_chart, profile_chart, CHART_HEIGHT, CHART_WIDTH};
pub use frame::{encode_full_png, fit_within, roi_image, stretch_to_rgb, web_image};

use crate::error::{CcdError, Result};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

fn encode_png(image: DynamicImage) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut output), ImageFormat::Png)
        .map_err(|e| CcdError::Render {
            details: format!("Failed to encode PNG: {}", e),
        })?;
    Ok(output)
}
