use crate::error::{CcdError, DecodeError, Result};
use crate::geometry::{validate_rect, CandidateRect, ProfileWindows, Rect, Size};
use crate::payload::{FitsDecoder, PayloadDecoder};
use crate::stats::{compute_statistics, extract_roi_x_profile, extract_roi_y_profile, roi_view};
use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

const IMAGE_EXTENSIONS: &[&str] = &["fits", "fit", "fts", "png", "tif", "tiff"];

/// One CSV row of sequence results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequenceRow {
    /// File modification time, seconds since the epoch
    pub mtime: f64,
    pub path: String,
    pub roi_min: u16,
    pub roi_mean: f64,
    pub roi_max: u16,
    pub roi_sd_pct: f64,
    pub x_min: u16,
    pub x_mean: f64,
    pub x_max: u16,
    pub x_sd_pct: f64,
    pub y_min: u16,
    pub y_mean: f64,
    pub y_max: u16,
    pub y_sd_pct: f64,
}

/// Applies the same ROI and profile windows to every image in a directory
#[derive(Debug, Clone)]
pub struct SequenceAnalyser {
    roi: Option<CandidateRect>,
    x_profile_width: u32,
    y_profile_width: u32,
}

impl SequenceAnalyser {
    /// `roi` of `None` analyses each whole image
    pub fn new(roi: Option<CandidateRect>, x_profile_width: u32, y_profile_width: u32) -> Self {
        Self {
            roi,
            x_profile_width,
            y_profile_width,
        }
    }

    /// Analyse every image under `dir`, oldest first. Unreadable images are skipped.
    pub async fn analyse_dir(&self, dir: &Path) -> Result<Vec<SequenceRow>> {
        let images = list_images(dir).await?;
        info!("Analysing {} images from {}", images.len(), dir.display());

        let mut rows = Vec::with_capacity(images.len());
        for (mtime, path) in images {
            match load_image(&path).await {
                Ok(pixels) => rows.push(self.analyse(&pixels, mtime, &path)),
                Err(e) => warn!("Skipping {}: {}", path.display(), e),
            }
        }
        Ok(rows)
    }

    pub fn analyse(&self, pixels: &Array2<u16>, mtime: DateTime<Utc>, path: &Path) -> SequenceRow {
        let size = Size::new(pixels.ncols() as u32, pixels.nrows() as u32);
        let roi = match self.roi {
            Some(candidate) => validate_rect(candidate, size).rect,
            None => Rect::full(size),
        };
        let windows = ProfileWindows::for_roi(roi, self.x_profile_width, self.y_profile_width);
        debug!(
            "{}: roi {}, x profile rows [{}, {}), y profile cols [{}, {})",
            path.display(),
            roi,
            windows.y.min,
            windows.y.max,
            windows.x.min,
            windows.x.max
        );

        let roi_stats = compute_statistics(roi_view(pixels, roi));
        let x_stats = compute_statistics(extract_roi_x_profile(pixels, roi, windows.y).view());
        let y_stats = compute_statistics(extract_roi_y_profile(pixels, roi, windows.x).view());

        SequenceRow {
            mtime: mtime.timestamp_millis() as f64 / 1000.0,
            path: path.display().to_string(),
            roi_min: roi_stats.min,
            roi_mean: roi_stats.mean,
            roi_max: roi_stats.max,
            roi_sd_pct: roi_stats.std_dev_percent(),
            x_min: x_stats.min,
            x_mean: x_stats.mean,
            x_max: x_stats.max,
            x_sd_pct: x_stats.std_dev_percent(),
            y_min: y_stats.min,
            y_mean: y_stats.mean,
            y_max: y_stats.max,
            y_sd_pct: y_stats.std_dev_percent(),
        }
    }
}

/// Whether `path` has one of the recognised image extensions
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Image files directly under `dir`, sorted by modification time then path
pub async fn list_images(dir: &Path) -> Result<Vec<(DateTime<Utc>, PathBuf)>> {
    let mut entries = fs::read_dir(dir).await.map_err(|e| {
        CcdError::system(format!("Failed to read directory {}: {}", dir.display(), e))
    })?;

    let mut images = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !is_image_file(&path) {
            continue;
        }
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        let mtime: DateTime<Utc> = metadata.modified()?.into();
        images.push((mtime, path));
    }

    images.sort();
    Ok(images)
}

/// Load a FITS, PNG or TIFF file as 16-bit grey pixels
pub async fn load_image(path: &Path) -> Result<Array2<u16>> {
    let data = fs::read(path).await?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();

    if FitsDecoder::accepts(extension) {
        return Ok(FitsDecoder::new().decode(extension, &data)?);
    }

    let decoded = image::load_from_memory(&data).map_err(|e| DecodeError::Unsupported {
        details: format!("{}: {}", path.display(), e),
    })?;
    let grey = decoded.into_luma16();
    let (width, height) = grey.dimensions();

    Array2::from_shape_vec((height as usize, width as usize), grey.into_raw()).map_err(|e| {
        CcdError::Decode(DecodeError::Unsupported {
            details: e.to_string(),
        })
    })
}

/// Write `rows` as CSV with a header line
pub fn write_csv<W: Write>(rows: &[SequenceRow], out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| CcdError::system(format!("Failed to write CSV row: {}", e)))?;
    }
    writer.flush()?;
    Ok(())
}
