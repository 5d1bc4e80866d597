use super::controller::SessionController;
use crate::error::{CcdError, Result};
use crate::payload::encode_fits;
use crate::product::ImageProduct;
use crate::render::encode_full_png;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// On-disk format for saved images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveFormat {
    #[default]
    Fits,
    /// 16-bit grayscale
    Png,
}

impl SaveFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fits" | "fit" => Some(SaveFormat::Fits),
            "png" => Some(SaveFormat::Png),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            SaveFormat::Fits => "fits",
            SaveFormat::Png => "png",
        }
    }
}

/// `{root}_{YYYYMMDD_HHMMSS}_{index}.{ext}`
pub fn image_file_name(
    root: &str,
    captured_at: DateTime<Utc>,
    index: u32,
    format: SaveFormat,
) -> String {
    format!(
        "{}_{}_{}.{}",
        root,
        captured_at.format("%Y%m%d_%H%M%S"),
        index,
        format.extension()
    )
}

/// Check a caller-supplied file name root; `None` means use the default
fn check_name_root(command: &str, root: Option<&str>) -> Result<Option<String>> {
    let Some(root) = root.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(None);
    };

    if root.contains(['/', '\\']) || root.contains("..") {
        return Err(CcdError::invalid_parameter(
            command,
            root,
            "name must not contain path separators",
        ));
    }
    Ok(Some(root.to_string()))
}

impl SessionController {
    /// Persist the current image once. Returns the path written.
    pub async fn save_image(&self, name_root: Option<&str>) -> Result<PathBuf> {
        let root = check_name_root("saveImage", name_root)?;
        let (image, root) = {
            let state = self.state.read();
            let image = state.current_image.clone().ok_or(CcdError::NoImage)?;
            (image, root.unwrap_or_else(|| state.config.save_name_root.clone()))
        };

        self.save_product(&image, &root).await
    }

    /// Save every image as it arrives, optionally under a new name root
    pub fn start_auto_save(&self, name_root: Option<&str>) -> Result<()> {
        let root = check_name_root("startAutoSave", name_root)?;

        let mut state = self.state.write();
        if let Some(root) = root {
            state.config.save_name_root = root;
        }
        state.config.auto_save = true;
        info!(
            "Auto-save enabled with name root '{}'",
            state.config.save_name_root
        );
        Ok(())
    }

    pub fn stop_auto_save(&self) {
        self.state.write().config.auto_save = false;
        info!("Auto-save disabled");
    }

    /// Write `product` to the data directory without overwriting any file
    pub(crate) async fn save_product(&self, product: &ImageProduct, root: &str) -> Result<PathBuf> {
        let format = self.settings.save_format;
        let dir = &self.settings.data_dir;

        fs::create_dir_all(dir).await?;

        let bytes = match format {
            SaveFormat::Fits => encode_fits(&product.pixels, product.captured_at),
            SaveFormat::Png => encode_full_png(&product.pixels)?,
        };

        let mut index = 0u32;
        loop {
            let path = dir.join(image_file_name(root, product.captured_at, index, format));

            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(mut file) => {
                    file.write_all(&bytes).await?;
                    file.flush().await?;
                    info!("Saved image {} to {}", product.sequence, path.display());
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!("{} exists, trying next suffix", path.display());
                    index = index
                        .checked_add(1)
                        .ok_or_else(|| CcdError::system("No free file name suffix left"))?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
