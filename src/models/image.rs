use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::PreviewConfig;
use crate::error::CaptionError;

/// Extensions accepted when the user picks an image by path.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// A path to an existing, non-empty file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    path: PathBuf,
}

impl ImageReference {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CaptionError> {
        let path = path.as_ref();
        match fs::metadata(path) {
            Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(Self {
                path: path.to_path_buf(),
            }),
            _ => Err(CaptionError::InvalidImage(path.to_path_buf())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_base64(&self) -> std::io::Result<String> {
        let bytes = fs::read(&self.path)?;
        Ok(STANDARD.encode(bytes))
    }

    /// Pixel dimensions from the image header.
    pub fn dimensions(&self) -> Result<(u32, u32), ::image::ImageError> {
        ::image::image_dimensions(&self.path)
    }

    pub fn preview(&self, bounds: PreviewConfig) -> Result<Preview, ::image::ImageError> {
        let (width, height) = self.dimensions()?;
        let (fit_width, fit_height) = fit_within(width, height, bounds.width, bounds.height);
        Ok(Preview {
            width,
            height,
            fit_width,
            fit_height,
        })
    }
}

pub fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| supported.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preview {
    pub width: u32,
    pub height: u32,
    pub fit_width: u32,
    pub fit_height: u32,
}

/// Shrinks `width x height` to fit the box, keeping the aspect ratio. Never enlarges.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (0, 0);
    }
    if width <= max_width && height <= max_height {
        return (width, height);
    }

    let scale = f64::min(
        max_width as f64 / width as f64,
        max_height as f64 / height as f64,
    );
    let fit_width = ((width as f64 * scale).round() as u32).max(1);
    let fit_height = ((height as f64 * scale).round() as u32).max(1);
    (fit_width, fit_height)
}
