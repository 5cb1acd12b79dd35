//! Image preprocessing before upload
//!
//! Photos are downscaled to a maximum width and re-encoded as JPEG.
//! Callers treat every failure here as recoverable and upload the original.

use crate::error::PreprocessError;
use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use reframe_model::LocalPhoto;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Resize/compress a local photo
#[async_trait]
pub trait ImagePreprocessor: Send + Sync {
    async fn compress(&self, photo: &LocalPhoto) -> Result<LocalPhoto, PreprocessError>;
}

/// Compression policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Wider images are scaled down to this width
    pub max_width: u32,
    /// JPEG quality, 1-100
    pub quality: u8,
    /// Where compressed copies are written
    pub output_dir: PathBuf,
}

impl PreprocessConfig {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_max_width(mut self, max_width: u32) -> Self {
        self.max_width = max_width;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            max_width: 1200,
            quality: 80,
            output_dir: std::env::temp_dir(),
        }
    }
}

/// JPEG re-encoder backed by the `image` crate
#[derive(Debug, Clone, Default)]
pub struct JpegPreprocessor {
    config: PreprocessConfig,
}

impl JpegPreprocessor {
    #[inline]
    #[must_use]
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }
}

#[async_trait]
impl ImagePreprocessor for JpegPreprocessor {
    async fn compress(&self, photo: &LocalPhoto) -> Result<LocalPhoto, PreprocessError> {
        let source = photo.path();
        let config = self.config.clone();

        let output = tokio::task::spawn_blocking(move || compress_file(&source, &config))
            .await
            .map_err(|e| PreprocessError::Internal(e.to_string()))??;

        tracing::debug!(source = %photo, output = %output.display(), "compressed photo");
        Ok(LocalPhoto::from_path(output))
    }
}

/// Preprocessor that leaves photos untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughPreprocessor;

#[async_trait]
impl ImagePreprocessor for PassthroughPreprocessor {
    async fn compress(&self, photo: &LocalPhoto) -> Result<LocalPhoto, PreprocessError> {
        Ok(photo.clone())
    }
}

fn compress_file(source: &Path, config: &PreprocessConfig) -> Result<PathBuf, PreprocessError> {
    let bytes = std::fs::read(source).map_err(|e| PreprocessError::io_error(source, &e))?;
    let img = image::load_from_memory(&bytes).map_err(|e| PreprocessError::Decode(e.to_string()))?;
    let img = fit_width(img, config.max_width);

    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("photo");
    let target = config
        .output_dir
        .join(format!("{stem}_{}.jpg", uuid::Uuid::new_v4().simple()));

    let file = File::create(&target).map_err(|e| PreprocessError::io_error(&target, &e))?;
    let mut writer = BufWriter::new(file);
    let encoder = JpegEncoder::new_with_quality(&mut writer, config.quality);

    // JPEG has no alpha channel
    img.to_rgb8()
        .write_with_encoder(encoder)
        .map_err(|e| PreprocessError::Encode(e.to_string()))?;

    Ok(target)
}

/// Scale down to `max_width` keeping aspect ratio; never upscale
fn fit_width(img: DynamicImage, max_width: u32) -> DynamicImage {
    if max_width == 0 || img.width() <= max_width {
        return img;
    }
    let scale = f64::from(max_width) / f64::from(img.width());
    let height = (f64::from(img.height()) * scale).round().max(1.0) as u32;
    img.resize_exact(max_width, height, FilterType::Lanczos3)
}
