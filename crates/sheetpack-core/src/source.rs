use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageReader, RgbaImage};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::config::{TexturePackerConfig, TransparentPolicy};
use crate::error::{AtlasError, Result};
use crate::model::{Rect, Size};

/// One source image ready to be packed.
///
/// Only the trimmed region of the original pixels is kept; `trim` records where
/// that region sat inside the original `source_size` bounds.
#[derive(Debug, Clone)]
pub struct SourceImage {
    /// Frame name, unique within a run.
    pub name: String,
    pub path: Option<PathBuf>,
    /// RGBA8 pixels of the trimmed region.
    pub pixels: RgbaImage,
    /// Offset and size of the trimmed region within the original image.
    pub trim: Rect,
    /// Original (untrimmed) image size.
    pub source_size: Size,
    /// Names of pixel-identical images that share this image's placement.
    pub aliases: Vec<String>,
}

impl SourceImage {
    /// Wraps `rgba` as-is, without trimming.
    pub fn from_rgba(name: impl Into<String>, rgba: RgbaImage) -> Self {
        let (w, h) = rgba.dimensions();
        Self {
            name: name.into(),
            path: None,
            pixels: rgba,
            trim: Rect::new(0, 0, w, h),
            source_size: Size::new(w, h),
            aliases: Vec::new(),
        }
    }

    /// Builds a source image applying the trim settings of `cfg`.
    ///
    /// Returns `None` when the image is fully transparent and the transparent
    /// policy is [`TransparentPolicy::Skip`].
    pub fn prepare(
        name: impl Into<String>,
        image: DynamicImage,
        cfg: &TexturePackerConfig,
    ) -> Option<Self> {
        let name = name.into();
        let rgba = image.into_rgba8();
        if !cfg.trim {
            return Some(Self::from_rgba(name, rgba));
        }
        let (w, h) = rgba.dimensions();
        let region = match compute_trim_rect(&rgba, cfg.trim_threshold, cfg.trim_margin) {
            Some(r) => r,
            None => match cfg.transparent_policy {
                TransparentPolicy::Keep => Rect::new(0, 0, w, h),
                TransparentPolicy::OneByOne => Rect::new(0, 0, 1, 1),
                TransparentPolicy::Skip => {
                    warn!(name = %name, "skipping fully transparent image");
                    return None;
                }
            },
        };
        let pixels = if region == Rect::new(0, 0, w, h) {
            rgba
        } else {
            image::imageops::crop_imm(&rgba, region.x, region.y, region.w, region.h).to_image()
        };
        Some(Self {
            name,
            path: None,
            pixels,
            trim: region,
            source_size: Size::new(w, h),
            aliases: Vec::new(),
        })
    }

    /// Decodes the image at `path` and prepares it with the trim settings of `cfg`.
    pub fn load(
        path: &Path,
        name: impl Into<String>,
        cfg: &TexturePackerConfig,
    ) -> Result<Option<Self>> {
        let image = ImageReader::open(path)
            .map_err(|e| AtlasError::ImageLoad {
                path: path.to_path_buf(),
                source: image::ImageError::IoError(e),
            })?
            .with_guessed_format()
            .map_err(|e| AtlasError::ImageLoad {
                path: path.to_path_buf(),
                source: image::ImageError::IoError(e),
            })?
            .decode()
            .map_err(|source| AtlasError::ImageLoad {
                path: path.to_path_buf(),
                source,
            })?;
        let prepared = Self::prepare(name, image, cfg);
        Ok(prepared.map(|mut img| {
            img.path = Some(path.to_path_buf());
            img
        }))
    }

    /// Packed width (after trimming).
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Packed height (after trimming).
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// SHA-256 over the packed pixels, the trim rect and the original size.
    /// Equal digests mean the two images produce identical atlas content and
    /// identical frame metadata.
    pub fn content_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.pixels.as_raw());
        for v in [self.width(), self.height()] {
            hasher.update(v.to_be_bytes());
        }
        for v in [self.trim.x, self.trim.y, self.trim.w, self.trim.h] {
            hasher.update(v.to_be_bytes());
        }
        for v in [self.source_size.w, self.source_size.h] {
            hasher.update(v.to_be_bytes());
        }
        hasher.finalize().into()
    }
}

/// Computes the bounding box of pixels whose alpha exceeds `threshold`, grown by
/// `margin` pixels on every side and clamped to the image.
///
/// Returns `None` if no pixel exceeds the threshold.
pub fn compute_trim_rect(rgba: &RgbaImage, threshold: u8, margin: u32) -> Option<Rect> {
    let (w, h) = rgba.dimensions();
    let opaque = |x: u32, y: u32| rgba.get_pixel(x, y)[3] > threshold;

    let top = (0..h).find(|&y| (0..w).any(|x| opaque(x, y)))?;
    let bottom = (top..h).rev().find(|&y| (0..w).any(|x| opaque(x, y)))?;
    let left = (0..w).find(|&x| (top..=bottom).any(|y| opaque(x, y)))?;
    let right = (left..w).rev().find(|&x| (top..=bottom).any(|y| opaque(x, y)))?;

    let x1 = left.saturating_sub(margin);
    let y1 = top.saturating_sub(margin);
    let x2 = (right + 1).saturating_add(margin).min(w);
    let y2 = (bottom + 1).saturating_add(margin).min(h);
    Some(Rect::new(x1, y1, x2 - x1, y2 - y1))
}
