use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::config::CropType;
use crate::error::{AtlasError, Result};
use crate::model::{PackRect, Page, Rect, Size};
use crate::naming::compare_names;
use crate::source::SourceImage;

/// `meta.app` and `meta.version` as the runtime atlas reader expects them.
pub const APP: &str = "https://littlekt.com";
pub const VERSION: &str = "1.0";
pub const FORMAT: &str = "RGBA8888";

/// Descriptor of a whole atlas: one [`AtlasPage`] per output page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtlasDescriptor {
    pub pages: Vec<AtlasPage>,
}

/// Manifest of one page image, the JSON document the runtime atlas reader loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtlasPage {
    pub meta: Meta,
    pub frames: Vec<Frame>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    pub app: String,
    pub version: String,
    /// File name of the page image.
    pub image: String,
    pub format: String,
    pub scale: f32,
    pub size: Size,
    /// Manifests of the other pages of a multi-page atlas.
    #[serde(default)]
    pub related_multi_packs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub filename: String,
    /// Content rect on the page (w/h swapped when rotated).
    pub frame: Rect,
    pub rotated: bool,
    pub trimmed: bool,
    pub sprite_source_size: Rect,
    pub source_size: Size,
}

/// File names used for one page: the image and its manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFiles {
    pub image: String,
    pub manifest: String,
}

impl PageFiles {
    /// `{name}_{index}.png` / `{name}_{index}.json`.
    pub fn for_page(name: &str, index: usize) -> Self {
        Self {
            image: format!("{name}_{index}.png"),
            manifest: format!("{name}_{index}.json"),
        }
    }
}

/// Builds the atlas descriptor for packed `pages`.
///
/// `images` must be the slice the pages were packed from and `files` must hold
/// one entry per page. Fails with [`AtlasError::NameCollision`] if two frames
/// (aliases included) share a name.
pub fn serialize(
    pages: &[Page],
    images: &[SourceImage],
    crop: CropType,
    files: &[PageFiles],
) -> Result<AtlasDescriptor> {
    if files.len() != pages.len() {
        return Err(AtlasError::InvalidConfig(format!(
            "{} page file names given for {} pages",
            files.len(),
            pages.len()
        )));
    }
    let mut seen: HashSet<&str> = HashSet::new();
    let mut out = Vec::with_capacity(pages.len());
    for (page, names) in pages.iter().zip(files) {
        let mut frames = Vec::with_capacity(page.rects.len());
        for r in &page.rects {
            let img = &images[r.image];
            for name in std::iter::once(&img.name).chain(&img.aliases) {
                if !seen.insert(name.as_str()) {
                    return Err(AtlasError::NameCollision { name: name.clone() });
                }
                frames.push(frame_for(name, r, img, crop));
            }
        }
        frames.sort_by(|a, b| compare_names(&a.filename, &b.filename));

        let related_multi_packs = files
            .iter()
            .filter(|f| f.manifest != names.manifest)
            .map(|f| f.manifest.clone())
            .collect();
        out.push(AtlasPage {
            meta: Meta {
                app: APP.into(),
                version: VERSION.into(),
                image: names.image.clone(),
                format: FORMAT.into(),
                scale: 1.0,
                size: Size::new(page.width, page.height),
                related_multi_packs,
            },
            frames,
        });
    }
    Ok(AtlasDescriptor { pages: out })
}

/// Describes one placed image under `name`.
pub fn frame_for(name: &str, rect: &PackRect, img: &SourceImage, crop: CropType) -> Frame {
    let (w, h) = (img.trim.w, img.trim.h);
    let (mut sprite_source_size, source_size) = match crop {
        CropType::None => (Rect::new(0, 0, w, h), Size::new(w, h)),
        CropType::FlushPosition => (Rect::new(0, 0, w, h), img.source_size),
        CropType::KeepPosition => (Rect::new(img.trim.x, img.trim.y, w, h), img.source_size),
    };
    let trimmed = sprite_source_size != Rect::new(0, 0, source_size.w, source_size.h);
    if rect.rotated {
        std::mem::swap(&mut sprite_source_size.w, &mut sprite_source_size.h);
    }
    Frame {
        filename: name.to_string(),
        frame: rect.footprint(),
        rotated: rect.rotated,
        trimmed,
        sprite_source_size,
        source_size,
    }
}

/// Pretty JSON of one page manifest.
pub fn to_json(page: &AtlasPage) -> Result<String> {
    Ok(serde_json::to_string_pretty(page)?)
}
