use serde::{Deserialize, Serialize};

use crate::config::PackingOptions;

/// Axis-aligned rectangle (pixels). `x,y` is top-left; `w,h` are sizes.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
    /// Exclusive right edge (`x + w`).
    pub fn right(&self) -> u32 {
        self.x + self.w
    }
    /// Exclusive bottom edge (`y + h`).
    pub fn bottom(&self) -> u32 {
        self.y + self.h
    }
    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }
    /// Returns true if `r` is fully inside `self`.
    pub fn contains(&self, r: &Rect) -> bool {
        r.x >= self.x && r.y >= self.y && r.right() <= self.right() && r.bottom() <= self.bottom()
    }
    /// Returns true if the two rectangles share at least one pixel.
    pub fn intersects(&self, r: &Rect) -> bool {
        self.x < r.right() && r.x < self.right() && self.y < r.bottom() && r.y < self.bottom()
    }
}

/// Width/height pair as it appears in atlas descriptors.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

impl Size {
    pub fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }
}

/// Placement of one source image on a page.
///
/// `x`/`y` address the top-left pixel of the image content; extrusion and padding
/// live outside of it. `w`/`h` are always the unrotated content size, the
/// occupied area is given by [`PackRect::footprint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackRect {
    /// Index of the source image in the slice handed to the packer.
    pub image: usize,
    pub page: usize,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    /// True if the content was placed rotated by 90°.
    pub rotated: bool,
}

impl PackRect {
    /// Content area on the page (w/h swapped when rotated).
    pub fn footprint(&self) -> Rect {
        if self.rotated {
            Rect::new(self.x, self.y, self.h, self.w)
        } else {
            Rect::new(self.x, self.y, self.w, self.h)
        }
    }

    /// Area reserved on the page: content grown by extrusion on every side,
    /// plus the trailing padding to the right and below.
    pub fn slot(&self, options: &PackingOptions) -> Rect {
        let f = self.footprint();
        let e = options.extrude;
        Rect::new(
            f.x - e,
            f.y - e,
            f.w + e * 2 + options.padding,
            f.h + e * 2 + options.padding,
        )
    }
}

/// One output atlas image (layout only; pixels come from the compositor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub index: usize,
    pub width: u32,
    pub height: u32,
    pub rects: Vec<PackRect>,
}

/// Statistics about atlas packing efficiency.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PackStats {
    pub num_pages: usize,
    pub num_frames: usize,
    /// Sum of width * height over all pages.
    pub total_page_area: u64,
    /// Sum of placed content area.
    pub used_frame_area: u64,
    /// used_frame_area / total_page_area (0.0 to 1.0).
    pub occupancy: f64,
    pub num_rotated: usize,
}

impl PackStats {
    pub fn from_pages(pages: &[Page]) -> Self {
        let mut num_frames = 0;
        let mut total_page_area = 0u64;
        let mut used_frame_area = 0u64;
        let mut num_rotated = 0;
        for page in pages {
            total_page_area += page.width as u64 * page.height as u64;
            for r in &page.rects {
                num_frames += 1;
                used_frame_area += r.w as u64 * r.h as u64;
                if r.rotated {
                    num_rotated += 1;
                }
            }
        }
        let occupancy = if total_page_area > 0 {
            used_frame_area as f64 / total_page_area as f64
        } else {
            0.0
        };
        Self {
            num_pages: pages.len(),
            num_frames,
            total_page_area,
            used_frame_area,
            occupancy,
            num_rotated,
        }
    }

    /// Returns a human-readable summary of the statistics.
    pub fn summary(&self) -> String {
        format!(
            "Pages: {}, Frames: {}, Occupancy: {:.2}%, Total Area: {} px², Used Area: {} px², Rotated: {}",
            self.num_pages,
            self.num_frames,
            self.occupancy * 100.0,
            self.total_page_area,
            self.used_frame_area,
            self.num_rotated,
        )
    }
}
