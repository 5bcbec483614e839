//! Core library for packing a folder of images into texture atlas pages.
//!
//! - Packing: guillotine free-list with best-area-fit, first-fit across pages
//! - Compositing: RGBA pages with optional rotation, edge extrusion and color bleeding
//! - Export: one JSON manifest per page describing every frame (trim, rotation, aliases)
//! - Orchestration: [`TexturePacker`] scans a directory and writes the atlas atomically
//!
//! Quick example:
//! ```ignore
//! use sheetpack_core::prelude::*;
//! # fn main() -> sheetpack_core::Result<()> {
//! let cfg = TexturePackerConfig {
//!     input_dir: "sprites".into(),
//!     output_dir: "out".into(),
//!     ..Default::default()
//! };
//! let mut packer = TexturePacker::new(cfg);
//! packer.process()?;
//! let out = packer.pack()?;
//! println!("{}", out.stats.summary());
//! # Ok(()) }
//! ```

pub mod compositing;
pub mod config;
pub mod error;
pub mod export;
pub mod job;
pub mod model;
pub mod naming;
pub mod packer;
pub mod source;

pub use compositing::{bleed, composite, extract_frame};
pub use config::*;
pub use error::*;
pub use export::{AtlasDescriptor, AtlasPage, Frame, Meta, PageFiles, serialize};
pub use job::{PackOutput, TexturePacker};
pub use model::*;
pub use naming::compare_names;
pub use packer::pack;
pub use source::SourceImage;

/// Convenience prelude for common types and functions.
/// Importing `sheetpack_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::config::{
        CropType, GuillotineSplit, PackingOptions, PackingOptionsBuilder, TexturePackerConfig,
        TransparentPolicy,
    };
    pub use crate::export::{AtlasDescriptor, AtlasPage, Frame};
    pub use crate::job::{PackOutput, TexturePacker};
    pub use crate::model::{PackRect, PackStats, Page, Rect, Size};
    pub use crate::source::SourceImage;
    pub use crate::{compare_names, composite, pack};
}
