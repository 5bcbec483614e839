use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{AtlasError, Result};

/// Guillotine split axis rules: how the free rectangle left over by a placement
/// is cut into a bottom and a right part.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GuillotineSplit {
    #[default]
    ShorterLeftoverAxis,
    LongerLeftoverAxis,
    MinimizeArea,
    MaximizeArea,
    ShorterAxis,
    LongerAxis,
}

impl FromStr for GuillotineSplit {
    type Err = ();
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "slas" | "shorter_leftover_axis" => Ok(Self::ShorterLeftoverAxis),
            "llas" | "longer_leftover_axis" => Ok(Self::LongerLeftoverAxis),
            "minas" | "minimize_area" => Ok(Self::MinimizeArea),
            "maxas" | "maximize_area" => Ok(Self::MaximizeArea),
            "sas" | "shorter_axis" => Ok(Self::ShorterAxis),
            "las" | "longer_axis" => Ok(Self::LongerAxis),
            _ => Err(()),
        }
    }
}

/// How the transparent border removed by trimming is described in the atlas.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CropType {
    /// The trimmed box becomes the whole sprite; `sourceSize` is the trimmed size.
    #[serde(alias = "none")]
    None,
    /// Sprite origin moves to the trimmed box; `sourceSize` stays the original size.
    #[serde(alias = "flush_position")]
    FlushPosition,
    /// Trim offsets are kept relative to the original image origin.
    #[default]
    #[serde(alias = "keep_position")]
    KeepPosition,
}

impl FromStr for CropType {
    type Err = ();
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "flush_position" | "flush" => Ok(Self::FlushPosition),
            "keep_position" | "keep" => Ok(Self::KeepPosition),
            _ => Err(()),
        }
    }
}

/// What to do with images that are fully transparent when trimming is on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransparentPolicy {
    /// Keep the whole image untrimmed.
    #[default]
    Keep,
    /// Pack a single transparent pixel.
    OneByOne,
    /// Leave the image out of the atlas.
    Skip,
}

impl FromStr for TransparentPolicy {
    type Err = ();
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "keep" => Ok(Self::Keep),
            "one_by_one" | "1x1" => Ok(Self::OneByOne),
            "skip" => Ok(Self::Skip),
            _ => Err(()),
        }
    }
}

/// Layout options for a single packing run. Read-only while packing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PackingOptions {
    /// Maximum page width in pixels.
    pub max_width: u32,
    /// Maximum page height in pixels.
    pub max_height: u32,
    /// Round output page dimensions up to powers of two.
    #[serde(rename = "outputPagesAsPowerOfTwo")]
    pub power_of_two: bool,
    /// Allow 90° rotations when they give a strictly better fit.
    pub allow_rotation: bool,
    /// Edge pixels repeated around each frame.
    pub extrude: u32,
    /// Pixels between frames.
    pub padding: u32,
    /// Pixels around the entire page.
    pub border_padding: u32,
    /// Output pages are exactly max_width x max_height.
    pub force_max_dimensions: bool,
    pub split: GuillotineSplit,
    /// Fill transparent page pixels with the color of nearby opaque pixels.
    pub bleed: bool,
    pub bleed_iterations: u32,
}

impl Default for PackingOptions {
    fn default() -> Self {
        Self {
            max_width: 1024,
            max_height: 1024,
            power_of_two: false,
            allow_rotation: true,
            extrude: 0,
            padding: 2,
            border_padding: 0,
            force_max_dimensions: false,
            split: GuillotineSplit::default(),
            bleed: false,
            bleed_iterations: 2,
        }
    }
}

impl PackingOptions {
    /// Validates the configuration parameters.
    ///
    /// Returns an error if the page dimensions are zero or the border padding
    /// leaves no usable space.
    pub fn validate(&self) -> Result<()> {
        if self.max_width == 0 || self.max_height == 0 {
            return Err(AtlasError::InvalidConfig(format!(
                "page dimensions must be non-zero, got {}x{}",
                self.max_width, self.max_height
            )));
        }
        let (pw, ph) = self.page_limits();
        let total_border = self.border_padding.saturating_mul(2);
        if total_border >= pw || total_border >= ph {
            return Err(AtlasError::InvalidConfig(format!(
                "borderPadding ({}) * 2 leaves no room in a {}x{} page",
                self.border_padding, pw, ph
            )));
        }
        Ok(())
    }

    /// Largest page size a run may produce. With `power_of_two` this is the
    /// largest power of two not above the configured maximum, so rounding a page
    /// up never exceeds it.
    pub fn page_limits(&self) -> (u32, u32) {
        if self.power_of_two && !self.force_max_dimensions {
            (prev_pow2(self.max_width), prev_pow2(self.max_height))
        } else {
            (self.max_width, self.max_height)
        }
    }

    /// Area available to frames (page limits minus the border on both sides).
    pub fn usable_area(&self) -> (u32, u32) {
        let (pw, ph) = self.page_limits();
        let b = self.border_padding.saturating_mul(2);
        (pw.saturating_sub(b), ph.saturating_sub(b))
    }

    /// Create a fluent builder for `PackingOptions`.
    pub fn builder() -> PackingOptionsBuilder {
        PackingOptionsBuilder::new()
    }
}

pub(crate) fn next_pow2(v: u32) -> u32 {
    v.max(1).next_power_of_two()
}

fn prev_pow2(v: u32) -> u32 {
    if v == 0 { 0 } else { 1 << (31 - v.leading_zeros()) }
}

/// Builder for `PackingOptions` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct PackingOptionsBuilder {
    opts: PackingOptions,
}

impl PackingOptionsBuilder {
    pub fn new() -> Self {
        Self {
            opts: PackingOptions::default(),
        }
    }
    pub fn with_max_dimensions(mut self, w: u32, h: u32) -> Self {
        self.opts.max_width = w;
        self.opts.max_height = h;
        self
    }
    pub fn pow2(mut self, v: bool) -> Self {
        self.opts.power_of_two = v;
        self
    }
    pub fn allow_rotation(mut self, v: bool) -> Self {
        self.opts.allow_rotation = v;
        self
    }
    pub fn extrude(mut self, v: u32) -> Self {
        self.opts.extrude = v;
        self
    }
    pub fn padding(mut self, v: u32) -> Self {
        self.opts.padding = v;
        self
    }
    pub fn border_padding(mut self, v: u32) -> Self {
        self.opts.border_padding = v;
        self
    }
    pub fn force_max_dimensions(mut self, v: bool) -> Self {
        self.opts.force_max_dimensions = v;
        self
    }
    pub fn split(mut self, v: GuillotineSplit) -> Self {
        self.opts.split = v;
        self
    }
    pub fn bleed(mut self, v: bool, iterations: u32) -> Self {
        self.opts.bleed = v;
        self.opts.bleed_iterations = iterations;
        self
    }
    pub fn build(self) -> PackingOptions {
        self.opts
    }
}

/// Full configuration of a packing job: where images come from, how they are
/// preprocessed and where the atlas goes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TexturePackerConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Base name of the output files (`{outputName}_{N}.png/.json`).
    pub output_name: String,
    /// Glob patterns of directories to skip, relative to `inputDir`.
    pub ignore_dirs: Vec<String>,
    /// Glob patterns of files to skip, relative to `inputDir`.
    pub ignore_files: Vec<String>,
    /// Trim transparent borders (alpha <= trimThreshold).
    pub trim: bool,
    /// Pixels of transparent border kept around trimmed content.
    pub trim_margin: u32,
    pub trim_threshold: u8,
    pub crop: CropType,
    pub transparent_policy: TransparentPolicy,
    /// Pack pixel-identical images once and emit the others as aliases.
    pub dedupe: bool,
    pub packing_options: PackingOptions,
}

impl Default for TexturePackerConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output_dir: PathBuf::from("out"),
            output_name: "atlas".into(),
            ignore_dirs: Vec::new(),
            ignore_files: Vec::new(),
            trim: true,
            trim_margin: 0,
            trim_threshold: 0,
            crop: CropType::default(),
            transparent_policy: TransparentPolicy::default(),
            dedupe: true,
            packing_options: PackingOptions::default(),
        }
    }
}

impl TexturePackerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.output_name.is_empty() {
            return Err(AtlasError::InvalidConfig("outputName must not be empty".into()));
        }
        if self.output_name.contains(['/', '\\']) {
            return Err(AtlasError::InvalidConfig(format!(
                "outputName '{}' must be a plain file name",
                self.output_name
            )));
        }
        self.packing_options.validate()
    }
}
