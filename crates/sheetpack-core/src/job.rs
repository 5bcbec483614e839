use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use image::ImageFormat;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::compositing::composite;
use crate::config::TexturePackerConfig;
use crate::error::{AtlasError, Result};
use crate::export::{self, AtlasDescriptor, PageFiles};
use crate::model::{PackStats, Page};
use crate::naming::compare_names;
use crate::packer;
use crate::source::SourceImage;

const EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Result of a packing job.
#[derive(Debug, Clone)]
pub struct PackOutput {
    pub pages: Vec<Page>,
    pub atlas: AtlasDescriptor,
    /// Files moved into the output directory (empty on a dry run).
    pub written: Vec<PathBuf>,
    pub stats: PackStats,
}

/// Packs a directory of images into atlas pages and manifests.
///
/// Call [`TexturePacker::process`] to scan and load the inputs, then
/// [`TexturePacker::pack`] to lay out, compose and write the atlas.
pub struct TexturePacker {
    config: TexturePackerConfig,
    images: Vec<SourceImage>,
    names: HashSet<String>,
    hashes: HashMap<[u8; 32], usize>,
    dry_run: bool,
}

impl TexturePacker {
    pub fn new(config: TexturePackerConfig) -> Self {
        Self {
            config,
            images: Vec::new(),
            names: HashSet::new(),
            hashes: HashMap::new(),
            dry_run: false,
        }
    }

    /// Compute everything but leave the output directory alone.
    pub fn dry_run(mut self, v: bool) -> Self {
        self.dry_run = v;
        self
    }

    pub fn config(&self) -> &TexturePackerConfig {
        &self.config
    }

    /// Loaded images in natural name order.
    pub fn images(&self) -> &[SourceImage] {
        &self.images
    }

    /// Scans `inputDir`, loads every eligible image and sorts them by name.
    #[instrument(skip_all, fields(input = %self.config.input_dir.display()))]
    pub fn process(&mut self) -> Result<()> {
        self.config.validate()?;
        let paths = gather_paths(&self.config)?;
        info!(count = paths.len(), "found input images");
        for path in paths {
            let name = frame_name(&path);
            if let Some(img) = SourceImage::load(&path, name, &self.config)? {
                self.add_image(img)?;
            }
        }
        self.sort_images();
        Ok(())
    }

    /// Adds an already decoded image.
    ///
    /// With `dedupe` on, an image whose packed pixels, trim rect and original
    /// size equal an earlier one is recorded as an alias of it instead of being
    /// packed again.
    pub fn add_image(&mut self, img: SourceImage) -> Result<()> {
        for name in std::iter::once(&img.name).chain(&img.aliases) {
            if !self.names.insert(name.clone()) {
                return Err(AtlasError::NameCollision { name: name.clone() });
            }
        }
        if self.config.dedupe {
            let hash = img.content_hash();
            if let Some(&existing) = self.hashes.get(&hash) {
                let original = &mut self.images[existing];
                warn!(name = %img.name, original = %original.name, "identical image packed as alias");
                original.aliases.push(img.name);
                original.aliases.extend(img.aliases);
                return Ok(());
            }
            self.hashes.insert(hash, self.images.len());
        }
        debug!(name = %img.name, w = img.width(), h = img.height(), "added image");
        self.images.push(img);
        Ok(())
    }

    fn sort_images(&mut self) {
        self.images.sort_by(|a, b| compare_names(&a.name, &b.name));
        self.hashes = self
            .images
            .iter()
            .enumerate()
            .map(|(i, img)| (img.content_hash(), i))
            .collect();
    }

    /// Packs the loaded images, composes every page and writes
    /// `{outputName}_{N}.png` plus `{outputName}_{N}.json` for each.
    ///
    /// Output files are staged next to the destination and moved into place
    /// only after every page was written; on failure nothing in the output
    /// directory changes.
    #[instrument(skip_all, fields(images = self.images.len()))]
    pub fn pack(&self) -> Result<PackOutput> {
        if self.images.is_empty() {
            return Err(AtlasError::Empty);
        }
        let cfg = &self.config;
        let opts = &cfg.packing_options;
        let pages = packer::pack(&self.images, opts)?;
        let files: Vec<PageFiles> = pages
            .iter()
            .map(|p| PageFiles::for_page(&cfg.output_name, p.index))
            .collect();
        let atlas = export::serialize(&pages, &self.images, cfg.crop, &files)?;
        let stats = PackStats::from_pages(&pages);
        info!(
            pages = stats.num_pages,
            frames = stats.num_frames,
            occupancy = stats.occupancy,
            "packed"
        );

        if self.dry_run {
            return Ok(PackOutput {
                pages,
                atlas,
                written: Vec::new(),
                stats,
            });
        }

        let staging = Staging::create(&cfg.output_dir, &cfg.output_name)?;
        for ((page, names), manifest) in pages.iter().zip(&files).zip(&atlas.pages) {
            let canvas = composite(page, &self.images, opts);
            let mut png = Vec::new();
            canvas
                .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
                .map_err(|source| AtlasError::Encode {
                    path: cfg.output_dir.join(&names.image),
                    source,
                })?;
            staging.write(&names.image, &png)?;
            staging.write(&names.manifest, export::to_json(manifest)?.as_bytes())?;
            debug!(page = page.index, image = %names.image, "staged page");
        }
        let written = staging.commit(&files)?;
        for path in &written {
            info!(path = %path.display(), "wrote");
        }
        Ok(PackOutput {
            pages,
            atlas,
            written,
            stats,
        })
    }
}

/// Frame name of an input file: its file name without extension.
pub fn frame_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn gather_paths(cfg: &TexturePackerConfig) -> Result<Vec<PathBuf>> {
    let root = cfg.input_dir.as_path();
    let ignore_dirs = build_globset(&cfg.ignore_dirs)?;
    let ignore_files = build_globset(&cfg.ignore_files)?;

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            !(e.depth() > 0 && e.file_type().is_dir() && is_ignored(&ignore_dirs, root, e.path()))
        });
    let mut list = Vec::new();
    for entry in walker {
        let entry = entry?;
        let p = entry.path();
        if !entry.file_type().is_file() || !is_image(p) {
            continue;
        }
        if is_ignored(&ignore_files, root, p) {
            debug!(path = %p.display(), "ignored");
            continue;
        }
        list.push(p.to_path_buf());
    }
    list.sort_by(|a, b| {
        compare_names(&frame_name(a), &frame_name(b)).then_with(|| a.cmp(b))
    });
    Ok(list)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut b = GlobSetBuilder::new();
    for pat in patterns {
        b.add(Glob::new(pat)?);
    }
    Ok(b.build()?)
}

/// Patterns match either the path relative to the input directory or the full
/// path, both with `/` separators.
fn is_ignored(set: &GlobSet, root: &Path, p: &Path) -> bool {
    if set.is_empty() {
        return false;
    }
    let rel = p.strip_prefix(root).unwrap_or(p);
    set.is_match(slash_path(rel)) || set.is_match(slash_path(p))
}

fn slash_path(p: &Path) -> String {
    p.to_string_lossy().replace('\\', "/")
}

fn is_image(p: &Path) -> bool {
    matches!(
        p.extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_ascii_lowercase()),
        Some(ext) if EXTENSIONS.contains(&ext.as_str())
    )
}

/// Temporary directory inside the output directory; removed on drop.
struct Staging {
    out_dir: PathBuf,
    dir: PathBuf,
    output_name: String,
}

impl Staging {
    fn create(out_dir: &Path, output_name: &str) -> Result<Self> {
        let dir = out_dir.join(format!(".{output_name}.staging-{}", std::process::id()));
        if dir.exists() {
            fs::remove_dir_all(&dir).map_err(|source| AtlasError::Write {
                path: dir.clone(),
                source,
            })?;
        }
        fs::create_dir_all(&dir).map_err(|source| AtlasError::Write {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            out_dir: out_dir.to_path_buf(),
            dir,
            output_name: output_name.to_string(),
        })
    }

    fn write(&self, file: &str, bytes: &[u8]) -> Result<()> {
        let path = self.dir.join(file);
        fs::write(&path, bytes).map_err(|source| AtlasError::Write { path, source })
    }

    /// Moves the staged files into the output directory, then removes page
    /// files of an earlier run that the new atlas no longer has.
    fn commit(self, files: &[PageFiles]) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(files.len() * 2);
        for f in files {
            for file in [&f.image, &f.manifest] {
                let from = self.dir.join(file);
                let to = self.out_dir.join(file);
                fs::rename(&from, &to).map_err(|source| AtlasError::Write {
                    path: to.clone(),
                    source,
                })?;
                written.push(to);
            }
        }

        let keep: HashSet<&str> = files
            .iter()
            .flat_map(|f| [f.image.as_str(), f.manifest.as_str()])
            .collect();
        let entries = fs::read_dir(&self.out_dir).map_err(|source| AtlasError::Write {
            path: self.out_dir.clone(),
            source,
        })?;
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_page_file(&self.output_name, &name) && !keep.contains(name.as_str()) {
                let path = entry.path();
                fs::remove_file(&path).map_err(|source| AtlasError::Write { path, source })?;
                debug!(file = %name, "removed stale page file");
            }
        }
        Ok(written)
    }
}

impl Drop for Staging {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.dir);
    }
}

/// True for `{output_name}_{digits}.png` and `{output_name}_{digits}.json`.
fn is_page_file(output_name: &str, file: &str) -> bool {
    let Some(rest) = file
        .strip_prefix(output_name)
        .and_then(|r| r.strip_prefix('_'))
    else {
        return false;
    };
    let Some((index, ext)) = rest.rsplit_once('.') else {
        return false;
    };
    !index.is_empty()
        && index.bytes().all(|b| b.is_ascii_digit())
        && matches!(ext, "png" | "json")
}
