use std::fs;
use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use sheetpack_core::config::{PackingOptions, TexturePackerConfig};
use sheetpack_core::error::AtlasError;
use sheetpack_core::export::AtlasPage;
use sheetpack_core::job::TexturePacker;

/// Fresh scratch directory with `input/` and `out/` below it.
fn scratch(test: &str) -> PathBuf {
    let root = std::env::temp_dir().join(format!("sheetpack-{test}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&root);
    fs::create_dir_all(root.join("input")).expect("mkdir");
    root
}

fn write_png(path: &Path, w: u32, h: u32, rgba: [u8; 4]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("mkdir");
    }
    RgbaImage::from_pixel(w, h, Rgba(rgba))
        .save(path)
        .expect("save png");
}

fn config(root: &Path) -> TexturePackerConfig {
    TexturePackerConfig {
        input_dir: root.join("input"),
        output_dir: root.join("out"),
        output_name: "atlas".into(),
        packing_options: PackingOptions::builder()
            .with_max_dimensions(256, 256)
            .build(),
        ..Default::default()
    }
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("read_dir")
        .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn packs_directory_into_page_files() {
    let root = scratch("e2e");
    let input = root.join("input");
    write_png(&input.join("a.png"), 16, 16, [255, 0, 0, 255]);
    write_png(&input.join("b10.png"), 8, 8, [0, 255, 0, 255]);
    write_png(&input.join("sub/b2.png"), 12, 6, [0, 0, 255, 255]);
    write_png(&input.join("raw/draft.png"), 8, 8, [9, 9, 9, 255]);
    write_png(&input.join("skip_me.png"), 8, 8, [7, 7, 7, 255]);
    fs::write(input.join("notes.txt"), "not an image").expect("write");

    let cfg = TexturePackerConfig {
        ignore_dirs: vec!["raw".into()],
        ignore_files: vec!["skip_*.png".into()],
        ..config(&root)
    };
    let mut packer = TexturePacker::new(cfg);
    packer.process().expect("process");
    let names: Vec<&str> = packer.images().iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b2", "b10"]);

    let out = packer.pack().expect("pack");
    assert_eq!(out.pages.len(), 1);
    assert_eq!(out.stats.num_frames, 3);
    assert_eq!(file_names(&root.join("out")), vec!["atlas_0.json", "atlas_0.png"]);

    let text = fs::read_to_string(root.join("out/atlas_0.json")).expect("read json");
    let manifest: AtlasPage = serde_json::from_str(&text).expect("parse json");
    assert_eq!(manifest, out.atlas.pages[0]);
    let frames: Vec<&str> = manifest.frames.iter().map(|f| f.filename.as_str()).collect();
    assert_eq!(frames, vec!["a", "b2", "b10"]);

    let png = image::open(root.join("out/atlas_0.png")).expect("open png");
    assert_eq!(
        (png.width(), png.height()),
        (manifest.meta.size.w, manifest.meta.size.h)
    );
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn identical_images_become_aliases() {
    let root = scratch("alias");
    let input = root.join("input");
    write_png(&input.join("coin.png"), 10, 10, [250, 200, 0, 255]);
    write_png(&input.join("coin_copy.png"), 10, 10, [250, 200, 0, 255]);

    let mut packer = TexturePacker::new(config(&root));
    packer.process().expect("process");
    assert_eq!(packer.images().len(), 1);
    assert_eq!(packer.images()[0].aliases, vec!["coin_copy".to_string()]);

    let out = packer.pack().expect("pack");
    let frames = &out.atlas.pages[0].frames;
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].filename, "coin");
    assert_eq!(frames[1].filename, "coin_copy");
    assert_eq!(frames[0].frame, frames[1].frame);
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn duplicate_names_fail_the_run() {
    let root = scratch("collide");
    let input = root.join("input");
    write_png(&input.join("hero.png"), 10, 10, [1, 0, 0, 255]);
    write_png(&input.join("alt/hero.png"), 12, 12, [0, 1, 0, 255]);

    let mut packer = TexturePacker::new(config(&root));
    assert!(matches!(
        packer.process(),
        Err(AtlasError::NameCollision { name }) if name == "hero"
    ));
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn empty_input_is_an_error() {
    let root = scratch("empty");
    let mut packer = TexturePacker::new(config(&root));
    packer.process().expect("process");
    assert!(matches!(packer.pack(), Err(AtlasError::Empty)));
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn stale_pages_are_replaced() {
    let root = scratch("stale");
    let out_dir = root.join("out");
    fs::create_dir_all(&out_dir).expect("mkdir");
    fs::write(out_dir.join("atlas_3.png"), b"old").expect("write");
    fs::write(out_dir.join("atlas_3.json"), b"{}").expect("write");
    fs::write(out_dir.join("atlas_extra.json"), b"{}").expect("write");
    fs::write(out_dir.join("keep.txt"), b"mine").expect("write");
    write_png(&root.join("input/a.png"), 8, 8, [3, 3, 3, 255]);

    let mut packer = TexturePacker::new(config(&root));
    packer.process().expect("process");
    let out = packer.pack().expect("pack");
    assert_eq!(out.written.len(), 2);
    assert_eq!(
        file_names(&out_dir),
        vec!["atlas_0.json", "atlas_0.png", "atlas_extra.json", "keep.txt"]
    );
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn failed_run_leaves_previous_output() {
    let root = scratch("failed");
    let out_dir = root.join("out");
    fs::create_dir_all(&out_dir).expect("mkdir");
    fs::write(out_dir.join("atlas_0.png"), b"previous").expect("write");
    write_png(&root.join("input/huge.png"), 300, 300, [5, 5, 5, 255]);

    let mut packer = TexturePacker::new(config(&root));
    packer.process().expect("process");
    assert!(matches!(packer.pack(), Err(AtlasError::SizeExceeded { .. })));
    assert_eq!(fs::read(out_dir.join("atlas_0.png")).expect("read"), b"previous");
    assert_eq!(file_names(&out_dir), vec!["atlas_0.png"]);
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn dry_run_writes_nothing() {
    let root = scratch("dry");
    write_png(&root.join("input/a.png"), 8, 8, [3, 3, 3, 255]);

    let mut packer = TexturePacker::new(config(&root)).dry_run(true);
    packer.process().expect("process");
    let out = packer.pack().expect("pack");
    assert_eq!(out.atlas.pages.len(), 1);
    assert!(out.written.is_empty());
    assert!(!root.join("out").exists());
    let _ = fs::remove_dir_all(&root);
}

/// Same red block, different canvas and offset.
fn block_on_canvas(size: u32, at: u32) -> image::DynamicImage {
    let img = RgbaImage::from_fn(size, size, |x, y| {
        if (at..at + 10).contains(&x) && (at..at + 10).contains(&y) {
            Rgba([255, 0, 0, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    });
    image::DynamicImage::ImageRgba8(img)
}

#[test]
fn equal_pixels_with_different_geometry_are_not_aliased() {
    use sheetpack_core::model::{Rect, Size};
    use sheetpack_core::source::SourceImage;

    let cfg = TexturePackerConfig::default();
    let big = SourceImage::prepare("big", block_on_canvas(64, 10), &cfg).expect("kept");
    let small = SourceImage::prepare("small", block_on_canvas(16, 3), &cfg).expect("kept");
    assert_eq!(big.pixels, small.pixels);

    let mut packer = TexturePacker::new(cfg).dry_run(true);
    packer.add_image(big).expect("add big");
    packer.add_image(small).expect("add small");
    assert_eq!(packer.images().len(), 2);
    assert!(packer.images().iter().all(|i| i.aliases.is_empty()));

    let out = packer.pack().expect("pack");
    let frames = &out.atlas.pages[0].frames;
    assert_eq!(frames.len(), 2);
    let big_f = frames.iter().find(|f| f.filename == "big").expect("big frame");
    let small_f = frames.iter().find(|f| f.filename == "small").expect("small frame");
    assert_eq!(big_f.sprite_source_size, Rect::new(10, 10, 10, 10));
    assert_eq!(big_f.source_size, Size::new(64, 64));
    assert_eq!(small_f.sprite_source_size, Rect::new(3, 3, 10, 10));
    assert_eq!(small_f.source_size, Size::new(16, 16));
}

#[test]
fn previous_pages_are_overwritten() {
    let root = scratch("overwrite");
    let out_dir = root.join("out");
    fs::create_dir_all(&out_dir).expect("mkdir");
    fs::write(out_dir.join("atlas_0.png"), b"old").expect("write");
    fs::write(out_dir.join("atlas_0.json"), b"{}").expect("write");
    fs::write(out_dir.join("atlas_1.png"), b"old").expect("write");
    fs::write(out_dir.join("atlas_1.json"), b"{}").expect("write");
    write_png(&root.join("input/a.png"), 8, 8, [3, 3, 3, 255]);

    let mut packer = TexturePacker::new(config(&root));
    packer.process().expect("process");
    let out = packer.pack().expect("pack");
    assert_eq!(file_names(&out_dir), vec!["atlas_0.json", "atlas_0.png"]);

    let png = image::open(out_dir.join("atlas_0.png")).expect("new png");
    assert_eq!(
        (png.width(), png.height()),
        (out.pages[0].width, out.pages[0].height)
    );
    let text = fs::read_to_string(out_dir.join("atlas_0.json")).expect("read json");
    let manifest: AtlasPage = serde_json::from_str(&text).expect("parse json");
    assert_eq!(manifest.frames[0].filename, "a");
    let _ = fs::remove_dir_all(&root);
}
