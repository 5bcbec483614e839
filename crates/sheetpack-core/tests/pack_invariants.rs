use image::{Rgba, RgbaImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sheetpack_core::config::{GuillotineSplit, PackingOptions};
use sheetpack_core::model::Page;
use sheetpack_core::pack;
use sheetpack_core::source::SourceImage;

fn random_images(seed: u64, count: usize, max_side: u32) -> Vec<SourceImage> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let w = rng.gen_range(1..=max_side);
            let h = rng.gen_range(1..=max_side);
            SourceImage::from_rgba(format!("img{i}"), RgbaImage::from_pixel(w, h, Rgba([1, 2, 3, 255])))
        })
        .collect()
}

fn check_invariants(images: &[SourceImage], pages: &[Page], opts: &PackingOptions) {
    let (limit_w, limit_h) = opts.page_limits();
    let e = opts.extrude;
    let b = opts.border_padding;
    let mut seen = vec![0usize; images.len()];

    for (p, page) in pages.iter().enumerate() {
        assert_eq!(page.index, p);
        assert!(page.width <= limit_w && page.height <= limit_h, "page {p} too large");
        for r in &page.rects {
            seen[r.image] += 1;
            assert_eq!(r.page, p);
            assert_eq!((r.w, r.h), (images[r.image].width(), images[r.image].height()));
            let f = r.footprint();
            assert!(f.x >= e + b && f.y >= e + b, "{:?} inside border", r);
            assert!(
                f.right() + e + b <= page.width && f.bottom() + e + b <= page.height,
                "{:?} outside page {}x{}",
                r,
                page.width,
                page.height
            );
        }
        for (i, a) in page.rects.iter().enumerate() {
            for c in &page.rects[i + 1..] {
                assert!(
                    !a.slot(opts).intersects(&c.slot(opts)),
                    "slots overlap: {:?} / {:?}",
                    a,
                    c
                );
            }
        }
    }
    assert!(seen.iter().all(|&n| n == 1), "every image placed exactly once");
}

#[test]
fn random_inputs_hold_layout_invariants() {
    for seed in [1u64, 7, 42, 1234] {
        let images = random_images(seed, 80, 48);
        let opts = PackingOptions::builder()
            .with_max_dimensions(128, 128)
            .padding(1)
            .extrude(1)
            .build();
        let pages = pack(&images, &opts).expect("pack");
        check_invariants(&images, &pages, &opts);
    }
}

#[test]
fn invariants_hold_for_every_split_rule() {
    let splits = [
        GuillotineSplit::ShorterLeftoverAxis,
        GuillotineSplit::LongerLeftoverAxis,
        GuillotineSplit::MinimizeArea,
        GuillotineSplit::MaximizeArea,
        GuillotineSplit::ShorterAxis,
        GuillotineSplit::LongerAxis,
    ];
    let images = random_images(99, 60, 40);
    for split in splits {
        let opts = PackingOptions::builder()
            .with_max_dimensions(200, 150)
            .pow2(true)
            .border_padding(2)
            .padding(2)
            .split(split)
            .build();
        let pages = pack(&images, &opts).expect("pack");
        check_invariants(&images, &pages, &opts);
    }
}

#[test]
fn packing_is_deterministic() {
    let images = random_images(2024, 100, 64);
    let opts = PackingOptions::builder()
        .with_max_dimensions(256, 256)
        .extrude(2)
        .build();
    let first = pack(&images, &opts).expect("pack");
    let second = pack(&images, &opts).expect("pack");
    assert_eq!(first, second);
}

#[test]
fn guillotine_free_list_stays_disjoint_from_placements() {
    use sheetpack_core::model::Rect;
    use sheetpack_core::packer::guillotine::GuillotineBin;

    let mut rng = StdRng::seed_from_u64(5);
    let mut bin = GuillotineBin::new(Rect::new(0, 0, 256, 256), GuillotineSplit::default());
    let mut placed: Vec<Rect> = Vec::new();
    for _ in 0..200 {
        let (w, h) = (rng.gen_range(4..=40), rng.gen_range(4..=40));
        let Some(p) = bin.find(w, h, true) else {
            continue;
        };
        bin.place(&p);
        placed.push(p.slot);

        let free = bin.free_rects();
        for (i, f) in free.iter().enumerate() {
            assert!(placed.iter().all(|u| !u.intersects(f)), "free {f:?} overlaps a slot");
            for (j, g) in free.iter().enumerate() {
                assert!(i == j || !g.contains(f), "free {f:?} not pruned");
            }
        }
    }
    assert!(!placed.is_empty());
}
