use tracing::{debug, instrument};

use crate::config::{PackingOptions, next_pow2};
use crate::error::{AtlasError, Result};
use crate::model::{PackRect, Page, Rect};
use crate::source::SourceImage;

pub mod guillotine;

use guillotine::GuillotineBin;

struct PageBuilder {
    bin: GuillotineBin,
    rects: Vec<PackRect>,
}

/// Places `images` onto as many pages as needed and returns them in creation order.
///
/// Notes:
/// - Images are visited by decreasing height, then decreasing width; the sort is
///   stable so callers control the order of equal sizes.
/// - Each image goes to the first page with room, at the best-area-fit free
///   rectangle of that page.
/// - Every image is checked against the page limits before anything is placed;
///   an image that cannot fit an empty page fails the whole run.
#[instrument(skip_all, fields(images = images.len()))]
pub fn pack(images: &[SourceImage], options: &PackingOptions) -> Result<Vec<Page>> {
    options.validate()?;
    for img in images {
        check_fits(img, options)?;
    }

    let e2 = options.extrude * 2;
    let pad = options.padding;
    let border = options.border_padding;
    let (uw, uh) = options.usable_area();
    // Trailing padding of the last slot in a row/column may hang past the page.
    let area = Rect::new(border, border, uw + pad, uh + pad);

    let mut order: Vec<usize> = (0..images.len()).collect();
    order.sort_by(|&a, &b| {
        images[b]
            .height()
            .cmp(&images[a].height())
            .then_with(|| images[b].width().cmp(&images[a].width()))
    });

    let mut pages: Vec<PageBuilder> = Vec::new();
    for idx in order {
        let img = &images[idx];
        let sw = img.width() + e2 + pad;
        let sh = img.height() + e2 + pad;

        let existing = pages.iter().enumerate().find_map(|(i, p)| {
            p.bin
                .find(sw, sh, options.allow_rotation)
                .map(|placement| (i, placement))
        });
        let (page_index, placement) = match existing {
            Some(found) => found,
            None => {
                let bin = GuillotineBin::new(area, options.split);
                let placement = bin
                    .find(sw, sh, options.allow_rotation)
                    .ok_or_else(|| size_exceeded(img, options))?;
                pages.push(PageBuilder {
                    bin,
                    rects: Vec::new(),
                });
                (pages.len() - 1, placement)
            }
        };
        let page = &mut pages[page_index];
        page.bin.place(&placement);

        let rect = PackRect {
            image: idx,
            page: page_index,
            x: placement.slot.x + options.extrude,
            y: placement.slot.y + options.extrude,
            w: img.width(),
            h: img.height(),
            rotated: placement.rotated,
        };
        debug!(
            name = %img.name,
            page = page_index,
            x = rect.x,
            y = rect.y,
            rotated = rect.rotated,
            "placed"
        );
        page.rects.push(rect);
    }

    Ok(pages
        .into_iter()
        .enumerate()
        .map(|(index, builder)| {
            let (width, height) = compute_page_size(&builder.rects, options);
            Page {
                index,
                width,
                height,
                rects: builder.rects,
            }
        })
        .collect())
}

fn check_fits(img: &SourceImage, options: &PackingOptions) -> Result<()> {
    if img.width() == 0 || img.height() == 0 {
        return Err(AtlasError::InvalidConfig(format!(
            "image '{}' has an empty size",
            img.name
        )));
    }
    let (uw, uh) = options.usable_area();
    let w = img.width().saturating_add(options.extrude * 2);
    let h = img.height().saturating_add(options.extrude * 2);
    let upright = w <= uw && h <= uh;
    let rotated = options.allow_rotation && h <= uw && w <= uh;
    if upright || rotated {
        Ok(())
    } else {
        Err(size_exceeded(img, options))
    }
}

fn size_exceeded(img: &SourceImage, options: &PackingOptions) -> AtlasError {
    let (uw, uh) = options.usable_area();
    AtlasError::SizeExceeded {
        name: img.name.clone(),
        width: img.width(),
        height: img.height(),
        max_width: uw,
        max_height: uh,
    }
}

/// Compute final page dimensions given placed rects and options.
fn compute_page_size(rects: &[PackRect], options: &PackingOptions) -> (u32, u32) {
    if options.force_max_dimensions {
        return (options.max_width, options.max_height);
    }
    let e = options.extrude;
    let b = options.border_padding;
    let mut page_w = 1u32;
    let mut page_h = 1u32;
    for r in rects {
        let f = r.footprint();
        page_w = page_w.max(f.right() + e + b);
        page_h = page_h.max(f.bottom() + e + b);
    }
    if options.power_of_two {
        page_w = next_pow2(page_w);
        page_h = next_pow2(page_h);
    }
    (page_w, page_h)
}
