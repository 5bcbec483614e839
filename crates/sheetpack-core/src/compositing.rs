use image::{Rgba, RgbaImage, imageops};
use tracing::instrument;

use crate::config::PackingOptions;
use crate::model::{PackRect, Page, Rect};
use crate::source::SourceImage;

/// Renders one page: a transparent canvas of the page size with every placed
/// image blitted at its rect, extruded and, when enabled, color-bled.
#[instrument(skip_all, fields(page = page.index))]
pub fn composite(page: &Page, images: &[SourceImage], options: &PackingOptions) -> RgbaImage {
    let mut canvas = RgbaImage::new(page.width, page.height);
    for r in &page.rects {
        blit_rgba(&images[r.image].pixels, &mut canvas, r, options.extrude);
    }
    if options.bleed {
        bleed(&mut canvas, options.bleed_iterations);
    }
    canvas
}

/// Blit `src` into `canvas` at the rect's position, rotated 90° counter-clockwise
/// when `rect.rotated`, then extrude the outermost pixels by `extrude`.
///
/// Pixels falling outside the canvas are dropped.
pub fn blit_rgba(src: &RgbaImage, canvas: &mut RgbaImage, rect: &PackRect, extrude: u32) {
    let area = rect.footprint();
    if rect.rotated {
        let turned = imageops::rotate270(src);
        imageops::replace(canvas, &turned, area.x as i64, area.y as i64);
    } else {
        imageops::replace(canvas, src, area.x as i64, area.y as i64);
    }
    if extrude > 0 {
        extrude_edges(canvas, &area, extrude);
    }
}

/// Copies the nearest edge pixel of `area` into the `extrude`-wide ring around it.
fn extrude_edges(canvas: &mut RgbaImage, area: &Rect, extrude: u32) {
    if area.w == 0 || area.h == 0 {
        return;
    }
    let (cw, ch) = canvas.dimensions();
    let e = extrude as i64;
    let (ax, ay) = (area.x as i64, area.y as i64);
    let (aw, ah) = (area.w as i64, area.h as i64);
    for yy in -e..ah + e {
        for xx in -e..aw + e {
            if (0..aw).contains(&xx) && (0..ah).contains(&yy) {
                continue;
            }
            let (tx, ty) = (ax + xx, ay + yy);
            if tx < 0 || ty < 0 || tx >= cw as i64 || ty >= ch as i64 {
                continue;
            }
            let sx = ax + xx.clamp(0, aw - 1);
            let sy = ay + yy.clamp(0, ah - 1);
            if sx >= cw as i64 || sy >= ch as i64 {
                continue;
            }
            let p = *canvas.get_pixel(sx as u32, sy as u32);
            canvas.put_pixel(tx as u32, ty as u32, p);
        }
    }
}

/// Reads a placed frame back from a composed page, undoing the rotation.
pub fn extract_frame(page: &RgbaImage, rect: &PackRect) -> RgbaImage {
    let area = rect.footprint();
    let region = imageops::crop_imm(page, area.x, area.y, area.w, area.h).to_image();
    if rect.rotated {
        imageops::rotate90(&region)
    } else {
        region
    }
}

const NEIGHBOURS: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Color bleeding: every fully transparent pixel next to a visible one takes
/// the average RGB of its visible neighbours (alpha stays 0). Each iteration
/// grows the bled region by one pixel; stops early once nothing changes.
pub fn bleed(canvas: &mut RgbaImage, max_iterations: u32) {
    let (w, h) = canvas.dimensions();
    let index = |x: u32, y: u32| (y as usize) * (w as usize) + x as usize;
    let mut blank: Vec<bool> = canvas.pixels().map(|p| p[3] == 0).collect();
    let mut pending: Vec<(u32, u32)> = canvas
        .enumerate_pixels()
        .filter(|(_, _, p)| p[3] == 0)
        .map(|(x, y, _)| (x, y))
        .collect();

    let mut iterations = 0;
    while !pending.is_empty() && iterations < max_iterations {
        let mut changed = Vec::new();
        pending.retain(|&(x, y)| {
            let (mut r, mut g, mut b, mut count) = (0u32, 0u32, 0u32, 0u32);
            for (dx, dy) in NEIGHBOURS {
                let (nx, ny) = (x as i64 + dx, y as i64 + dy);
                if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                    continue;
                }
                let (nx, ny) = (nx as u32, ny as u32);
                if blank[index(nx, ny)] {
                    continue;
                }
                let p = canvas.get_pixel(nx, ny);
                r += p[0] as u32;
                g += p[1] as u32;
                b += p[2] as u32;
                count += 1;
            }
            if count == 0 {
                return true;
            }
            canvas.put_pixel(
                x,
                y,
                Rgba([(r / count) as u8, (g / count) as u8, (b / count) as u8, 0]),
            );
            changed.push(index(x, y));
            false
        });
        if changed.is_empty() {
            break;
        }
        for i in changed {
            blank[i] = false;
        }
        iterations += 1;
    }
}
