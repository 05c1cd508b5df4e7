extern crate alloc;
use alloc::vec;
use alloc::vec::Vec;

use rgb::RGBA;

use crate::dither::DitherMap;
use crate::palette::{distance_sq, PaletteSet, Rgbf};
use crate::refine::assign_tiles;
use crate::tiles::Tile;

/// Ordered-dither parameters resolved at validation time.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DitherParams {
    pub map: DitherMap,
    pub bins: u8,
    pub weight: f32,
}

/// The engine's output: one palette index per tile and one color index per
/// pixel, enough for an external encoder to pack any indexed format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedImage {
    tile_palettes: Vec<u8>,
    pixel_indices: Vec<u8>,
    tiles_x: usize,
    tiles_y: usize,
}

impl IndexedImage {
    /// Palette index for each tile, row-major.
    pub fn tile_palettes(&self) -> &[u8] {
        &self.tile_palettes
    }

    /// Color index within the owning tile's palette, one per pixel.
    pub fn pixel_indices(&self) -> &[u8] {
        &self.pixel_indices
    }

    pub fn tiles_x(&self) -> usize {
        self.tiles_x
    }

    pub fn tiles_y(&self) -> usize {
        self.tiles_y
    }
}

/// Assign every tile to its best palette and emit the index buffer,
/// applying ordered dithering when requested.
#[allow(clippy::too_many_arguments)]
pub(crate) fn compose(
    set: &PaletteSet,
    pixels: &[RGBA<u8>],
    mask: &[bool],
    width: usize,
    height: usize,
    tile_width: u32,
    tile_height: u32,
    tiles: &[Tile],
    dither: Option<&DitherParams>,
) -> IndexedImage {
    let tw = tile_width as usize;
    let th = tile_height as usize;
    let tiles_x = width / tw;
    let tiles_y = height / th;

    let (tile_palettes, _) = assign_tiles(set, tiles);

    let mut pixel_indices = vec![0u8; pixels.len()];
    for y in 0..height {
        for x in 0..width {
            let i = y * width + x;
            if mask[i] {
                // Reserved transparent slot.
                continue;
            }
            let tile = (y / th) * tiles_x + x / tw;
            let palette = tile_palettes[tile] as usize;
            let p = pixels[i];
            let rgb = [p.r as f32, p.g as f32, p.b as f32];
            pixel_indices[i] = match dither {
                Some(d) => dithered_index(
                    set.colors(palette),
                    set.match_start(),
                    rgb,
                    d.weight,
                    d.map.rank(x, y),
                    d.bins,
                ) as u8,
                None => set.nearest(palette, rgb).0 as u8,
            };
        }
    }

    IndexedImage {
        tile_palettes,
        pixel_indices,
        tiles_x,
        tiles_y,
    }
}

/// Ordered-dither color selection. Finds the color pair whose mix best
/// approximates the pixel, with t(1-t)|ci-cj|^2 charging the visible noise
/// of an uneven mix against `weight`, then thresholds the mix ratio by the
/// pixel's rank: bin boundaries sit at (rank + 0.5) / bins.
fn dithered_index(
    colors: &[Rgbf],
    start: usize,
    rgb: Rgbf,
    weight: f32,
    rank: u8,
    bins: u8,
) -> usize {
    let mut best = (start, start, 0.0f32);
    let mut best_cost = f32::MAX;

    for i in start..colors.len() {
        let plain = distance_sq(rgb, colors[i]);
        if plain < best_cost {
            best_cost = plain;
            best = (i, i, 0.0);
        }
        for j in (i + 1)..colors.len() {
            let seg = [
                colors[j][0] - colors[i][0],
                colors[j][1] - colors[i][1],
                colors[j][2] - colors[i][2],
            ];
            let len_sq = seg[0] * seg[0] + seg[1] * seg[1] + seg[2] * seg[2];
            if len_sq <= f32::EPSILON {
                continue;
            }
            let delta = [
                rgb[0] - colors[i][0],
                rgb[1] - colors[i][1],
                rgb[2] - colors[i][2],
            ];
            let t = ((delta[0] * seg[0] + delta[1] * seg[1] + delta[2] * seg[2]) / len_sq)
                .clamp(0.0, 1.0);
            let blend = [
                colors[i][0] + t * seg[0],
                colors[i][1] + t * seg[1],
                colors[i][2] + t * seg[2],
            ];
            let cost = distance_sq(rgb, blend) + weight * t * (1.0 - t) * len_sq;
            if cost < best_cost {
                best_cost = cost;
                best = (i, j, t);
            }
        }
    }

    let (i, j, t) = best;
    let threshold = (rank as f32 + 0.5) / bins as f32;
    if t > threshold {
        j
    } else {
        i
    }
}
