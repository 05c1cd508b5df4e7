extern crate alloc;
use alloc::vec;
use alloc::vec::Vec;

use crate::grow::worst_residual_colors;
use crate::palette::PaletteSet;
use crate::shuffle::SampleShuffler;
use crate::tiles::{Sample, Tile};

/// Summed squared error of rendering a tile with one palette.
fn tile_error(set: &PaletteSet, palette: usize, tile: &Tile) -> f64 {
    let mut total = 0.0f64;
    for color in &tile.colors {
        let (_, d) = set.nearest(palette, color.rgb);
        total += d as f64 * color.count as f64;
    }
    total
}

/// Derive the tile-to-palette assignment (minimum error, ties to the
/// lowest palette index) and the mean square error over opaque pixels.
/// Always recomputed from scratch; palette mutations make any cached
/// assignment stale.
pub(crate) fn assign_tiles(set: &PaletteSet, tiles: &[Tile]) -> (Vec<u8>, f64) {
    let mut assignment = Vec::with_capacity(tiles.len());
    let mut total = 0.0f64;
    let mut weight = 0u64;
    for tile in tiles {
        let mut best_palette = 0usize;
        let mut best_error = f64::MAX;
        for palette in 0..set.palette_count() {
            let e = tile_error(set, palette, tile);
            if e < best_error {
                best_error = e;
                best_palette = palette;
            }
        }
        assignment.push(best_palette as u8);
        total += best_error;
        weight += tile.pixel_count();
    }
    let mse = if weight == 0 { 0.0 } else { total / weight as f64 };
    (assignment, mse)
}

pub(crate) fn mean_square_error(set: &PaletteSet, tiles: &[Tile]) -> f64 {
    assign_tiles(set, tiles).1
}

/// One block of online competitive learning. Samples are applied strictly
/// in sequence; each nudges the nearest color of the palette its tile is
/// assigned to.
pub(crate) fn anneal_block(
    set: &mut PaletteSet,
    samples: &[Sample],
    shuffler: &mut SampleShuffler,
    assignment: &[u8],
    iterations: usize,
    alpha: f32,
) {
    for _ in 0..iterations {
        let sample = &samples[shuffler.next_index()];
        let palette = assignment[sample.tile as usize] as usize;
        let (slot, _) = set.nearest(palette, sample.rgb);
        set.nudge(palette, slot, sample.rgb, alpha);
    }
}

/// Dead-unit reinitialization. Colors whose accumulated error falls below
/// `min_color_factor` of their palette's average are reseeded at the
/// palette's worst residuals; a palette whose error share falls below
/// `min_palette_factor` of the global average has its weakest color
/// reseeded at the globally worst residual. Reserved slots are exempt.
pub(crate) fn replace_weakest_colors(
    set: &mut PaletteSet,
    tiles: &[Tile],
    min_color_factor: f64,
    min_palette_factor: f64,
) {
    let (assignment, _) = assign_tiles(set, tiles);
    let palette_count = set.palette_count();
    let slots = set.colors_per_palette();
    let reseed_start = set.reseed_start();
    if slots <= reseed_start {
        return;
    }

    let mut color_err = vec![0.0f64; palette_count * slots];
    let mut palette_err = vec![0.0f64; palette_count];
    for (t, tile) in tiles.iter().enumerate() {
        let palette = assignment[t] as usize;
        for color in &tile.colors {
            let (slot, d) = set.nearest(palette, color.rgb);
            let e = d as f64 * color.count as f64;
            color_err[palette * slots + slot] += e;
            palette_err[palette] += e;
        }
    }

    for palette in 0..palette_count {
        let errs = &color_err[palette * slots..(palette + 1) * slots];
        let candidates = slots - reseed_start;
        let avg = errs[reseed_start..].iter().sum::<f64>() / candidates as f64;
        if avg <= 0.0 {
            continue;
        }
        let seeds = worst_residual_colors(set, palette, tiles, Some(&assignment), candidates);
        let mut next_seed = 0usize;
        for slot in reseed_start..slots {
            if color_err[palette * slots + slot] < min_color_factor * avg {
                if let Some(&seed) = seeds.get(next_seed) {
                    set.set_color(palette, slot, seed);
                    next_seed += 1;
                }
            }
        }
    }

    let global_avg = palette_err.iter().sum::<f64>() / palette_count as f64;
    if global_avg <= 0.0 {
        return;
    }
    for palette in 0..palette_count {
        if palette_err[palette] >= min_palette_factor * global_avg {
            continue;
        }
        let mut weakest = reseed_start;
        for slot in reseed_start..slots {
            if color_err[palette * slots + slot] < color_err[palette * slots + weakest] {
                weakest = slot;
            }
        }
        if let Some(&seed) = worst_residual_colors(set, palette, tiles, None, 1).first() {
            set.set_color(palette, weakest, seed);
        }
    }
}

/// One batch k-means pass: assign, then move every trainable color to the
/// mean of the pixels it serves. Used to recover placement quality after
/// posterization. Unused colors stay put.
pub(crate) fn kmeans_pass(set: &mut PaletteSet, tiles: &[Tile]) {
    let (assignment, _) = assign_tiles(set, tiles);
    let palette_count = set.palette_count();
    let slots = set.colors_per_palette();

    // r, g, b sums plus weight per slot.
    let mut sums = vec![[0.0f64; 4]; palette_count * slots];
    for (t, tile) in tiles.iter().enumerate() {
        let palette = assignment[t] as usize;
        for color in &tile.colors {
            let (slot, _) = set.nearest(palette, color.rgb);
            let cell = &mut sums[palette * slots + slot];
            let w = color.count as f64;
            for ch in 0..3 {
                cell[ch] += color.rgb[ch] as f64 * w;
            }
            cell[3] += w;
        }
    }

    if set.shared_zero() {
        // The shared slot is one logical color: merge its statistics
        // across palettes before updating.
        let mut merged = [0.0f64; 4];
        for palette in 0..palette_count {
            for ch in 0..4 {
                merged[ch] += sums[palette * slots][ch];
            }
        }
        if merged[3] > 0.0 {
            set.set_color(
                0,
                0,
                [
                    (merged[0] / merged[3]) as f32,
                    (merged[1] / merged[3]) as f32,
                    (merged[2] / merged[3]) as f32,
                ],
            );
        }
    }

    let start = set.reseed_start();
    for palette in 0..palette_count {
        for slot in start..slots {
            let cell = sums[palette * slots + slot];
            if cell[3] > 0.0 {
                set.set_color(
                    palette,
                    slot,
                    [
                        (cell[0] / cell[3]) as f32,
                        (cell[1] / cell[3]) as f32,
                        (cell[2] / cell[3]) as f32,
                    ],
                );
            }
        }
    }
}
