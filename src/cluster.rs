extern crate alloc;
use alloc::vec;
use alloc::vec::Vec;

use crate::palette::{distance_sq, PaletteSet, Rgbf, SlotZeroMode};
use crate::tiles::Tile;

const LLOYD_ROUNDS: usize = 8;

/// Build the initial palette set: one trainable color per palette, taken
/// from clustering the tiles' mean colors into one cluster per palette.
/// Reserved slots (shared or fixed) are installed ahead of the centroid.
pub(crate) fn initialize_palettes(
    tiles: &[Tile],
    count: usize,
    zero: SlotZeroMode,
    shared_seed: Option<Rgbf>,
) -> PaletteSet {
    let reps: Vec<(Rgbf, f32)> = tiles.iter().map(tile_mean).collect();
    let centroids = cluster_means(&reps, count);

    let mut set = PaletteSet::new(count, zero);
    for (palette, centroid) in centroids.into_iter().enumerate() {
        if let SlotZeroMode::Fixed(rgb) = zero {
            set.push_color(palette, rgb);
        } else if let Some(seed) = shared_seed {
            set.push_color(palette, seed);
        }
        set.push_color(palette, centroid);
    }
    set
}

/// Mean opaque color of a tile, weighted by its pixel count. A fully
/// transparent tile contributes nothing.
fn tile_mean(tile: &Tile) -> (Rgbf, f32) {
    let mut sum = [0.0f64; 3];
    let mut weight = 0.0f64;
    for color in &tile.colors {
        let w = color.count as f64;
        for ch in 0..3 {
            sum[ch] += color.rgb[ch] as f64 * w;
        }
        weight += w;
    }
    if weight == 0.0 {
        return ([0.0; 3], 0.0);
    }
    (
        [
            (sum[0] / weight) as f32,
            (sum[1] / weight) as f32,
            (sum[2] / weight) as f32,
        ],
        weight as f32,
    )
}

/// Deterministic k-means: farthest-point seeding from the global mean,
/// a fixed number of Lloyd rounds, round-robin rescue of empty clusters.
fn cluster_means(reps: &[(Rgbf, f32)], k: usize) -> Vec<Rgbf> {
    if reps.is_empty() {
        return vec![[0.0; 3]; k];
    }

    let mut centroids = Vec::with_capacity(k);
    centroids.push(global_mean(reps));
    while centroids.len() < k {
        // Farthest rep from every existing centroid; ties keep the lowest
        // tile index.
        let mut best = (0usize, -1.0f32);
        for (i, (rgb, _)) in reps.iter().enumerate() {
            let d = centroids
                .iter()
                .map(|c| distance_sq(*c, *rgb))
                .fold(f32::MAX, f32::min);
            if d > best.1 {
                best = (i, d);
            }
        }
        centroids.push(reps[best.0].0);
    }

    let mut assignment = vec![0usize; reps.len()];
    let mut rescue_cursor = 0usize;
    for _ in 0..LLOYD_ROUNDS {
        for (i, (rgb, _)) in reps.iter().enumerate() {
            let mut best = (0usize, f32::MAX);
            for (c, centroid) in centroids.iter().enumerate() {
                let d = distance_sq(*centroid, *rgb);
                if d < best.1 {
                    best = (c, d);
                }
            }
            assignment[i] = best.0;
        }

        // A cluster with no tiles would leave a degenerate palette; hand
        // it a tile round-robin instead.
        for c in 0..k {
            if !assignment.contains(&c) {
                assignment[rescue_cursor % reps.len()] = c;
                rescue_cursor += 1;
            }
        }

        for (c, centroid) in centroids.iter_mut().enumerate() {
            let mut sum = [0.0f64; 3];
            let mut weight = 0.0f64;
            for (i, (rgb, w)) in reps.iter().enumerate() {
                if assignment[i] != c {
                    continue;
                }
                let w = (*w).max(1.0) as f64;
                for ch in 0..3 {
                    sum[ch] += rgb[ch] as f64 * w;
                }
                weight += w;
            }
            if weight > 0.0 {
                *centroid = [
                    (sum[0] / weight) as f32,
                    (sum[1] / weight) as f32,
                    (sum[2] / weight) as f32,
                ];
            }
        }
    }

    centroids
}

fn global_mean(reps: &[(Rgbf, f32)]) -> Rgbf {
    let mut sum = [0.0f64; 3];
    let mut weight = 0.0f64;
    for (rgb, w) in reps {
        let w = (*w).max(1.0) as f64;
        for ch in 0..3 {
            sum[ch] += rgb[ch] as f64 * w;
        }
        weight += w;
    }
    if weight == 0.0 {
        return [0.0; 3];
    }
    [
        (sum[0] / weight) as f32,
        (sum[1] / weight) as f32,
        (sum[2] / weight) as f32,
    ]
}
