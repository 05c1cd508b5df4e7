extern crate alloc;
use alloc::vec::Vec;

use crate::palette::{PaletteSet, Rgbf};
use crate::tiles::Tile;

/// Top `n` residual colors for one palette: the distinct tile colors with
/// the largest count-weighted squared error under the palette's current
/// colors, deduplicated. `assignment` restricts the scan to the palette's
/// own tiles; `None` scans everything.
pub(crate) fn worst_residual_colors(
    set: &PaletteSet,
    palette: usize,
    tiles: &[Tile],
    assignment: Option<&[u8]>,
    n: usize,
) -> Vec<Rgbf> {
    let mut scored: Vec<(f64, Rgbf)> = Vec::new();
    for (t, tile) in tiles.iter().enumerate() {
        if let Some(assignment) = assignment {
            if assignment[t] as usize != palette {
                continue;
            }
        }
        for color in &tile.colors {
            let (_, d) = set.nearest(palette, color.rgb);
            scored.push((d as f64 * color.count as f64, color.rgb));
        }
    }
    // Stable sort keeps equal-residual colors in tile order.
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(core::cmp::Ordering::Equal));

    let mut out: Vec<Rgbf> = Vec::with_capacity(n);
    for (_, rgb) in scored {
        if out.len() == n {
            break;
        }
        if !out.contains(&rgb) {
            out.push(rgb);
        }
    }
    out
}

/// Add one color slot to every palette, seeded at the worst residual so
/// total error can only go down. A palette with no assigned tiles seeds
/// from the global worst residual instead of starving.
pub(crate) fn expand_palettes_by_one(set: &mut PaletteSet, tiles: &[Tile], assignment: &[u8]) {
    for palette in 0..set.palette_count() {
        let seed = worst_residual_colors(set, palette, tiles, Some(assignment), 1)
            .first()
            .copied()
            .or_else(|| {
                worst_residual_colors(set, palette, tiles, None, 1)
                    .first()
                    .copied()
            })
            .unwrap_or([0.0; 3]);
        set.push_color(palette, seed);
    }
}
