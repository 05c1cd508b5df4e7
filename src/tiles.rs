extern crate alloc;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use rgb::RGBA;

use crate::error::QuantizeError;
use crate::palette::Rgbf;

/// Which source pixels are treated as transparent, derived from the
/// color-zero policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transparency {
    /// Every pixel participates in optimization.
    Opaque,
    /// Pixels with alpha 0 map to the reserved index.
    AlphaZero,
    /// Pixels matching the key color map to the reserved index.
    Key([u8; 3]),
}

impl Transparency {
    fn is_transparent(self, pixel: RGBA<u8>) -> bool {
        match self {
            Self::Opaque => false,
            Self::AlphaZero => pixel.a == 0,
            Self::Key([r, g, b]) => pixel.r == r && pixel.g == g && pixel.b == b,
        }
    }
}

/// One distinct color within a tile and how often it occurs there.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TileColor {
    pub rgb: Rgbf,
    pub count: u32,
}

/// A fixed-size tile: the deduplicated multiset of its opaque colors plus
/// the number of transparent pixels it holds.
#[derive(Debug, Clone)]
pub(crate) struct Tile {
    pub colors: Vec<TileColor>,
    pub transparent: u32,
}

impl Tile {
    pub fn pixel_count(&self) -> u64 {
        self.colors.iter().map(|c| c.count as u64).sum()
    }
}

/// One opaque pixel flattened for stochastic refinement, tagged with the
/// tile that owns it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Sample {
    pub rgb: Rgbf,
    pub tile: u32,
}

/// Reject buffers whose dimensions do not partition into whole tiles.
pub(crate) fn check_dimensions(
    len: usize,
    width: usize,
    height: usize,
    tile_width: u32,
    tile_height: u32,
) -> Result<(), QuantizeError> {
    if width == 0 || height == 0 {
        return Err(QuantizeError::ZeroDimension);
    }
    if len != width * height {
        return Err(QuantizeError::DimensionMismatch { len, width, height });
    }
    if width % tile_width as usize != 0 || height % tile_height as usize != 0 {
        return Err(QuantizeError::InvalidDimensions {
            width,
            height,
            tile_width,
            tile_height,
        });
    }
    Ok(())
}

/// Per-pixel transparency mask, decided against the source buffer so that
/// later preprocessing cannot disturb key-color matches.
pub(crate) fn transparency_mask(pixels: &[RGBA<u8>], transparency: Transparency) -> Vec<bool> {
    pixels
        .iter()
        .map(|&p| transparency.is_transparent(p))
        .collect()
}

fn pack(pixel: RGBA<u8>) -> u32 {
    (pixel.r as u32) << 16 | (pixel.g as u32) << 8 | pixel.b as u32
}

fn unpack(key: u32) -> Rgbf {
    [
        ((key >> 16) & 0xff) as f32,
        ((key >> 8) & 0xff) as f32,
        (key & 0xff) as f32,
    ]
}

/// Partition the buffer into row-major tiles, each with its color multiset.
/// Dimensions must already be validated as exact tile multiples.
pub(crate) fn extract_tiles(
    pixels: &[RGBA<u8>],
    width: usize,
    height: usize,
    tile_width: u32,
    tile_height: u32,
    mask: &[bool],
) -> Vec<Tile> {
    let tw = tile_width as usize;
    let th = tile_height as usize;
    let tiles_x = width / tw;
    let tiles_y = height / th;

    let mut tiles = Vec::with_capacity(tiles_x * tiles_y);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            // BTreeMap keeps the color order deterministic.
            let mut counts: BTreeMap<u32, u32> = BTreeMap::new();
            let mut transparent = 0u32;
            for y in ty * th..(ty + 1) * th {
                for x in tx * tw..(tx + 1) * tw {
                    let i = y * width + x;
                    if mask[i] {
                        transparent += 1;
                    } else {
                        *counts.entry(pack(pixels[i])).or_insert(0) += 1;
                    }
                }
            }
            let colors = counts
                .into_iter()
                .map(|(key, count)| TileColor {
                    rgb: unpack(key),
                    count,
                })
                .collect();
            tiles.push(Tile {
                colors,
                transparent,
            });
        }
    }
    tiles
}

/// Flatten every opaque pixel into a refinement sample.
pub(crate) fn collect_samples(
    pixels: &[RGBA<u8>],
    width: usize,
    tile_width: u32,
    tile_height: u32,
    mask: &[bool],
) -> Vec<Sample> {
    let tw = tile_width as usize;
    let th = tile_height as usize;
    let tiles_x = width / tw;

    let mut samples = Vec::with_capacity(pixels.len());
    for (i, pixel) in pixels.iter().enumerate() {
        if mask[i] {
            continue;
        }
        let x = i % width;
        let y = i / width;
        let tile = (y / th) * tiles_x + x / tw;
        samples.push(Sample {
            rgb: [pixel.r as f32, pixel.g as f32, pixel.b as f32],
            tile: tile as u32,
        });
    }
    samples
}
