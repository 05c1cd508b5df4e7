#![forbid(unsafe_code)]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod cluster;
pub mod compose;
pub mod dither;
pub mod error;
mod grow;
pub mod meta;
pub mod palette;
pub mod progress;
mod refine;
pub mod shuffle;
mod tiles;

pub use compose::IndexedImage;
pub use dither::{Dither, DitherMap, DitherMapSet, DitherPattern, DitherPixelType};
pub use error::QuantizeError;
pub use palette::{ColorZeroBehavior, PaletteSet};
pub use progress::{Control, NoProgress, Progress, ProgressSink};
pub use shuffle::SampleShuffler;

use alloc::string::String;
use alloc::vec::Vec;

use rgb::RGBA;

use crate::compose::DitherParams;
use crate::palette::{parse_hex_color, posterize_u8, to_rgbf, Rgbf, SlotZeroMode};
use crate::tiles::{
    check_dimensions, collect_samples, extract_tiles, transparency_mask, Tile, Transparency,
};

// Annealing schedule and replacement thresholds.
const ALPHA: f32 = 0.3;
const FINAL_ALPHA: f32 = 0.05;
const SLOW_ALPHA: f32 = 0.1;
const SLOW_FINAL_ALPHA: f32 = 0.02;
const MIN_COLOR_FACTOR: f64 = 0.5;
const MIN_PALETTE_FACTOR: f64 = 0.5;
const REPLACE_ITERATIONS: usize = 10;
const FINAL_BLOCKS: usize = 10;
const CORRECTIVE_PASSES: usize = 3;

/// Configuration for tile-constrained palette quantization.
#[derive(Debug, Clone)]
pub struct QuantizeConfig {
    /// Tile width in pixels (1..=32). Image width must be a multiple.
    pub tile_width: u32,
    /// Tile height in pixels (1..=32). Image height must be a multiple.
    pub tile_height: u32,
    /// Number of palettes tiles may choose from (1..=16).
    pub palette_count: u32,
    /// Color slots per palette, including the reserved slot (2..=256).
    pub colors_per_palette: u32,
    /// Output bit depth per channel (2..=8).
    pub bits_per_channel: u32,
    /// Samples per refinement block as a fraction of the image (0.01..=10.0).
    pub fraction_of_pixels: f32,
    /// Ordered dithering mode.
    pub dither: Dither,
    /// 2x2 dither pattern, used when dithering is on.
    pub dither_pattern: DitherPattern,
    /// Penalty on visible noise when pairing dither colors (0.01..=1.0).
    pub dither_weight: f32,
    /// Semantics of the reserved first palette slot.
    pub color_zero: ColorZeroBehavior,
    /// Hex color mirrored into slot 0 of every palette (Shared policy).
    pub shared_color: String,
    /// Hex key color mapped to the transparent slot (TransparentFromColor).
    pub transparent_color: String,
    /// Shuffler seed. Drawn process-random when absent.
    pub seed: Option<u64>,
    /// Attach a non-dithered preview index buffer to progress events.
    pub progress_previews: bool,
}

impl Default for QuantizeConfig {
    fn default() -> Self {
        Self {
            tile_width: 8,
            tile_height: 8,
            palette_count: 8,
            colors_per_palette: 4,
            bits_per_channel: 5,
            fraction_of_pixels: 0.1,
            dither: Dither::Off,
            dither_pattern: DitherPattern::Diagonal4,
            dither_weight: 0.5,
            color_zero: ColorZeroBehavior::Unique,
            shared_color: String::from("#000000"),
            transparent_color: String::from("#000000"),
            seed: None,
            progress_previews: false,
        }
    }
}

impl QuantizeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tile_size(mut self, width: u32, height: u32) -> Self {
        self.tile_width = width;
        self.tile_height = height;
        self
    }

    pub fn palette_count(mut self, n: u32) -> Self {
        self.palette_count = n;
        self
    }

    pub fn colors_per_palette(mut self, n: u32) -> Self {
        self.colors_per_palette = n;
        self
    }

    pub fn bits_per_channel(mut self, bits: u32) -> Self {
        self.bits_per_channel = bits;
        self
    }

    pub fn fraction_of_pixels(mut self, fraction: f32) -> Self {
        self.fraction_of_pixels = fraction;
        self
    }

    pub fn dither(mut self, mode: Dither) -> Self {
        self.dither = mode;
        self
    }

    pub fn dither_pattern(mut self, pattern: DitherPattern) -> Self {
        self.dither_pattern = pattern;
        self
    }

    pub fn dither_weight(mut self, weight: f32) -> Self {
        self.dither_weight = weight;
        self
    }

    pub fn color_zero(mut self, behavior: ColorZeroBehavior) -> Self {
        self.color_zero = behavior;
        self
    }

    pub fn shared_color(mut self, hex: impl Into<String>) -> Self {
        self.shared_color = hex.into();
        self
    }

    pub fn transparent_color(mut self, hex: impl Into<String>) -> Self {
        self.transparent_color = hex.into();
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn progress_previews(mut self, enabled: bool) -> Self {
        self.progress_previews = enabled;
        self
    }
}

/// Quantization result.
#[derive(Debug)]
pub struct QuantizeResult {
    palettes: Vec<Vec<[u8; 3]>>,
    palettes_rgba: Vec<Vec<[u8; 4]>>,
    indexed: IndexedImage,
    mse: f64,
    cancelled: bool,
}

impl QuantizeResult {
    /// Final palette table, 8 bits per channel.
    pub fn palettes(&self) -> &[Vec<[u8; 3]>] {
        &self.palettes
    }

    /// Palette table with alpha: 0 for a fixed transparent slot 0,
    /// 255 everywhere else.
    pub fn palettes_rgba(&self) -> &[Vec<[u8; 4]>] {
        &self.palettes_rgba
    }

    /// Palette index for each tile, row-major.
    pub fn tile_palettes(&self) -> &[u8] {
        self.indexed.tile_palettes()
    }

    /// Color index within the owning tile's palette, one per pixel.
    pub fn pixel_indices(&self) -> &[u8] {
        self.indexed.pixel_indices()
    }

    pub fn indexed(&self) -> &IndexedImage {
        &self.indexed
    }

    pub fn tiles_x(&self) -> usize {
        self.indexed.tiles_x()
    }

    pub fn tiles_y(&self) -> usize {
        self.indexed.tiles_y()
    }

    /// Mean square error of the returned solution against the working
    /// pixel buffer.
    pub fn mean_square_error(&self) -> f64 {
        self.mse
    }

    /// Whether the run stopped at a cancellation checkpoint. The result
    /// still holds the best solution seen up to that point.
    pub fn cancelled(&self) -> bool {
        self.cancelled
    }
}

/// Validated, resolved configuration details.
struct Resolved {
    zero: SlotZeroMode,
    shared_seed: Option<Rgbf>,
    transparency: Transparency,
    dither: Option<DitherParams>,
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), QuantizeError> {
    if value < min || value > max {
        return Err(QuantizeError::OutOfRange {
            field,
            min,
            max,
            value,
        });
    }
    Ok(())
}

fn validate_config(config: &QuantizeConfig) -> Result<Resolved, QuantizeError> {
    check_range("tile_width", config.tile_width as f64, 1.0, 32.0)?;
    check_range("tile_height", config.tile_height as f64, 1.0, 32.0)?;
    check_range("palette_count", config.palette_count as f64, 1.0, 16.0)?;
    check_range(
        "colors_per_palette",
        config.colors_per_palette as f64,
        2.0,
        256.0,
    )?;
    check_range("bits_per_channel", config.bits_per_channel as f64, 2.0, 8.0)?;
    check_range(
        "fraction_of_pixels",
        config.fraction_of_pixels as f64,
        0.01,
        10.0,
    )?;
    check_range("dither_weight", config.dither_weight as f64, 0.01, 1.0)?;

    // Every policy needs two trainable slots to optimize against.
    let required = match config.color_zero {
        ColorZeroBehavior::Unique => 2,
        _ => 3,
    };
    if config.colors_per_palette < required {
        return Err(QuantizeError::InvalidColorZeroConfiguration {
            behavior: config.color_zero,
            required,
            got: config.colors_per_palette,
        });
    }

    let (zero, shared_seed, transparency) = match config.color_zero {
        ColorZeroBehavior::Unique => (SlotZeroMode::Free, None, Transparency::Opaque),
        ColorZeroBehavior::Shared => {
            let shared = parse_hex_color(&config.shared_color)?;
            (
                SlotZeroMode::Shared,
                Some(to_rgbf(shared)),
                Transparency::Opaque,
            )
        }
        ColorZeroBehavior::TransparentFromTransparent => (
            SlotZeroMode::Fixed([0.0; 3]),
            None,
            Transparency::AlphaZero,
        ),
        ColorZeroBehavior::TransparentFromColor => {
            let key = parse_hex_color(&config.transparent_color)?;
            (
                SlotZeroMode::Fixed(to_rgbf(key)),
                None,
                Transparency::Key(key),
            )
        }
    };

    let dither = if config.dither != Dither::Off {
        let map = dither::resolve_map(config.dither_pattern)?;
        Some(DitherParams {
            map,
            bins: config.dither_pattern.pixel_type().bins(),
            weight: config.dither_weight,
        })
    } else {
        None
    };

    Ok(Resolved {
        zero,
        shared_seed,
        transparency,
        dither,
    })
}

/// Everything the pipeline's later stages need, borrowed once.
struct RunCtx<'a> {
    work: &'a [RGBA<u8>],
    mask: &'a [bool],
    tiles: &'a [Tile],
    width: usize,
    height: usize,
    tile_width: u32,
    tile_height: u32,
    bits: u32,
    posterize_output: bool,
    dither: Option<DitherParams>,
}

impl RunCtx<'_> {
    fn compose(&self, set: &PaletteSet, dithered: bool) -> IndexedImage {
        compose::compose(
            set,
            self.work,
            self.mask,
            self.width,
            self.height,
            self.tile_width,
            self.tile_height,
            self.tiles,
            if dithered { self.dither.as_ref() } else { None },
        )
    }
}

fn finalize(mut set: PaletteSet, ctx: &RunCtx<'_>, cancelled: bool) -> QuantizeResult {
    if ctx.posterize_output {
        set.posterize(ctx.bits);
    }
    let indexed = ctx.compose(&set, true);
    let mse = refine::mean_square_error(&set, ctx.tiles);
    QuantizeResult {
        palettes: set.output_rgb(),
        palettes_rgba: set.output_rgba(),
        indexed,
        mse,
        cancelled,
    }
}

/// Clamps reported percentages to a monotone sequence and builds previews
/// when they are enabled.
struct Reporter<'a> {
    sink: &'a mut dyn ProgressSink,
    previews: bool,
    last: f32,
}

impl Reporter<'_> {
    fn checkpoint(&mut self, percent: f32, set: &PaletteSet, ctx: &RunCtx<'_>) -> Control {
        let percent = percent.max(self.last);
        self.last = percent;
        let preview = if self.previews {
            Some(ctx.compose(set, false))
        } else {
            None
        };
        self.sink.report(Progress {
            percent,
            palettes: set,
            preview: preview.as_ref(),
        })
    }
}

/// Quantize an RGBA image to per-tile palettes.
pub fn quantize(
    pixels: &[RGBA<u8>],
    width: usize,
    height: usize,
    config: &QuantizeConfig,
) -> Result<QuantizeResult, QuantizeError> {
    let mut sink = NoProgress;
    quantize_with_progress(pixels, width, height, config, &mut sink)
}

/// Quantize with progress reporting and cooperative cancellation. The sink
/// is invoked at every checkpoint; returning [`Control::Cancel`] stops the
/// run at the next block boundary and yields the best solution seen.
pub fn quantize_with_progress(
    pixels: &[RGBA<u8>],
    width: usize,
    height: usize,
    config: &QuantizeConfig,
    sink: &mut dyn ProgressSink,
) -> Result<QuantizeResult, QuantizeError> {
    let resolved = validate_config(config)?;
    check_dimensions(
        pixels.len(),
        width,
        height,
        config.tile_width,
        config.tile_height,
    )?;

    let use_dither = resolved.dither.is_some();
    let mask = transparency_mask(pixels, resolved.transparency);

    // Without dithering the engine optimizes against pixels already at the
    // output bit depth; with dithering the pixels keep full precision and
    // quantization error is distributed spatially instead.
    let work: Vec<RGBA<u8>> = if use_dither {
        pixels.to_vec()
    } else {
        let bits = config.bits_per_channel;
        pixels
            .iter()
            .map(|&p| RGBA {
                r: posterize_u8(p.r, bits),
                g: posterize_u8(p.g, bits),
                b: posterize_u8(p.b, bits),
                a: p.a,
            })
            .collect()
    };

    let tiles = extract_tiles(
        &work,
        width,
        height,
        config.tile_width,
        config.tile_height,
        &mask,
    );
    let samples = collect_samples(&work, width, config.tile_width, config.tile_height, &mask);

    if !tiles.is_empty() {
        let avg = tiles.iter().map(|t| t.colors.len()).sum::<usize>() as f64 / tiles.len() as f64;
        log::debug!("colors per tile: {avg:.2}");
    }

    let mut iterations = (config.fraction_of_pixels as f64 * (width * height) as f64) as usize;
    let (mut alpha, mut final_alpha) = (ALPHA, FINAL_ALPHA);
    if config.dither == Dither::Slow {
        iterations /= 5;
        alpha = SLOW_ALPHA;
        final_alpha = SLOW_FINAL_ALPHA;
    }
    let iterations = iterations.max(1);

    let seed = config.seed.unwrap_or_else(shuffle::entropy_seed);
    let mut shuffler = SampleShuffler::new(samples.len(), seed);

    let ctx = RunCtx {
        work: &work,
        mask: &mask,
        tiles: &tiles,
        width,
        height,
        tile_width: config.tile_width,
        tile_height: config.tile_height,
        bits: config.bits_per_channel,
        posterize_output: !use_dither,
        dither: resolved.dither,
    };
    let mut reporter = Reporter {
        sink,
        previews: config.progress_previews,
        last: 0.0,
    };

    let target = config.colors_per_palette as usize;
    let marks: [f32; 4] = [25.0, 65.0, 90.0, if use_dither { 94.0 } else { 100.0 }];

    // Growing: cluster tiles for the initial colors, then add one slot per
    // palette at a time, settling after each addition.
    let mut set = cluster::initialize_palettes(
        &tiles,
        config.palette_count as usize,
        resolved.zero,
        resolved.shared_seed,
    );
    let pct = marks[0] * set.colors_per_palette() as f32 / target as f32;
    if reporter.checkpoint(pct, &set, &ctx) == Control::Cancel {
        return Ok(finalize(set, &ctx, true));
    }
    while set.colors_per_palette() < target {
        let (assignment, _) = refine::assign_tiles(&set, &tiles);
        grow::expand_palettes_by_one(&mut set, &tiles, &assignment);
        if !samples.is_empty() {
            let (assignment, _) = refine::assign_tiles(&set, &tiles);
            refine::anneal_block(&mut set, &samples, &mut shuffler, &assignment, iterations, alpha);
        }
        let pct = marks[0] * set.colors_per_palette() as f32 / target as f32;
        if reporter.checkpoint(pct, &set, &ctx) == Control::Cancel {
            return Ok(finalize(set, &ctx, true));
        }
    }

    // Annealing, replace phase: evict weak colors, then one block of online
    // updates. The lowest-error snapshot is kept aside the whole way.
    let mut min_mse = refine::mean_square_error(&set, &tiles);
    let mut best = set.clone();
    for i in 0..REPLACE_ITERATIONS {
        refine::replace_weakest_colors(&mut set, &tiles, MIN_COLOR_FACTOR, MIN_PALETTE_FACTOR);
        if !samples.is_empty() {
            let (assignment, _) = refine::assign_tiles(&set, &tiles);
            refine::anneal_block(&mut set, &samples, &mut shuffler, &assignment, iterations, alpha);
        }
        let mse = refine::mean_square_error(&set, &tiles);
        if mse < min_mse {
            min_mse = mse;
            best = set.clone();
        }
        log::debug!("replace iteration {}: mse {:.1}", i + 1, mse);
        let pct = marks[0] + (marks[1] - marks[0]) * (i + 1) as f32 / REPLACE_ITERATIONS as f32;
        if reporter.checkpoint(pct, &set, &ctx) == Control::Cancel {
            return Ok(finalize(best, &ctx, true));
        }
    }
    set = best.clone();

    // Annealing, final phase: ten times the block budget at the low
    // learning rate.
    for block in 0..FINAL_BLOCKS {
        if !samples.is_empty() {
            let (assignment, _) = refine::assign_tiles(&set, &tiles);
            refine::anneal_block(
                &mut set,
                &samples,
                &mut shuffler,
                &assignment,
                iterations,
                final_alpha,
            );
        }
        let mse = refine::mean_square_error(&set, &tiles);
        if mse < min_mse {
            min_mse = mse;
            best = set.clone();
        }
        let pct = marks[1] + (marks[2] - marks[1]) * (block + 1) as f32 / FINAL_BLOCKS as f32;
        if reporter.checkpoint(pct, &set, &ctx) == Control::Cancel {
            return Ok(finalize(best, &ctx, true));
        }
    }
    set = best;
    log::debug!("refinement converged: mse {min_mse:.1}");

    // Bit depth recovery: posterize, correct, posterize. Dithered output
    // keeps full-precision palettes.
    if !use_dither {
        set.posterize(config.bits_per_channel);
        for pass in 0..CORRECTIVE_PASSES {
            refine::kmeans_pass(&mut set, &tiles);
            let pct = marks[2] + (marks[3] - marks[2]) * (pass + 1) as f32 / CORRECTIVE_PASSES as f32;
            if reporter.checkpoint(pct, &set, &ctx) == Control::Cancel {
                return Ok(finalize(set, &ctx, true));
            }
        }
        set.posterize(config.bits_per_channel);
    }

    let indexed = ctx.compose(&set, true);
    let mse = refine::mean_square_error(&set, &tiles);
    log::debug!("final mse {mse:.2}");
    let _ = reporter.sink.report(Progress {
        percent: 100.0,
        palettes: &set,
        preview: Some(&indexed),
    });

    Ok(QuantizeResult {
        palettes: set.output_rgb(),
        palettes_rgba: set.output_rgba(),
        indexed,
        mse,
        cancelled: false,
    })
}
