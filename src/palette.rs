extern crate alloc;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use crate::error::QuantizeError;

/// Working color representation: one f32 per channel in 0..=255, kept in
/// floating point so refinement nudges are not lost to rounding.
pub type Rgbf = [f32; 3];

pub(crate) fn distance_sq(a: Rgbf, b: Rgbf) -> f32 {
    let dr = a[0] - b[0];
    let dg = a[1] - b[1];
    let db = a[2] - b[2];
    dr * dr + dg * dg + db * db
}

/// Policy governing the reserved first palette slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorZeroBehavior {
    /// Index 0 is a normal, independently optimized color.
    Unique,
    /// Index 0 is one color shared by all palettes, optimized jointly.
    Shared,
    /// Index 0 is fully transparent, fed by pixels transparent in the source.
    TransparentFromTransparent,
    /// Index 0 is a fixed key color; matching source pixels map to it.
    TransparentFromColor,
}

/// Resolved slot-zero handling inside the palette set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum SlotZeroMode {
    /// Slot 0 trains like any other color.
    Free,
    /// Slot 0 is mirrored across all palettes and trained jointly.
    Shared,
    /// Slot 0 holds this color verbatim and never moves.
    Fixed(Rgbf),
}

/// The mutable collection of palettes: central state of the optimization.
///
/// Invariant: after growth completes every palette has the same number of
/// color slots, and under `SlotZeroMode::Shared` every palette's slot 0
/// holds the same value.
#[derive(Debug, Clone)]
pub struct PaletteSet {
    palettes: Vec<Vec<Rgbf>>,
    zero: SlotZeroMode,
}

impl PaletteSet {
    pub(crate) fn new(count: usize, zero: SlotZeroMode) -> Self {
        Self {
            palettes: vec![Vec::new(); count],
            zero,
        }
    }

    pub fn palette_count(&self) -> usize {
        self.palettes.len()
    }

    /// Current slot count. Equal across palettes.
    pub fn colors_per_palette(&self) -> usize {
        self.palettes.first().map_or(0, Vec::len)
    }

    pub fn colors(&self, palette: usize) -> &[Rgbf] {
        &self.palettes[palette]
    }

    pub(crate) fn push_color(&mut self, palette: usize, rgb: Rgbf) {
        self.palettes[palette].push(rgb);
    }

    /// First slot opaque pixels may map to. The fixed transparent slot is
    /// reserved for masked pixels only.
    pub(crate) fn match_start(&self) -> usize {
        match self.zero {
            SlotZeroMode::Fixed(_) => 1,
            _ => 0,
        }
    }

    /// First slot the weak-color replacer may reseed. The shared slot is
    /// global state and never reseeded per palette.
    pub(crate) fn reseed_start(&self) -> usize {
        match self.zero {
            SlotZeroMode::Free => 0,
            _ => 1,
        }
    }

    pub(crate) fn shared_zero(&self) -> bool {
        self.zero == SlotZeroMode::Shared
    }

    /// Nearest matchable slot for an opaque pixel, with its squared
    /// distance. Ties resolve to the lowest slot.
    pub(crate) fn nearest(&self, palette: usize, rgb: Rgbf) -> (usize, f32) {
        let colors = &self.palettes[palette];
        let start = self.match_start();
        let mut best_slot = start;
        let mut best_dist = f32::MAX;
        for (slot, color) in colors.iter().enumerate().skip(start) {
            let d = distance_sq(*color, rgb);
            if d < best_dist {
                best_dist = d;
                best_slot = slot;
            }
        }
        (best_slot, best_dist)
    }

    /// Competitive-learning update: move a slot toward the sample.
    pub(crate) fn nudge(&mut self, palette: usize, slot: usize, rgb: Rgbf, alpha: f32) {
        let color = &mut self.palettes[palette][slot];
        for ch in 0..3 {
            color[ch] += alpha * (rgb[ch] - color[ch]);
        }
        if slot == 0 && self.shared_zero() {
            self.mirror_zero(palette);
        }
    }

    /// Overwrite a slot. Writes through to all palettes for the shared
    /// slot; the fixed slot is left untouched.
    pub(crate) fn set_color(&mut self, palette: usize, slot: usize, rgb: Rgbf) {
        if slot == 0 {
            if let SlotZeroMode::Fixed(_) = self.zero {
                return;
            }
        }
        self.palettes[palette][slot] = rgb;
        if slot == 0 && self.shared_zero() {
            self.mirror_zero(palette);
        }
    }

    fn mirror_zero(&mut self, source: usize) {
        let value = self.palettes[source][0];
        for palette in &mut self.palettes {
            palette[0] = value;
        }
    }

    /// Posterize every trainable color to the given bits per channel.
    /// Idempotent at a fixed bit depth; the fixed transparent slot keeps
    /// its configured value.
    pub fn posterize(&mut self, bits: u32) {
        let skip_zero = matches!(self.zero, SlotZeroMode::Fixed(_));
        for palette in &mut self.palettes {
            for (slot, color) in palette.iter_mut().enumerate() {
                if slot == 0 && skip_zero {
                    continue;
                }
                for ch in color.iter_mut() {
                    *ch = posterize_channel(*ch, bits);
                }
            }
        }
    }

    /// Palette table rounded to 8-bit channels.
    pub fn output_rgb(&self) -> Vec<Vec<[u8; 3]>> {
        self.palettes
            .iter()
            .map(|palette| palette.iter().map(|c| round_color(*c)).collect())
            .collect()
    }

    /// Palette table with alpha: 0 for the fixed transparent slot, 255
    /// everywhere else.
    pub fn output_rgba(&self) -> Vec<Vec<[u8; 4]>> {
        let transparent_zero = matches!(self.zero, SlotZeroMode::Fixed(_));
        self.palettes
            .iter()
            .map(|palette| {
                palette
                    .iter()
                    .enumerate()
                    .map(|(slot, c)| {
                        let [r, g, b] = round_color(*c);
                        let a = if slot == 0 && transparent_zero { 0 } else { 255 };
                        [r, g, b, a]
                    })
                    .collect()
            })
            .collect()
    }
}

fn round_color(c: Rgbf) -> [u8; 3] {
    [round_channel(c[0]), round_channel(c[1]), round_channel(c[2])]
}

fn round_channel(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Round one channel to the grid representable at `bits` per channel.
pub(crate) fn posterize_channel(v: f32, bits: u32) -> f32 {
    let step = 255.0 / ((1u32 << bits) - 1) as f32;
    (v / step).round() * step
}

pub(crate) fn posterize_u8(v: u8, bits: u32) -> u8 {
    round_channel(posterize_channel(v as f32, bits))
}

/// Parse a "#RRGGBB" (or "RRGGBB") color.
pub(crate) fn parse_hex_color(s: &str) -> Result<[u8; 3], QuantizeError> {
    let digits = s.strip_prefix('#').unwrap_or(s);
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(QuantizeError::InvalidHexColor(String::from(s)));
    }
    let value = u32::from_str_radix(digits, 16)
        .map_err(|_| QuantizeError::InvalidHexColor(String::from(s)))?;
    Ok([(value >> 16) as u8, (value >> 8) as u8, value as u8])
}

pub(crate) fn to_rgbf(c: [u8; 3]) -> Rgbf {
    [c[0] as f32, c[1] as f32, c[2] as f32]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_with(colors: &[Rgbf], zero: SlotZeroMode) -> PaletteSet {
        let mut set = PaletteSet::new(1, zero);
        for &c in colors {
            set.push_color(0, c);
        }
        set
    }

    #[test]
    fn posterize_two_bits_hits_the_four_levels() {
        let mut set = set_with(
            &[[10.0, 100.0, 140.0], [200.0, 250.0, 255.0]],
            SlotZeroMode::Free,
        );
        set.posterize(2);
        assert_eq!(set.colors(0)[0], [0.0, 85.0, 170.0]);
        assert_eq!(set.colors(0)[1], [170.0, 255.0, 255.0]);
    }

    #[test]
    fn posterize_is_idempotent() {
        for bits in 2..=8 {
            let mut set = set_with(&[[13.7, 199.2, 64.9], [0.0, 255.0, 128.0]], SlotZeroMode::Free);
            set.posterize(bits);
            let once = set.clone();
            set.posterize(bits);
            assert_eq!(set.colors(0), once.colors(0), "bits = {bits}");
        }
    }

    #[test]
    fn fixed_slot_survives_posterize_and_writes() {
        let key = [0.0, 255.0, 0.0];
        let mut set = set_with(&[key, [100.0, 100.0, 100.0]], SlotZeroMode::Fixed(key));
        set.posterize(3);
        set.set_color(0, 0, [9.0, 9.0, 9.0]);
        assert_eq!(set.colors(0)[0], key);
        // Opaque pixels never match slot 0.
        assert_eq!(set.match_start(), 1);
        let (slot, _) = set.nearest(0, [0.0, 250.0, 0.0]);
        assert_eq!(slot, 1);
    }

    #[test]
    fn shared_slot_mirrors_across_palettes() {
        let mut set = PaletteSet::new(3, SlotZeroMode::Shared);
        for p in 0..3 {
            set.push_color(p, [10.0, 10.0, 10.0]);
            set.push_color(p, [p as f32 * 40.0, 0.0, 0.0]);
        }
        set.nudge(1, 0, [110.0, 10.0, 10.0], 0.5);
        for p in 0..3 {
            assert_eq!(set.colors(p)[0], [60.0, 10.0, 10.0]);
        }
    }

    #[test]
    fn nudge_moves_toward_the_sample() {
        let mut set = set_with(&[[0.0, 0.0, 0.0]], SlotZeroMode::Free);
        set.nudge(0, 0, [100.0, 50.0, 10.0], 0.3);
        let c = set.colors(0)[0];
        assert!((c[0] - 30.0).abs() < 1e-4);
        assert!((c[1] - 15.0).abs() < 1e-4);
        assert!((c[2] - 3.0).abs() < 1e-4);
    }

    #[test]
    fn nearest_ties_resolve_to_lowest_slot() {
        let set = set_with(
            &[[100.0, 0.0, 0.0], [100.0, 0.0, 0.0], [0.0, 0.0, 0.0]],
            SlotZeroMode::Free,
        );
        let (slot, _) = set.nearest(0, [100.0, 0.0, 0.0]);
        assert_eq!(slot, 0);
    }

    #[test]
    fn hex_parsing() {
        assert_eq!(parse_hex_color("#00FF00").unwrap(), [0, 255, 0]);
        assert_eq!(parse_hex_color("123abc").unwrap(), [0x12, 0x3a, 0xbc]);
        assert!(parse_hex_color("#12345").is_err());
        assert!(parse_hex_color("#12345g").is_err());
        assert!(parse_hex_color("").is_err());
    }

    #[test]
    fn rgba_output_marks_transparent_zero() {
        let key = [0.0, 255.0, 0.0];
        let set = set_with(&[key, [100.0, 100.0, 100.0]], SlotZeroMode::Fixed(key));
        let rgba = set.output_rgba();
        assert_eq!(rgba[0][0], [0, 255, 0, 0]);
        assert_eq!(rgba[0][1], [100, 100, 100, 255]);
    }
}
