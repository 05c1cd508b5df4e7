use rgb::RGBA;
use zentile::{ColorZeroBehavior, Dither, DitherPattern, QuantizeConfig, QuantizeError};

fn rgba(r: u8, g: u8, b: u8, a: u8) -> RGBA<u8> {
    RGBA { r, g, b, a }
}

fn solid(width: usize, height: usize, r: u8, g: u8, b: u8) -> Vec<RGBA<u8>> {
    vec![rgba(r, g, b, 255); width * height]
}

fn gradient(width: usize, height: usize) -> Vec<RGBA<u8>> {
    let mut pixels = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let r = (x * 255 / width.max(1)) as u8;
            let g = (y * 255 / height.max(1)) as u8;
            pixels.push(rgba(r, g, 128, 255));
        }
    }
    pixels
}

#[test]
fn smoke_test_gradient() {
    let width = 32;
    let height = 32;
    let pixels = gradient(width, height);
    let config = QuantizeConfig::default().seed(7);
    let result = zentile::quantize(&pixels, width, height, &config).unwrap();

    assert_eq!(result.palettes().len(), 8);
    for palette in result.palettes() {
        assert_eq!(palette.len(), 4);
    }
    assert_eq!(result.pixel_indices().len(), width * height);
    assert_eq!(result.tile_palettes().len(), 16);
    assert_eq!(result.tiles_x(), 4);
    assert_eq!(result.tiles_y(), 4);
    for &p in result.tile_palettes() {
        assert!((p as usize) < 8);
    }
    for &i in result.pixel_indices() {
        assert!((i as usize) < 4);
    }
    assert!(!result.cancelled());
    assert!(result.mean_square_error().is_finite());
}

#[test]
fn solid_red_collapses_to_a_single_color() {
    // 4 tiles of pure red, one 2-color palette: every pixel lands on
    // index 0 and the first entry is exactly red.
    let pixels = solid(16, 16, 255, 0, 0);
    let config = QuantizeConfig::default()
        .palette_count(1)
        .colors_per_palette(2)
        .bits_per_channel(8)
        .seed(1);
    let result = zentile::quantize(&pixels, 16, 16, &config).unwrap();

    assert_eq!(result.palettes().len(), 1);
    assert_eq!(result.palettes()[0].len(), 2);
    assert_eq!(result.palettes()[0][0], [255, 0, 0]);
    assert_eq!(result.tile_palettes(), &[0, 0, 0, 0]);
    assert!(result.pixel_indices().iter().all(|&i| i == 0));
    assert_eq!(result.mean_square_error(), 0.0);
}

#[test]
fn transparent_from_color_keeps_the_key_exact() {
    // No pixel is green, so nothing maps to the key slot and refinement
    // must leave it untouched.
    let pixels = gradient(16, 16);
    let config = QuantizeConfig::default()
        .palette_count(2)
        .colors_per_palette(4)
        .color_zero(ColorZeroBehavior::TransparentFromColor)
        .transparent_color("#00FF00")
        .seed(3);
    let result = zentile::quantize(&pixels, 16, 16, &config).unwrap();

    for palette in result.palettes() {
        assert_eq!(palette[0], [0, 255, 0]);
    }
    for palette in result.palettes_rgba() {
        assert_eq!(palette[0], [0, 255, 0, 0]);
    }
    // The reserved slot is never used by opaque pixels.
    assert!(result.pixel_indices().iter().all(|&i| i >= 1));
}

#[test]
fn transparent_from_transparent_maps_alpha_zero_to_index_zero() {
    let mut pixels = gradient(16, 16);
    // Top-left tile is fully transparent.
    for y in 0..8 {
        for x in 0..8 {
            pixels[y * 16 + x] = rgba(90, 90, 90, 0);
        }
    }
    let config = QuantizeConfig::default()
        .palette_count(2)
        .colors_per_palette(4)
        .color_zero(ColorZeroBehavior::TransparentFromTransparent)
        .seed(5);
    let result = zentile::quantize(&pixels, 16, 16, &config).unwrap();

    for y in 0..16 {
        for x in 0..16 {
            let idx = result.pixel_indices()[y * 16 + x];
            if x < 8 && y < 8 {
                assert_eq!(idx, 0, "transparent pixel ({x}, {y})");
            } else {
                assert!(idx >= 1, "opaque pixel ({x}, {y}) took the reserved slot");
            }
        }
    }
    for palette in result.palettes_rgba() {
        assert_eq!(palette[0][3], 0);
    }
}

#[test]
fn shared_slot_is_identical_across_palettes() {
    let pixels = gradient(32, 32);
    let config = QuantizeConfig::default()
        .palette_count(4)
        .colors_per_palette(4)
        .color_zero(ColorZeroBehavior::Shared)
        .shared_color("#102030")
        .seed(9);
    let result = zentile::quantize(&pixels, 32, 32, &config).unwrap();

    let first = result.palettes()[0][0];
    for palette in result.palettes() {
        assert_eq!(palette[0], first);
    }
}

#[test]
fn same_seed_is_bit_identical() {
    let pixels = gradient(32, 32);
    let config = QuantizeConfig::default().seed(1234);
    let a = zentile::quantize(&pixels, 32, 32, &config).unwrap();
    let b = zentile::quantize(&pixels, 32, 32, &config).unwrap();

    assert_eq!(a.palettes(), b.palettes());
    assert_eq!(a.tile_palettes(), b.tile_palettes());
    assert_eq!(a.pixel_indices(), b.pixel_indices());
    assert_eq!(a.mean_square_error(), b.mean_square_error());
}

#[test]
fn rejects_zero_dimensions() {
    let config = QuantizeConfig::default();
    assert!(matches!(
        zentile::quantize(&[], 0, 0, &config),
        Err(QuantizeError::ZeroDimension)
    ));
}

#[test]
fn rejects_mismatched_buffer_length() {
    let pixels = solid(8, 8, 0, 0, 0);
    let config = QuantizeConfig::default();
    assert!(matches!(
        zentile::quantize(&pixels, 16, 16, &config),
        Err(QuantizeError::DimensionMismatch { .. })
    ));
}

#[test]
fn rejects_non_tile_multiple_dimensions() {
    let pixels = solid(12, 12, 0, 0, 0);
    let config = QuantizeConfig::default();
    assert!(matches!(
        zentile::quantize(&pixels, 12, 12, &config),
        Err(QuantizeError::InvalidDimensions { .. })
    ));
}

#[test]
fn rejects_out_of_range_settings() {
    let pixels = solid(16, 16, 0, 0, 0);

    let config = QuantizeConfig::default().palette_count(17);
    assert!(matches!(
        zentile::quantize(&pixels, 16, 16, &config),
        Err(QuantizeError::OutOfRange {
            field: "palette_count",
            ..
        })
    ));

    let config = QuantizeConfig::default().colors_per_palette(1);
    assert!(matches!(
        zentile::quantize(&pixels, 16, 16, &config),
        Err(QuantizeError::OutOfRange {
            field: "colors_per_palette",
            ..
        })
    ));

    let config = QuantizeConfig::default().bits_per_channel(9);
    assert!(matches!(
        zentile::quantize(&pixels, 16, 16, &config),
        Err(QuantizeError::OutOfRange {
            field: "bits_per_channel",
            ..
        })
    ));

    let config = QuantizeConfig::default().fraction_of_pixels(0.001);
    assert!(matches!(
        zentile::quantize(&pixels, 16, 16, &config),
        Err(QuantizeError::OutOfRange {
            field: "fraction_of_pixels",
            ..
        })
    ));
}

#[test]
fn rejects_too_small_palette_for_reserved_slot() {
    let pixels = solid(16, 16, 0, 0, 0);
    for behavior in [
        ColorZeroBehavior::Shared,
        ColorZeroBehavior::TransparentFromTransparent,
        ColorZeroBehavior::TransparentFromColor,
    ] {
        let config = QuantizeConfig::default()
            .colors_per_palette(2)
            .color_zero(behavior);
        assert!(
            matches!(
                zentile::quantize(&pixels, 16, 16, &config),
                Err(QuantizeError::InvalidColorZeroConfiguration { .. })
            ),
            "{behavior:?} accepted 2 colors per palette"
        );
    }
}

#[test]
fn rejects_vertical4_when_dithering() {
    let pixels = solid(16, 16, 0, 0, 0);
    let config = QuantizeConfig::default()
        .dither(Dither::Fast)
        .dither_pattern(DitherPattern::Vertical4);
    assert!(matches!(
        zentile::quantize(&pixels, 16, 16, &config),
        Err(QuantizeError::UnsupportedPattern(DitherPattern::Vertical4))
    ));

    // Without dithering the pattern is never consulted.
    let config = QuantizeConfig::default().dither_pattern(DitherPattern::Vertical4);
    assert!(zentile::quantize(&pixels, 16, 16, &config).is_ok());
}

#[test]
fn rejects_malformed_hex_colors() {
    let pixels = solid(16, 16, 0, 0, 0);
    let config = QuantizeConfig::default()
        .color_zero(ColorZeroBehavior::Shared)
        .shared_color("#12z456");
    assert!(matches!(
        zentile::quantize(&pixels, 16, 16, &config),
        Err(QuantizeError::InvalidHexColor(_))
    ));
}
