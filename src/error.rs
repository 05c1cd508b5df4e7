extern crate alloc;
use alloc::string::String;

use thiserror::Error;

use crate::dither::DitherPattern;
use crate::palette::ColorZeroBehavior;

#[derive(Debug, Error)]
pub enum QuantizeError {
    #[error("image dimensions cannot be zero")]
    ZeroDimension,

    #[error("pixel buffer length {len} does not match dimensions {width}x{height}")]
    DimensionMismatch {
        len: usize,
        width: usize,
        height: usize,
    },

    #[error("image {width}x{height} is not an exact multiple of the {tile_width}x{tile_height} tile size")]
    InvalidDimensions {
        width: usize,
        height: usize,
        tile_width: u32,
        tile_height: u32,
    },

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },

    #[error("{behavior:?} needs at least {required} colors per palette, got {got}")]
    InvalidColorZeroConfiguration {
        behavior: ColorZeroBehavior,
        required: u32,
        got: u32,
    },

    #[error("dither pattern {0:?} has no map for its pixel type")]
    UnsupportedPattern(DitherPattern),

    #[error("invalid hex color {0:?}, expected #RRGGBB")]
    InvalidHexColor(String),
}
