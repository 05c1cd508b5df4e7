/// Display metadata for one configuration field. Consumed by presentation
/// layers only; the engine itself never reads this table.
#[derive(Debug, Clone, Copy)]
pub struct FieldMeta {
    /// Field identifier, matching the `QuantizeConfig` field name.
    pub field: &'static str,
    pub description: &'static str,
    pub min: f64,
    pub max: f64,
    pub default: &'static str,
}

/// Metadata for every bounded configuration field.
pub const FIELD_METADATA: &[FieldMeta] = &[
    FieldMeta {
        field: "tile_width",
        description: "Width of one tile in pixels",
        min: 1.0,
        max: 32.0,
        default: "8",
    },
    FieldMeta {
        field: "tile_height",
        description: "Height of one tile in pixels",
        min: 1.0,
        max: 32.0,
        default: "8",
    },
    FieldMeta {
        field: "palette_count",
        description: "Number of palettes tiles may choose from",
        min: 1.0,
        max: 16.0,
        default: "8",
    },
    FieldMeta {
        field: "colors_per_palette",
        description: "Color slots per palette, including the reserved slot",
        min: 2.0,
        max: 256.0,
        default: "4",
    },
    FieldMeta {
        field: "bits_per_channel",
        description: "Output bit depth per color channel",
        min: 2.0,
        max: 8.0,
        default: "5",
    },
    FieldMeta {
        field: "fraction_of_pixels",
        description: "Samples per refinement block, as a fraction of the image",
        min: 0.01,
        max: 10.0,
        default: "0.1",
    },
    FieldMeta {
        field: "dither_weight",
        description: "Penalty on visible noise when pairing dither colors",
        min: 0.01,
        max: 1.0,
        default: "0.5",
    },
    FieldMeta {
        field: "dither",
        description: "Ordered dithering mode",
        min: 0.0,
        max: 2.0,
        default: "Off",
    },
    FieldMeta {
        field: "dither_pattern",
        description: "2x2 ordered dither pattern",
        min: 0.0,
        max: 5.0,
        default: "Diagonal4",
    },
    FieldMeta {
        field: "color_zero",
        description: "Semantics of the reserved first palette slot",
        min: 0.0,
        max: 3.0,
        default: "Unique",
    },
    FieldMeta {
        field: "shared_color",
        description: "Hex color mirrored into slot 0 of every palette",
        min: 0.0,
        max: 0.0,
        default: "#000000",
    },
    FieldMeta {
        field: "transparent_color",
        description: "Hex key color mapped to the transparent slot",
        min: 0.0,
        max: 0.0,
        default: "#000000",
    },
];

/// Look up metadata by field identifier.
pub fn field_metadata(field: &str) -> Option<&'static FieldMeta> {
    FIELD_METADATA.iter().find(|m| m.field == field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_identifier() {
        let meta = field_metadata("bits_per_channel").unwrap();
        assert_eq!(meta.default, "5");
        assert_eq!(meta.min, 2.0);
        assert_eq!(meta.max, 8.0);
        assert!(field_metadata("no_such_field").is_none());
    }
}
