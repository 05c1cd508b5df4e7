use crate::error::QuantizeError;

/// Dithering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dither {
    /// No dithering. Raw pixels and palette colors are posterized.
    Off,
    /// Ordered dithering with the normal refinement budget.
    Fast,
    /// Ordered dithering with a reduced budget and lower learning rate.
    Slow,
}

/// 2x2 ordered-dither pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DitherPattern {
    Diagonal4,
    Horizontal4,
    Vertical4,
    Diagonal2,
    Horizontal2,
    Vertical2,
}

/// Symmetry class of a dither pattern: how many intensity bins a pixel
/// position selects between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DitherPixelType {
    /// 1-fold symmetric patterns, 2 bins.
    Type2,
    /// 2-fold symmetric patterns, 4 bins.
    Type4,
}

impl DitherPattern {
    /// Pixel type implied by the pattern's fold count.
    pub fn pixel_type(self) -> DitherPixelType {
        match self {
            Self::Diagonal4 | Self::Horizontal4 | Self::Vertical4 => DitherPixelType::Type4,
            Self::Diagonal2 | Self::Horizontal2 | Self::Vertical2 => DitherPixelType::Type2,
        }
    }
}

impl DitherPixelType {
    /// Number of intensity quantization bins.
    pub fn bins(self) -> u8 {
        match self {
            Self::Type2 => 2,
            Self::Type4 => 4,
        }
    }
}

/// Fixed 2x2 matrix of rank values ordering the dither thresholds for one
/// pattern. Rank at (x mod 2, y mod 2) selects the pixel's intensity bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DitherMap {
    map: [[u8; 2]; 2],
}

impl DitherMap {
    const fn from_rows(map: [[u8; 2]; 2]) -> Self {
        Self { map }
    }

    pub fn of(pattern: DitherPattern) -> Self {
        match pattern {
            DitherPattern::Diagonal4 => Self::from_rows([[0, 2], [3, 1]]),
            DitherPattern::Horizontal4 => Self::from_rows([[0, 3], [1, 2]]),
            DitherPattern::Vertical4 => Self::from_rows([[0, 1], [3, 2]]),
            DitherPattern::Diagonal2 => Self::from_rows([[0, 1], [1, 0]]),
            DitherPattern::Horizontal2 => Self::from_rows([[0, 1], [0, 1]]),
            DitherPattern::Vertical2 => Self::from_rows([[0, 0], [1, 1]]),
        }
    }

    /// Rank for the pixel at image coordinates (x, y).
    pub fn rank(&self, x: usize, y: usize) -> u8 {
        self.map[y & 1][x & 1]
    }
}

/// Lookup from pattern to map, keyed by symmetry type. Each type only
/// carries the patterns declared for it; Vertical4 belongs to no set.
#[derive(Debug, Clone, Copy)]
pub struct DitherMapSet {
    patterns: &'static [DitherPattern],
}

impl DitherMapSet {
    pub fn for_type(pixel_type: DitherPixelType) -> Self {
        let patterns: &'static [DitherPattern] = match pixel_type {
            DitherPixelType::Type2 => &[
                DitherPattern::Diagonal2,
                DitherPattern::Horizontal2,
                DitherPattern::Vertical2,
            ],
            DitherPixelType::Type4 => &[DitherPattern::Diagonal4, DitherPattern::Horizontal4],
        };
        Self { patterns }
    }

    pub fn get(&self, pattern: DitherPattern) -> Result<DitherMap, QuantizeError> {
        if self.patterns.contains(&pattern) {
            Ok(DitherMap::of(pattern))
        } else {
            Err(QuantizeError::UnsupportedPattern(pattern))
        }
    }
}

/// Resolve a pattern to its map through the set for its derived pixel type.
pub(crate) fn resolve_map(pattern: DitherPattern) -> Result<DitherMap, QuantizeError> {
    DitherMapSet::for_type(pattern.pixel_type()).get(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagonal4_matrix() {
        let map = DitherMap::of(DitherPattern::Diagonal4);
        assert_eq!(map.rank(0, 0), 0);
        assert_eq!(map.rank(1, 0), 2);
        assert_eq!(map.rank(0, 1), 3);
        assert_eq!(map.rank(1, 1), 1);
        // Wraps modulo 2.
        assert_eq!(map.rank(2, 2), 0);
        assert_eq!(map.rank(3, 5), 1);
    }

    #[test]
    fn horizontal2_alternates_by_column() {
        let map = DitherMap::of(DitherPattern::Horizontal2);
        for y in 0..4 {
            assert_eq!(map.rank(0, y), 0);
            assert_eq!(map.rank(1, y), 1);
        }
    }

    #[test]
    fn pattern_pixel_types() {
        assert_eq!(
            DitherPattern::Diagonal4.pixel_type(),
            DitherPixelType::Type4
        );
        assert_eq!(
            DitherPattern::Vertical2.pixel_type(),
            DitherPixelType::Type2
        );
        assert_eq!(DitherPixelType::Type2.bins(), 2);
        assert_eq!(DitherPixelType::Type4.bins(), 4);
    }

    #[test]
    fn vertical4_is_unsupported() {
        assert!(matches!(
            resolve_map(DitherPattern::Vertical4),
            Err(QuantizeError::UnsupportedPattern(DitherPattern::Vertical4))
        ));
    }

    #[test]
    fn type2_rejects_type4_patterns() {
        let set = DitherMapSet::for_type(DitherPixelType::Type2);
        assert!(set.get(DitherPattern::Diagonal4).is_err());
        assert!(set.get(DitherPattern::Diagonal2).is_ok());
    }
}
