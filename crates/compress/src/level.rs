//! Compression levels and their per-codec numeric mapping.

use std::{fmt, num::NonZeroU8, ops::RangeInclusive};

use crate::algorithm::CodecId;

const GZIP_LEVELS: RangeInclusive<u32> = 1..=9;
const ZSTD_LEVELS: RangeInclusive<u32> = 1..=22;

/// Compression levels recognised by every encoder.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CompressionLevel {
    /// Favour speed over compression ratio.
    Fast,
    /// Use the codec's default balance between speed and ratio.
    #[default]
    Default,
    /// Favour the best possible compression ratio.
    Best,
    /// Use an explicit codec level.
    Precise(NonZeroU8),
}

impl CompressionLevel {
    /// Validates `level` against the range accepted by `codec`.
    ///
    /// gzip accepts `1..=9` and zstd `1..=22`. The pass-through codec ignores
    /// levels entirely, so any value maps to [`CompressionLevel::Default`].
    pub fn for_codec(codec: CodecId, level: u32) -> Result<Self, CompressionLevelError> {
        let Some(range) = level_range(codec) else {
            return Ok(Self::Default);
        };
        if !range.contains(&level) {
            return Err(CompressionLevelError::new(codec, level));
        }
        u8::try_from(level)
            .ok()
            .and_then(NonZeroU8::new)
            .map(Self::Precise)
            .ok_or(CompressionLevelError::new(codec, level))
    }

    /// Constructs a [`CompressionLevel::Precise`] variant from the provided level.
    #[must_use]
    pub const fn precise(level: NonZeroU8) -> Self {
        Self::Precise(level)
    }

    /// Returns the numeric level handed to `codec`'s encoder.
    ///
    /// Precise levels above the codec maximum are clamped. The pass-through
    /// codec always reports `0`.
    #[must_use]
    pub fn numeric_for(self, codec: CodecId) -> i32 {
        let (fast, default, best) = match codec {
            CodecId::Gzip => (1, 6, 9),
            CodecId::Zstd => (1, 3, 19),
            CodecId::None => return 0,
        };
        match self {
            Self::Fast => fast,
            Self::Default => default,
            Self::Best => best,
            Self::Precise(value) => {
                let max = level_range(codec).map_or(0, |range| *range.end());
                i32::from(value.get()).min(max as i32)
            }
        }
    }
}

/// Returns the accepted numeric range for `codec`, or `None` for the pass-through codec.
#[must_use]
pub fn level_range(codec: CodecId) -> Option<RangeInclusive<u32>> {
    match codec {
        CodecId::Gzip => Some(GZIP_LEVELS),
        CodecId::Zstd => Some(ZSTD_LEVELS),
        CodecId::None => None,
    }
}

/// Error returned when a requested compression level falls outside the
/// codec's permissible range.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CompressionLevelError {
    codec: CodecId,
    level: u32,
}

impl CompressionLevelError {
    const fn new(codec: CodecId, level: u32) -> Self {
        Self { codec, level }
    }

    /// Returns the codec the level was validated against.
    #[must_use]
    pub const fn codec(&self) -> CodecId {
        self.codec
    }

    /// Returns the invalid compression level that triggered the error.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }
}

impl fmt::Display for CompressionLevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match level_range(self.codec) {
            Some(range) => write!(
                f,
                "compression level {} is outside the supported {} range {}-{}",
                self.level,
                self.codec,
                range.start(),
                range.end()
            ),
            None => write!(f, "compression level {} is not valid", self.level),
        }
    }
}

impl std::error::Error for CompressionLevelError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gzip_accepts_one_through_nine() {
        for level in 1..=9 {
            let parsed = CompressionLevel::for_codec(CodecId::Gzip, level).expect("valid level");
            assert_eq!(parsed.numeric_for(CodecId::Gzip), level as i32);
        }
    }

    #[test]
    fn gzip_rejects_out_of_range() {
        let err = CompressionLevel::for_codec(CodecId::Gzip, 10).expect_err("above 9");
        assert_eq!(err.level(), 10);
        assert_eq!(err.codec(), CodecId::Gzip);
        assert_eq!(
            err.to_string(),
            "compression level 10 is outside the supported gzip range 1-9"
        );
        assert!(CompressionLevel::for_codec(CodecId::Gzip, 0).is_err());
    }

    #[test]
    fn zstd_accepts_extended_range() {
        let level = CompressionLevel::for_codec(CodecId::Zstd, 22).expect("valid");
        assert_eq!(level.numeric_for(CodecId::Zstd), 22);
        assert!(CompressionLevel::for_codec(CodecId::Zstd, 23).is_err());
    }

    #[test]
    fn none_ignores_level() {
        let level = CompressionLevel::for_codec(CodecId::None, 999).expect("ignored");
        assert_eq!(level, CompressionLevel::Default);
        assert_eq!(level.numeric_for(CodecId::None), 0);
    }

    #[test]
    fn named_levels_map_per_codec() {
        assert_eq!(CompressionLevel::Default.numeric_for(CodecId::Gzip), 6);
        assert_eq!(CompressionLevel::Default.numeric_for(CodecId::Zstd), 3);
        assert_eq!(CompressionLevel::Best.numeric_for(CodecId::Zstd), 19);
        assert_eq!(CompressionLevel::Fast.numeric_for(CodecId::Gzip), 1);
    }

    #[test]
    fn precise_levels_clamp_to_codec_maximum() {
        let level = CompressionLevel::precise(NonZeroU8::new(19).expect("non-zero"));
        assert_eq!(level.numeric_for(CodecId::Zstd), 19);
        assert_eq!(level.numeric_for(CodecId::Gzip), 9);
    }
}
