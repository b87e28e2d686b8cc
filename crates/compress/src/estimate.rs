//! Fixed-ratio compressed size estimates used for capacity planning.

use crate::algorithm::CodecId;

const PER_MILLE: u64 = 1000;

/// Expected compressed size per thousand input bytes.
const fn ratio_per_mille(codec: CodecId) -> u64 {
    match codec {
        CodecId::Gzip => 400,
        CodecId::Zstd => 350,
        CodecId::None => 1000,
    }
}

/// Returns the planning ratio for `codec` as a fraction of the input size.
#[must_use]
pub fn ratio(codec: CodecId) -> f64 {
    ratio_per_mille(codec) as f64 / PER_MILLE as f64
}

/// Estimates the compressed size of `uncompressed` bytes under `codec`.
///
/// The result is `floor(uncompressed * ratio)`. It is a planning figure, not
/// a bound on what the encoder produces.
#[must_use]
pub fn estimate(codec: CodecId, uncompressed: u64) -> u64 {
    let scaled =
        u128::from(uncompressed) * u128::from(ratio_per_mille(codec)) / u128::from(PER_MILLE);
    u64::try_from(scaled).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_ratios() {
        assert_eq!(estimate(CodecId::Gzip, 1000), 400);
        assert_eq!(estimate(CodecId::Zstd, 1000), 350);
        assert_eq!(estimate(CodecId::None, 1000), 1000);
    }

    #[test]
    fn zero_input_estimates_zero() {
        for codec in CodecId::ALL {
            assert_eq!(estimate(codec, 0), 0);
        }
    }

    #[test]
    fn rounds_down() {
        assert_eq!(estimate(CodecId::Gzip, 3), 1);
        assert_eq!(estimate(CodecId::Zstd, 2), 0);
    }

    #[test]
    fn large_inputs_do_not_overflow() {
        assert_eq!(estimate(CodecId::None, u64::MAX), u64::MAX);
        assert!(estimate(CodecId::Gzip, u64::MAX) < u64::MAX);
    }

    #[test]
    fn ratio_reports_fraction() {
        assert!((ratio(CodecId::Gzip) - 0.40).abs() < f64::EPSILON);
        assert!((ratio(CodecId::None) - 1.0).abs() < f64::EPSILON);
    }
}
