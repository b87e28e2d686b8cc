//! Content sniffing over the magic-number catalog.

use std::io::{self, Read};

use crate::algorithm::{self, CodecId, MAX_SIGNATURE_LEN};

/// Fewest bytes that can carry any signature. Shorter inputs are never sniffed.
pub const MIN_SNIFF_LEN: usize = 2;

/// Identifies the codec that produced `bytes` by inspecting its prefix.
///
/// Input shorter than [`MIN_SNIFF_LEN`] is reported as [`CodecId::None`]
/// without consulting the catalog. A zstd signature needs four bytes, so a
/// two or three byte prefix of the zstd magic is also [`CodecId::None`].
#[must_use]
pub fn detect_algorithm(bytes: &[u8]) -> CodecId {
    if bytes.len() < MIN_SNIFF_LEN {
        return CodecId::None;
    }
    algorithm::detect(bytes)
}

/// Returns `true` when `bytes` starts with a known compression signature.
#[must_use]
pub fn is_compressed(bytes: &[u8]) -> bool {
    !detect_algorithm(bytes).is_none()
}

/// Reads up to [`MAX_SIGNATURE_LEN`] bytes from `reader`.
///
/// Stops early only at end of input. The returned prefix must be replayed in
/// front of the remaining reader by the caller.
pub(crate) fn read_prefix<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut prefix = [0u8; MAX_SIGNATURE_LEN];
    let mut filled = 0;
    while filled < prefix.len() {
        match reader.read(&mut prefix[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(prefix[..filled].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::{GZIP_MAGIC, ZSTD_MAGIC};

    #[test]
    fn short_inputs_are_uncompressed() {
        assert_eq!(detect_algorithm(&[]), CodecId::None);
        assert_eq!(detect_algorithm(&[0x1F]), CodecId::None);
        assert_eq!(detect_algorithm(&[0x28]), CodecId::None);
    }

    #[test]
    fn gzip_needs_two_bytes() {
        assert_eq!(detect_algorithm(&GZIP_MAGIC), CodecId::Gzip);
        assert_eq!(detect_algorithm(&[0x1F, 0x8B, 0x08, 0x00]), CodecId::Gzip);
        assert!(is_compressed(&GZIP_MAGIC));
    }

    #[test]
    fn zstd_needs_four_bytes() {
        assert_eq!(detect_algorithm(&ZSTD_MAGIC[..2]), CodecId::None);
        assert_eq!(detect_algorithm(&ZSTD_MAGIC[..3]), CodecId::None);
        assert_eq!(detect_algorithm(&ZSTD_MAGIC), CodecId::Zstd);
    }

    #[test]
    fn arbitrary_text_is_uncompressed() {
        assert!(!is_compressed(b"{\"schemaVersion\":2}"));
    }

    #[test]
    fn read_prefix_stops_at_eof() {
        let mut short = &b"ab"[..];
        assert_eq!(read_prefix(&mut short).unwrap(), b"ab");
        let mut long = &b"abcdefgh"[..];
        assert_eq!(read_prefix(&mut long).unwrap(), b"abcd");
        assert_eq!(long, b"efgh");
    }
}
