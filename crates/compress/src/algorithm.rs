//! Codec identifiers, their magic-number signatures, and the per-build
//! capability set.
//!
//! The catalog is a small ordered table rather than a chain of conditionals:
//! supporting a new codec means adding one [`CodecId`] variant, one table row,
//! and one encoder/decoder adapter.

use core::fmt;
use core::str::FromStr;

/// Codecs recognised by the layer.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum CodecId {
    /// RFC 1952 gzip framing around a deflate stream.
    #[default]
    Gzip,
    /// Zstandard frames (RFC 8878).
    Zstd,
    /// Bytes stored as-is. Has no signature and is the detection fallback.
    None,
}

impl CodecId {
    /// Every codec in catalog order.
    pub const ALL: [CodecId; 3] = [CodecId::Gzip, CodecId::Zstd, CodecId::None];

    /// Returns the canonical display name used for diagnostics and metric labels.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            CodecId::Gzip => "gzip",
            CodecId::Zstd => "zstd",
            CodecId::None => "none",
        }
    }

    /// Returns `true` for the pass-through codec.
    #[must_use]
    pub const fn is_none(self) -> bool {
        matches!(self, CodecId::None)
    }

    /// Returns the magic-number signature of this codec, if it has one.
    #[must_use]
    pub fn signature(self) -> Option<&'static Signature> {
        signature_for(self)
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when attempting to parse an unknown codec name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CodecIdParseError {
    input: String,
}

impl CodecIdParseError {
    /// Creates a parse error capturing the original input.
    #[must_use]
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }

    /// Returns the invalid input.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl fmt::Display for CodecIdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported compression codec: {}", self.input)
    }
}

impl std::error::Error for CodecIdParseError {}

impl FromStr for CodecId {
    type Err = CodecIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gzip" | "gz" => Ok(CodecId::Gzip),
            "zstd" | "zst" => Ok(CodecId::Zstd),
            "none" | "identity" | "uncompressed" => Ok(CodecId::None),
            other => Err(CodecIdParseError::new(other)),
        }
    }
}

/// Fixed byte prefix identifying a codec's framing.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Signature {
    magic: &'static [u8],
}

impl Signature {
    const fn new(magic: &'static [u8]) -> Self {
        Self { magic }
    }

    /// Returns the magic bytes.
    #[must_use]
    pub const fn magic(&self) -> &'static [u8] {
        self.magic
    }

    /// Minimum number of bytes that must be present before the signature can be tested.
    #[must_use]
    pub const fn min_len(&self) -> usize {
        self.magic.len()
    }

    /// Returns `true` when `prefix` is long enough and starts with the magic bytes.
    #[must_use]
    pub fn matches(&self, prefix: &[u8]) -> bool {
        prefix.len() >= self.min_len() && prefix.starts_with(self.magic)
    }
}

/// Gzip member magic (`ID1 ID2`).
pub const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Zstandard frame magic (`0xFD2FB528` little-endian).
pub const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Length of the longest signature in the catalog.
pub const MAX_SIGNATURE_LEN: usize = 4;

/// Signatures sorted shortest-first. `CodecId::None` has no row.
const CATALOG: &[(CodecId, Signature)] = &[
    (CodecId::Gzip, Signature::new(&GZIP_MAGIC)),
    (CodecId::Zstd, Signature::new(&ZSTD_MAGIC)),
];

/// Returns the signature table in scan order.
#[must_use]
pub fn catalog() -> &'static [(CodecId, Signature)] {
    CATALOG
}

/// Returns the signature registered for `codec`.
#[must_use]
pub fn signature_for(codec: CodecId) -> Option<&'static Signature> {
    CATALOG
        .iter()
        .find(|(id, _)| *id == codec)
        .map(|(_, signature)| signature)
}

/// Returns the first catalog codec whose signature matches `prefix`.
///
/// Signatures longer than the available prefix are skipped, never treated as
/// a match. Returns [`CodecId::None`] when nothing matches.
#[must_use]
pub fn detect(prefix: &[u8]) -> CodecId {
    CATALOG
        .iter()
        .find(|(_, signature)| signature.matches(prefix))
        .map_or(CodecId::None, |(codec, _)| *codec)
}

/// Codecs this build (or a caller-narrowed view of it) can actually run.
///
/// `CodecId::None` is always supported.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Capabilities {
    gzip: bool,
    zstd: bool,
}

impl Capabilities {
    /// Returns the codecs compiled into this build.
    #[must_use]
    pub const fn compiled() -> Self {
        Self {
            gzip: true,
            zstd: cfg!(feature = "zstd"),
        }
    }

    /// Returns `true` if `codec` can be encoded and decoded.
    #[must_use]
    pub const fn supports(self, codec: CodecId) -> bool {
        match codec {
            CodecId::Gzip => self.gzip,
            CodecId::Zstd => self.zstd,
            CodecId::None => true,
        }
    }

    /// Returns a copy of this set with `codec` removed.
    ///
    /// Removing [`CodecId::None`] has no effect.
    #[must_use]
    pub const fn without(mut self, codec: CodecId) -> Self {
        match codec {
            CodecId::Gzip => self.gzip = false,
            CodecId::Zstd => self.zstd = false,
            CodecId::None => {}
        }
        self
    }

    /// Iterates over the supported codecs in catalog order.
    pub fn available(self) -> impl Iterator<Item = CodecId> {
        CodecId::ALL
            .into_iter()
            .filter(move |codec| self.supports(*codec))
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::compiled()
    }
}
