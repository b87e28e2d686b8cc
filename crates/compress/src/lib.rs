#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `compress` is a content-sniffing compression layer for container image
//! layer blobs. Callers pick a codec once, through a [`CompressorConfig`],
//! and then compress either whole buffers or arbitrary [`std::io::Read`]
//! sources. Decompression never needs to be told the codec: the first bytes
//! of the input are matched against the magic-number catalog and the right
//! decoder is chosen automatically.
//!
//! # Design
//!
//! - [`algorithm`] holds the codec catalog: [`CodecId`], the signature table,
//!   and the per-build [`Capabilities`].
//! - [`sniff`] detects a codec from a byte prefix.
//! - [`pool`] keeps native encoder and decoder contexts alive between calls.
//! - [`buffer`] runs one-shot operations on pooled handles.
//! - [`stream`] compresses on a worker thread behind a bounded pipe and
//!   decompresses lazily with the native streaming readers.
//! - [`estimate`] predicts compressed sizes for capacity planning.
//! - [`Compressor`] ties the above together behind one configured value.
//!
//! # Invariants
//!
//! - The `none` codec never copies: one-shot results borrow the caller's
//!   buffer.
//! - A pooled handle is reset before another caller can receive it.
//! - A compression stream's worker holds at most the pipe capacity of
//!   encoded chunks and exits once the consumer closes the stream.
//!
//! # Errors
//!
//! Fallible operations return [`CodecError`]. The stream types implement
//! [`std::io::Read`] and carry a [`CodecError`] inside the returned
//! [`std::io::Error`]; [`CodecError::from_io`] recovers it.
//!
//! # Examples
//!
//! ```
//! use compress::{CodecId, Compressor, CompressorConfig};
//!
//! # fn main() -> Result<(), compress::CodecError> {
//! let compressor = Compressor::new(CompressorConfig::new(CodecId::Gzip))?;
//! let payload = b"layer bytes layer bytes layer bytes";
//! let encoded = compressor.compress(payload)?;
//! let decoded = compressor.decompress(encoded.as_bytes())?;
//! assert_eq!(decoded.detected(), CodecId::Gzip);
//! assert_eq!(decoded.as_bytes(), payload);
//! # Ok(())
//! # }
//! ```

pub mod algorithm;
pub mod buffer;
mod common;
mod compressor;
pub mod debug_codec;
mod error;
pub mod estimate;
mod gzip;
mod handle;
mod level;
pub mod observe;
mod pipe;
pub mod pool;
pub mod sniff;
pub mod stream;
#[cfg(feature = "zstd")]
mod zstd;

pub use algorithm::{Capabilities, CodecId, CodecIdParseError};
pub use compressor::{
    CompressReader, Compressor, CompressorConfig, Decoded, Encoded, FallbackPolicy,
};
pub use error::{CodecError, CodecResult};
pub use estimate::estimate;
pub use level::{CompressionLevel, CompressionLevelError, level_range};
pub use observe::{DurationObserver, Observation, OperationKind};
pub use pool::ResourcePool;
pub use sniff::{detect_algorithm, is_compressed};
pub use stream::{CompressStream, DecompressStream, StreamOptions, StreamOutcome};
