//! Codec-erased encoder and decoder handles stored in the resource pool.

use std::io;

use crate::algorithm::CodecId;
use crate::error::{CodecError, CodecResult};
use crate::gzip::{GzipDecoder, GzipEncoder};
#[cfg(feature = "zstd")]
use crate::zstd::{ZstdDecoder, ZstdEncoder};

/// Encoder state for one signature-carrying codec.
pub(crate) enum EncoderHandle {
    Gzip(GzipEncoder),
    #[cfg(feature = "zstd")]
    Zstd(ZstdEncoder),
}

impl EncoderHandle {
    /// Allocates a fresh encoder. `CodecId::None` never has one.
    pub(crate) fn new(codec: CodecId, level: i32) -> CodecResult<Self> {
        match codec {
            CodecId::Gzip => Ok(Self::Gzip(GzipEncoder::new(level))),
            #[cfg(feature = "zstd")]
            CodecId::Zstd => ZstdEncoder::new(level)
                .map(Self::Zstd)
                .map_err(|e| CodecError::write_failure(codec, e)),
            _ => Err(CodecError::UnsupportedCodec { codec }),
        }
    }

    pub(crate) const fn codec(&self) -> CodecId {
        match self {
            Self::Gzip(_) => CodecId::Gzip,
            #[cfg(feature = "zstd")]
            Self::Zstd(_) => CodecId::Zstd,
        }
    }

    pub(crate) fn begin(&mut self, capacity: usize) {
        match self {
            Self::Gzip(encoder) => encoder.begin(capacity),
            #[cfg(feature = "zstd")]
            Self::Zstd(encoder) => encoder.begin(capacity),
        }
    }

    pub(crate) fn write(&mut self, input: &[u8]) -> CodecResult<()> {
        let codec = self.codec();
        let result: io::Result<()> = match self {
            Self::Gzip(encoder) => encoder.write(input),
            #[cfg(feature = "zstd")]
            Self::Zstd(encoder) => encoder.write(input),
        };
        result.map_err(|e| CodecError::write_failure(codec, e))
    }

    pub(crate) fn finish(&mut self) -> CodecResult<()> {
        let codec = self.codec();
        let result: io::Result<()> = match self {
            Self::Gzip(encoder) => encoder.finish(),
            #[cfg(feature = "zstd")]
            Self::Zstd(encoder) => encoder.finish(),
        };
        result.map_err(|e| CodecError::write_failure(codec, e))
    }

    /// Drains the output produced so far.
    pub(crate) fn take_output(&mut self) -> Vec<u8> {
        match self {
            Self::Gzip(encoder) => encoder.take_output(),
            #[cfg(feature = "zstd")]
            Self::Zstd(encoder) => encoder.take_output(),
        }
    }

    /// Clears per-use state. `false` means the handle must not be reused.
    pub(crate) fn reset(&mut self) -> bool {
        match self {
            Self::Gzip(encoder) => {
                encoder.reset();
                true
            }
            #[cfg(feature = "zstd")]
            Self::Zstd(encoder) => encoder.reset(),
        }
    }
}

/// Decoder state for one signature-carrying codec.
pub(crate) enum DecoderHandle {
    Gzip(GzipDecoder),
    #[cfg(feature = "zstd")]
    Zstd(ZstdDecoder),
}

impl DecoderHandle {
    pub(crate) fn new(codec: CodecId) -> CodecResult<Self> {
        match codec {
            CodecId::Gzip => Ok(Self::Gzip(GzipDecoder::new())),
            #[cfg(feature = "zstd")]
            CodecId::Zstd => ZstdDecoder::new()
                .map(Self::Zstd)
                .map_err(|e| CodecError::corrupt(codec, e.to_string())),
            _ => Err(CodecError::UnsupportedCodec { codec }),
        }
    }

    pub(crate) fn decode_into(&mut self, input: &[u8], out: &mut Vec<u8>) -> CodecResult<()> {
        match self {
            Self::Gzip(decoder) => decoder.decode_into(input, out),
            #[cfg(feature = "zstd")]
            Self::Zstd(decoder) => decoder.decode_into(input, out),
        }
    }

    pub(crate) fn reset(&mut self) -> bool {
        match self {
            Self::Gzip(decoder) => {
                decoder.reset();
                true
            }
            #[cfg(feature = "zstd")]
            Self::Zstd(decoder) => decoder.reset(),
        }
    }
}
