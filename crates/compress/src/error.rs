//! Error taxonomy shared by every codec operation.

use std::io;

use thiserror::Error;

use crate::algorithm::CodecId;

/// Result alias used throughout the crate.
pub type CodecResult<T> = Result<T, CodecError>;

/// Failures surfaced by buffer and stream codec operations.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The codec was requested (or detected) but is not compiled into this
    /// build, or was excluded by the caller's capability set.
    #[error("codec {codec} is not supported by this build")]
    UnsupportedCodec {
        /// Codec that could not be served.
        codec: CodecId,
    },
    /// The encoder rejected input or failed to emit its trailer.
    #[error("{codec} encoder failed: {source}")]
    CodecWriteFailure {
        /// Codec whose encoder failed.
        codec: CodecId,
        /// Underlying I/O or codec library error.
        #[source]
        source: io::Error,
    },
    /// Input carried a recognised signature but its body failed to decode.
    #[error("corrupt {codec} stream: {reason}")]
    CorruptStream {
        /// Codec detected from the input signature.
        codec: CodecId,
        /// Human readable description of the failure.
        reason: String,
    },
    /// A read was attempted after the stream session was already terminated.
    #[error("stream session already terminated")]
    SessionClosed,
}

impl CodecError {
    pub(crate) fn write_failure(codec: CodecId, source: io::Error) -> Self {
        Self::CodecWriteFailure { codec, source }
    }

    pub(crate) fn corrupt(codec: CodecId, reason: impl Into<String>) -> Self {
        Self::CorruptStream {
            codec,
            reason: reason.into(),
        }
    }

    /// Returns the codec the error concerns, if any.
    #[must_use]
    pub const fn codec(&self) -> Option<CodecId> {
        match self {
            Self::UnsupportedCodec { codec }
            | Self::CodecWriteFailure { codec, .. }
            | Self::CorruptStream { codec, .. } => Some(*codec),
            Self::SessionClosed => None,
        }
    }

    /// Recovers a [`CodecError`] carried inside an [`io::Error`] produced by
    /// one of the stream readers.
    #[must_use]
    pub fn from_io(error: &io::Error) -> Option<&CodecError> {
        error.get_ref()?.downcast_ref::<CodecError>()
    }

    const fn io_kind(&self) -> io::ErrorKind {
        match self {
            Self::UnsupportedCodec { .. } => io::ErrorKind::Unsupported,
            Self::CodecWriteFailure { .. } => io::ErrorKind::Other,
            Self::CorruptStream { .. } => io::ErrorKind::InvalidData,
            Self::SessionClosed => io::ErrorKind::BrokenPipe,
        }
    }
}

impl From<CodecError> for io::Error {
    fn from(error: CodecError) -> Self {
        io::Error::new(error.io_kind(), error)
    }
}
