//! Failure classification and exit codes.

use std::fmt;
use std::io;
use std::path::Path;

use compress::CodecError;

/// Exit code for success.
pub const EXIT_OK: i32 = 0;
/// Exit code for invalid arguments or configuration.
pub const EXIT_USAGE: i32 = 1;
/// Exit code for corrupt input or encoder failures.
pub const EXIT_CODEC: i32 = 2;
/// Exit code for a codec missing from this build.
pub const EXIT_UNSUPPORTED: i32 = 3;
/// Exit code for input or output file errors.
pub const EXIT_IO: i32 = 4;

/// A failed command, carrying what is needed to report it.
#[derive(Debug)]
pub enum Failure {
    /// Bad flag value or environment default.
    Usage(String),
    /// The codec layer rejected the operation.
    Codec(CodecError),
    /// Reading input or writing output failed.
    Io {
        /// What was being accessed.
        context: String,
        /// Underlying error.
        source: io::Error,
    },
}

impl Failure {
    /// Wraps an I/O error, unwrapping a [`CodecError`] carried inside it.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        if CodecError::from_io(&source).is_none() {
            return Self::Io {
                context: context.into(),
                source,
            };
        }
        let kind = source.kind();
        let message = source.to_string();
        match source.into_inner().map(|inner| inner.downcast::<CodecError>()) {
            Some(Ok(codec)) => Self::Codec(*codec),
            _ => Self::Io {
                context: context.into(),
                source: io::Error::new(kind, message),
            },
        }
    }

    /// Wraps an error while opening or creating `path`.
    pub fn path(path: &Path, source: io::Error) -> Self {
        Self::Io {
            context: path.display().to_string(),
            source,
        }
    }

    /// Returns the process exit code for this failure.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => EXIT_USAGE,
            Self::Codec(CodecError::UnsupportedCodec { .. }) => EXIT_UNSUPPORTED,
            Self::Codec(_) => EXIT_CODEC,
            Self::Io { .. } => EXIT_IO,
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Usage(message) => f.write_str(message),
            Self::Codec(error) => write!(f, "{error}"),
            Self::Io { context, source } => write!(f, "{context}: {source}"),
        }
    }
}

impl From<CodecError> for Failure {
    fn from(error: CodecError) -> Self {
        Self::Codec(error)
    }
}
