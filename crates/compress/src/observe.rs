//! Hook for reporting per-operation timing to an external collector.

use std::time::Duration;

use crate::algorithm::CodecId;

/// Which direction an observed operation ran in.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum OperationKind {
    /// Buffer compression.
    Compress,
    /// Buffer decompression.
    Decompress,
}

impl OperationKind {
    /// Returns a stable lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Compress => "compress",
            Self::Decompress => "decompress",
        }
    }
}

/// One completed buffer operation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Observation {
    /// Direction of the operation.
    pub operation: OperationKind,
    /// Codec that actually ran. For decompression this is the detected codec.
    pub codec: CodecId,
    /// Numeric level handed to the encoder; `0` for decompression and `none`.
    pub level: i32,
    /// Wall-clock time spent in the codec.
    pub elapsed: Duration,
    /// Input size in bytes.
    pub bytes_in: usize,
    /// Output size in bytes.
    pub bytes_out: usize,
    /// Set when the request was served by a fallback codec.
    pub degraded: bool,
}

/// Receives an [`Observation`] after every successful buffer operation.
///
/// Implementations run on the caller's thread and should return quickly.
pub trait DurationObserver: Send + Sync {
    /// Records one operation.
    fn observe(&self, observation: &Observation);
}

impl<F> DurationObserver for F
where
    F: Fn(&Observation) + Send + Sync,
{
    fn observe(&self, observation: &Observation) {
        self(observation);
    }
}
