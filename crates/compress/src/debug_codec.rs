//! Structured tracing for pool, codec, and stream events.
//!
//! Every function is compiled behind the `tracing` feature and collapses to an
//! inline no-op without it, so call sites never need their own `cfg` guards.

use crate::algorithm::CodecId;

/// Target for one-shot codec events.
pub const CODEC_TARGET: &str = "compress::codec";
/// Target for handle pool events.
pub const POOL_TARGET: &str = "compress::pool";
/// Target for streaming session events.
pub const STREAM_TARGET: &str = "compress::stream";

// ============================================================================
// Pool
// ============================================================================

/// Traces the allocation of a new native handle.
#[cfg(feature = "tracing")]
#[inline]
pub fn trace_handle_created(codec: CodecId, role: &'static str, level: i32) {
    tracing::debug!(
        target: POOL_TARGET,
        codec = %codec,
        role = role,
        level = level,
        "pool: created handle"
    );
}

/// No-op when tracing is disabled.
#[cfg(not(feature = "tracing"))]
#[inline]
pub fn trace_handle_created(_codec: CodecId, _role: &'static str, _level: i32) {}

/// Traces a handle served from the idle set.
#[cfg(feature = "tracing")]
#[inline]
pub fn trace_handle_reused(codec: CodecId, role: &'static str) {
    tracing::trace!(target: POOL_TARGET, codec = %codec, role = role, "pool: reused handle");
}

/// No-op when tracing is disabled.
#[cfg(not(feature = "tracing"))]
#[inline]
pub fn trace_handle_reused(_codec: CodecId, _role: &'static str) {}

/// Traces a handle discarded because it could not be reset.
#[cfg(feature = "tracing")]
#[inline]
pub fn trace_handle_discarded(codec: CodecId, role: &'static str) {
    tracing::warn!(
        target: POOL_TARGET,
        codec = %codec,
        role = role,
        "pool: reset failed, handle dropped"
    );
}

/// No-op when tracing is disabled.
#[cfg(not(feature = "tracing"))]
#[inline]
pub fn trace_handle_discarded(_codec: CodecId, _role: &'static str) {}

// ============================================================================
// Codec
// ============================================================================

/// Traces a completed one-shot operation.
#[cfg(feature = "tracing")]
#[inline]
pub fn trace_buffer_op(operation: &'static str, codec: CodecId, bytes_in: usize, bytes_out: usize) {
    tracing::trace!(
        target: CODEC_TARGET,
        operation = operation,
        codec = %codec,
        bytes_in = bytes_in,
        bytes_out = bytes_out,
        "codec: buffer operation finished"
    );
}

/// No-op when tracing is disabled.
#[cfg(not(feature = "tracing"))]
#[inline]
pub fn trace_buffer_op(
    _operation: &'static str,
    _codec: CodecId,
    _bytes_in: usize,
    _bytes_out: usize,
) {
}

/// Warns that a request was served by a different codec than asked for.
#[cfg(feature = "tracing")]
#[inline]
pub fn trace_degraded(requested: CodecId, effective: CodecId) {
    tracing::warn!(
        target: CODEC_TARGET,
        requested = %requested,
        effective = %effective,
        "codec: requested codec unavailable, degrading"
    );
}

/// No-op when tracing is disabled.
#[cfg(not(feature = "tracing"))]
#[inline]
pub fn trace_degraded(_requested: CodecId, _effective: CodecId) {}

// ============================================================================
// Stream
// ============================================================================

/// Traces the start of a streaming session.
#[cfg(feature = "tracing")]
#[inline]
pub fn trace_stream_opened(direction: &'static str, codec: CodecId) {
    tracing::debug!(target: STREAM_TARGET, direction = direction, codec = %codec, "stream: opened");
}

/// No-op when tracing is disabled.
#[cfg(not(feature = "tracing"))]
#[inline]
pub fn trace_stream_opened(_direction: &'static str, _codec: CodecId) {}

/// Traces the end of a streaming session.
#[cfg(feature = "tracing")]
#[inline]
pub fn trace_stream_closed(
    direction: &'static str,
    codec: CodecId,
    outcome: &'static str,
    bytes_in: u64,
    bytes_out: u64,
) {
    tracing::debug!(
        target: STREAM_TARGET,
        direction = direction,
        codec = %codec,
        outcome = outcome,
        bytes_in = bytes_in,
        bytes_out = bytes_out,
        "stream: closed"
    );
}

/// No-op when tracing is disabled.
#[cfg(not(feature = "tracing"))]
#[inline]
pub fn trace_stream_closed(
    _direction: &'static str,
    _codec: CodecId,
    _outcome: &'static str,
    _bytes_in: u64,
    _bytes_out: u64,
) {
}
