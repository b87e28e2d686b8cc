//! One-shot compression and decompression of whole in-memory buffers.

use std::borrow::Cow;
use std::sync::Arc;

use crate::algorithm::{Capabilities, CodecId};
use crate::debug_codec::trace_buffer_op;
use crate::error::{CodecError, CodecResult};
use crate::estimate::estimate;
use crate::pool::ResourcePool;
use crate::sniff::detect_algorithm;

/// Slack added to the estimated output size for framing overhead.
const FRAMING_SLACK: usize = 64;

/// Compresses `data` with `codec` using a pooled encoder.
///
/// [`CodecId::None`] returns the input borrowed and untouched.
pub fn compress<'a>(
    pool: &Arc<ResourcePool>,
    codec: CodecId,
    level: i32,
    data: &'a [u8],
) -> CodecResult<Cow<'a, [u8]>> {
    if codec.is_none() {
        return Ok(Cow::Borrowed(data));
    }
    let mut encoder = ResourcePool::acquire_encoder(pool, codec, level)?;
    let planned = usize::try_from(estimate(codec, data.len() as u64)).unwrap_or(data.len());
    encoder.begin(planned + FRAMING_SLACK);
    encoder.write(data)?;
    encoder.finish()?;
    let output = encoder.take_output();
    trace_buffer_op("compress", codec, data.len(), output.len());
    Ok(Cow::Owned(output))
}

/// Sniffs `data` and decompresses it with the detected codec.
///
/// Input without a recognised signature is returned borrowed and untouched,
/// together with [`CodecId::None`]. A detected codec outside `capabilities`
/// yields [`CodecError::UnsupportedCodec`].
pub fn decompress<'a>(
    pool: &Arc<ResourcePool>,
    capabilities: Capabilities,
    data: &'a [u8],
) -> CodecResult<(CodecId, Cow<'a, [u8]>)> {
    let codec = detect_algorithm(data);
    if codec.is_none() {
        return Ok((codec, Cow::Borrowed(data)));
    }
    if !capabilities.supports(codec) {
        return Err(CodecError::UnsupportedCodec { codec });
    }
    let mut decoder = ResourcePool::acquire_decoder(pool, codec)?;
    let mut output = Vec::with_capacity(data.len().saturating_mul(2));
    decoder.decode_into(data, &mut output)?;
    trace_buffer_op("decompress", codec, data.len(), output.len());
    Ok((codec, Cow::Owned(output)))
}
