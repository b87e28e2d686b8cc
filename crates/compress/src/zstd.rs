//! Zstandard frame encoding and decoding over reusable native contexts.
//!
//! Only compiled with the `zstd` feature. Contexts survive
//! [`reset`](ZstdEncoder::reset) so pooled handles skip the context allocation
//! on every call.

use std::io;

use zstd::stream::raw::{Decoder, Encoder, Operation, OutBuffer};

use crate::algorithm::CodecId;
use crate::error::{CodecError, CodecResult};

const SCRATCH_SIZE: usize = 128 * 1024;

/// Reusable zstd encoder producing one frame per use.
pub(crate) struct ZstdEncoder {
    context: Encoder<'static>,
    scratch: Vec<u8>,
    output: Vec<u8>,
}

impl ZstdEncoder {
    pub(crate) fn new(level: i32) -> io::Result<Self> {
        Ok(Self {
            context: Encoder::new(level)?,
            scratch: vec![0u8; SCRATCH_SIZE],
            output: Vec::new(),
        })
    }

    pub(crate) fn begin(&mut self, capacity: usize) {
        self.output.reserve(capacity);
    }

    pub(crate) fn write(&mut self, input: &[u8]) -> io::Result<()> {
        let mut remaining = input;
        while !remaining.is_empty() {
            let status = self.context.run_on_buffers(remaining, &mut self.scratch)?;
            self.output
                .extend_from_slice(&self.scratch[..status.bytes_written]);
            if status.bytes_read == 0 && status.bytes_written == 0 {
                return Err(io::Error::other("zstd encoder made no progress"));
            }
            remaining = &remaining[status.bytes_read..];
        }
        Ok(())
    }

    /// Ends the frame, flushing everything the context still buffers.
    pub(crate) fn finish(&mut self) -> io::Result<()> {
        loop {
            let mut buffer = OutBuffer::around(&mut self.scratch[..]);
            let remaining = self.context.finish(&mut buffer, true)?;
            let written = buffer.pos();
            self.output.extend_from_slice(&self.scratch[..written]);
            if remaining == 0 {
                return Ok(());
            }
        }
    }

    pub(crate) fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }

    /// Rewinds the context for a new frame. Returns `false` when the native
    /// context could not be reinitialised and must be discarded.
    pub(crate) fn reset(&mut self) -> bool {
        self.output = Vec::new();
        self.context.reinit().is_ok()
    }
}

/// Reusable zstd decoder accepting one or more concatenated frames.
pub(crate) struct ZstdDecoder {
    context: Decoder<'static>,
    scratch: Vec<u8>,
}

impl ZstdDecoder {
    pub(crate) fn new() -> io::Result<Self> {
        Ok(Self {
            context: Decoder::new()?,
            scratch: vec![0u8; SCRATCH_SIZE],
        })
    }

    pub(crate) fn decode_into(&mut self, input: &[u8], out: &mut Vec<u8>) -> CodecResult<()> {
        let mut remaining = input;
        let mut frame_open = true;
        loop {
            let status = self
                .context
                .run_on_buffers(remaining, &mut self.scratch)
                .map_err(|e| corrupt(e.to_string()))?;
            if status.bytes_read == 0 && status.bytes_written == 0 {
                break;
            }
            out.extend_from_slice(&self.scratch[..status.bytes_written]);
            remaining = &remaining[status.bytes_read..];
            // `remaining == 0` from the context marks a completed frame. A call
            // without progress reports the next frame's header size instead.
            frame_open = status.remaining != 0;
            if remaining.is_empty() && status.bytes_written < self.scratch.len() {
                break;
            }
        }
        if frame_open || !remaining.is_empty() {
            return Err(corrupt("truncated frame"));
        }
        Ok(())
    }

    pub(crate) fn reset(&mut self) -> bool {
        self.context.reinit().is_ok()
    }
}

fn corrupt(reason: impl Into<String>) -> CodecError {
    CodecError::corrupt(CodecId::Zstd, reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::ZSTD_MAGIC;

    fn encode(data: &[u8], level: i32) -> Vec<u8> {
        let mut encoder = ZstdEncoder::new(level).expect("context");
        encoder.begin(data.len());
        encoder.write(data).expect("write");
        encoder.finish().expect("finish");
        encoder.take_output()
    }

    fn decode(data: &[u8]) -> CodecResult<Vec<u8>> {
        let mut out = Vec::new();
        ZstdDecoder::new().expect("context").decode_into(data, &mut out)?;
        Ok(out)
    }

    #[test]
    fn output_is_readable_by_reference_decoder() {
        let data = b"{\"mediaType\":\"layer\"}".repeat(300);
        let encoded = encode(&data, 3);
        assert_eq!(&encoded[..4], &ZSTD_MAGIC);
        assert_eq!(zstd::decode_all(&encoded[..]).expect("decode"), data);
    }

    #[test]
    fn decodes_reference_encoder_output() {
        let data = vec![7u8; 300_000];
        let encoded = zstd::encode_all(&data[..], 19).expect("encode");
        assert_eq!(decode(&encoded).unwrap(), data);
    }

    #[test]
    fn frames_ending_on_scratch_boundary_decode() {
        for len in [SCRATCH_SIZE - 1, SCRATCH_SIZE, SCRATCH_SIZE + 1, 2 * SCRATCH_SIZE] {
            let data = vec![7u8; len];
            assert_eq!(decode(&encode(&data, 3)).unwrap(), data, "length {len}");
        }
        let mut joined = encode(&vec![1u8; SCRATCH_SIZE], 3);
        joined.extend(encode(b"tail", 3));
        let decoded = decode(&joined).unwrap();
        assert_eq!(decoded.len(), SCRATCH_SIZE + 4);
        assert!(decoded.ends_with(b"tail"));
    }

    #[test]
    fn decodes_concatenated_frames() {
        let mut joined = encode(b"first ", 3);
        joined.extend(encode(b"second", 1));
        assert_eq!(decode(&joined).unwrap(), b"first second");
    }

    #[test]
    fn empty_input_round_trips() {
        assert_eq!(decode(&encode(b"", 3)).unwrap(), b"");
    }

    #[test]
    fn truncated_frames_are_corrupt() {
        let encoded = encode(&b"truncate me ".repeat(200), 3);
        for cut in [4, encoded.len() / 2, encoded.len() - 1] {
            assert!(
                matches!(
                    decode(&encoded[..cut]),
                    Err(CodecError::CorruptStream {
                        codec: CodecId::Zstd,
                        ..
                    })
                ),
                "cut at {cut}"
            );
        }
    }

    #[test]
    fn reset_allows_reuse() {
        let mut encoder = ZstdEncoder::new(3).unwrap();
        encoder.begin(0);
        encoder.write(b"abandoned").unwrap();
        assert!(encoder.reset());
        encoder.begin(0);
        encoder.write(b"kept").unwrap();
        encoder.finish().unwrap();
        assert_eq!(decode(&encoder.take_output()).unwrap(), b"kept");
    }
}
