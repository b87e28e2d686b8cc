//! RFC 1952 gzip framing over a raw deflate context.
//!
//! The encoder and decoder keep their deflate state across uses so the
//! [`ResourcePool`](crate::pool::ResourcePool) can hand the same handle to
//! consecutive operations after a [`reset`](GzipEncoder::reset). Output is
//! interoperable with `gzip(1)` and [`flate2::read::MultiGzDecoder`].

use std::io;

use flate2::{Compress, Compression, Crc, Decompress, FlushCompress, FlushDecompress, Status};

use crate::algorithm::{CodecId, GZIP_MAGIC};
use crate::error::{CodecError, CodecResult};

const SCRATCH_SIZE: usize = 32 * 1024;
const HEADER_LEN: usize = 10;
const TRAILER_LEN: usize = 8;
const METHOD_DEFLATE: u8 = 8;
const OS_UNKNOWN: u8 = 255;

const FHCRC: u8 = 0x02;
const FEXTRA: u8 = 0x04;
const FNAME: u8 = 0x08;
const FCOMMENT: u8 = 0x10;
const FRESERVED: u8 = 0xE0;

/// Reusable gzip encoder.
pub(crate) struct GzipEncoder {
    deflate: Compress,
    crc: Crc,
    level: Compression,
    scratch: Vec<u8>,
    output: Vec<u8>,
}

impl GzipEncoder {
    pub(crate) fn new(level: i32) -> Self {
        let level = Compression::new(u32::try_from(level).unwrap_or(6).min(9));
        Self {
            deflate: Compress::new(level, false),
            crc: Crc::new(),
            level,
            scratch: vec![0u8; SCRATCH_SIZE],
            output: Vec::new(),
        }
    }

    /// Starts a member, reserving `capacity` bytes of output up front.
    pub(crate) fn begin(&mut self, capacity: usize) {
        self.output.reserve(capacity.max(HEADER_LEN + TRAILER_LEN));
        let xfl = if self.level.level() >= Compression::best().level() {
            2
        } else if self.level.level() <= Compression::fast().level() {
            4
        } else {
            0
        };
        self.output.extend_from_slice(&[
            GZIP_MAGIC[0],
            GZIP_MAGIC[1],
            METHOD_DEFLATE,
            0,
            0,
            0,
            0,
            0,
            xfl,
            OS_UNKNOWN,
        ]);
    }

    pub(crate) fn write(&mut self, input: &[u8]) -> io::Result<()> {
        self.crc.update(input);
        let mut remaining = input;
        while !remaining.is_empty() {
            let before_in = self.deflate.total_in();
            let before_out = self.deflate.total_out();
            self.deflate
                .compress(remaining, &mut self.scratch, FlushCompress::None)
                .map_err(|e| io::Error::other(e.to_string()))?;
            let consumed = (self.deflate.total_in() - before_in) as usize;
            let produced = (self.deflate.total_out() - before_out) as usize;
            self.output.extend_from_slice(&self.scratch[..produced]);
            if consumed == 0 && produced == 0 {
                return Err(io::Error::other("deflate made no progress"));
            }
            remaining = &remaining[consumed..];
        }
        Ok(())
    }

    /// Flushes the deflate stream and appends the CRC32/ISIZE trailer.
    pub(crate) fn finish(&mut self) -> io::Result<()> {
        loop {
            let before_out = self.deflate.total_out();
            let status = self
                .deflate
                .compress(&[], &mut self.scratch, FlushCompress::Finish)
                .map_err(|e| io::Error::other(e.to_string()))?;
            let produced = (self.deflate.total_out() - before_out) as usize;
            self.output.extend_from_slice(&self.scratch[..produced]);
            if status == Status::StreamEnd {
                break;
            }
        }
        self.output.extend_from_slice(&self.crc.sum().to_le_bytes());
        self.output.extend_from_slice(&self.crc.amount().to_le_bytes());
        Ok(())
    }

    pub(crate) fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }

    pub(crate) fn reset(&mut self) {
        self.deflate.reset();
        self.crc.reset();
        self.output = Vec::new();
    }
}

/// Reusable gzip decoder accepting one or more concatenated members.
pub(crate) struct GzipDecoder {
    inflate: Decompress,
    scratch: Vec<u8>,
}

impl GzipDecoder {
    pub(crate) fn new() -> Self {
        Self {
            inflate: Decompress::new(false),
            scratch: vec![0u8; SCRATCH_SIZE],
        }
    }

    /// Appends the decoded contents of every member in `input` to `out`.
    pub(crate) fn decode_into(&mut self, input: &[u8], out: &mut Vec<u8>) -> CodecResult<()> {
        let mut rest = input;
        loop {
            rest = self.decode_member(rest, out)?;
            if rest.is_empty() {
                return Ok(());
            }
            if !rest.starts_with(&GZIP_MAGIC) {
                return Err(corrupt("trailing bytes after gzip member"));
            }
        }
    }

    fn decode_member<'a>(&mut self, input: &'a [u8], out: &mut Vec<u8>) -> CodecResult<&'a [u8]> {
        let body_start = parse_header(input)?;
        let mut body = &input[body_start..];
        self.inflate.reset(false);
        let member_start = out.len();

        loop {
            let before_in = self.inflate.total_in();
            let before_out = self.inflate.total_out();
            let status = self
                .inflate
                .decompress(body, &mut self.scratch, FlushDecompress::None)
                .map_err(|e| corrupt(e.to_string()))?;
            let consumed = (self.inflate.total_in() - before_in) as usize;
            let produced = (self.inflate.total_out() - before_out) as usize;
            out.extend_from_slice(&self.scratch[..produced]);
            body = &body[consumed..];
            if status == Status::StreamEnd {
                break;
            }
            if consumed == 0 && produced == 0 {
                return Err(corrupt("truncated deflate body"));
            }
        }

        let Some((trailer, rest)) = body.split_first_chunk::<TRAILER_LEN>() else {
            return Err(corrupt("truncated trailer"));
        };
        let expected_crc = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
        let expected_len = u32::from_le_bytes([trailer[4], trailer[5], trailer[6], trailer[7]]);

        let mut crc = Crc::new();
        crc.update(&out[member_start..]);
        if crc.sum() != expected_crc {
            return Err(corrupt(format!(
                "crc mismatch: expected {expected_crc:#010x}, computed {:#010x}",
                crc.sum()
            )));
        }
        if crc.amount() != expected_len {
            return Err(corrupt(format!(
                "length mismatch: expected {expected_len}, decoded {}",
                crc.amount()
            )));
        }
        Ok(rest)
    }

    pub(crate) fn reset(&mut self) {
        self.inflate.reset(false);
    }
}

fn corrupt(reason: impl Into<String>) -> CodecError {
    CodecError::corrupt(CodecId::Gzip, reason)
}

/// Validates a member header and returns the offset of the deflate body.
fn parse_header(input: &[u8]) -> CodecResult<usize> {
    if input.len() < HEADER_LEN {
        return Err(corrupt("truncated header"));
    }
    if !input.starts_with(&GZIP_MAGIC) {
        return Err(corrupt("missing gzip magic"));
    }
    if input[2] != METHOD_DEFLATE {
        return Err(corrupt(format!("unsupported method {}", input[2])));
    }
    let flags = input[3];
    if flags & FRESERVED != 0 {
        return Err(corrupt("reserved header flags set"));
    }

    let mut pos = HEADER_LEN;
    if flags & FEXTRA != 0 {
        let xlen = input
            .get(pos..pos + 2)
            .map(|b| usize::from(u16::from_le_bytes([b[0], b[1]])))
            .ok_or_else(|| corrupt("truncated extra field"))?;
        pos += 2 + xlen;
    }
    if flags & FNAME != 0 {
        pos = skip_terminated(input, pos, "file name")?;
    }
    if flags & FCOMMENT != 0 {
        pos = skip_terminated(input, pos, "comment")?;
    }
    if flags & FHCRC != 0 {
        let stored = input
            .get(pos..pos + 2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
            .ok_or_else(|| corrupt("truncated header crc"))?;
        let mut crc = Crc::new();
        crc.update(&input[..pos]);
        if (crc.sum() & 0xFFFF) as u16 != stored {
            return Err(corrupt("header crc mismatch"));
        }
        pos += 2;
    }
    if pos > input.len() {
        return Err(corrupt("truncated header"));
    }
    Ok(pos)
}

fn skip_terminated(input: &[u8], start: usize, field: &str) -> CodecResult<usize> {
    input
        .get(start..)
        .and_then(|tail| tail.iter().position(|&b| b == 0))
        .map(|nul| start + nul + 1)
        .ok_or_else(|| corrupt(format!("unterminated {field}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::GzBuilder;
    use flate2::read::MultiGzDecoder;
    use std::io::{Read, Write};

    fn encode(data: &[u8], level: i32) -> Vec<u8> {
        let mut encoder = GzipEncoder::new(level);
        encoder.begin(data.len());
        encoder.write(data).expect("write");
        encoder.finish().expect("finish");
        encoder.take_output()
    }

    fn decode(data: &[u8]) -> CodecResult<Vec<u8>> {
        let mut out = Vec::new();
        GzipDecoder::new().decode_into(data, &mut out)?;
        Ok(out)
    }

    #[test]
    fn output_is_readable_by_flate2() {
        let data = b"layer.tar contents ".repeat(500);
        let encoded = encode(&data, 6);
        assert_eq!(&encoded[..2], &GZIP_MAGIC);
        let mut decoded = Vec::new();
        MultiGzDecoder::new(&encoded[..])
            .read_to_end(&mut decoded)
            .expect("flate2 decode");
        assert_eq!(decoded, data);
    }

    #[test]
    fn header_carries_extra_flags_for_level() {
        assert_eq!(encode(b"x", 9)[8], 2);
        assert_eq!(encode(b"x", 1)[8], 4);
        assert_eq!(encode(b"x", 6)[8], 0);
    }

    #[test]
    fn decodes_headers_with_optional_fields() {
        let mut writer = GzBuilder::new()
            .filename("layer.tar")
            .comment("built by ci")
            .extra(vec![1, 2, 3, 4])
            .write(Vec::new(), Compression::default());
        writer.write_all(b"optional header fields").unwrap();
        let encoded = writer.finish().unwrap();
        assert_eq!(decode(&encoded).unwrap(), b"optional header fields");
    }

    #[test]
    fn decodes_concatenated_members() {
        let mut joined = encode(b"first ", 6);
        joined.extend(encode(b"second", 1));
        assert_eq!(decode(&joined).unwrap(), b"first second");
    }

    #[test]
    fn empty_input_round_trips() {
        let encoded = encode(b"", 6);
        assert_eq!(decode(&encoded).unwrap(), b"");
    }

    #[test]
    fn detects_crc_mismatch() {
        let mut encoded = encode(b"checksummed payload", 6);
        let crc_at = encoded.len() - TRAILER_LEN;
        encoded[crc_at] ^= 0xFF;
        let err = decode(&encoded).expect_err("crc must not match");
        assert!(err.to_string().contains("crc mismatch"), "{err}");
    }

    #[test]
    fn detects_truncation() {
        let encoded = encode(&b"truncate me ".repeat(100), 6);
        for cut in [3, HEADER_LEN, encoded.len() / 2, encoded.len() - 1] {
            assert!(
                matches!(
                    decode(&encoded[..cut]),
                    Err(CodecError::CorruptStream {
                        codec: CodecId::Gzip,
                        ..
                    })
                ),
                "cut at {cut}"
            );
        }
    }

    #[test]
    fn rejects_trailing_garbage() {
        let mut encoded = encode(b"payload", 6);
        encoded.extend_from_slice(b"garbage");
        assert!(decode(&encoded).is_err());
    }

    #[test]
    fn rejects_unknown_method_and_reserved_flags() {
        let mut encoded = encode(b"payload", 6);
        encoded[2] = 7;
        assert!(decode(&encoded).is_err());
        let mut encoded = encode(b"payload", 6);
        encoded[3] = 0x20;
        assert!(decode(&encoded).is_err());
    }

    #[test]
    fn reset_allows_reuse() {
        let mut encoder = GzipEncoder::new(6);
        encoder.begin(0);
        encoder.write(b"abandoned").unwrap();
        encoder.reset();
        encoder.begin(0);
        encoder.write(b"second").unwrap();
        encoder.finish().unwrap();
        assert_eq!(decode(&encoder.take_output()).unwrap(), b"second");

        let mut decoder = GzipDecoder::new();
        let mut out = Vec::new();
        assert!(decoder.decode_into(&encode(b"abc", 6)[..12], &mut out).is_err());
        decoder.reset();
        out.clear();
        decoder.decode_into(&encode(b"abc", 6), &mut out).unwrap();
        assert_eq!(out, b"abc");
    }
}
