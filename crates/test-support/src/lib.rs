//! Deterministic payloads and misbehaving readers shared by the workspace tests.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tempfile::TempDir;

const WORDS: &[&[u8]] = &[
    b"sha256:",
    b"layer",
    b"manifest",
    b"application/vnd.oci.image",
    b".tar",
    b"{\"digest\":",
    b" ",
    b"\n",
    b"usr/lib/",
    b"0000000000",
];

/// Small xorshift generator so payloads are reproducible without a rand dependency.
#[derive(Clone, Debug)]
pub struct XorShift(u64);

impl XorShift {
    /// Seeds the generator. A zero seed is replaced by a fixed constant.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self(if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed })
    }

    /// Returns the next value.
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
}

/// Text-like payload of exactly `len` bytes that compresses well.
#[must_use]
pub fn compressible_payload(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = XorShift::new(seed);
    let mut out = Vec::with_capacity(len + 32);
    while out.len() < len {
        let word = WORDS[(rng.next_u64() % WORDS.len() as u64) as usize];
        out.extend_from_slice(word);
    }
    out.truncate(len);
    out
}

/// Noise payload of exactly `len` bytes that does not compress.
///
/// The first byte is forced to `0x00` so the payload never sniffs as a
/// compressed stream.
#[must_use]
pub fn pseudo_random_payload(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = XorShift::new(seed);
    let mut out = Vec::with_capacity(len + 8);
    while out.len() < len {
        out.extend_from_slice(&rng.next_u64().to_le_bytes());
    }
    out.truncate(len);
    if let Some(first) = out.first_mut() {
        *first = 0;
    }
    out
}

/// Reader that returns at most the next size from a cycling pattern on
/// every call, exercising callers that assume full reads.
#[derive(Debug)]
pub struct IrregularReader<R> {
    inner: R,
    sizes: Vec<usize>,
    next: usize,
}

impl<R> IrregularReader<R> {
    /// Wraps `inner` using the default 1, 7, 3, 64, 2, 513 byte pattern.
    pub fn new(inner: R) -> Self {
        Self::with_sizes(inner, vec![1, 7, 3, 64, 2, 513])
    }

    /// Wraps `inner` with a custom pattern. Zero entries are treated as one.
    pub fn with_sizes(inner: R, sizes: Vec<usize>) -> Self {
        let sizes = if sizes.is_empty() { vec![1] } else { sizes };
        Self {
            inner,
            sizes,
            next: 0,
        }
    }
}

impl<R: Read> Read for IrregularReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let limit = self.sizes[self.next % self.sizes.len()].max(1);
        self.next = self.next.wrapping_add(1);
        let end = limit.min(buf.len());
        self.inner.read(&mut buf[..end])
    }
}

/// Drains `reader` using irregular buffer sizes on the consumer side.
pub fn read_irregular<R: Read>(reader: &mut R, seed: u64) -> io::Result<Vec<u8>> {
    let mut rng = XorShift::new(seed);
    let mut out = Vec::new();
    let mut buf = vec![0u8; 4096];
    loop {
        let size = 1 + (rng.next_u64() % buf.len() as u64) as usize;
        match reader.read(&mut buf[..size]) {
            Ok(0) => return Ok(out),
            Ok(n) => out.extend_from_slice(&buf[..n]),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
}

/// Source that never reaches end of input and records how much was pulled.
///
/// Stands in for a producer whose consumer stops reading: the only way a
/// worker draining it can finish is by being cancelled.
#[derive(Clone, Debug)]
pub struct EndlessSource {
    pulled: Arc<AtomicU64>,
    rng: XorShift,
}

impl EndlessSource {
    /// Creates a source and returns it with its shared pull counter.
    #[must_use]
    pub fn new(seed: u64) -> (Self, Arc<AtomicU64>) {
        let pulled = Arc::new(AtomicU64::new(0));
        (
            Self {
                pulled: Arc::clone(&pulled),
                rng: XorShift::new(seed),
            },
            pulled,
        )
    }
}

impl Read for EndlessSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        for chunk in buf.chunks_mut(8) {
            let bytes = self.rng.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
        self.pulled.fetch_add(buf.len() as u64, Ordering::SeqCst);
        Ok(buf.len())
    }
}

/// Source that yields `good` bytes of zeros and then fails.
#[derive(Debug)]
pub struct FailingSource {
    remaining: usize,
}

impl FailingSource {
    /// Creates a source failing after `good` bytes.
    #[must_use]
    pub const fn new(good: usize) -> Self {
        Self { remaining: good }
    }
}

impl Read for FailingSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Err(io::Error::other("source failed"));
        }
        let n = self.remaining.min(buf.len());
        buf[..n].fill(0);
        self.remaining -= n;
        Ok(n)
    }
}

/// Creates a scratch directory removed when dropped.
pub fn scratch_dir() -> io::Result<TempDir> {
    tempfile::Builder::new().prefix("blobpress-").tempdir()
}

/// Writes `contents` to `name` inside `dir` and returns the full path.
pub fn write_fixture(dir: &Path, name: &str, contents: &[u8]) -> io::Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, contents)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payloads_are_deterministic_and_sized() {
        assert_eq!(compressible_payload(1000, 7), compressible_payload(1000, 7));
        assert_eq!(compressible_payload(1000, 7).len(), 1000);
        assert_eq!(pseudo_random_payload(33, 1).len(), 33);
        assert_eq!(pseudo_random_payload(33, 1)[0], 0);
        assert!(pseudo_random_payload(0, 1).is_empty());
    }

    #[test]
    fn irregular_reader_caps_each_read() {
        let data = vec![9u8; 100];
        let mut reader = IrregularReader::with_sizes(&data[..], vec![3, 5]);
        let mut buf = [0u8; 64];
        assert_eq!(reader.read(&mut buf).unwrap(), 3);
        assert_eq!(reader.read(&mut buf).unwrap(), 5);
        assert_eq!(reader.read(&mut buf).unwrap(), 3);
    }

    #[test]
    fn read_irregular_collects_everything() {
        let data = compressible_payload(10_000, 3);
        let mut reader = IrregularReader::new(&data[..]);
        assert_eq!(read_irregular(&mut reader, 5).unwrap(), data);
    }

    #[test]
    fn endless_source_counts_pulls() {
        let (mut source, pulled) = EndlessSource::new(1);
        let mut buf = [0u8; 13];
        source.read(&mut buf).unwrap();
        source.read(&mut buf).unwrap();
        assert_eq!(pulled.load(Ordering::SeqCst), 26);
    }

    #[test]
    fn failing_source_fails_after_budget() {
        let mut source = FailingSource::new(4);
        let mut buf = [1u8; 8];
        assert_eq!(source.read(&mut buf).unwrap(), 4);
        assert!(source.read(&mut buf).is_err());
    }

    #[test]
    fn fixtures_land_in_scratch_dir() {
        let dir = scratch_dir().unwrap();
        let path = write_fixture(dir.path(), "blob", b"abc").unwrap();
        assert_eq!(fs::read(path).unwrap(), b"abc");
    }
}
