//! Configured entry point tying the catalog, pool, and codecs together.
//!
//! A [`Compressor`] resolves its configured codec against the build's
//! [`Capabilities`] once, at construction. Every later call uses the resolved
//! codec, so a build without zstd either refuses to construct a zstd
//! compressor ([`FallbackPolicy::Reject`]) or constructs one that reports
//! itself as degraded to gzip ([`FallbackPolicy::Degrade`]).

use std::borrow::Cow;
use std::fmt;
use std::io::{self, Cursor, Read};
use std::sync::Arc;
use std::time::Instant;

use crate::algorithm::{Capabilities, CodecId};
use crate::buffer;
use crate::debug_codec::trace_degraded;
use crate::error::{CodecError, CodecResult};
use crate::level::CompressionLevel;
use crate::observe::{DurationObserver, Observation, OperationKind};
use crate::pool::ResourcePool;
use crate::sniff::detect_algorithm;
use crate::stream::{self, CompressStream, DecompressStream, StreamOptions};

/// Codecs tried, in order, when the requested one is unavailable and the
/// policy allows degrading. `none` is always available, so resolution under
/// [`FallbackPolicy::Degrade`] never fails.
const DEGRADE_ORDER: [CodecId; 2] = [CodecId::Gzip, CodecId::None];

/// What to do when the configured codec is not available in this build.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum FallbackPolicy {
    /// Fail construction with [`CodecError::UnsupportedCodec`].
    #[default]
    Reject,
    /// Serve requests with gzip instead and flag every result as degraded.
    Degrade,
}

/// Immutable settings for a [`Compressor`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CompressorConfig {
    codec: CodecId,
    level: CompressionLevel,
    streaming: bool,
    fallback: FallbackPolicy,
    stream: StreamOptions,
}

impl Default for CompressorConfig {
    fn default() -> Self {
        Self::new(CodecId::default())
    }
}

impl CompressorConfig {
    /// Starts a configuration for `codec` with default level and options.
    #[must_use]
    pub fn new(codec: CodecId) -> Self {
        Self {
            codec,
            level: CompressionLevel::Default,
            streaming: false,
            fallback: FallbackPolicy::Reject,
            stream: StreamOptions::default(),
        }
    }

    /// Sets the compression level.
    #[must_use]
    pub const fn with_level(mut self, level: CompressionLevel) -> Self {
        self.level = level;
        self
    }

    /// Routes [`Compressor::compress_reader`] through the streaming codec.
    #[must_use]
    pub const fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    /// Sets the policy for an unavailable codec.
    #[must_use]
    pub const fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = fallback;
        self
    }

    /// Sets how many encoded chunks a stream may buffer ahead of its reader.
    #[must_use]
    pub fn with_pipe_capacity(mut self, capacity: usize) -> Self {
        self.stream = self.stream.with_pipe_capacity(capacity);
        self
    }

    /// Sets the source read size for streaming compression.
    #[must_use]
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.stream = self.stream.with_chunk_size(size);
        self
    }

    /// Returns the configured codec.
    #[must_use]
    pub const fn codec(&self) -> CodecId {
        self.codec
    }

    /// Returns the configured level.
    #[must_use]
    pub const fn level(&self) -> CompressionLevel {
        self.level
    }

    /// Returns `true` when streaming is enabled.
    #[must_use]
    pub const fn streaming(&self) -> bool {
        self.streaming
    }

    /// Returns the fallback policy.
    #[must_use]
    pub const fn fallback(&self) -> FallbackPolicy {
        self.fallback
    }

    /// Returns the streaming options.
    #[must_use]
    pub const fn stream_options(&self) -> StreamOptions {
        self.stream
    }
}

/// Output of [`Compressor::compress`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Encoded<'a> {
    data: Cow<'a, [u8]>,
    requested: CodecId,
    produced: CodecId,
    degraded: bool,
}

impl<'a> Encoded<'a> {
    /// Returns the encoded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the result, returning the encoded bytes.
    #[must_use]
    pub fn into_data(self) -> Cow<'a, [u8]> {
        self.data
    }

    /// Codec the caller configured.
    #[must_use]
    pub const fn requested(&self) -> CodecId {
        self.requested
    }

    /// Codec that actually produced the bytes.
    #[must_use]
    pub const fn codec(&self) -> CodecId {
        self.produced
    }

    /// `true` when the bytes were produced by a fallback codec.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        self.degraded
    }
}

/// Output of [`Compressor::decompress`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Decoded<'a> {
    data: Cow<'a, [u8]>,
    detected: CodecId,
}

impl<'a> Decoded<'a> {
    /// Returns the decoded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the result, returning the decoded bytes.
    #[must_use]
    pub fn into_data(self) -> Cow<'a, [u8]> {
        self.data
    }

    /// Codec sniffed from the input.
    #[must_use]
    pub const fn detected(&self) -> CodecId {
        self.detected
    }
}

/// Reader returned by [`Compressor::compress_reader`].
#[derive(Debug)]
pub enum CompressReader {
    /// Output produced incrementally by a stream worker.
    Streaming(CompressStream),
    /// Output produced up front by the buffer codec.
    Buffered(Cursor<Vec<u8>>),
}

impl Read for CompressReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Streaming(stream) => stream.read(buf),
            Self::Buffered(cursor) => cursor.read(buf),
        }
    }
}

/// Compression front-end bound to one configuration.
#[derive(Clone)]
pub struct Compressor {
    config: CompressorConfig,
    capabilities: Capabilities,
    effective: CodecId,
    pool: Arc<ResourcePool>,
    observer: Option<Arc<dyn DurationObserver>>,
}

impl Compressor {
    /// Builds a compressor using every codec compiled into this build.
    pub fn new(config: CompressorConfig) -> CodecResult<Self> {
        Self::with_capabilities(config, Capabilities::compiled())
    }

    /// Builds a compressor restricted to `capabilities`.
    pub fn with_capabilities(
        config: CompressorConfig,
        capabilities: Capabilities,
    ) -> CodecResult<Self> {
        let effective = resolve(config.codec, config.fallback, capabilities)?;
        if effective != config.codec {
            trace_degraded(config.codec, effective);
        }
        Ok(Self {
            config,
            capabilities,
            effective,
            pool: Arc::new(ResourcePool::new()),
            observer: None,
        })
    }

    /// Shares `pool` with this compressor instead of its private one.
    #[must_use]
    pub fn with_pool(mut self, pool: Arc<ResourcePool>) -> Self {
        self.pool = pool;
        self
    }

    /// Attaches an observer called after every buffer operation.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn DurationObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Codec named in the configuration.
    #[must_use]
    pub const fn algorithm(&self) -> CodecId {
        self.config.codec
    }

    /// Codec that will actually encode.
    #[must_use]
    pub const fn effective_algorithm(&self) -> CodecId {
        self.effective
    }

    /// Numeric level handed to the effective codec's encoder.
    #[must_use]
    pub fn level(&self) -> i32 {
        self.numeric_level()
    }

    /// `true` when the configured codec was replaced by a fallback.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.effective != self.config.codec
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &CompressorConfig {
        &self.config
    }

    /// Returns the capability set this compressor was resolved against.
    #[must_use]
    pub const fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Returns the handle pool.
    #[must_use]
    pub fn pool(&self) -> &Arc<ResourcePool> {
        &self.pool
    }

    fn numeric_level(&self) -> i32 {
        self.config.level.numeric_for(self.effective)
    }

    /// Compresses `data` in one shot.
    pub fn compress<'a>(&self, data: &'a [u8]) -> CodecResult<Encoded<'a>> {
        let degraded = self.is_degraded();
        if degraded {
            trace_degraded(self.config.codec, self.effective);
        }
        let level = self.numeric_level();
        let started = Instant::now();
        let output = buffer::compress(&self.pool, self.effective, level, data)?;
        self.notify(Observation {
            operation: OperationKind::Compress,
            codec: self.effective,
            level,
            elapsed: started.elapsed(),
            bytes_in: data.len(),
            bytes_out: output.len(),
            degraded,
        });
        Ok(Encoded {
            data: output,
            requested: self.config.codec,
            produced: self.effective,
            degraded,
        })
    }

    /// Sniffs `data` and decompresses it with whatever codec produced it.
    pub fn decompress<'a>(&self, data: &'a [u8]) -> CodecResult<Decoded<'a>> {
        let started = Instant::now();
        let (detected, output) = buffer::decompress(&self.pool, self.capabilities, data)?;
        self.notify(Observation {
            operation: OperationKind::Decompress,
            codec: detected,
            level: 0,
            elapsed: started.elapsed(),
            bytes_in: data.len(),
            bytes_out: output.len(),
            degraded: false,
        });
        Ok(Decoded {
            data: output,
            detected,
        })
    }

    /// Like [`decompress`](Self::decompress), but fails with
    /// [`CodecError::CorruptStream`] unless `data` sniffs as `codec`.
    pub fn decompress_expecting<'a>(
        &self,
        codec: CodecId,
        data: &'a [u8],
    ) -> CodecResult<Decoded<'a>> {
        let detected = detect_algorithm(data);
        if detected != codec {
            return Err(CodecError::corrupt(
                codec,
                format!("expected {codec} stream, found {detected}"),
            ));
        }
        self.decompress(data)
    }

    /// Starts a streaming compression session over `source`.
    pub fn open_compress_stream<R>(&self, source: R) -> CodecResult<CompressStream>
    where
        R: Read + Send + 'static,
    {
        if self.is_degraded() {
            trace_degraded(self.config.codec, self.effective);
        }
        stream::open_compress_stream(
            &self.pool,
            self.effective,
            self.numeric_level(),
            source,
            self.config.stream,
        )
        .map(|stream| stream.with_requested(self.config.codec))
    }

    /// Wraps `source` in a lazily sniffing decompressor.
    pub fn open_decompress_stream<R: Read>(&self, source: R) -> DecompressStream<R> {
        DecompressStream::new(source, self.capabilities)
    }

    /// Compresses everything `source` yields, streaming or buffered per the
    /// configuration.
    ///
    /// In buffered mode the source is drained on the caller's thread before
    /// this returns; read errors surface as [`CodecError::CodecWriteFailure`].
    pub fn compress_reader<R>(&self, mut source: R) -> CodecResult<CompressReader>
    where
        R: Read + Send + 'static,
    {
        if self.config.streaming {
            return self.open_compress_stream(source).map(CompressReader::Streaming);
        }
        let mut input = Vec::new();
        source
            .read_to_end(&mut input)
            .map_err(|e| CodecError::write_failure(self.effective, e))?;
        let encoded = self.compress(&input)?.into_data().into_owned();
        Ok(CompressReader::Buffered(Cursor::new(encoded)))
    }

    fn notify(&self, observation: Observation) {
        if let Some(observer) = &self.observer {
            observer.observe(&observation);
        }
    }
}

impl fmt::Debug for Compressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compressor")
            .field("config", &self.config)
            .field("capabilities", &self.capabilities)
            .field("effective", &self.effective)
            .field("observer", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}

fn resolve(
    requested: CodecId,
    policy: FallbackPolicy,
    capabilities: Capabilities,
) -> CodecResult<CodecId> {
    if capabilities.supports(requested) {
        return Ok(requested);
    }
    match policy {
        FallbackPolicy::Reject => Err(CodecError::UnsupportedCodec { codec: requested }),
        FallbackPolicy::Degrade => Ok(DEGRADE_ORDER
            .into_iter()
            .find(|codec| capabilities.supports(*codec))
            .unwrap_or(CodecId::None)),
    }
}
