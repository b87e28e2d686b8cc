//! Streaming compression and lazy streaming decompression.
//!
//! # Compression
//!
//! [`open_compress_stream`] moves the source and a pooled encoder onto a
//! dedicated worker thread. The worker reads the source in chunks, encodes
//! them, and pushes the output through a bounded [pipe](crate::pipe). The
//! returned [`CompressStream`] is the read end of that pipe, so the worker
//! can never run more than the pipe capacity ahead of the consumer.
//!
//! ```text
//!   source ──read──▶ [worker: encoder] ──bounded pipe──▶ CompressStream::read
//! ```
//!
//! Closing or dropping the stream disconnects the pipe. A worker blocked on a
//! full pipe wakes up, releases its encoder to the pool, and exits; the close
//! call joins it. A worker blocked inside the *source's* `read` cannot be
//! interrupted and is joined once that read returns.
//!
//! # Decompression
//!
//! [`DecompressStream`] sniffs the first bytes of its source on the first
//! read, then hands the replayed prefix plus the remaining source to the
//! native streaming decoder for the detected codec. No thread is involved.

use std::fmt;
use std::io::{self, Chain, Cursor, Read};
#[cfg(feature = "zstd")]
use std::io::BufReader;
use std::mem;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use flate2::read::MultiGzDecoder;

use crate::algorithm::{Capabilities, CodecId};
use crate::common::{CountingReader, StreamCounters};
use crate::debug_codec::{trace_stream_closed, trace_stream_opened};
use crate::error::{CodecError, CodecResult};
use crate::pipe::{Disconnected, PipeReader, PipeWriter, pipe};
use crate::pool::{PooledEncoder, ResourcePool};
use crate::sniff::{detect_algorithm, read_prefix};

/// Default number of chunks the pipe buffers before the worker blocks.
pub const DEFAULT_PIPE_CAPACITY: usize = 16;

/// Default size of the chunks read from the source.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

const WORKER_NAME: &str = "compress-stream";

/// Tunables for streaming compression.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StreamOptions {
    pipe_capacity: usize,
    chunk_size: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            pipe_capacity: DEFAULT_PIPE_CAPACITY,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl StreamOptions {
    /// Sets how many encoded chunks may be queued ahead of the consumer.
    #[must_use]
    pub fn with_pipe_capacity(mut self, capacity: usize) -> Self {
        self.pipe_capacity = capacity.max(1);
        self
    }

    /// Sets the read size used against the source.
    #[must_use]
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Returns the pipe capacity in chunks.
    #[must_use]
    pub const fn pipe_capacity(&self) -> usize {
        self.pipe_capacity
    }

    /// Returns the source read size in bytes.
    #[must_use]
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

/// How a compression session ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StreamOutcome {
    /// The worker encoded the whole source.
    Completed,
    /// The consumer went away before the worker finished.
    Cancelled,
}

impl StreamOutcome {
    const fn label(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

enum WorkerOutcome {
    Completed,
    Cancelled,
    Failed(io::ErrorKind, String),
}

enum PumpError {
    Disconnected,
    Failed(io::Error),
}

impl From<Disconnected> for PumpError {
    fn from(_: Disconnected) -> Self {
        Self::Disconnected
    }
}

impl From<CodecError> for PumpError {
    fn from(error: CodecError) -> Self {
        Self::Failed(error.into())
    }
}

/// Starts compressing `source` with `codec` on a worker thread.
///
/// The encoder is taken from `pool` before the thread starts, so an
/// unsupported codec fails here rather than on the first read.
/// [`CodecId::None`] needs no worker and streams the source through as-is.
pub fn open_compress_stream<R>(
    pool: &Arc<ResourcePool>,
    codec: CodecId,
    level: i32,
    source: R,
    options: StreamOptions,
) -> CodecResult<CompressStream>
where
    R: Read + Send + 'static,
{
    let counters = StreamCounters::shared();
    if codec.is_none() {
        trace_stream_opened("compress", codec);
        return Ok(CompressStream {
            codec,
            requested: codec,
            session: Session::Passthrough(Box::new(CountingReader::new(
                source,
                Arc::clone(&counters),
            ))),
            counters,
        });
    }

    let encoder = ResourcePool::acquire_encoder(pool, codec, level)?;
    let (writer, reader) = pipe(options.pipe_capacity);
    let worker_counters = Arc::clone(&counters);
    let chunk_size = options.chunk_size;
    let worker = thread::Builder::new()
        .name(WORKER_NAME.into())
        .spawn(move || run_worker(encoder, source, writer, chunk_size, &worker_counters))
        .map_err(|e| CodecError::write_failure(codec, e))?;

    trace_stream_opened("compress", codec);
    Ok(CompressStream {
        codec,
        requested: codec,
        session: Session::Piped { reader, worker },
        counters,
    })
}

fn run_worker<R: Read>(
    mut encoder: PooledEncoder,
    mut source: R,
    pipe: PipeWriter,
    chunk_size: usize,
    counters: &StreamCounters,
) -> WorkerOutcome {
    let outcome = match pump(&mut encoder, &mut source, &pipe, chunk_size, counters) {
        Ok(()) => match pipe.finish() {
            Ok(()) => WorkerOutcome::Completed,
            Err(Disconnected) => WorkerOutcome::Cancelled,
        },
        Err(PumpError::Disconnected) => WorkerOutcome::Cancelled,
        Err(PumpError::Failed(error)) => {
            let outcome = WorkerOutcome::Failed(error.kind(), error.to_string());
            pipe.fail(error);
            outcome
        }
    };
    drop(encoder);
    outcome
}

fn pump<R: Read>(
    encoder: &mut PooledEncoder,
    source: &mut R,
    pipe: &PipeWriter,
    chunk_size: usize,
    counters: &StreamCounters,
) -> Result<(), PumpError> {
    let mut chunk = vec![0u8; chunk_size];
    encoder.begin(chunk_size);
    loop {
        let read = match source.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(PumpError::Failed(err)),
        };
        counters.add_in(read);
        encoder.write(&chunk[..read])?;
        forward(encoder, pipe, counters)?;
    }
    encoder.finish()?;
    forward(encoder, pipe, counters)
}

fn forward(
    encoder: &mut PooledEncoder,
    pipe: &PipeWriter,
    counters: &StreamCounters,
) -> Result<(), PumpError> {
    let output = encoder.take_output();
    if output.is_empty() {
        return Ok(());
    }
    counters.add_out(output.len());
    pipe.send(output)?;
    Ok(())
}

enum Session {
    Piped {
        reader: PipeReader,
        worker: JoinHandle<WorkerOutcome>,
    },
    Passthrough(Box<dyn Read + Send>),
    Closed,
}

/// Readable end of a compression session.
pub struct CompressStream {
    codec: CodecId,
    requested: CodecId,
    session: Session,
    counters: Arc<StreamCounters>,
}

impl CompressStream {
    /// Returns the codec producing this stream's bytes.
    #[must_use]
    pub const fn codec(&self) -> CodecId {
        self.codec
    }

    /// Codec the caller asked for. Differs from [`codec`](Self::codec) only
    /// when a fallback codec is serving the stream.
    #[must_use]
    pub const fn requested(&self) -> CodecId {
        self.requested
    }

    /// `true` when the stream is produced by a fallback codec.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.requested != self.codec
    }

    pub(crate) fn with_requested(mut self, requested: CodecId) -> Self {
        self.requested = requested;
        self
    }

    /// Uncompressed bytes pulled from the source so far.
    #[must_use]
    pub fn bytes_in(&self) -> u64 {
        self.counters.bytes_in()
    }

    /// Compressed bytes produced so far.
    #[must_use]
    pub fn bytes_out(&self) -> u64 {
        self.counters.bytes_out()
    }

    /// Returns `true` once [`close`](Self::close) has run.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self.session, Session::Closed)
    }

    /// Ends the session and waits for the worker to exit.
    ///
    /// Unread output is discarded. Reads after a close fail with
    /// [`CodecError::SessionClosed`], as does a second close.
    pub fn close(&mut self) -> io::Result<StreamOutcome> {
        let outcome = match mem::replace(&mut self.session, Session::Closed) {
            Session::Piped { reader, worker } => {
                drop(reader);
                match worker.join() {
                    Ok(WorkerOutcome::Completed) => StreamOutcome::Completed,
                    Ok(WorkerOutcome::Cancelled) => StreamOutcome::Cancelled,
                    Ok(WorkerOutcome::Failed(kind, message)) => {
                        trace_stream_closed(
                            "compress",
                            self.codec,
                            "failed",
                            self.bytes_in(),
                            self.bytes_out(),
                        );
                        return Err(io::Error::new(kind, message));
                    }
                    Err(_) => return Err(io::Error::other("compression worker panicked")),
                }
            }
            Session::Passthrough(_) => StreamOutcome::Completed,
            Session::Closed => return Err(CodecError::SessionClosed.into()),
        };
        trace_stream_closed(
            "compress",
            self.codec,
            outcome.label(),
            self.bytes_in(),
            self.bytes_out(),
        );
        Ok(outcome)
    }
}

impl Read for CompressStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.session {
            Session::Piped { reader, .. } => reader.read(buf),
            Session::Passthrough(source) => {
                let read = source.read(buf)?;
                self.counters.add_out(read);
                Ok(read)
            }
            Session::Closed => Err(CodecError::SessionClosed.into()),
        }
    }
}

impl Drop for CompressStream {
    fn drop(&mut self) {
        if !self.is_closed() {
            let _ = self.close();
        }
    }
}

impl fmt::Debug for CompressStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompressStream")
            .field("codec", &self.codec)
            .field("requested", &self.requested)
            .field("closed", &self.is_closed())
            .field("bytes_in", &self.bytes_in())
            .field("bytes_out", &self.bytes_out())
            .finish()
    }
}

type Replay<R> = Chain<Cursor<Vec<u8>>, CountingReader<R>>;

enum Inner<R: Read> {
    Plain(Replay<R>),
    Gzip(MultiGzDecoder<Replay<R>>),
    #[cfg(feature = "zstd")]
    Zstd(zstd::stream::read::Decoder<'static, BufReader<Replay<R>>>),
}

impl<R: Read> Read for Inner<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Plain(reader) => reader.read(buf),
            Self::Gzip(reader) => reader.read(buf),
            #[cfg(feature = "zstd")]
            Self::Zstd(reader) => reader.read(buf),
        }
    }
}

enum DecodeState<R: Read> {
    Pending(R),
    Active(Inner<R>),
    Finished,
    Failed,
    Closed,
}

/// Lazily-sniffing streaming decompressor.
pub struct DecompressStream<R: Read> {
    state: DecodeState<R>,
    capabilities: Capabilities,
    expected: Option<CodecId>,
    detected: Option<CodecId>,
    counters: Arc<StreamCounters>,
}

impl<R: Read> DecompressStream<R> {
    /// Wraps `source`. Nothing is read until the first call to [`Read::read`].
    pub fn new(source: R, capabilities: Capabilities) -> Self {
        Self {
            state: DecodeState::Pending(source),
            capabilities,
            expected: None,
            detected: None,
            counters: StreamCounters::shared(),
        }
    }

    /// Requires the sniffed codec to be `codec`; anything else is reported
    /// as [`CodecError::CorruptStream`].
    #[must_use]
    pub fn expecting(mut self, codec: CodecId) -> Self {
        self.expected = Some(codec);
        self
    }

    /// Returns the sniffed codec, or `None` before the first read.
    #[must_use]
    pub const fn detected(&self) -> Option<CodecId> {
        self.detected
    }

    /// Raw bytes pulled from the source so far, including read-ahead.
    #[must_use]
    pub fn bytes_in(&self) -> u64 {
        self.counters.bytes_in()
    }

    /// Decoded bytes returned to the caller so far.
    #[must_use]
    pub fn bytes_out(&self) -> u64 {
        self.counters.bytes_out()
    }

    /// Ends the session and releases the source. Later reads fail with
    /// [`CodecError::SessionClosed`].
    pub fn close(&mut self) {
        if let DecodeState::Active(_) = self.state {
            trace_stream_closed(
                "decompress",
                self.detected.unwrap_or_default(),
                "cancelled",
                self.bytes_in(),
                self.bytes_out(),
            );
        }
        self.state = DecodeState::Closed;
    }

    fn activate(&mut self) -> io::Result<()> {
        let source = match mem::replace(&mut self.state, DecodeState::Failed) {
            DecodeState::Pending(source) => source,
            other => {
                self.state = other;
                return Ok(());
            }
        };
        let mut source = CountingReader::new(source, Arc::clone(&self.counters));
        let prefix = read_prefix(&mut source)?;
        let codec = detect_algorithm(&prefix);
        match self.expected {
            Some(expected) if expected != codec => {
                return Err(CodecError::corrupt(
                    expected,
                    format!("expected {expected} stream, found {codec}"),
                )
                .into());
            }
            _ => {}
        }
        if !self.capabilities.supports(codec) {
            return Err(CodecError::UnsupportedCodec { codec }.into());
        }

        let replay = Cursor::new(prefix).chain(source);
        let inner = match codec {
            CodecId::Gzip => Inner::Gzip(MultiGzDecoder::new(replay)),
            #[cfg(feature = "zstd")]
            CodecId::Zstd => Inner::Zstd(
                zstd::stream::read::Decoder::new(replay)
                    .map_err(|e| CodecError::corrupt(codec, e.to_string()))?,
            ),
            #[cfg(not(feature = "zstd"))]
            CodecId::Zstd => return Err(CodecError::UnsupportedCodec { codec }.into()),
            CodecId::None => Inner::Plain(replay),
        };
        trace_stream_opened("decompress", codec);
        self.detected = Some(codec);
        self.state = DecodeState::Active(inner);
        Ok(())
    }
}

impl<R: Read> Read for DecompressStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if matches!(self.state, DecodeState::Pending(_)) {
            self.activate()?;
        }
        let inner = match &mut self.state {
            DecodeState::Active(inner) => inner,
            DecodeState::Finished => return Ok(0),
            DecodeState::Pending(_) | DecodeState::Failed | DecodeState::Closed => {
                return Err(CodecError::SessionClosed.into());
            }
        };
        let codec = self.detected.unwrap_or_default();
        match inner.read(buf) {
            Ok(0) if !buf.is_empty() => {
                self.state = DecodeState::Finished;
                trace_stream_closed(
                    "decompress",
                    codec,
                    "completed",
                    self.bytes_in(),
                    self.bytes_out(),
                );
                Ok(0)
            }
            Ok(read) => {
                self.counters.add_out(read);
                Ok(read)
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => Err(err),
            Err(err) => {
                self.state = DecodeState::Failed;
                Err(classify_decode_error(codec, err))
            }
        }
    }
}

impl<R: Read> fmt::Debug for DecompressStream<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecompressStream")
            .field("detected", &self.detected)
            .field("expected", &self.expected)
            .field("bytes_in", &self.bytes_in())
            .field("bytes_out", &self.bytes_out())
            .finish_non_exhaustive()
    }
}

/// Decoder library errors become [`CodecError::CorruptStream`]; source I/O
/// errors pass through untouched.
fn classify_decode_error(codec: CodecId, err: io::Error) -> io::Error {
    if codec.is_none() || CodecError::from_io(&err).is_some() {
        return err;
    }
    match err.kind() {
        io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput | io::ErrorKind::UnexpectedEof => {
            CodecError::corrupt(codec, err.to_string()).into()
        }
        _ => err,
    }
}
