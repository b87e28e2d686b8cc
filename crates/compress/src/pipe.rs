//! Bounded in-process pipe connecting a stream worker to its consumer.
//!
//! The channel holds at most `capacity` chunks. A full pipe blocks the
//! producer, which is what keeps a fast encoder from running ahead of a slow
//! consumer. Dropping the [`PipeReader`] disconnects the channel and every
//! pending or future [`PipeWriter::send`] fails.

use std::io::{self, Read};

use crossbeam_channel::{Receiver, Sender, bounded};

use crate::error::CodecError;

enum Frame {
    Data(Vec<u8>),
    Failed(io::Error),
    End,
}

/// The consumer side has gone away.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) struct Disconnected;

/// Creates a pipe that buffers at most `capacity` chunks.
pub(crate) fn pipe(capacity: usize) -> (PipeWriter, PipeReader) {
    let (tx, rx) = bounded(capacity.max(1));
    (
        PipeWriter { tx },
        PipeReader {
            rx,
            current: Vec::new(),
            offset: 0,
            state: ReadState::Open,
        },
    )
}

/// Producer half, owned by the worker thread.
pub(crate) struct PipeWriter {
    tx: Sender<Frame>,
}

impl PipeWriter {
    /// Queues a chunk, blocking while the pipe is full.
    pub(crate) fn send(&self, chunk: Vec<u8>) -> Result<(), Disconnected> {
        self.tx.send(Frame::Data(chunk)).map_err(|_| Disconnected)
    }

    /// Marks the end of the stream.
    pub(crate) fn finish(self) -> Result<(), Disconnected> {
        self.tx.send(Frame::End).map_err(|_| Disconnected)
    }

    /// Forwards a worker failure to the consumer.
    pub(crate) fn fail(self, error: io::Error) {
        let _ = self.tx.send(Frame::Failed(error));
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ReadState {
    Open,
    Finished,
    Failed,
}

/// Consumer half exposed through [`Read`].
pub(crate) struct PipeReader {
    rx: Receiver<Frame>,
    current: Vec<u8>,
    offset: usize,
    state: ReadState,
}

impl Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.offset < self.current.len() {
                let available = &self.current[self.offset..];
                let n = available.len().min(buf.len());
                buf[..n].copy_from_slice(&available[..n]);
                self.offset += n;
                return Ok(n);
            }
            match self.state {
                ReadState::Open => {}
                ReadState::Finished => return Ok(0),
                ReadState::Failed => return Err(CodecError::SessionClosed.into()),
            }
            if buf.is_empty() {
                return Ok(0);
            }
            match self.rx.recv() {
                Ok(Frame::Data(chunk)) => {
                    self.current = chunk;
                    self.offset = 0;
                }
                Ok(Frame::End) => self.state = ReadState::Finished,
                Ok(Frame::Failed(error)) => {
                    self.state = ReadState::Failed;
                    return Err(error);
                }
                // The worker vanished without an end marker.
                Err(_) => {
                    self.state = ReadState::Failed;
                    return Err(CodecError::SessionClosed.into());
                }
            }
        }
    }
}
