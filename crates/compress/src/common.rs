//! Byte accounting shared by the streaming session types.

use std::io::{self, IoSliceMut, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by a session's worker and read by its consumer.
#[derive(Debug, Default)]
pub(crate) struct StreamCounters {
    bytes_in: AtomicU64,
    bytes_out: AtomicU64,
}

impl StreamCounters {
    pub(crate) fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn add_in(&self, amount: usize) {
        self.bytes_in.fetch_add(amount as u64, Ordering::Relaxed);
    }

    pub(crate) fn add_out(&self, amount: usize) {
        self.bytes_out.fetch_add(amount as u64, Ordering::Relaxed);
    }

    pub(crate) fn bytes_in(&self) -> u64 {
        self.bytes_in.load(Ordering::Relaxed)
    }

    pub(crate) fn bytes_out(&self) -> u64 {
        self.bytes_out.load(Ordering::Relaxed)
    }
}

/// Reader adapter that records every byte pulled from `inner` as input.
pub(crate) struct CountingReader<R> {
    inner: R,
    counters: Arc<StreamCounters>,
}

impl<R> CountingReader<R> {
    pub(crate) fn new(inner: R, counters: Arc<StreamCounters>) -> Self {
        Self { inner, counters }
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        self.counters.add_in(read);
        Ok(read)
    }

    fn read_vectored(&mut self, bufs: &mut [IoSliceMut<'_>]) -> io::Result<usize> {
        let read = self.inner.read_vectored(bufs)?;
        self.counters.add_in(read);
        Ok(read)
    }
}
