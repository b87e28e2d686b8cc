//! Thread-safe pool of reusable codec handles.
//!
//! Native encoder and decoder contexts are expensive to allocate, so every
//! one-shot call borrows a handle from a [`ResourcePool`] and hands it back
//! when done. The pool is elastic: an empty idle set allocates a new handle
//! rather than blocking, and returned handles are retained without an upper
//! bound.
//!
//! # Invariants
//!
//! - A handle is never held by two callers at once. Acquisition pops it from
//!   the idle set under the lock.
//! - A handle is reset before it re-enters the idle set. Handles whose reset
//!   fails are dropped instead of returned.
//! - Lock poisoning is recovered from; the idle sets only hold reset handles,
//!   so a panic in another caller cannot leave them inconsistent.

use std::collections::HashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::algorithm::CodecId;
use crate::debug_codec::{trace_handle_created, trace_handle_discarded, trace_handle_reused};
use crate::error::CodecResult;
use crate::handle::{DecoderHandle, EncoderHandle};

const ENCODER: &str = "encoder";
const DECODER: &str = "decoder";

/// Encoders are keyed by level because native contexts fix it at creation.
type EncoderKey = (CodecId, i32);

/// Elastic per-codec pool of encoder and decoder handles.
#[derive(Default)]
pub struct ResourcePool {
    encoders: Mutex<HashMap<EncoderKey, Vec<EncoderHandle>>>,
    decoders: Mutex<HashMap<CodecId, Vec<DecoderHandle>>>,
    created: AtomicU64,
    reused: AtomicU64,
}

impl ResourcePool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrows an encoder for `codec` at `level`, allocating one if none is idle.
    pub(crate) fn acquire_encoder(
        pool: &Arc<Self>,
        codec: CodecId,
        level: i32,
    ) -> CodecResult<PooledEncoder> {
        let idle = lock(&pool.encoders)
            .get_mut(&(codec, level))
            .and_then(Vec::pop);
        let handle = if let Some(handle) = idle {
            pool.reused.fetch_add(1, Ordering::Relaxed);
            trace_handle_reused(codec, ENCODER);
            handle
        } else {
            let handle = EncoderHandle::new(codec, level)?;
            pool.created.fetch_add(1, Ordering::Relaxed);
            trace_handle_created(codec, ENCODER, level);
            handle
        };
        Ok(PooledEncoder {
            handle: Some(handle),
            level,
            pool: Arc::clone(pool),
        })
    }

    /// Borrows a decoder for `codec`, allocating one if none is idle.
    pub(crate) fn acquire_decoder(pool: &Arc<Self>, codec: CodecId) -> CodecResult<PooledDecoder> {
        let idle = lock(&pool.decoders).get_mut(&codec).and_then(Vec::pop);
        let handle = if let Some(handle) = idle {
            pool.reused.fetch_add(1, Ordering::Relaxed);
            trace_handle_reused(codec, DECODER);
            handle
        } else {
            let handle = DecoderHandle::new(codec)?;
            pool.created.fetch_add(1, Ordering::Relaxed);
            trace_handle_created(codec, DECODER, 0);
            handle
        };
        Ok(PooledDecoder {
            handle: Some((codec, handle)),
            pool: Arc::clone(pool),
        })
    }

    fn release_encoder(&self, level: i32, mut handle: EncoderHandle) {
        let codec = handle.codec();
        if !handle.reset() {
            trace_handle_discarded(codec, ENCODER);
            return;
        }
        lock(&self.encoders)
            .entry((codec, level))
            .or_default()
            .push(handle);
    }

    fn release_decoder(&self, codec: CodecId, mut handle: DecoderHandle) {
        if !handle.reset() {
            trace_handle_discarded(codec, DECODER);
            return;
        }
        lock(&self.decoders).entry(codec).or_default().push(handle);
    }

    /// Returns the number of idle handles, encoders and decoders, for `codec`.
    #[must_use]
    pub fn idle(&self, codec: CodecId) -> usize {
        let encoders: usize = lock(&self.encoders)
            .iter()
            .filter(|((id, _), _)| *id == codec)
            .map(|(_, handles)| handles.len())
            .sum();
        let decoders = lock(&self.decoders).get(&codec).map_or(0, Vec::len);
        encoders + decoders
    }

    /// Returns how many handles have been allocated over the pool's lifetime.
    #[must_use]
    pub fn created(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }

    /// Returns how many acquisitions were served from the idle set.
    #[must_use]
    pub fn reused(&self) -> u64 {
        self.reused.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for ResourcePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourcePool")
            .field("created", &self.created())
            .field("reused", &self.reused())
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// RAII guard returning an encoder to its pool on drop.
pub(crate) struct PooledEncoder {
    handle: Option<EncoderHandle>,
    level: i32,
    pool: Arc<ResourcePool>,
}

impl Deref for PooledEncoder {
    type Target = EncoderHandle;

    fn deref(&self) -> &Self::Target {
        self.handle.as_ref().expect("encoder already released")
    }
}

impl DerefMut for PooledEncoder {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.handle.as_mut().expect("encoder already released")
    }
}

impl Drop for PooledEncoder {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.pool.release_encoder(self.level, handle);
        }
    }
}

/// RAII guard returning a decoder to its pool on drop.
pub(crate) struct PooledDecoder {
    handle: Option<(CodecId, DecoderHandle)>,
    pool: Arc<ResourcePool>,
}

impl Deref for PooledDecoder {
    type Target = DecoderHandle;

    fn deref(&self) -> &Self::Target {
        &self.handle.as_ref().expect("decoder already released").1
    }
}

impl DerefMut for PooledDecoder {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.handle.as_mut().expect("decoder already released").1
    }
}

impl Drop for PooledDecoder {
    fn drop(&mut self) {
        if let Some((codec, handle)) = self.handle.take() {
            self.pool.release_decoder(codec, handle);
        }
    }
}
