//! Thread-safe handle to a [`ReplayBuffer`].
//!
//! For setups where several environment workers insert while a learner
//! samples. Insertion takes the write lock, so slot allocation is atomic
//! with respect to samplers; sampling only takes the read lock.
//!
//! Every insertion names a [`StreamId`]. Each worker must use its own id:
//! n-step windows follow the links of one stream, so interleaved inserts
//! from different workers never end up in the same window.
//!
//! ```text
//! Worker 0 ─┐
//! Worker 1 ─┼──> write lock ──> ReplayBuffer ──> read lock ──> Learner
//! Worker N ─┘
//! ```

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use rand::Rng;

use super::replay_buffer::{ReplayBuffer, StreamId};
use crate::core::batch::Batch;
use crate::core::transition::Transition;
use crate::error::{ConfigError, Result};

/// Cloneable shared replay buffer.
#[derive(Debug, Clone)]
pub struct SharedReplayBuffer {
    inner: Arc<RwLock<ReplayBuffer>>,
}

impl SharedReplayBuffer {
    pub fn new(capacity: usize) -> std::result::Result<Self, ConfigError> {
        Ok(Self::from_buffer(ReplayBuffer::new(capacity)?))
    }

    pub fn from_buffer(buffer: ReplayBuffer) -> Self {
        Self {
            inner: Arc::new(RwLock::new(buffer)),
        }
    }

    /// Insert one transition on `stream`; returns its slot index.
    pub fn add(&self, stream: StreamId, transition: Transition) -> usize {
        self.inner.write().add_to_stream(stream, transition)
    }

    /// Insert several transitions of `stream` under a single write lock.
    pub fn add_batch(&self, stream: StreamId, transitions: Vec<Transition>) -> Vec<usize> {
        let mut guard = self.inner.write();
        transitions.into_iter().map(|t| guard.add_to_stream(stream, t)).collect()
    }

    pub fn sample<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Result<Batch> {
        self.inner.read().sample(batch_size, rng)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.read().capacity()
    }

    /// Read access for processors that need buffer context.
    pub fn read(&self) -> RwLockReadGuard<'_, ReplayBuffer> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, ReplayBuffer> {
        self.inner.write()
    }
}
