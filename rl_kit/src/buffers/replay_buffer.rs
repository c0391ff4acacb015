//! Fixed-capacity FIFO replay buffer with n-step bookkeeping.
//!
//! Transitions live in a ring of `capacity` slots. Once full, every insert
//! overwrites the oldest resident transition. Each slot stores the global
//! insertion sequence number of its transition and a link to the slot that
//! received the next transition of the same stream. A link is followed only
//! while the target slot still carries the linked sequence number, so
//! n-step windows stop at the write head instead of silently wrapping into
//! evicted history.
//!
//! Writers that interleave (one stream per environment worker) insert with
//! [`ReplayBuffer::add_to_stream`]; windows then follow one worker's
//! trajectory and never mix workers. [`ReplayBuffer::add`] writes to
//! [`DEFAULT_STREAM`].
//!
//! ```text
//! capacity = 5, after 8 inserts (#1..#8) on one stream:
//!
//!   slot:  0    1    2    3    4
//!   item:  #6   #7   #8   #4   #5
//!   seq:   5    6    7    3    4
//!   next:  1    2    -    4    0
//!                        ^ head (next write)
//! ```

use std::collections::HashMap;

use rand::Rng;

use crate::core::batch::Batch;
use crate::core::transition::Transition;
use crate::error::{ConfigError, Result, RlError};

/// Identifies one writer's trajectory inside a buffer.
pub type StreamId = u32;

/// Stream used by [`ReplayBuffer::add`].
pub const DEFAULT_STREAM: StreamId = 0;

#[derive(Debug, Clone)]
struct Slot {
    transition: Transition,
    seq: u64,
    /// Slot and sequence number of the next transition of the same stream.
    next: Option<(usize, u64)>,
}

/// Temporally contiguous run of resident slots starting at a sampled index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    /// Physical slot indices, oldest first.
    pub indices: Vec<usize>,
    /// The last transition in the window ended its episode.
    pub terminated: bool,
}

impl Window {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Slot of the newest transition in the window.
    pub fn last(&self) -> Option<usize> {
        self.indices.last().copied()
    }
}

/// Ring buffer of transitions with uniform sampling.
#[derive(Debug, Clone)]
pub struct ReplayBuffer {
    slots: Vec<Slot>,
    capacity: usize,
    /// Next slot to write.
    head: usize,
    total_added: u64,
    /// Newest slot and sequence number per stream.
    tails: HashMap<StreamId, (usize, u64)>,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> std::result::Result<Self, ConfigError> {
        ConfigError::check_count("capacity", capacity)?;
        Ok(Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            head: 0,
            total_added: 0,
            tails: HashMap::new(),
        })
    }

    /// Store a transition on [`DEFAULT_STREAM`], evicting the oldest when
    /// full.
    ///
    /// Returns the physical slot index written.
    pub fn add(&mut self, transition: Transition) -> usize {
        self.add_to_stream(DEFAULT_STREAM, transition)
    }

    /// Store a transition as the successor of `stream`'s previous one.
    ///
    /// Returns the physical slot index written.
    pub fn add_to_stream(&mut self, stream: StreamId, transition: Transition) -> usize {
        let index = self.head;
        let seq = self.total_added;
        let slot = Slot {
            transition,
            seq,
            next: None,
        };
        if self.slots.len() < self.capacity {
            self.slots.push(slot);
        } else {
            self.slots[index] = slot;
        }

        if let Some((prev, prev_seq)) = self.tails.insert(stream, (index, seq)) {
            // the previous transition may have just been evicted
            if let Some(prev_slot) = self.slots.get_mut(prev).filter(|s| s.seq == prev_seq) {
                prev_slot.next = Some((index, seq));
            }
        }

        self.head = (self.head + 1) % self.capacity;
        self.total_added += 1;
        index
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() == self.capacity
    }

    /// Number of transitions ever added, including evicted ones.
    pub fn total_added(&self) -> u64 {
        self.total_added
    }

    pub fn get(&self, index: usize) -> Option<&Transition> {
        self.slots.get(index).map(|s| &s.transition)
    }

    /// Insertion sequence number of the transition in `index`.
    pub fn sequence(&self, index: usize) -> Option<u64> {
        self.slots.get(index).map(|s| s.seq)
    }

    /// Slot of the most recently added transition.
    pub fn newest_index(&self) -> Option<usize> {
        if self.is_empty() {
            None
        } else {
            Some((self.head + self.capacity - 1) % self.capacity)
        }
    }

    /// Resident transitions from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Transition> + '_ {
        let start = if self.is_full() { self.head } else { 0 };
        let len = self.slots.len();
        (0..len).map(move |i| &self.slots[(start + i) % len].transition)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.tails.clear();
        self.head = 0;
    }

    /// Slot holding the transition its stream inserted right after `index`.
    ///
    /// `None` when that transition has not been added yet, has been evicted,
    /// or `index` is not resident. A full ring's newest slot has no
    /// successor: the physically next slot holds the oldest transition.
    pub fn successor(&self, index: usize) -> Option<usize> {
        let (next, seq) = self.slots.get(index)?.next?;
        match self.slots.get(next) {
            Some(slot) if slot.seq == seq => Some(next),
            _ => None,
        }
    }

    /// Up to `n` contiguous slots starting at `index`.
    ///
    /// Stops after a `done` transition (`terminated`) or at the first
    /// missing successor. Returns `None` if `index` is not resident.
    pub fn window(&self, index: usize, n: usize) -> Option<Window> {
        self.slots.get(index)?;

        let mut window = Window {
            indices: Vec::with_capacity(n.min(self.len())),
            terminated: false,
        };
        let mut current = index;
        while window.indices.len() < n {
            window.indices.push(current);
            if self.slots[current].transition.done {
                window.terminated = true;
                break;
            }
            match self.successor(current) {
                Some(next) => current = next,
                None => break,
            }
        }
        Some(window)
    }

    /// Draw `batch_size` distinct resident indices uniformly at random.
    pub fn sample_indices<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Result<Vec<usize>> {
        let available = self.len();
        if batch_size > available {
            return Err(RlError::InsufficientData {
                requested: batch_size,
                available,
            });
        }
        Ok(rand::seq::index::sample(rng, available, batch_size).into_vec())
    }

    /// Sample a batch without replacement.
    pub fn sample<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Result<Batch> {
        let indices = self.sample_indices(batch_size, rng)?;
        let batch = self.batch_from_indices(&indices)?;
        tracing::trace!(batch_size, buffer_len = self.len(), "sampled batch");
        Ok(batch)
    }

    /// Gather a batch from explicit slot indices.
    pub fn batch_from_indices(&self, indices: &[usize]) -> Result<Batch> {
        let len = self.len();
        let rows = indices
            .iter()
            .map(|&index| {
                self.get(index)
                    .map(|t| (index, t))
                    .ok_or(RlError::IndexOutOfRange { index, len })
            })
            .collect::<Result<Vec<_>>>()?;
        Batch::from_transitions(rows)
    }
}
