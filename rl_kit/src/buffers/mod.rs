//! Replay storage for off-policy learning.
//!
//! - `ReplayBuffer`: single-owner FIFO ring with uniform sampling and
//!   sequence-number n-step windows
//! - `SharedReplayBuffer`: `Arc<RwLock<_>>` handle for multi-writer setups

pub mod replay_buffer;
pub mod shared_buffer;

pub use replay_buffer::{ReplayBuffer, StreamId, Window, DEFAULT_STREAM};
pub use shared_buffer::SharedReplayBuffer;
