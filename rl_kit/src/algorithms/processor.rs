//! Batch post-processing hooks.
//!
//! A processor turns a freshly sampled [`Batch`] into a training batch. It
//! may read surrounding transitions from the buffer (n-step windows) and
//! query a [`ValueFunction`] for bootstrap values, but never mutates either.
//! The collector runs its processors in registration order.

use crate::buffers::ReplayBuffer;
use crate::core::batch::Batch;
use crate::core::target_network::NetworkSlot;
use crate::error::Result;

/// State-value estimates used to bootstrap truncated returns.
///
/// Implemented by policies: V(s) for actor-critic methods, `max_a Q(s, a)`
/// for value-based ones.
pub trait ValueFunction {
    /// Evaluate `count` flattened observations with the given parameter set.
    fn bootstrap_values(&self, observations: &[f32], count: usize, slot: NetworkSlot) -> Result<Vec<f32>>;
}

/// Pure transformation of a sampled batch.
pub trait BatchProcessor<V: ?Sized> {
    fn process(&self, batch: Batch, buffer: &ReplayBuffer, value_fn: &V) -> Result<Batch>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}
