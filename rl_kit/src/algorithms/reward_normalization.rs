//! Per-batch reward standardization.
//!
//! The processor records the [`RewardScale`] it used on the batch, so a
//! return processor running after it sums standardized rewards too.

use super::processor::BatchProcessor;
use crate::buffers::ReplayBuffer;
use crate::core::batch::{Batch, RewardScale};
use crate::error::{ConfigError, Result, RlError};

/// Standardize rewards to zero mean and unit variance within one batch.
///
/// Uses the unbiased sample std (0 for a single reward). `epsilon` keeps
/// zero-variance batches finite: they map to all zeros.
pub fn normalize_rewards(rewards: &[f32], epsilon: f32) -> Vec<f32> {
    let scale = RewardScale::from_rewards(rewards, epsilon);
    rewards.iter().map(|&r| scale.apply(r)).collect()
}

/// Processor applying [`normalize_rewards`] to `batch.rewards`.
///
/// Must run before any return processor: a batch that already carries
/// `returns` is rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardNormalization {
    epsilon: f32,
}

impl Default for RewardNormalization {
    fn default() -> Self {
        Self { epsilon: f32::EPSILON }
    }
}

impl RewardNormalization {
    pub fn new(epsilon: f32) -> std::result::Result<Self, ConfigError> {
        ConfigError::check_positive("epsilon", f64::from(epsilon))?;
        Ok(Self { epsilon })
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }
}

impl<V: ?Sized> BatchProcessor<V> for RewardNormalization {
    fn process(&self, mut batch: Batch, _buffer: &ReplayBuffer, _value_fn: &V) -> Result<Batch> {
        if batch.returns.is_some() {
            return Err(RlError::Pipeline("reward normalization must run before return estimation"));
        }
        if batch.reward_scale.is_some() {
            return Ok(batch);
        }
        let scale = RewardScale::from_rewards(&batch.rewards, self.epsilon);
        batch.rewards = batch.rewards.iter().map(|&r| scale.apply(r)).collect();
        batch.reward_scale = Some(scale);
        Ok(batch)
    }

    fn name(&self) -> &'static str {
        "reward_normalization"
    }
}
