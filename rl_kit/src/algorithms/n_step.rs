//! n-step discounted returns over replay-buffer windows.
//!
//! For a sampled transition t with a contiguous window of `m ≤ n` resident
//! transitions:
//!
//! ## Formula
//!
//! G_t = Σ_{k=0}^{m-1} γ^k r_{t+k} + γ^m V(s_{t+m})
//!
//! where the bootstrap term is dropped when the window ended on a terminal
//! transition. `n = 1` reduces to the TD target `r + γ(1 - done) V(s')`;
//! an unbounded `n` gives Monte-Carlo returns that bootstrap only at the
//! newest resident transition.
//!
//! Bootstrap values come from the shadow network unless configured
//! otherwise.
//!
//! ## Reward normalization
//!
//! When the batch carries a [`RewardScale`] (set by
//! [`RewardNormalization`](super::RewardNormalization)), or the processor was
//! built with [`NStepReturn::with_reward_normalization`], every window reward
//! is standardized with the batch statistics before discounting. With `n = 1`
//! the target becomes `r̂ + γ(1 - done) V(s')`.

use super::processor::{BatchProcessor, ValueFunction};
use crate::buffers::ReplayBuffer;
use crate::config::NStepConfig;
use crate::core::batch::{Batch, RewardScale};
use crate::core::target_network::NetworkSlot;
use crate::error::{ConfigError, Result, RlError};

/// Discounted sum of `rewards`, bootstrapped with `bootstrap` unless the
/// sequence ended on a terminal transition.
///
/// # Arguments
///
/// * `rewards` - rewards r_t .. r_{t+m-1}
/// * `terminated` - the last reward ended its episode
/// * `bootstrap` - V(s_{t+m}), ignored when `terminated`
/// * `gamma` - discount factor
pub fn discounted_return(rewards: &[f32], terminated: bool, bootstrap: f32, gamma: f32) -> f32 {
    let mut ret = if terminated { 0.0 } else { bootstrap };
    for &r in rewards.iter().rev() {
        ret = r + gamma * ret;
    }
    ret
}

/// Processor writing n-step returns into `batch.returns`.
#[derive(Debug, Clone, PartialEq)]
pub struct NStepReturn {
    n: usize,
    gamma: f32,
    slot: NetworkSlot,
    /// Epsilon for standardizing rewards of batches not yet normalized.
    normalize: Option<f32>,
}

impl NStepReturn {
    pub fn new(config: NStepConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            n: config.n,
            gamma: config.gamma,
            slot: NetworkSlot::Shadow,
            normalize: None,
        })
    }

    /// Monte-Carlo returns: sum until the episode ends or history runs out.
    pub fn until_episode_end(gamma: f32) -> std::result::Result<Self, ConfigError> {
        ConfigError::check_unit_interval("gamma", gamma)?;
        Ok(Self {
            n: usize::MAX,
            gamma,
            slot: NetworkSlot::Shadow,
            normalize: None,
        })
    }

    /// Bootstrap from a different parameter set.
    pub fn with_slot(mut self, slot: NetworkSlot) -> Self {
        self.slot = slot;
        self
    }

    /// Standardize rewards with the sampled rows' statistics before summing.
    pub fn with_reward_normalization(mut self, epsilon: f32) -> std::result::Result<Self, ConfigError> {
        ConfigError::check_positive("epsilon", f64::from(epsilon))?;
        self.normalize = Some(epsilon);
        Ok(self)
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn gamma(&self) -> f32 {
        self.gamma
    }

    pub fn slot(&self) -> NetworkSlot {
        self.slot
    }

    pub fn reward_normalization(&self) -> Option<f32> {
        self.normalize
    }

    /// Returns for the given buffer slots.
    ///
    /// With reward normalization enabled, the scale comes from the rewards
    /// of `indices` themselves.
    pub fn compute<V>(&self, indices: &[usize], buffer: &ReplayBuffer, value_fn: &V) -> Result<Vec<f32>>
    where
        V: ValueFunction + ?Sized,
    {
        let scale = self.normalize.map(|epsilon| {
            let rewards: Vec<f32> = indices.iter().filter_map(|&i| buffer.get(i)).map(|t| t.reward).collect();
            RewardScale::from_rewards(&rewards, epsilon)
        });
        self.compute_scaled(indices, buffer, value_fn, scale.as_ref())
    }

    /// Returns for the given buffer slots, standardizing every window reward
    /// with `scale` when given.
    pub fn compute_scaled<V>(
        &self,
        indices: &[usize],
        buffer: &ReplayBuffer,
        value_fn: &V,
        scale: Option<&RewardScale>,
    ) -> Result<Vec<f32>>
    where
        V: ValueFunction + ?Sized,
    {
        let len = buffer.len();
        let mut rewards = Vec::with_capacity(indices.len());
        let mut terminated = Vec::with_capacity(indices.len());
        // rows that need V(s_{t+m}), and their observations
        let mut bootstrap_rows = Vec::new();
        let mut bootstrap_obs = Vec::new();

        for (row, &index) in indices.iter().enumerate() {
            let window = buffer
                .window(index, self.n)
                .ok_or(RlError::IndexOutOfRange { index, len })?;

            let window_rewards: Vec<f32> = window
                .indices
                .iter()
                .filter_map(|&i| buffer.get(i))
                .map(|t| scale.map_or(t.reward, |s| s.apply(t.reward)))
                .collect();

            if !window.terminated {
                if let Some(last) = window.last().and_then(|i| buffer.get(i)) {
                    bootstrap_rows.push(row);
                    bootstrap_obs.extend_from_slice(&last.next_observation);
                }
            }
            rewards.push(window_rewards);
            terminated.push(window.terminated);
        }

        let mut bootstrap = vec![0.0f32; indices.len()];
        if !bootstrap_rows.is_empty() {
            let values = value_fn.bootstrap_values(&bootstrap_obs, bootstrap_rows.len(), self.slot)?;
            if values.len() != bootstrap_rows.len() {
                return Err(RlError::ShapeMismatch {
                    field: "bootstrap_values",
                    expected: bootstrap_rows.len(),
                    found: values.len(),
                });
            }
            for (&row, v) in bootstrap_rows.iter().zip(values) {
                bootstrap[row] = v;
            }
        }

        Ok(rewards
            .iter()
            .zip(&terminated)
            .zip(&bootstrap)
            .map(|((r, &done), &v)| discounted_return(r, done, v, self.gamma))
            .collect())
    }
}

impl<V: ValueFunction + ?Sized> BatchProcessor<V> for NStepReturn {
    fn process(&self, mut batch: Batch, buffer: &ReplayBuffer, value_fn: &V) -> Result<Batch> {
        if batch.reward_scale.is_none() {
            if let Some(epsilon) = self.normalize {
                let scale = RewardScale::from_rewards(&batch.rewards, epsilon);
                batch.rewards = batch.rewards.iter().map(|&r| scale.apply(r)).collect();
                batch.reward_scale = Some(scale);
            }
        }
        let scale = batch.reward_scale;
        let returns = self.compute_scaled(&batch.indices, buffer, value_fn, scale.as_ref())?;
        batch.set_returns(returns)?;
        Ok(batch)
    }

    fn name(&self) -> &'static str {
        "n_step_return"
    }
}
