//! Deep Q-Network policy.
//!
//! Acts epsilon-greedily over Q-values and regresses `Q(s, a)` onto a
//! bootstrapped target computed with the shadow network:
//!
//! ```text
//! y = r + γ (1 - done) max_a' Q_shadow(s', a')     (1-step)
//! y = batch.returns                                (when a processor set them)
//! L = mean((Q(s, a) - y)^2)
//! ```
//!
//! The shadow network is synced on the caller's schedule, typically a hard
//! copy every N updates.

use burn::module::AutodiffModule;
use burn::optim::{GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use rand::Rng;

use super::network::Network;
use super::{ActOutput, LearnMetrics, Mode, Policy};
use crate::algorithms::ValueFunction;
use crate::config::DqnConfig;
use crate::core::batch::{matrix, to_scalar, to_vec, Batch, BatchInput};
use crate::core::target_network::{NetworkSlot, TargetNetwork};
use crate::core::transition::Action;
use crate::error::{ConfigError, Result, RlError};

/// Epsilon-greedy Q-learning policy.
pub struct DqnPolicy<B, M, O>
where
    B: AutodiffBackend,
    M: Network<B> + AutodiffModule<B>,
    O: Optimizer<M, B>,
{
    model: TargetNetwork<B, M>,
    optimizer: O,
    config: DqnConfig,
    n_actions: usize,
    epsilon: f32,
    mode: Mode,
    device: B::Device,
}

impl<B, M, O> DqnPolicy<B, M, O>
where
    B: AutodiffBackend,
    M: Network<B> + AutodiffModule<B>,
    O: Optimizer<M, B>,
{
    /// Build a policy over `n_actions` discrete actions.
    ///
    /// `factory` is called twice to build the online and shadow Q-networks.
    pub fn new<F>(
        factory: F,
        optimizer: O,
        n_actions: usize,
        config: DqnConfig,
        device: &B::Device,
    ) -> std::result::Result<Self, ConfigError>
    where
        F: Fn(&B::Device) -> M,
    {
        config.validate()?;
        ConfigError::check_count("n_actions", n_actions)?;
        Ok(Self {
            model: TargetNetwork::new(factory, device),
            optimizer,
            epsilon: config.epsilon,
            config,
            n_actions,
            mode: Mode::Train,
            device: device.clone(),
        })
    }

    pub fn model(&self) -> &TargetNetwork<B, M> {
        &self.model
    }

    pub fn config(&self) -> &DqnConfig {
        &self.config
    }

    pub fn n_actions(&self) -> usize {
        self.n_actions
    }

    /// Q-values `[count, n_actions]` of the selected network, row-major.
    fn q_values_batch(&self, observations: &[f32], count: usize, slot: NetworkSlot) -> Tensor<B, 2> {
        let obs_dim = if count == 0 { 0 } else { observations.len() / count };
        let obs = matrix::<B>(observations.to_vec(), count, obs_dim, &self.device);
        self.model.get(slot).forward(obs, None).output
    }

    /// Online Q-values for one observation.
    pub fn q_values(&self, obs: &[f32]) -> Result<Vec<f32>> {
        let q = to_vec(self.q_values_batch(obs, 1, NetworkSlot::Online))?;
        self.check_actions(q.len())?;
        Ok(q)
    }

    fn check_actions(&self, found: usize) -> Result<()> {
        if found == self.n_actions {
            Ok(())
        } else {
            Err(RlError::ShapeMismatch {
                field: "q_values",
                expected: self.n_actions,
                found,
            })
        }
    }
}

/// Index of the largest value; the first one wins ties.
fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

impl<B, M, O> Policy for DqnPolicy<B, M, O>
where
    B: AutodiffBackend,
    M: Network<B> + AutodiffModule<B>,
    O: Optimizer<M, B>,
{
    fn act<R: Rng + ?Sized>(&self, obs: &[f32], state: Option<&[f32]>, rng: &mut R) -> Result<ActOutput> {
        let obs_t = matrix::<B>(obs.to_vec(), 1, obs.len(), &self.device);
        let state_t = state.map(|s| matrix::<B>(s.to_vec(), 1, s.len(), &self.device));
        let out = self.model.online().forward(obs_t, state_t);

        let q = to_vec(out.output)?;
        self.check_actions(q.len())?;

        let explore = self.mode == Mode::Train && self.epsilon > 0.0 && rng.gen::<f32>() < self.epsilon;
        let action = if explore {
            rng.gen_range(0..self.n_actions)
        } else {
            argmax(&q)
        };

        Ok(ActOutput {
            action: Action::Discrete(action as u32),
            state: out.state.map(to_vec).transpose()?,
        })
    }

    fn learn(&mut self, batch: &Batch) -> Result<LearnMetrics> {
        batch.validate()?;
        if batch.is_empty() {
            return Err(RlError::InsufficientData {
                requested: 1,
                available: 0,
            });
        }

        let device = self.device.clone();
        let obs = batch.input_tensor::<B>(BatchInput::Obs, &device);
        let mask = batch.action_mask_tensor::<B>(self.n_actions, &device)?;

        let target = match &batch.returns {
            Some(returns) => batch.column_tensor::<B>(returns, &device),
            None => {
                let next_obs = batch.input_tensor::<B>(BatchInput::NextObs, &device);
                let next_q = self.model.shadow().forward(next_obs, None).output.max_dim(1);
                let rewards = batch.column_tensor::<B>(&batch.rewards, &device);
                rewards + batch.not_done_tensor::<B>(&device) * next_q.mul_scalar(self.config.gamma)
            }
        }
        .detach();

        let q = self.model.online().forward(obs, None).output;
        let q_taken = (q * mask).sum_dim(1);
        let loss = (q_taken - target).powf_scalar(2.0).mean();
        let loss_value = to_scalar(loss.clone())?;

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, self.model.online());
        let lr = self.config.learning_rate;
        let optimizer = &mut self.optimizer;
        self.model.update_online(|model| optimizer.step(lr, model, grads));

        tracing::trace!(batch_size = batch.len(), loss = loss_value, "dqn update");
        Ok(LearnMetrics::new().with("loss", loss_value))
    }

    fn sync_weights(&mut self) -> Result<()> {
        self.model.sync(self.config.tau)?;
        tracing::debug!(tau = self.config.tau, syncs = self.model.sync_count(), "dqn target synced");
        Ok(())
    }

    fn mode(&self) -> Mode {
        self.mode
    }

    fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    fn exploration(&self) -> f32 {
        self.epsilon
    }

    fn set_exploration(&mut self, eps: f32) -> std::result::Result<(), ConfigError> {
        ConfigError::check_non_negative("epsilon", eps)?;
        self.epsilon = eps;
        Ok(())
    }
}

impl<B, M, O> ValueFunction for DqnPolicy<B, M, O>
where
    B: AutodiffBackend,
    M: Network<B> + AutodiffModule<B>,
    O: Optimizer<M, B>,
{
    /// `max_a Q(s, a)` under the selected network.
    fn bootstrap_values(&self, observations: &[f32], count: usize, slot: NetworkSlot) -> Result<Vec<f32>> {
        let q = self.q_values_batch(observations, count, slot);
        to_vec(q.max_dim(1).detach())
    }
}
