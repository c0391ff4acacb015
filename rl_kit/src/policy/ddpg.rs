//! Deep Deterministic Policy Gradient.
//!
//! ## Update
//!
//! ```text
//! r'  = normalize(r)                        (if reward_normalization)
//! y   = r' + γ (1 - done) Q_shadow(s', μ_shadow(s'))
//! L_Q = mean((Q(s, a) - y)^2)
//! L_μ = -mean(Q(s, μ(s)))
//! ```
//!
//! A batch carrying processor `returns` uses them as `y`. With
//! `reward_normalization` on, those returns must have been summed from
//! normalized rewards (`batch.reward_scale` set); raw returns are rejected.
//!
//! Actions are `μ(s) + N(0, σ)` in train mode, clamped to the configured
//! action range. Both actor and critic shadows are soft-updated with `tau`
//! after every `update`.
//!
//! ## References
//!
//! - Lillicrap et al., "Continuous control with deep reinforcement
//!   learning" (2016)

use burn::module::AutodiffModule;
use burn::optim::{GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use super::network::{CriticNetwork, Network};
use super::{ActOutput, LearnMetrics, Mode, Policy};
use crate::algorithms::{normalize_rewards, ValueFunction};
use crate::config::DdpgConfig;
use crate::core::batch::{matrix, to_scalar, to_vec, Batch, BatchInput};
use crate::core::target_network::{parameter_distance, NetworkSlot, TargetNetwork};
use crate::core::transition::Action;
use crate::error::{ConfigError, Result, RlError};

/// Learnable functions owned by a [`DdpgPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DdpgModel {
    Actor,
    Critic,
}

/// DDPG with Gaussian exploration noise.
pub struct DdpgPolicy<B, A, C, OA, OC>
where
    B: AutodiffBackend,
    A: Network<B> + AutodiffModule<B>,
    C: CriticNetwork<B> + AutodiffModule<B>,
    OA: Optimizer<A, B>,
    OC: Optimizer<C, B>,
{
    actor: TargetNetwork<B, A>,
    critic: TargetNetwork<B, C>,
    actor_optimizer: OA,
    critic_optimizer: OC,
    config: DdpgConfig,
    noise: f32,
    mode: Mode,
    device: B::Device,
}

impl<B, A, C, OA, OC> DdpgPolicy<B, A, C, OA, OC>
where
    B: AutodiffBackend,
    A: Network<B> + AutodiffModule<B>,
    C: CriticNetwork<B> + AutodiffModule<B>,
    OA: Optimizer<A, B>,
    OC: Optimizer<C, B>,
{
    pub fn new<FA, FC>(
        actor_factory: FA,
        critic_factory: FC,
        actor_optimizer: OA,
        critic_optimizer: OC,
        config: DdpgConfig,
        device: &B::Device,
    ) -> std::result::Result<Self, ConfigError>
    where
        FA: Fn(&B::Device) -> A,
        FC: Fn(&B::Device) -> C,
    {
        config.validate()?;
        Ok(Self {
            actor: TargetNetwork::new(actor_factory, device),
            critic: TargetNetwork::new(critic_factory, device),
            actor_optimizer,
            critic_optimizer,
            noise: config.exploration_noise,
            config,
            mode: Mode::Train,
            device: device.clone(),
        })
    }

    pub fn actor(&self) -> &TargetNetwork<B, A> {
        &self.actor
    }

    pub fn critic(&self) -> &TargetNetwork<B, C> {
        &self.critic
    }

    pub fn config(&self) -> &DdpgConfig {
        &self.config
    }

    /// L1 distance between the online and shadow parameters of `model`.
    pub fn shadow_drift(&self, model: DdpgModel) -> Result<f32> {
        match model {
            DdpgModel::Actor => parameter_distance::<B, A>(self.actor.online(), self.actor.shadow()),
            DdpgModel::Critic => parameter_distance::<B, C>(self.critic.online(), self.critic.shadow()),
        }
    }

    fn clamp(&self, actions: Tensor<B, 2>) -> Tensor<B, 2> {
        match self.config.action_range {
            Some((low, high)) => actions.clamp(low, high),
            None => actions,
        }
    }

    /// Noise-free, clamped actor output for a batch of observations.
    fn actions(&self, slot: NetworkSlot, obs: Tensor<B, 2>) -> Tensor<B, 2> {
        self.clamp(self.actor.get(slot).forward(obs, None).output)
    }

    /// `Q(s, μ(s))` with both networks taken from `slot`.
    fn q_of_policy(&self, slot: NetworkSlot, obs: Tensor<B, 2>) -> Tensor<B, 2> {
        let actions = self.actions(slot, obs.clone());
        self.critic.get(slot).forward(obs, actions)
    }

    fn critic_target(&self, batch: &Batch) -> Result<Tensor<B, 2>> {
        let normalize = self.config.reward_normalization && batch.reward_scale.is_none();
        if let Some(returns) = &batch.returns {
            if normalize {
                return Err(RlError::Pipeline(
                    "reward_normalization is enabled but returns were built from raw rewards",
                ));
            }
            return Ok(batch.column_tensor::<B>(returns, &self.device));
        }
        let next_obs = batch.input_tensor::<B>(BatchInput::NextObs, &self.device);
        let next_q = self.q_of_policy(NetworkSlot::Shadow, next_obs);

        let rewards = if normalize {
            normalize_rewards(&batch.rewards, f32::EPSILON)
        } else {
            batch.rewards.clone()
        };
        Ok(batch.column_tensor::<B>(&rewards, &self.device)
            + batch.not_done_tensor::<B>(&self.device) * next_q.mul_scalar(self.config.gamma))
    }
}

impl<B, A, C, OA, OC> Policy for DdpgPolicy<B, A, C, OA, OC>
where
    B: AutodiffBackend,
    A: Network<B> + AutodiffModule<B>,
    C: CriticNetwork<B> + AutodiffModule<B>,
    OA: Optimizer<A, B>,
    OC: Optimizer<C, B>,
{
    fn act<R: Rng + ?Sized>(&self, obs: &[f32], state: Option<&[f32]>, rng: &mut R) -> Result<ActOutput> {
        let obs_t = matrix::<B>(obs.to_vec(), 1, obs.len(), &self.device);
        let state_t = state.map(|s| matrix::<B>(s.to_vec(), 1, s.len(), &self.device));
        let out = self.actor.online().forward(obs_t, state_t);

        let mut action = to_vec(out.output)?;
        if self.mode == Mode::Train && self.noise > 0.0 {
            let normal = Normal::new(0.0f32, self.noise).map_err(|_| ConfigError::Negative {
                field: "exploration_noise",
                value: self.noise,
            })?;
            for a in action.iter_mut() {
                *a += normal.sample(rng);
            }
        }
        if let Some((low, high)) = self.config.action_range {
            for a in action.iter_mut() {
                *a = a.clamp(low, high);
            }
        }

        Ok(ActOutput {
            action: Action::Continuous(action),
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
        let actions = batch.actions_tensor::<B>(&device)?;

        // Critic
        let target = self.critic_target(batch)?.detach();
        let current_q = self.critic.online().forward(obs.clone(), actions);
        let critic_loss = (current_q - target).powf_scalar(2.0).mean();
        let critic_loss_value = to_scalar(critic_loss.clone())?;

        let grads = critic_loss.backward();
        let grads = GradientsParams::from_grads(grads, self.critic.online());
        let lr = self.config.critic_lr;
        let optimizer = &mut self.critic_optimizer;
        self.critic.update_online(|critic| optimizer.step(lr, critic, grads));

        // Actor, against the freshly updated critic
        let actor_loss = self.q_of_policy(NetworkSlot::Online, obs).mean().neg();
        let actor_loss_value = to_scalar(actor_loss.clone())?;

        let grads = actor_loss.backward();
        let grads = GradientsParams::from_grads(grads, self.actor.online());
        let lr = self.config.actor_lr;
        let optimizer = &mut self.actor_optimizer;
        self.actor.update_online(|actor| optimizer.step(lr, actor, grads));

        tracing::trace!(
            batch_size = batch.len(),
            actor_loss = actor_loss_value,
            critic_loss = critic_loss_value,
            "ddpg update"
        );
        Ok(LearnMetrics::new()
            .with("loss/actor", actor_loss_value)
            .with("loss/critic", critic_loss_value))
    }

    fn sync_weights(&mut self) -> Result<()> {
        let tau = self.config.tau;
        self.actor.sync(tau)?;
        self.critic.sync(tau)?;
        tracing::debug!(tau, syncs = self.actor.sync_count(), "ddpg targets synced");
        Ok(())
    }

    fn mode(&self) -> Mode {
        self.mode
    }

    fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    fn exploration(&self) -> f32 {
        self.noise
    }

    fn set_exploration(&mut self, eps: f32) -> std::result::Result<(), ConfigError> {
        ConfigError::check_non_negative("exploration_noise", eps)?;
        self.noise = eps;
        Ok(())
    }

    fn syncs_after_learn(&self) -> bool {
        true
    }
}

impl<B, A, C, OA, OC> ValueFunction for DdpgPolicy<B, A, C, OA, OC>
where
    B: AutodiffBackend,
    A: Network<B> + AutodiffModule<B>,
    C: CriticNetwork<B> + AutodiffModule<B>,
    OA: Optimizer<A, B>,
    OC: Optimizer<C, B>,
{
    /// `Q(s, μ(s))` under the selected actor/critic pair.
    fn bootstrap_values(&self, observations: &[f32], count: usize, slot: NetworkSlot) -> Result<Vec<f32>> {
        let obs_dim = if count == 0 { 0 } else { observations.len() / count };
        let obs = matrix::<B>(observations.to_vec(), count, obs_dim, &self.device);
        to_vec(self.q_of_policy(slot, obs).detach())
    }
}
