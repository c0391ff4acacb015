//! Hyperparameter sets for policies and the collector.
//!
//! Each config is a plain serde-serializable struct with `with_*` builders
//! and a `validate()` that every constructor calls before building
//! anything. Out-of-range values are rejected, never clamped.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ============================================================================
// DQN
// ============================================================================

/// Configuration for [`DqnPolicy`](crate::policy::DqnPolicy).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DqnConfig {
    /// Discount factor, in `(0, 1]`.
    pub gamma: f32,
    /// Target blend used by `sync_weights`, in `(0, 1]`.
    /// 1.0 is a hard copy, driven by the caller every N steps.
    pub tau: f32,
    /// Probability of a random action in train mode. Annealed by the caller.
    pub epsilon: f32,
    /// Optimizer learning rate for the online Q-network.
    pub learning_rate: f64,
}

impl Default for DqnConfig {
    fn default() -> Self {
        Self {
            gamma: 0.99,
            tau: 1.0,
            epsilon: 0.1,
            learning_rate: 1e-4,
        }
    }
}

impl DqnConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gamma(mut self, gamma: f32) -> Self {
        self.gamma = gamma;
        self
    }

    pub fn with_tau(mut self, tau: f32) -> Self {
        self.tau = tau;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f32) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check_unit_interval("gamma", self.gamma)?;
        ConfigError::check_unit_interval("tau", self.tau)?;
        ConfigError::check_non_negative("epsilon", self.epsilon)?;
        ConfigError::check_positive("learning_rate", self.learning_rate)?;
        Ok(())
    }
}

// ============================================================================
// DDPG
// ============================================================================

/// Configuration for [`DdpgPolicy`](crate::policy::DdpgPolicy).
///
/// Defaults follow the usual DDPG settings: soft target updates with
/// `tau = 0.005`, Gaussian exploration with std 0.1, and per-batch reward
/// normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DdpgConfig {
    /// Soft update coefficient, in `(0, 1]`.
    pub tau: f32,
    /// Discount factor, in `(0, 1]`.
    pub gamma: f32,
    /// Std of Gaussian exploration noise added in train mode.
    pub exploration_noise: f32,
    /// Optional `(low, high)` clamp applied to every action.
    pub action_range: Option<(f32, f32)>,
    /// Normalize rewards per batch before computing the critic target.
    pub reward_normalization: bool,
    pub actor_lr: f64,
    pub critic_lr: f64,
}

impl Default for DdpgConfig {
    fn default() -> Self {
        Self {
            tau: 0.005,
            gamma: 0.99,
            exploration_noise: 0.1,
            action_range: None,
            reward_normalization: true,
            actor_lr: 1e-4,
            critic_lr: 1e-3,
        }
    }
}

impl DdpgConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tau(mut self, tau: f32) -> Self {
        self.tau = tau;
        self
    }

    pub fn with_gamma(mut self, gamma: f32) -> Self {
        self.gamma = gamma;
        self
    }

    pub fn with_exploration_noise(mut self, noise: f32) -> Self {
        self.exploration_noise = noise;
        self
    }

    pub fn with_action_range(mut self, low: f32, high: f32) -> Self {
        self.action_range = Some((low, high));
        self
    }

    pub fn with_reward_normalization(mut self, enabled: bool) -> Self {
        self.reward_normalization = enabled;
        self
    }

    pub fn with_actor_lr(mut self, lr: f64) -> Self {
        self.actor_lr = lr;
        self
    }

    pub fn with_critic_lr(mut self, lr: f64) -> Self {
        self.critic_lr = lr;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check_unit_interval("tau", self.tau)?;
        ConfigError::check_unit_interval("gamma", self.gamma)?;
        ConfigError::check_non_negative("exploration_noise", self.exploration_noise)?;
        if let Some((low, high)) = self.action_range {
            if !(low.is_finite() && high.is_finite() && low < high) {
                return Err(ConfigError::InvalidActionRange { low, high });
            }
        }
        ConfigError::check_positive("actor_lr", self.actor_lr)?;
        ConfigError::check_positive("critic_lr", self.critic_lr)?;
        Ok(())
    }
}

// ============================================================================
// N-step returns
// ============================================================================

/// Configuration for [`NStepReturn`](crate::algorithms::NStepReturn).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NStepConfig {
    /// Maximum number of rewards summed before bootstrapping.
    pub n: usize,
    /// Discount factor, in `(0, 1]`.
    pub gamma: f32,
}

impl Default for NStepConfig {
    fn default() -> Self {
        Self { n: 1, gamma: 0.99 }
    }
}

impl NStepConfig {
    pub fn new(n: usize, gamma: f32) -> Self {
        Self { n, gamma }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check_count("n", self.n)?;
        ConfigError::check_unit_interval("gamma", self.gamma)?;
        Ok(())
    }
}

// ============================================================================
// Collector
// ============================================================================

/// Configuration for [`Collector`](crate::collector::Collector).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Replay buffer capacity in transitions.
    pub buffer_capacity: usize,
    /// Seed for the collector-owned RNG used for sampling and exploration.
    pub seed: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 20_000,
            seed: 123,
        }
    }
}

impl CollectorConfig {
    pub fn new(buffer_capacity: usize) -> Self {
        Self {
            buffer_capacity,
            ..Default::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check_count("buffer_capacity", self.buffer_capacity)
    }
}
