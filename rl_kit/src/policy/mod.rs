//! Policies: action selection, learning and target syncing.
//!
//! A policy owns its learnable functions as [`TargetNetwork`] pairs and its
//! optimizers. It acts on single observations, learns from batches and
//! syncs its shadow networks when told to.
//!
//! - `network`: traits the backing burn modules implement
//! - `dqn`: epsilon-greedy Q-learning
//! - `ddpg`: deterministic policy gradient with Gaussian exploration
//!
//! [`TargetNetwork`]: crate::core::target_network::TargetNetwork

pub mod ddpg;
pub mod dqn;
pub mod network;

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::batch::Batch;
use crate::core::transition::Action;
use crate::error::{ConfigError, Result};

pub use ddpg::{DdpgModel, DdpgPolicy};
pub use dqn::DqnPolicy;
pub use network::{CriticNetwork, Mlp, MlpActor, MlpCritic, ModelOutput, Network};

/// Train mode explores; eval mode acts deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    Train,
    Eval,
}

/// Result of one `act` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ActOutput {
    pub action: Action,
    /// Recurrent state to pass to the next `act` call of this episode.
    pub state: Option<Vec<f32>>,
}

impl ActOutput {
    pub fn new(action: Action) -> Self {
        Self { action, state: None }
    }
}

/// Named scalars reported by `learn` (e.g. `loss/critic`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LearnMetrics(BTreeMap<String, f32>);

impl LearnMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: f32) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f32) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f32> {
        self.0.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for LearnMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, value) in self.iter() {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{}={:.4}", name, value)?;
            first = false;
        }
        Ok(())
    }
}

/// Common interface driven by the collector and the training loop.
pub trait Policy {
    /// Choose an action for one observation.
    ///
    /// `state` is the recurrent state returned by the previous call in the
    /// same episode, or `None` at episode start.
    fn act<R: Rng + ?Sized>(&self, obs: &[f32], state: Option<&[f32]>, rng: &mut R) -> Result<ActOutput>;

    /// One optimizer step on the online networks.
    ///
    /// Shadow networks are never modified here.
    fn learn(&mut self, batch: &Batch) -> Result<LearnMetrics>;

    /// Move every shadow network towards its online counterpart.
    fn sync_weights(&mut self) -> Result<()>;

    fn mode(&self) -> Mode;

    fn set_mode(&mut self, mode: Mode);

    fn train(&mut self) {
        self.set_mode(Mode::Train);
    }

    fn eval(&mut self) {
        self.set_mode(Mode::Eval);
    }

    /// Current exploration scale (epsilon or noise std).
    fn exploration(&self) -> f32;

    /// Set the exploration scale; negative values are rejected.
    fn set_exploration(&mut self, eps: f32) -> std::result::Result<(), ConfigError>;

    /// Whether the policy expects a sync after every `learn`.
    fn syncs_after_learn(&self) -> bool {
        false
    }

    /// `learn`, followed by `sync_weights` for policies that sync every step.
    fn update(&mut self, batch: &Batch) -> Result<LearnMetrics> {
        let metrics = self.learn(batch)?;
        if self.syncs_after_learn() {
            self.sync_weights()?;
        }
        Ok(metrics)
    }
}
