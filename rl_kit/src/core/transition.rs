//! Transition and action types recorded by the collector.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque per-step side channel returned by the environment.
///
/// The library stores and forwards it but never interprets it.
pub type Info = HashMap<String, f32>;

/// Action representation (discrete or continuous).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Discrete action index
    Discrete(u32),
    /// Continuous action vector
    Continuous(Vec<f32>),
}

impl Action {
    /// Discrete action index, or `None` for continuous actions.
    pub fn discrete(&self) -> Option<u32> {
        match self {
            Action::Discrete(a) => Some(*a),
            Action::Continuous(_) => None,
        }
    }

    /// Continuous action vector, or `None` for discrete actions.
    pub fn continuous(&self) -> Option<&[f32]> {
        match self {
            Action::Discrete(_) => None,
            Action::Continuous(a) => Some(a),
        }
    }

    /// Number of floats needed to represent this action.
    pub fn size(&self) -> usize {
        match self {
            Action::Discrete(_) => 1,
            Action::Continuous(a) => a.len(),
        }
    }

    /// Short description used in mismatch errors.
    pub fn kind(&self) -> String {
        match self {
            Action::Discrete(_) => "discrete".to_string(),
            Action::Continuous(a) => format!("continuous[{}]", a.len()),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Discrete(a) => write!(f, "{}", a),
            Action::Continuous(a) => write!(f, "{:?}", a),
        }
    }
}

/// One `(s, a, r, s', done)` record from environment interaction.
///
/// Immutable once stored: the replay buffer only hands out shared
/// references or clones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub observation: Vec<f32>,
    pub action: Action,
    pub reward: f32,
    pub next_observation: Vec<f32>,
    /// Episode ended at this step; no bootstrapping past it.
    pub done: bool,
    #[serde(default)]
    pub info: Info,
}

impl Transition {
    pub fn new(
        observation: Vec<f32>,
        action: Action,
        reward: f32,
        next_observation: Vec<f32>,
        done: bool,
    ) -> Self {
        Self {
            observation,
            action,
            reward,
            next_observation,
            done,
            info: Info::new(),
        }
    }

    /// Create a new transition with discrete action.
    pub fn new_discrete(
        observation: Vec<f32>,
        action: u32,
        reward: f32,
        next_observation: Vec<f32>,
        done: bool,
    ) -> Self {
        Self::new(observation, Action::Discrete(action), reward, next_observation, done)
    }

    /// Create a new transition with continuous action.
    pub fn new_continuous(
        observation: Vec<f32>,
        action: Vec<f32>,
        reward: f32,
        next_observation: Vec<f32>,
        done: bool,
    ) -> Self {
        Self::new(observation, Action::Continuous(action), reward, next_observation, done)
    }

    pub fn with_info(mut self, info: Info) -> Self {
        self.info = info;
        self
    }
}
