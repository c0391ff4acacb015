//! Single-environment interface driven by the collector.
//!
//! The environment is external to the library: implementations wrap a
//! simulator and expose gym-style `reset`/`step`. Episodes do not
//! auto-reset; the collector calls `reset` after a step reports `done`.

pub mod spaces;

use thiserror::Error;

use crate::core::transition::{Action, Info};

pub use spaces::Space;

/// Failure raised by an environment.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvError {
    /// The action is not a member of the action space.
    #[error("invalid action: {0}")]
    InvalidAction(String),

    /// The simulator itself failed.
    #[error("simulation fault: {0}")]
    Simulation(String),
}

/// Result from stepping a single environment.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    /// Observation after the step, flattened.
    pub observation: Vec<f32>,
    pub reward: f32,
    /// Episode ended (terminal or truncated).
    pub done: bool,
    pub info: Info,
}

impl StepResult {
    pub fn new(observation: Vec<f32>, reward: f32, done: bool) -> Self {
        Self {
            observation,
            reward,
            done,
            info: Info::new(),
        }
    }

    pub fn with_info(mut self, info: Info) -> Self {
        self.info = info;
        self
    }
}

/// Gym-style environment.
pub trait Environment {
    fn observation_space(&self) -> Space;

    fn action_space(&self) -> Space;

    /// Start a new episode and return its first observation.
    fn reset(&mut self) -> Result<Vec<f32>, EnvError>;

    /// Advance one step.
    ///
    /// Implementations should reject actions outside the action space with
    /// [`EnvError::InvalidAction`].
    fn step(&mut self, action: &Action) -> Result<StepResult, EnvError>;
}

impl<E: Environment + ?Sized> Environment for Box<E> {
    fn observation_space(&self) -> Space {
        (**self).observation_space()
    }

    fn action_space(&self) -> Space {
        (**self).action_space()
    }

    fn reset(&mut self) -> Result<Vec<f32>, EnvError> {
        (**self).reset()
    }

    fn step(&mut self, action: &Action) -> Result<StepResult, EnvError> {
        (**self).step(action)
    }
}
