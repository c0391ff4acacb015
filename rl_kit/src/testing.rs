//! Deterministic environments and a scripted policy shared by tests.

use std::cell::{Cell, RefCell};

use rand::Rng;
use tracing_subscriber::EnvFilter;

use crate::algorithms::ValueFunction;
use crate::core::batch::Batch;
use crate::core::target_network::NetworkSlot;
use crate::core::transition::Action;
use crate::environment::{EnvError, Environment, Space, StepResult};
use crate::error::{ConfigError, Result};
use crate::policy::{ActOutput, LearnMetrics, Mode, Policy};

/// Route crate logs to the test writer; filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Walks `0, 1, .., length - 1`; reward 1 per step, done at `length`.
///
/// Observation is `[t]`. Accepts discrete actions `0..2`.
pub struct ChainEnv {
    pub length: usize,
    pub t: usize,
    pub resets: usize,
    /// Fail the step with this 1-based global step number, once.
    pub fail_at: Option<usize>,
    pub steps: usize,
}

impl ChainEnv {
    pub fn new(length: usize) -> Self {
        Self {
            length,
            t: 0,
            resets: 0,
            fail_at: None,
            steps: 0,
        }
    }

    pub fn failing_at(mut self, step: usize) -> Self {
        self.fail_at = Some(step);
        self
    }
}

impl Environment for ChainEnv {
    fn observation_space(&self) -> Space {
        Space::unbounded(&[1])
    }

    fn action_space(&self) -> Space {
        Space::Discrete { n: 2 }
    }

    fn reset(&mut self) -> std::result::Result<Vec<f32>, EnvError> {
        self.t = 0;
        self.resets += 1;
        Ok(vec![0.0])
    }

    fn step(&mut self, action: &Action) -> std::result::Result<StepResult, EnvError> {
        if !self.action_space().contains(action) {
            return Err(EnvError::InvalidAction(action.to_string()));
        }
        if self.fail_at == Some(self.steps + 1) {
            self.fail_at = None;
            return Err(EnvError::Simulation("chain broke".to_string()));
        }
        self.steps += 1;
        self.t += 1;
        Ok(StepResult::new(vec![self.t as f32], 1.0, self.t >= self.length))
    }
}

/// 1-D point pushed by continuous actions in `[-1, 1]`.
///
/// Reward is `-|x|`; episodes last `length` steps.
pub struct PointEnv {
    pub length: usize,
    pub x: f32,
    pub t: usize,
}

impl PointEnv {
    pub fn new(length: usize) -> Self {
        Self { length, x: 0.0, t: 0 }
    }
}

impl Environment for PointEnv {
    fn observation_space(&self) -> Space {
        Space::unbounded(&[1])
    }

    fn action_space(&self) -> Space {
        Space::Box {
            shape: vec![1],
            low: -1.0,
            high: 1.0,
        }
    }

    fn reset(&mut self) -> std::result::Result<Vec<f32>, EnvError> {
        self.x = 0.5;
        self.t = 0;
        Ok(vec![self.x])
    }

    fn step(&mut self, action: &Action) -> std::result::Result<StepResult, EnvError> {
        let push = match action.continuous() {
            Some([a]) if (-1.0..=1.0).contains(a) => *a,
            _ => return Err(EnvError::InvalidAction(action.to_string())),
        };
        self.x += 0.1 * push;
        self.t += 1;
        Ok(StepResult::new(vec![self.x], -self.x.abs(), self.t >= self.length))
    }
}

/// Always picks action 0 and counts steps in its recurrent state.
///
/// The state passed to `act` is recorded so tests can check it is
/// threaded within an episode and cleared between episodes.
#[derive(Default)]
pub struct ScriptedPolicy {
    pub seen_states: RefCell<Vec<Option<f32>>>,
    pub learn_calls: Cell<usize>,
    pub value: f32,
    mode: Mode,
    eps: f32,
}

impl ScriptedPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: f32) -> Self {
        Self {
            value,
            ..Self::default()
        }
    }
}

impl Policy for ScriptedPolicy {
    fn act<R: Rng + ?Sized>(&self, _obs: &[f32], state: Option<&[f32]>, _rng: &mut R) -> Result<ActOutput> {
        let previous = state.map(|s| s[0]);
        self.seen_states.borrow_mut().push(previous);
        Ok(ActOutput {
            action: Action::Discrete(0),
            state: Some(vec![previous.unwrap_or(0.0) + 1.0]),
        })
    }

    fn learn(&mut self, batch: &Batch) -> Result<LearnMetrics> {
        self.learn_calls.set(self.learn_calls.get() + 1);
        Ok(LearnMetrics::new().with("batch_size", batch.len() as f32))
    }

    fn sync_weights(&mut self) -> Result<()> {
        Ok(())
    }

    fn mode(&self) -> Mode {
        self.mode
    }

    fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    fn exploration(&self) -> f32 {
        self.eps
    }

    fn set_exploration(&mut self, eps: f32) -> std::result::Result<(), ConfigError> {
        self.eps = eps;
        Ok(())
    }
}

impl ValueFunction for ScriptedPolicy {
    fn bootstrap_values(&self, _observations: &[f32], count: usize, _slot: NetworkSlot) -> Result<Vec<f32>> {
        Ok(vec![self.value; count])
    }
}
