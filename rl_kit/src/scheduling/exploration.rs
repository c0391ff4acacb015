//! Exploration schedules.
//!
//! A schedule maps a training step to an exploration scale: epsilon for
//! [`DqnPolicy`](crate::policy::DqnPolicy), Gaussian noise std for
//! [`DdpgPolicy`](crate::policy::DdpgPolicy). Policies never anneal on their
//! own; the training loop calls [`apply`] with its step counter.
//!
//! - `ConstantSchedule`: fixed value
//! - `LinearSchedule`: linear interpolation from start to end
//! - `StepDecaySchedule`: subtract a fixed decrement every `interval` steps
//!
//! Constructors validate their inputs and return [`ConfigError`] instead of
//! sanitizing. Every value a schedule yields is finite and non-negative.

use crate::error::ConfigError;
use crate::policy::Policy;

/// Step-dependent exploration scale.
pub trait ExplorationSchedule: Send + Sync {
    fn value(&self, step: usize) -> f32;
}

/// Set `policy`'s exploration to `schedule.value(step)` and return it.
pub fn apply<S, P>(schedule: &S, policy: &mut P, step: usize) -> Result<f32, ConfigError>
where
    S: ExplorationSchedule + ?Sized,
    P: Policy + ?Sized,
{
    let value = schedule.value(step);
    policy.set_exploration(value)?;
    Ok(value)
}

/// Same value at every step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantSchedule {
    value: f32,
}

impl ConstantSchedule {
    pub fn new(value: f32) -> Result<Self, ConfigError> {
        ConfigError::check_non_negative("value", value)?;
        Ok(Self { value })
    }
}

impl ExplorationSchedule for ConstantSchedule {
    fn value(&self, _step: usize) -> f32 {
        self.value
    }
}

/// Linear interpolation from `start` to `end` over `total_steps`.
///
/// Holds `end` from `total_steps` onwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearSchedule {
    start: f32,
    end: f32,
    total_steps: usize,
}

impl LinearSchedule {
    pub fn new(start: f32, end: f32, total_steps: usize) -> Result<Self, ConfigError> {
        ConfigError::check_non_negative("start", start)?;
        ConfigError::check_non_negative("end", end)?;
        ConfigError::check_count("total_steps", total_steps)?;
        Ok(Self {
            start,
            end,
            total_steps,
        })
    }

    pub fn start(&self) -> f32 {
        self.start
    }

    pub fn end(&self) -> f32 {
        self.end
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }
}

impl ExplorationSchedule for LinearSchedule {
    fn value(&self, step: usize) -> f32 {
        let progress = (step as f64 / self.total_steps as f64).min(1.0) as f32;
        let value = self.start + (self.end - self.start) * progress;
        // guard float drift past either endpoint
        value.clamp(self.start.min(self.end), self.start.max(self.end))
    }
}

/// Piecewise-constant decay: `start - decrement * (step / interval)`,
/// never below `floor`.
///
/// With the defaults (0.6, 0.1, 500, 0.1) this is the classic DQN
/// schedule: epsilon drops by 0.1 every 500 updates until it reaches 0.1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepDecaySchedule {
    start: f32,
    decrement: f32,
    interval: usize,
    floor: f32,
}

impl Default for StepDecaySchedule {
    fn default() -> Self {
        Self {
            start: 0.6,
            decrement: 0.1,
            interval: 500,
            floor: 0.1,
        }
    }
}

impl StepDecaySchedule {
    pub fn new(start: f32, decrement: f32, interval: usize, floor: f32) -> Result<Self, ConfigError> {
        ConfigError::check_non_negative("start", start)?;
        ConfigError::check_non_negative("decrement", decrement)?;
        ConfigError::check_non_negative("floor", floor)?;
        ConfigError::check_count("interval", interval)?;
        Ok(Self {
            start,
            decrement,
            interval,
            floor: floor.min(start),
        })
    }
}

impl ExplorationSchedule for StepDecaySchedule {
    fn value(&self, step: usize) -> f32 {
        let drops = (step / self.interval) as f32;
        (self.start - self.decrement * drops).max(self.floor)
    }
}
