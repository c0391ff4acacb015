//! Observation and action spaces.

use rand::Rng;
use rand_distr::{Distribution, StandardNormal, Uniform};
use serde::{Deserialize, Serialize};

use crate::core::transition::Action;
use crate::error::ConfigError;

/// Shape and bounds of observations or actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Space {
    /// Integer choices `0..n`.
    Discrete { n: usize },
    /// Real vectors with uniform per-element bounds.
    Box { shape: Vec<usize>, low: f32, high: f32 },
}

impl Space {
    pub fn discrete(n: usize) -> Result<Self, ConfigError> {
        ConfigError::check_count("n", n)?;
        Ok(Space::Discrete { n })
    }

    /// Box space with uniform bounds; infinite bounds are allowed.
    pub fn bounded(shape: &[usize], low: f32, high: f32) -> Result<Self, ConfigError> {
        if low.is_nan() || high.is_nan() || low >= high {
            return Err(ConfigError::InvalidActionRange { low, high });
        }
        Ok(Space::Box {
            shape: shape.to_vec(),
            low,
            high,
        })
    }

    /// Box space over all reals.
    pub fn unbounded(shape: &[usize]) -> Self {
        Space::Box {
            shape: shape.to_vec(),
            low: f32::NEG_INFINITY,
            high: f32::INFINITY,
        }
    }

    pub fn shape(&self) -> Vec<usize> {
        match self {
            Space::Discrete { .. } => vec![1],
            Space::Box { shape, .. } => shape.clone(),
        }
    }

    /// Number of floats in one flattened sample.
    pub fn flat_dim(&self) -> usize {
        match self {
            Space::Discrete { .. } => 1,
            Space::Box { shape, .. } => shape.iter().product(),
        }
    }

    /// Number of choices for a discrete space.
    pub fn n(&self) -> Option<usize> {
        match self {
            Space::Discrete { n } => Some(*n),
            Space::Box { .. } => None,
        }
    }

    /// `(low, high)` for a box space.
    pub fn bounds(&self) -> Option<(f32, f32)> {
        match self {
            Space::Discrete { .. } => None,
            Space::Box { low, high, .. } => Some((*low, *high)),
        }
    }

    pub fn contains(&self, action: &Action) -> bool {
        match (self, action) {
            (Space::Discrete { n }, Action::Discrete(a)) => (*a as usize) < *n,
            (Space::Box { .. }, Action::Continuous(values)) => self.contains_values(values),
            _ => false,
        }
    }

    /// Check a flattened vector (e.g. an observation) against this space.
    pub fn contains_values(&self, values: &[f32]) -> bool {
        match self {
            Space::Discrete { n } => {
                values.len() == 1 && values[0] >= 0.0 && values[0].fract() == 0.0 && (values[0] as usize) < *n
            }
            Space::Box { low, high, .. } => {
                values.len() == self.flat_dim() && values.iter().all(|v| *v >= *low && *v <= *high)
            }
        }
    }

    /// Uniformly random element; unbounded box dimensions draw from N(0, 1).
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Action {
        match self {
            Space::Discrete { n } => Action::Discrete(rng.gen_range(0..*n) as u32),
            Space::Box { low, high, .. } => {
                let dim = self.flat_dim();
                let values = if low.is_finite() && high.is_finite() {
                    let dist = Uniform::new_inclusive(*low, *high);
                    (0..dim).map(|_| dist.sample(rng)).collect()
                } else {
                    (0..dim)
                        .map(|_| {
                            let v: f32 = StandardNormal.sample(rng);
                            v.clamp(*low, *high)
                        })
                        .collect()
                };
                Action::Continuous(values)
            }
        }
    }
}
