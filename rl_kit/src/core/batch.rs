//! Column-wise mini-batches sampled from the replay buffer.
//!
//! A [`Batch`] stores each field of its transitions as a parallel column.
//! Observations are flattened row-major (`[len * obs_dim]`) so they convert
//! to a `[len, obs_dim]` tensor without copying row by row. Processors add
//! derived columns (`returns`, named extras); every column must have exactly
//! `len()` rows.

use std::collections::BTreeMap;

use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};

use super::transition::{Action, Info, Transition};
use crate::error::{Result, RlError};

/// Build a `[rows, cols]` tensor from row-major host data.
pub fn matrix<B: Backend>(values: Vec<f32>, rows: usize, cols: usize, device: &B::Device) -> Tensor<B, 2> {
    Tensor::from_data(TensorData::new(values, [rows, cols]), device)
}

/// Read a tensor back to host memory as `f32`.
pub fn to_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| RlError::Tensor(format!("{:?}", e)))
}

/// Read a single-element tensor (e.g. a mean loss) back as `f32`.
pub fn to_scalar<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<f32> {
    to_vec(tensor)?
        .first()
        .copied()
        .ok_or_else(|| RlError::Tensor("empty tensor".to_string()))
}

/// Which observation column a network consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchInput {
    /// Observations `s_t`.
    Obs,
    /// Next observations `s_{t+1}`.
    NextObs,
}

/// Reward standardization statistics: `(r - mean) / (std + epsilon)`.
///
/// `std` is the unbiased sample std, 0 for fewer than two rewards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardScale {
    pub mean: f32,
    pub std: f32,
    pub epsilon: f32,
}

impl RewardScale {
    pub fn from_rewards(rewards: &[f32], epsilon: f32) -> Self {
        let n = rewards.len();
        let mean = if n == 0 {
            0.0
        } else {
            rewards.iter().sum::<f32>() / n as f32
        };
        let std = if n > 1 {
            let var = rewards.iter().map(|r| (r - mean).powi(2)).sum::<f32>() / (n - 1) as f32;
            var.sqrt()
        } else {
            0.0
        };
        Self { mean, std, epsilon }
    }

    pub fn apply(&self, reward: f32) -> f32 {
        (reward - self.mean) / (self.std + self.epsilon)
    }
}

/// Ephemeral training batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    /// Flattened observations `[len * obs_dim]`.
    pub observations: Vec<f32>,
    /// Flattened next observations `[len * obs_dim]`.
    pub next_observations: Vec<f32>,
    pub obs_dim: usize,
    pub actions: Vec<Action>,
    pub rewards: Vec<f32>,
    pub dones: Vec<bool>,
    pub infos: Vec<Info>,
    /// Buffer slots the rows were sampled from.
    pub indices: Vec<usize>,
    /// Training targets written by a return processor.
    pub returns: Option<Vec<f32>>,
    /// Set once `rewards` have been standardized; return processors apply
    /// the same scale to every reward they sum.
    pub reward_scale: Option<RewardScale>,
    extras: BTreeMap<String, Vec<f32>>,
}

impl Batch {
    /// Assemble a batch from `(slot index, transition)` pairs.
    ///
    /// Fails if observations disagree on dimension.
    pub fn from_transitions<'a, I>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, &'a Transition)>,
    {
        let mut batch = Batch::default();
        for (i, (index, t)) in rows.into_iter().enumerate() {
            if i == 0 {
                batch.obs_dim = t.observation.len();
            }
            for (field, obs) in [("observation", &t.observation), ("next_observation", &t.next_observation)] {
                if obs.len() != batch.obs_dim {
                    return Err(RlError::ShapeMismatch {
                        field,
                        expected: batch.obs_dim,
                        found: obs.len(),
                    });
                }
            }
            batch.observations.extend_from_slice(&t.observation);
            batch.next_observations.extend_from_slice(&t.next_observation);
            batch.actions.push(t.action.clone());
            batch.rewards.push(t.reward);
            batch.dones.push(t.done);
            batch.infos.push(t.info.clone());
            batch.indices.push(index);
        }
        Ok(batch)
    }

    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    /// Observation of `row`, or `None` past the last row.
    pub fn observation(&self, row: usize) -> Option<&[f32]> {
        self.row_slice(&self.observations, row)
    }

    /// Next observation of `row`, or `None` past the last row.
    pub fn next_observation(&self, row: usize) -> Option<&[f32]> {
        self.row_slice(&self.next_observations, row)
    }

    fn row_slice<'a>(&self, column: &'a [f32], row: usize) -> Option<&'a [f32]> {
        if row >= self.len() {
            return None;
        }
        column.get(row * self.obs_dim..(row + 1) * self.obs_dim)
    }

    /// Check that every column describes the same number of timesteps.
    pub fn validate(&self) -> Result<()> {
        let n = self.len();
        let checks = [
            ("observations", n * self.obs_dim, self.observations.len()),
            ("next_observations", n * self.obs_dim, self.next_observations.len()),
            ("actions", n, self.actions.len()),
            ("dones", n, self.dones.len()),
            ("infos", n, self.infos.len()),
            ("indices", n, self.indices.len()),
            ("returns", n, self.returns.as_ref().map_or(n, Vec::len)),
        ];
        for (field, expected, found) in checks {
            if expected != found {
                return Err(RlError::ShapeMismatch { field, expected, found });
            }
        }
        for values in self.extras.values() {
            if values.len() != n {
                return Err(RlError::ShapeMismatch {
                    field: "extra",
                    expected: n,
                    found: values.len(),
                });
            }
        }
        Ok(())
    }

    pub fn set_returns(&mut self, returns: Vec<f32>) -> Result<()> {
        self.check_column("returns", returns.len())?;
        self.returns = Some(returns);
        Ok(())
    }

    pub fn with_returns(mut self, returns: Vec<f32>) -> Result<Self> {
        self.set_returns(returns)?;
        Ok(self)
    }

    /// Attach a named derived column (e.g. advantages).
    pub fn set_field(&mut self, name: impl Into<String>, values: Vec<f32>) -> Result<()> {
        self.check_column("extra", values.len())?;
        self.extras.insert(name.into(), values);
        Ok(())
    }

    pub fn field(&self, name: &str) -> Option<&[f32]> {
        self.extras.get(name).map(Vec::as_slice)
    }

    fn check_column(&self, field: &'static str, found: usize) -> Result<()> {
        if found == self.len() {
            Ok(())
        } else {
            Err(RlError::ShapeMismatch {
                field,
                expected: self.len(),
                found,
            })
        }
    }

    /// Discrete action indices, failing on any continuous action.
    pub fn discrete_actions(&self) -> Result<Vec<u32>> {
        self.actions
            .iter()
            .map(|a| {
                a.discrete().ok_or_else(|| RlError::ActionMismatch {
                    expected: "discrete".to_string(),
                    found: a.kind(),
                })
            })
            .collect()
    }

    /// Flattened continuous actions `[len * act_dim]` and `act_dim`.
    pub fn continuous_actions(&self) -> Result<(Vec<f32>, usize)> {
        let act_dim = self.actions.first().map_or(0, Action::size);
        let mut flat = Vec::with_capacity(self.len() * act_dim);
        for a in &self.actions {
            match a.continuous() {
                Some(values) if values.len() == act_dim => flat.extend_from_slice(values),
                _ => {
                    return Err(RlError::ActionMismatch {
                        expected: format!("continuous[{}]", act_dim),
                        found: a.kind(),
                    })
                }
            }
        }
        Ok((flat, act_dim))
    }

    // ------------------------------------------------------------------------
    // Tensor views
    // ------------------------------------------------------------------------

    /// Flattened observation column selected by `input`.
    pub fn input(&self, input: BatchInput) -> &[f32] {
        match input {
            BatchInput::Obs => &self.observations,
            BatchInput::NextObs => &self.next_observations,
        }
    }

    /// Observation column as `[len, obs_dim]`.
    pub fn input_tensor<B: Backend>(&self, input: BatchInput, device: &B::Device) -> Tensor<B, 2> {
        matrix::<B>(self.input(input).to_vec(), self.len(), self.obs_dim, device)
    }

    /// Continuous actions as `[len, act_dim]`.
    pub fn actions_tensor<B: Backend>(&self, device: &B::Device) -> Result<Tensor<B, 2>> {
        let (flat, act_dim) = self.continuous_actions()?;
        Ok(matrix::<B>(flat, self.len(), act_dim, device))
    }

    /// One-hot mask `[len, n_actions]` selecting the taken discrete action.
    pub fn action_mask_tensor<B: Backend>(&self, n_actions: usize, device: &B::Device) -> Result<Tensor<B, 2>> {
        let actions = self.discrete_actions()?;
        let mut mask = vec![0.0f32; self.len() * n_actions];
        for (row, &a) in actions.iter().enumerate() {
            let a = a as usize;
            if a >= n_actions {
                return Err(RlError::ActionMismatch {
                    expected: format!("index < {}", n_actions),
                    found: a.to_string(),
                });
            }
            mask[row * n_actions + a] = 1.0;
        }
        Ok(matrix::<B>(mask, self.len(), n_actions, device))
    }

    /// Any per-row scalar column as `[len, 1]`.
    pub fn column_tensor<B: Backend>(&self, values: &[f32], device: &B::Device) -> Tensor<B, 2> {
        matrix::<B>(values.to_vec(), values.len(), 1, device)
    }

    /// `1 - done` as `[len, 1]`.
    pub fn not_done_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 2> {
        let mask: Vec<f32> = self.dones.iter().map(|&d| if d { 0.0 } else { 1.0 }).collect();
        self.column_tensor::<B>(&mask, device)
    }
}
