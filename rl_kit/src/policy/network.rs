//! Learnable function interfaces consumed by the policies.
//!
//! Any burn [`Module`] can back a policy by implementing one of these
//! traits. Inputs and outputs are batched `[batch, features]` tensors; a
//! single observation is a batch of one.
//!
//! [`Mlp`], [`MlpActor`] and [`MlpCritic`] are small ready-made networks
//! for low-dimensional control tasks.

use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::{relu, tanh};

/// Network output plus optional recurrent state.
#[derive(Debug, Clone)]
pub struct ModelOutput<B: Backend> {
    /// Q-values `[batch, n_actions]` or actions `[batch, act_dim]`.
    pub output: Tensor<B, 2>,
    /// Hidden state to feed back on the next step.
    pub state: Option<Tensor<B, 2>>,
}

impl<B: Backend> ModelOutput<B> {
    pub fn new(output: Tensor<B, 2>) -> Self {
        Self { output, state: None }
    }

    pub fn with_state(mut self, state: Tensor<B, 2>) -> Self {
        self.state = Some(state);
        self
    }
}

/// Observation → output mapping (Q-network or deterministic actor).
pub trait Network<B: Backend>: Module<B> {
    fn forward(&self, obs: Tensor<B, 2>, state: Option<Tensor<B, 2>>) -> ModelOutput<B>;
}

/// (observation, action) → Q-value `[batch, 1]`.
pub trait CriticNetwork<B: Backend>: Module<B> {
    fn forward(&self, obs: Tensor<B, 2>, action: Tensor<B, 2>) -> Tensor<B, 2>;
}

// ============================================================================
// Ready-made networks
// ============================================================================

/// Two-layer perceptron with a linear head.
#[derive(Module, Debug)]
pub struct Mlp<B: Backend> {
    hidden: Linear<B>,
    head: Linear<B>,
}

impl<B: Backend> Mlp<B> {
    pub fn new(input: usize, hidden: usize, output: usize, device: &B::Device) -> Self {
        Self {
            hidden: LinearConfig::new(input, hidden).init(device),
            head: LinearConfig::new(hidden, output).init(device),
        }
    }
}

impl<B: Backend> Network<B> for Mlp<B> {
    fn forward(&self, obs: Tensor<B, 2>, _state: Option<Tensor<B, 2>>) -> ModelOutput<B> {
        let x = relu(self.hidden.forward(obs));
        ModelOutput::new(self.head.forward(x))
    }
}

/// Deterministic actor with a `tanh` head, producing actions in `[-1, 1]`.
#[derive(Module, Debug)]
pub struct MlpActor<B: Backend> {
    body: Mlp<B>,
}

impl<B: Backend> MlpActor<B> {
    pub fn new(obs_dim: usize, hidden: usize, act_dim: usize, device: &B::Device) -> Self {
        Self {
            body: Mlp::new(obs_dim, hidden, act_dim, device),
        }
    }
}

impl<B: Backend> Network<B> for MlpActor<B> {
    fn forward(&self, obs: Tensor<B, 2>, state: Option<Tensor<B, 2>>) -> ModelOutput<B> {
        let out = self.body.forward(obs, state);
        ModelOutput::new(tanh(out.output))
    }
}

/// Q(s, a) over the concatenated observation and action.
#[derive(Module, Debug)]
pub struct MlpCritic<B: Backend> {
    body: Mlp<B>,
}

impl<B: Backend> MlpCritic<B> {
    pub fn new(obs_dim: usize, act_dim: usize, hidden: usize, device: &B::Device) -> Self {
        Self {
            body: Mlp::new(obs_dim + act_dim, hidden, 1, device),
        }
    }
}

impl<B: Backend> CriticNetwork<B> for MlpCritic<B> {
    fn forward(&self, obs: Tensor<B, 2>, action: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = Tensor::cat(vec![obs, action], 1);
        self.body.forward(x, None).output
    }
}
