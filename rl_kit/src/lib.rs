//! # rl_kit: Off-Policy Reinforcement Learning Building Blocks
//!
//! Replay storage, n-step return estimation, environment interaction and
//! two off-policy algorithms (DQN for discrete actions, DDPG for continuous
//! actions) on top of burn.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                            Collector                                │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │   ┌─────────────┐   act    ┌─────────────┐   step   ┌────────────┐  │
//! │   │   Policy    │ ───────► │   Action    │ ───────► │Environment │  │
//! │   │ DQN / DDPG  │          └─────────────┘          └─────┬──────┘  │
//! │   └──────┬──────┘                                         │         │
//! │          │ learn / sync_weights                Transition │         │
//! │          ▼                                                ▼         │
//! │   ┌─────────────┐        ┌──────────────────┐     ┌──────────────┐  │
//! │   │TargetNetwork│        │ BatchProcessors  │◄────│ ReplayBuffer │  │
//! │   │online/shadow│◄───────│ NStepReturn, ... │     │ (ring, FIFO) │  │
//! │   └─────────────┘ values └──────────────────┘     └──────────────┘  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The training loop is owned by the caller: it decides how many steps to
//! collect, how often to learn, when to sync target networks and when to
//! evaluate.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rl_kit::{Collector, CollectorConfig, DqnConfig, DqnPolicy, Mlp, NStepConfig, NStepReturn};
//! use rl_kit::{evaluate, Policy, TargetSyncer};
//!
//! let policy = DqnPolicy::new(|d| Mlp::new(4, 64, 2, d), AdamConfig::new().init(), 2, DqnConfig::new(), &device)?;
//! let mut collector = Collector::new(env, policy, CollectorConfig::new(20_000))?
//!     .with_processor(NStepReturn::new(NStepConfig::new(3, 0.99))?);
//! let mut syncer = TargetSyncer::hard(500)?;
//!
//! collector.collect(1_000)?;
//! for _ in 0..num_updates {
//!     collector.collect(4)?;
//!     collector.train_step(64)?;
//!     if syncer.tick() {
//!         collector.policy_mut().sync_weights()?;
//!     }
//! }
//! ```

pub mod algorithms;
pub mod buffers;
pub mod collector;
pub mod config;
pub mod core;
pub mod environment;
pub mod error;
pub mod policy;
pub mod scheduling;

#[cfg(test)]
pub(crate) mod testing;

// Core data types
pub use crate::core::batch::{Batch, BatchInput, RewardScale};
pub use crate::core::target_network::{NetworkSlot, SyncSchedule, TargetNetwork, TargetSyncer};
pub use crate::core::transition::{Action, Info, Transition};

pub use buffers::{ReplayBuffer, SharedReplayBuffer, StreamId, Window};

// Return estimation and batch processing
pub use algorithms::{BatchProcessor, NStepReturn, RewardNormalization, ValueFunction};

pub use collector::{evaluate, CollectStats, Collector, EvalStats};

pub use config::{CollectorConfig, DdpgConfig, DqnConfig, NStepConfig};
pub use environment::{EnvError, Environment, Space, StepResult};
pub use error::{ConfigError, Result, RlError};

pub use policy::{
    ActOutput, CriticNetwork, DdpgModel, DdpgPolicy, DqnPolicy, LearnMetrics, Mlp, MlpActor, MlpCritic, Mode,
    ModelOutput, Network, Policy,
};

pub use scheduling::{ConstantSchedule, ExplorationSchedule, LinearSchedule, StepDecaySchedule};
