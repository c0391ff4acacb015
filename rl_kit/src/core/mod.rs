//! Core data types shared by buffers, processors and policies.

pub mod batch;
pub mod target_network;
pub mod transition;

pub use batch::{Batch, BatchInput, RewardScale};
pub use target_network::{
    hard_copy, parameter_distance, soft_update, NetworkSlot, SyncSchedule, TargetNetwork, TargetSyncer,
};
pub use transition::{Action, Info, Transition};
