//! Return estimation and batch processing.
//!
//! - `processor`: `BatchProcessor` hook and the `ValueFunction` it queries
//! - `n_step`: n-step / Monte-Carlo discounted returns over buffer windows
//! - `reward_normalization`: per-batch reward standardization

pub mod n_step;
pub mod processor;
pub mod reward_normalization;

#[cfg(test)]
mod tests;

pub use n_step::{discounted_return, NStepReturn};
pub use processor::{BatchProcessor, ValueFunction};
pub use reward_normalization::{normalize_rewards, RewardNormalization};
