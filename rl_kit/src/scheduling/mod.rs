//! Exploration scheduling.
//!
//! Schedules for annealing a policy's exploration scale during training.
//!
//! ## Available Schedules
//!
//! - [`ConstantSchedule`]: No annealing
//! - [`LinearSchedule`]: Linear interpolation from start to end
//! - [`StepDecaySchedule`]: Fixed decrement every N steps down to a floor
//!
//! ## Example
//!
//! ```rust,ignore
//! use rl_kit::scheduling::{apply, StepDecaySchedule};
//!
//! let schedule = StepDecaySchedule::default();
//! for step in 0..num_updates {
//!     apply(&schedule, collector.policy_mut(), step)?;
//!     collector.collect(4)?;
//!     collector.train_step(64)?;
//! }
//! ```

pub mod exploration;


pub use exploration::{apply, ConstantSchedule, ExplorationSchedule, LinearSchedule, StepDecaySchedule};
