//! Data collection and evaluation.
//!
//! - `Collector`: resumable interaction loop feeding the replay buffer
//! - `evaluate`: exploration-free evaluation pass

pub mod collector;
pub mod evaluation;


pub use collector::{CollectStats, Collector};
pub use evaluation::{evaluate, EvalStats};
