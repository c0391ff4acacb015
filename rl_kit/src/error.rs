//! Error types.
//!
//! Every fallible operation in the crate returns [`RlError`]. Nothing is
//! logged and swallowed: environment faults, configuration mistakes and
//! sampling before warm-up all surface to the calling training loop.

use thiserror::Error;

use crate::environment::EnvError;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RlError>;

/// Invalid hyperparameter detected at construction time.
///
/// Values are never clamped into range; the constructor fails instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A count parameter (capacity, n-step length, interval) must be positive.
    #[error("{field} must be > 0, got {value}")]
    InvalidCount { field: &'static str, value: usize },

    /// A discount or blend coefficient outside `(0, 1]`.
    #[error("{field} must be in (0, 1], got {value}")]
    OutsideUnitInterval { field: &'static str, value: f32 },

    /// A scale that must be finite and non-negative.
    #[error("{field} must be finite and >= 0, got {value}")]
    Negative { field: &'static str, value: f32 },

    /// A learning rate or epsilon that must be finite and strictly positive.
    #[error("{field} must be finite and > 0, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    /// Action clamp bounds are inverted or not finite.
    #[error("action range must satisfy low < high, got ({low}, {high})")]
    InvalidActionRange { low: f32, high: f32 },
}

impl ConfigError {
    /// Check `value` lies in the half-open interval `(0, 1]`.
    pub(crate) fn check_unit_interval(field: &'static str, value: f32) -> std::result::Result<(), Self> {
        if value > 0.0 && value <= 1.0 {
            Ok(())
        } else {
            Err(ConfigError::OutsideUnitInterval { field, value })
        }
    }

    /// Check `value` is finite and non-negative.
    pub(crate) fn check_non_negative(field: &'static str, value: f32) -> std::result::Result<(), Self> {
        if value.is_finite() && value >= 0.0 {
            Ok(())
        } else {
            Err(ConfigError::Negative { field, value })
        }
    }

    /// Check a rate or scale is finite and strictly positive.
    pub(crate) fn check_positive(field: &'static str, value: f64) -> std::result::Result<(), Self> {
        if value.is_finite() && value > 0.0 {
            Ok(())
        } else {
            Err(ConfigError::NotPositive { field, value })
        }
    }

    pub(crate) fn check_count(field: &'static str, value: usize) -> std::result::Result<(), Self> {
        if value == 0 {
            Err(ConfigError::InvalidCount { field, value })
        } else {
            Ok(())
        }
    }
}

/// Top-level error for buffers, processors, collectors and policies.
#[derive(Debug, Error)]
pub enum RlError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The buffer holds fewer transitions than requested; warm it up first.
    #[error("insufficient data: requested {requested} transitions, buffer holds {available}")]
    InsufficientData { requested: usize, available: usize },

    /// Failure reported by the environment, propagated unchanged.
    #[error("environment error: {0}")]
    Environment(#[from] EnvError),

    /// A buffer index that does not refer to a resident transition.
    #[error("index {index} out of range for buffer of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// An action of the wrong kind or dimension for the policy or space.
    #[error("action mismatch: expected {expected}, found {found}")]
    ActionMismatch { expected: String, found: String },

    /// A column or observation has the wrong length.
    #[error("shape mismatch for {field}: expected {expected}, found {found}")]
    ShapeMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    /// Tensor data could not be read back from the backend.
    #[error("tensor readback failed: {0}")]
    Tensor(String),

    /// Batch columns that cannot be combined, e.g. raw returns where
    /// normalized rewards were configured.
    #[error("invalid batch pipeline: {0}")]
    Pipeline(&'static str),
}
