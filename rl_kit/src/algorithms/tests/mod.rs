//! Tests for the return estimators.
//!
//! # Test Organization
//!
//! - `n_step_tests`: discounted returns, window truncation, bootstrapping
//! - `normalization_tests`: reward standardization
