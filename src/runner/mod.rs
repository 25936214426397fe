//! Runner module - scores restored checkpoints on held-out folds.
//!
//! This module provides:
//! - Runner for restoring a checkpoint and iterating a test loader
//! - TestOutcome carrying the loss and the task's summary metric

mod test_runner;

pub use test_runner::{Runner, TestOutcome};
