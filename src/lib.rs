//! crystaleval - cross-validated evaluation of trained crystal-property GNNs
//!
//! Restores one checkpoint per fold, scores it on that fold's held-out
//! crystals and appends `[test_loss, metric]` to a per-experiment CSV ledger.

pub mod config;
pub mod data;
pub mod device;
pub mod error;
pub mod eval;
pub mod experiment;
pub mod ledger;
pub mod model;
pub mod nn;
pub mod runner;
pub mod task;

pub use error::{EvalError, Result};
