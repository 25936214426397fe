//! Crystal graph datasets.
//!
//! This module provides:
//! - `CrystalGraph` records and `GraphBatch` collation
//! - `KFold` cross-validation splits
//! - `StandardScaler` target normalization
//! - `DatasetWrapper` and the JSONL-backed `CrystalDatasetWrapper`

mod graph;
mod kfold;
mod scaler;
mod wrapper;

pub use graph::{CrystalGraph, GraphBatch};
pub use kfold::KFold;
pub use scaler::StandardScaler;
pub use wrapper::{CrystalDatasetWrapper, DatasetWrapper, GRAPHS_FILE, TestLoader, write_graphs};
