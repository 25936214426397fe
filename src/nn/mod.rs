//! Inference building blocks shared by the graph models.
//!
//! - `Linear` dense layers with `[in, out]` weights
//! - activations
//! - graph-level pooling over a node-to-graph assignment vector
//! - `StateDict` checkpoints

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::Result;

mod state_dict;

pub use state_dict::{StateDict, TensorRecord, fingerprint};

/// Graph readout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pool {
    Mean,
    Sum,
    Max,
}

/// Dense layer: `y = x W + b`.
#[derive(Debug, Clone)]
pub struct Linear {
    pub weight: Array2<f32>,
    pub bias: Array1<f32>,
}

impl Linear {
    pub fn zeros(in_dim: usize, out_dim: usize) -> Self {
        Self {
            weight: Array2::zeros((in_dim, out_dim)),
            bias: Array1::zeros(out_dim),
        }
    }

    pub fn out_dim(&self) -> usize {
        self.weight.ncols()
    }

    pub fn forward(&self, x: &Array2<f32>) -> Array2<f32> {
        x.dot(&self.weight) + &self.bias
    }

    /// Replace parameters from `{prefix}.weight` and `{prefix}.bias`.
    pub fn load(&mut self, state: &mut StateDict, prefix: &str) -> Result<()> {
        self.weight = state.take_array2(&format!("{}.weight", prefix), self.weight.dim())?;
        self.bias = state.take_array1(&format!("{}.bias", prefix), self.out_dim())?;
        Ok(())
    }

    pub fn export(&self, state: &mut StateDict, prefix: &str) {
        state.insert(format!("{}.weight", prefix), TensorRecord::from_array2(&self.weight));
        state.insert(format!("{}.bias", prefix), TensorRecord::from_array1(&self.bias));
    }
}

pub fn relu(x: Array2<f32>) -> Array2<f32> {
    x.mapv_into(|v| v.max(0.0))
}

/// Reduce node rows into one row per graph.
///
/// `batch[i]` is the graph index of node `i`. Graphs without nodes pool to zeros.
pub fn global_pool(x: &Array2<f32>, batch: &[usize], num_graphs: usize, pool: Pool) -> Array2<f32> {
    let dim = x.ncols();
    let mut counts = vec![0usize; num_graphs];
    let mut out = match pool {
        Pool::Max => Array2::from_elem((num_graphs, dim), f32::NEG_INFINITY),
        Pool::Mean | Pool::Sum => Array2::zeros((num_graphs, dim)),
    };

    for (node, row) in x.axis_iter(Axis(0)).enumerate() {
        let graph = batch[node];
        counts[graph] += 1;
        let mut target = out.row_mut(graph);
        match pool {
            Pool::Max => target.zip_mut_with(&row, |acc, &v| *acc = acc.max(v)),
            Pool::Mean | Pool::Sum => target += &row,
        }
    }

    for (graph, count) in counts.iter().enumerate() {
        let mut row = out.row_mut(graph);
        if *count == 0 {
            row.fill(0.0);
        } else if pool == Pool::Mean {
            row /= *count as f32;
        }
    }
    out
}

/// Sum rows of `messages` into their destination nodes.
pub fn scatter_add(messages: &Array2<f32>, dst: &[usize], num_nodes: usize) -> Array2<f32> {
    let mut out = Array2::zeros((num_nodes, messages.ncols()));
    for (edge, row) in messages.axis_iter(Axis(0)).enumerate() {
        let mut target = out.row_mut(dst[edge]);
        target += &row;
    }
    out
}
