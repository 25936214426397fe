//! Graph neural network models restored from checkpoints.
//!
//! Both architectures share the same readout: graph pooling, a `feat_lin`
//! projection producing the embedding, and a two-layer head producing one
//! scalar per graph.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2};

use crate::config::ModelConfig;
use crate::data::GraphBatch;
use crate::error::{EvalError, Result};
use crate::nn::{Linear, StateDict, relu};

mod dimenet;
mod gin;

pub use dimenet::DimeNet;
pub use gin::Gin;

/// Architectures selectable through `model_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelType {
    Gin,
    DimeNet,
}

impl FromStr for ModelType {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "gin" => Ok(ModelType::Gin),
            "dimenet" => Ok(ModelType::DimeNet),
            other => Err(EvalError::UndefinedModel(other.to_string())),
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelType::Gin => write!(f, "gin"),
            ModelType::DimeNet => write!(f, "dimenet"),
        }
    }
}

/// A graph-level property predictor.
pub trait GraphModel {
    /// Returns `(embedding, prediction)`: one embedding row and one scalar per graph.
    fn forward(&self, batch: &GraphBatch) -> Result<(Array2<f32>, Array1<f32>)>;

    /// Replace all parameters. Missing, unexpected or mis-shaped tensors are errors.
    fn load_state_dict(&mut self, state: StateDict) -> Result<()>;

    fn state_dict(&self) -> StateDict;

    /// Switch to inference mode.
    fn eval(&mut self);

    fn is_training(&self) -> bool;
}

pub fn build_model(model_type: ModelType, config: &ModelConfig) -> Box<dyn GraphModel> {
    match model_type {
        ModelType::Gin => Box::new(Gin::new(config)),
        ModelType::DimeNet => Box::new(DimeNet::new(config)),
    }
}

/// Pooled features -> embedding -> scalar prediction.
#[derive(Debug, Clone)]
pub(crate) struct PredictionHead {
    feat_lin: Linear,
    hidden: Linear,
    out: Linear,
}

impl PredictionHead {
    pub(crate) fn new(emb_dim: usize, feat_dim: usize) -> Self {
        let hidden = (feat_dim / 2).max(1);
        Self {
            feat_lin: Linear::zeros(emb_dim, feat_dim),
            hidden: Linear::zeros(feat_dim, hidden),
            out: Linear::zeros(hidden, 1),
        }
    }

    pub(crate) fn forward(&self, pooled: &Array2<f32>) -> (Array2<f32>, Array1<f32>) {
        let embedding = self.feat_lin.forward(pooled);
        let out = self.out.forward(&relu(self.hidden.forward(&embedding)));
        let prediction = out.column(0).to_owned();
        (embedding, prediction)
    }

    pub(crate) fn load(&mut self, state: &mut StateDict) -> Result<()> {
        self.feat_lin.load(state, "feat_lin")?;
        self.hidden.load(state, "pred_head.0")?;
        self.out.load(state, "pred_head.2")
    }

    pub(crate) fn export(&self, state: &mut StateDict) {
        self.feat_lin.export(state, "feat_lin");
        self.hidden.export(state, "pred_head.0");
        self.out.export(state, "pred_head.2");
    }
}

/// Reject batches whose feature widths do not match the model.
pub(crate) fn check_widths(batch: &GraphBatch, node_dim: usize, edge_dim: usize) -> Result<()> {
    if batch.x.ncols() != node_dim {
        return Err(EvalError::ShapeMismatch(format!(
            "node features have width {}, model expects {}",
            batch.x.ncols(),
            node_dim
        )));
    }
    if batch.num_edges() > 0 && batch.edge_attr.ncols() != edge_dim {
        return Err(EvalError::ShapeMismatch(format!(
            "edge features have width {}, model expects {}",
            batch.edge_attr.ncols(),
            edge_dim
        )));
    }
    Ok(())
}
