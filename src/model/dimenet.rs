//! Distance-aware message passing in the DimeNet family.
//!
//! Bond lengths are expanded in a Gaussian radial basis with a cosine
//! cutoff envelope; each interaction block gates neighbour messages by that
//! basis. Angular (triplet) terms are not modelled.

use std::f32::consts::PI;

use ndarray::{Array1, Array2, Axis};

use super::{GraphModel, PredictionHead, check_widths};
use crate::config::ModelConfig;
use crate::data::GraphBatch;
use crate::error::{EvalError, Result};
use crate::nn::{Linear, Pool, StateDict, global_pool, relu, scatter_add};

#[derive(Debug, Clone)]
struct InteractionBlock {
    lin_rbf: Linear,
    lin_msg: Linear,
    lin_update: Linear,
}

impl InteractionBlock {
    fn new(emb_dim: usize, num_radial: usize) -> Self {
        Self {
            lin_rbf: Linear::zeros(num_radial, emb_dim),
            lin_msg: Linear::zeros(emb_dim, emb_dim),
            lin_update: Linear::zeros(emb_dim, emb_dim),
        }
    }

    /// `h + relu(W_upd sum_j (W_rbf rbf(d_ij)) * (W_msg h_j))`
    fn forward(&self, h: &Array2<f32>, rbf: &Array2<f32>, batch: &GraphBatch) -> Array2<f32> {
        if batch.num_edges() == 0 {
            return h + &relu(self.lin_update.forward(&Array2::zeros(h.dim())));
        }
        let gate = self.lin_rbf.forward(rbf);
        let neighbours = self.lin_msg.forward(&h.select(Axis(0), &batch.edge_src));
        let messages = gate * &neighbours;
        let aggregated = scatter_add(&messages, &batch.edge_dst, h.nrows());
        h + &relu(self.lin_update.forward(&aggregated))
    }

    fn load(&mut self, state: &mut StateDict, prefix: &str) -> Result<()> {
        self.lin_rbf.load(state, &format!("{}.lin_rbf", prefix))?;
        self.lin_msg.load(state, &format!("{}.lin_msg", prefix))?;
        self.lin_update.load(state, &format!("{}.lin_update", prefix))
    }

    fn export(&self, state: &mut StateDict, prefix: &str) {
        self.lin_rbf.export(state, &format!("{}.lin_rbf", prefix));
        self.lin_msg.export(state, &format!("{}.lin_msg", prefix));
        self.lin_update.export(state, &format!("{}.lin_update", prefix));
    }
}

#[derive(Debug, Clone)]
pub struct DimeNet {
    embedding: Linear,
    blocks: Vec<InteractionBlock>,
    head: PredictionHead,
    pool: Pool,
    node_dim: usize,
    edge_dim: usize,
    num_radial: usize,
    cutoff: f32,
    training: bool,
}

impl DimeNet {
    /// Zero-initialized; parameters come from `load_state_dict`.
    pub fn new(config: &ModelConfig) -> Self {
        let num_radial = config.num_radial.max(1);
        Self {
            embedding: Linear::zeros(config.node_dim, config.emb_dim),
            blocks: (0..config.num_layer)
                .map(|_| InteractionBlock::new(config.emb_dim, num_radial))
                .collect(),
            head: PredictionHead::new(config.emb_dim, config.feat_dim),
            pool: config.pool,
            node_dim: config.node_dim,
            edge_dim: config.edge_dim,
            num_radial,
            cutoff: config.cutoff,
            training: true,
        }
    }

    /// Gaussian basis on `[0, cutoff]` times a smooth cosine envelope.
    fn radial_basis(&self, distances: &Array1<f32>) -> Array2<f32> {
        let spacing = if self.num_radial > 1 {
            self.cutoff / (self.num_radial - 1) as f32
        } else {
            self.cutoff
        };
        let gamma = 1.0 / (spacing * spacing).max(f32::EPSILON);

        Array2::from_shape_fn((distances.len(), self.num_radial), |(edge, k)| {
            let d = distances[edge];
            if d >= self.cutoff {
                return 0.0;
            }
            let envelope = 0.5 * ((PI * d / self.cutoff).cos() + 1.0);
            let center = spacing * k as f32;
            envelope * (-gamma * (d - center).powi(2)).exp()
        })
    }
}

impl GraphModel for DimeNet {
    fn forward(&self, batch: &GraphBatch) -> Result<(Array2<f32>, Array1<f32>)> {
        check_widths(batch, self.node_dim, self.edge_dim)?;
        if batch.num_edges() > 0 && batch.edge_attr.ncols() == 0 {
            return Err(EvalError::ShapeMismatch(
                "dimenet needs the bond distance in edge_attr column 0".to_string(),
            ));
        }

        let distances = if batch.num_edges() > 0 {
            batch.edge_attr.column(0).to_owned()
        } else {
            Array1::zeros(0)
        };
        let rbf = self.radial_basis(&distances);

        let mut h = self.embedding.forward(&batch.x);
        for block in &self.blocks {
            h = block.forward(&h, &rbf, batch);
        }

        let pooled = global_pool(&h, &batch.batch, batch.num_graphs, self.pool);
        Ok(self.head.forward(&pooled))
    }

    fn load_state_dict(&mut self, mut state: StateDict) -> Result<()> {
        self.embedding.load(&mut state, "embedding")?;
        for (index, block) in self.blocks.iter_mut().enumerate() {
            block.load(&mut state, &format!("blocks.{}", index))?;
        }
        self.head.load(&mut state)?;
        state.finish()
    }

    fn state_dict(&self) -> StateDict {
        let mut state = StateDict::new();
        self.embedding.export(&mut state, "embedding");
        for (index, block) in self.blocks.iter().enumerate() {
            block.export(&mut state, &format!("blocks.{}", index));
        }
        self.head.export(&mut state);
        state
    }

    fn eval(&mut self) {
        self.training = false;
    }

    fn is_training(&self) -> bool {
        self.training
    }
}
