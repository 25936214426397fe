//! Graph isomorphism network with edge features (GINE).

use ndarray::{Array1, Array2, Axis};

use super::{GraphModel, PredictionHead, check_widths};
use crate::config::ModelConfig;
use crate::data::GraphBatch;
use crate::error::Result;
use crate::nn::{Linear, Pool, StateDict, TensorRecord, global_pool, relu, scatter_add};

#[derive(Debug, Clone)]
struct GinLayer {
    eps: f32,
    edge_embedding: Linear,
    mlp_in: Linear,
    mlp_out: Linear,
}

impl GinLayer {
    fn new(emb_dim: usize, edge_dim: usize) -> Self {
        Self {
            eps: 0.0,
            edge_embedding: Linear::zeros(edge_dim, emb_dim),
            mlp_in: Linear::zeros(emb_dim, 2 * emb_dim),
            mlp_out: Linear::zeros(2 * emb_dim, emb_dim),
        }
    }

    /// `MLP((1 + eps) h + sum_j relu(h_j + E e_ij))`
    fn forward(&self, h: &Array2<f32>, batch: &GraphBatch) -> Array2<f32> {
        let mut z = h * (1.0 + self.eps);
        if batch.num_edges() > 0 {
            let edges = self.edge_embedding.forward(&batch.edge_attr);
            let messages = relu(h.select(Axis(0), &batch.edge_src) + &edges);
            z += &scatter_add(&messages, &batch.edge_dst, h.nrows());
        }
        self.mlp_out.forward(&relu(self.mlp_in.forward(&z)))
    }
}

/// GINE encoder with a pooled regression/classification head.
#[derive(Debug, Clone)]
pub struct Gin {
    node_embedding: Linear,
    layers: Vec<GinLayer>,
    head: PredictionHead,
    pool: Pool,
    node_dim: usize,
    edge_dim: usize,
    training: bool,
}

impl Gin {
    /// Zero-initialized; parameters come from `load_state_dict`.
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            node_embedding: Linear::zeros(config.node_dim, config.emb_dim),
            layers: (0..config.num_layer)
                .map(|_| GinLayer::new(config.emb_dim, config.edge_dim))
                .collect(),
            head: PredictionHead::new(config.emb_dim, config.feat_dim),
            pool: config.pool,
            node_dim: config.node_dim,
            edge_dim: config.edge_dim,
            training: true,
        }
    }
}

impl GraphModel for Gin {
    fn forward(&self, batch: &GraphBatch) -> Result<(Array2<f32>, Array1<f32>)> {
        check_widths(batch, self.node_dim, self.edge_dim)?;

        let mut h = self.node_embedding.forward(&batch.x);
        let last = self.layers.len().saturating_sub(1);
        for (index, layer) in self.layers.iter().enumerate() {
            h = layer.forward(&h, batch);
            if index < last {
                h = relu(h);
            }
        }

        let pooled = global_pool(&h, &batch.batch, batch.num_graphs, self.pool);
        Ok(self.head.forward(&pooled))
    }

    fn load_state_dict(&mut self, mut state: StateDict) -> Result<()> {
        self.node_embedding.load(&mut state, "node_embedding")?;
        for (index, layer) in self.layers.iter_mut().enumerate() {
            let prefix = format!("gnns.{}", index);
            layer.eps = state.take_array1(&format!("{}.eps", prefix), 1)?[0];
            layer.edge_embedding.load(&mut state, &format!("{}.edge_embedding", prefix))?;
            layer.mlp_in.load(&mut state, &format!("{}.mlp.0", prefix))?;
            layer.mlp_out.load(&mut state, &format!("{}.mlp.2", prefix))?;
        }
        self.head.load(&mut state)?;
        state.finish()
    }

    fn state_dict(&self) -> StateDict {
        let mut state = StateDict::new();
        self.node_embedding.export(&mut state, "node_embedding");
        for (index, layer) in self.layers.iter().enumerate() {
            let prefix = format!("gnns.{}", index);
            state.insert(
                format!("{}.eps", prefix),
                TensorRecord::from_array1(&Array1::from_elem(1, layer.eps)),
            );
            layer.edge_embedding.export(&mut state, &format!("{}.edge_embedding", prefix));
            layer.mlp_in.export(&mut state, &format!("{}.mlp.0", prefix));
            layer.mlp_out.export(&mut state, &format!("{}.mlp.2", prefix));
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CrystalGraph;
    use crate::error::EvalError;

    fn config() -> ModelConfig {
        ModelConfig {
            num_layer: 1,
            emb_dim: 1,
            feat_dim: 2,
            node_dim: 1,
            edge_dim: 1,
            ..ModelConfig::default()
        }
    }

    fn pair() -> CrystalGraph {
        CrystalGraph {
            id: "pair".to_string(),
            node_features: vec![vec![1.0], vec![3.0]],
            edge_index: vec![[0, 1], [1, 0]],
            edge_attr: vec![vec![0.0], vec![0.0]],
            target: 0.0,
        }
    }

    fn set(state: &mut StateDict, name: &str, shape: Vec<usize>, data: Vec<f32>) {
        state.insert(name, TensorRecord { shape, data });
    }

    #[test]
    fn test_parameter_names() {
        let state = Gin::new(&config()).state_dict();
        let keys: Vec<_> = state.keys().collect();
        assert!(keys.contains(&"gnns.0.eps"));
        assert!(keys.contains(&"gnns.0.edge_embedding.weight"));
        assert!(keys.contains(&"pred_head.2.bias"));
        assert_eq!(state.len(), 2 + 1 + 2 * 3 + 6);
    }

    #[test]
    fn test_hand_computed_forward() {
        let mut model = Gin::new(&config());
        let mut state = model.state_dict();
        // identity embedding, sum aggregation, pass-through MLP
        set(&mut state, "node_embedding.weight", vec![1, 1], vec![1.0]);
        set(&mut state, "gnns.0.mlp.0.weight", vec![1, 2], vec![1.0, 0.0]);
        set(&mut state, "gnns.0.mlp.2.weight", vec![2, 1], vec![1.0, 0.0]);
        set(&mut state, "feat_lin.weight", vec![1, 2], vec![1.0, 0.0]);
        set(&mut state, "pred_head.0.weight", vec![2, 1], vec![1.0, 0.0]);
        set(&mut state, "pred_head.2.weight", vec![1, 1], vec![2.0]);
        model.load_state_dict(state).unwrap();
        model.eval();
        assert!(!model.is_training());

        let graph = pair();
        let batch = GraphBatch::collate(&[&graph], None).unwrap();
        let (embedding, prediction) = model.forward(&batch).unwrap();

        // node 0: 1 + relu(3) = 4, node 1: 3 + relu(1) = 4; mean pool = 4; head = 2 * 4
        assert_eq!(embedding.dim(), (1, 2));
        assert!((prediction[0] - 8.0).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_wrong_node_width() {
        let model = Gin::new(&ModelConfig {
            node_dim: 4,
            ..config()
        });
        let graph = pair();
        let batch = GraphBatch::collate(&[&graph], None).unwrap();
        assert!(matches!(model.forward(&batch), Err(EvalError::ShapeMismatch(_))));
    }

    #[test]
    fn test_strict_load() {
        let mut model = Gin::new(&config());
        let mut state = model.state_dict();
        set(&mut state, "gnns.7.eps", vec![1], vec![0.0]);
        let err = model.load_state_dict(state).unwrap_err();
        assert!(err.to_string().contains("unexpected keys: gnns.7.eps"));
    }
}
