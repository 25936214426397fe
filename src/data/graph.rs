//! Crystal graphs and mini-batch collation.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::scaler::StandardScaler;
use crate::error::{EvalError, Result};

/// One pre-featurized crystal structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrystalGraph {
    pub id: String,
    /// One row per atom
    pub node_features: Vec<Vec<f32>>,
    /// Directed bonds as `[src, dst]`
    #[serde(default)]
    pub edge_index: Vec<[usize; 2]>,
    /// One row per bond; column 0 is the interatomic distance
    #[serde(default)]
    pub edge_attr: Vec<Vec<f32>>,
    pub target: f32,
}

impl CrystalGraph {
    pub fn num_nodes(&self) -> usize {
        self.node_features.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edge_index.len()
    }

    /// Check internal consistency of node and edge tables.
    pub fn validate(&self) -> Result<()> {
        if self.node_features.is_empty() {
            return Err(EvalError::Dataset(format!("{}: graph has no atoms", self.id)));
        }
        let width = self.node_features[0].len();
        if self.node_features.iter().any(|row| row.len() != width) {
            return Err(EvalError::Dataset(format!("{}: ragged node features", self.id)));
        }
        if self.edge_attr.len() != self.edge_index.len() {
            return Err(EvalError::Dataset(format!(
                "{}: {} edges but {} edge attribute rows",
                self.id,
                self.edge_index.len(),
                self.edge_attr.len()
            )));
        }
        let n = self.num_nodes();
        if let Some([src, dst]) = self.edge_index.iter().find(|[s, d]| *s >= n || *d >= n) {
            return Err(EvalError::Dataset(format!(
                "{}: edge {}->{} out of range for {} atoms",
                self.id, src, dst, n
            )));
        }
        Ok(())
    }
}

/// Disjoint union of several graphs, ready for a forward pass.
#[derive(Debug, Clone)]
pub struct GraphBatch {
    /// Node features, `[num_nodes, node_dim]`
    pub x: Array2<f32>,
    pub edge_src: Vec<usize>,
    pub edge_dst: Vec<usize>,
    /// Edge features, `[num_edges, edge_dim]`
    pub edge_attr: Array2<f32>,
    /// Graph index of every node
    pub batch: Vec<usize>,
    /// Targets, normalized when the loader carries a scaler
    pub y: Array1<f32>,
    pub num_graphs: usize,
}

impl GraphBatch {
    /// Concatenate graphs, offsetting edge endpoints by the running node count.
    pub fn collate(graphs: &[&CrystalGraph], scaler: Option<&StandardScaler>) -> Result<Self> {
        let first = graphs
            .first()
            .ok_or_else(|| EvalError::Dataset("cannot collate an empty batch".to_string()))?;
        let node_dim = first.node_features.first().map_or(0, |row| row.len());
        let edge_dim = graphs
            .iter()
            .find_map(|g| g.edge_attr.first())
            .map_or(0, |row| row.len());

        let num_nodes: usize = graphs.iter().map(|g| g.num_nodes()).sum();
        let num_edges: usize = graphs.iter().map(|g| g.num_edges()).sum();

        let mut x = Vec::with_capacity(num_nodes * node_dim);
        let mut edge_attr = Vec::with_capacity(num_edges * edge_dim);
        let mut edge_src = Vec::with_capacity(num_edges);
        let mut edge_dst = Vec::with_capacity(num_edges);
        let mut batch = Vec::with_capacity(num_nodes);
        let mut y = Vec::with_capacity(graphs.len());

        let mut offset = 0;
        for (index, graph) in graphs.iter().enumerate() {
            for row in &graph.node_features {
                if row.len() != node_dim {
                    return Err(EvalError::ShapeMismatch(format!(
                        "{}: node feature width {} != {}",
                        graph.id,
                        row.len(),
                        node_dim
                    )));
                }
                x.extend_from_slice(row);
                batch.push(index);
            }
            for ([src, dst], row) in graph.edge_index.iter().zip(&graph.edge_attr) {
                if row.len() != edge_dim {
                    return Err(EvalError::ShapeMismatch(format!(
                        "{}: edge feature width {} != {}",
                        graph.id,
                        row.len(),
                        edge_dim
                    )));
                }
                edge_src.push(src + offset);
                edge_dst.push(dst + offset);
                edge_attr.extend_from_slice(row);
            }
            offset += graph.num_nodes();
            y.push(scaler.map_or(graph.target, |s| s.transform(graph.target)));
        }

        let x = Array2::from_shape_vec((num_nodes, node_dim), x)
            .map_err(|e| EvalError::ShapeMismatch(e.to_string()))?;
        let edge_attr = Array2::from_shape_vec((num_edges, edge_dim), edge_attr)
            .map_err(|e| EvalError::ShapeMismatch(e.to_string()))?;

        Ok(Self {
            x,
            edge_src,
            edge_dst,
            edge_attr,
            batch,
            y: Array1::from_vec(y),
            num_graphs: graphs.len(),
        })
    }

    pub fn num_nodes(&self) -> usize {
        self.x.nrows()
    }

    pub fn num_edges(&self) -> usize {
        self.edge_src.len()
    }
}
