//! Dataset wrappers producing the per-fold test loader.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use super::graph::{CrystalGraph, GraphBatch};
use super::kfold::KFold;
use super::scaler::StandardScaler;
use crate::config::DatasetConfig;
use crate::error::{EvalError, Result};
use crate::task::Task;

/// File inside `data_dir` holding one JSON graph per line.
pub const GRAPHS_FILE: &str = "graphs.jsonl";

/// Batches of one fold's test split plus the target scaler fitted on its
/// training split.
#[derive(Debug, Clone)]
pub struct TestLoader {
    pub fold: usize,
    pub batches: Vec<GraphBatch>,
    /// Present for regression only
    pub scaler: Option<StandardScaler>,
}

impl TestLoader {
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn num_samples(&self) -> usize {
        self.batches.iter().map(|b| b.num_graphs).sum()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GraphBatch> {
        self.batches.iter()
    }
}

/// Source of evaluation data for one fold.
pub trait DatasetWrapper {
    fn get_data_loaders(&self) -> Result<TestLoader>;
}

/// Reads `graphs.jsonl` and serves fold `fold` of a seeded k-fold split.
#[derive(Debug, Clone)]
pub struct CrystalDatasetWrapper {
    batch_size: usize,
    data_dir: PathBuf,
    task: Task,
    fold: usize,
    folds: usize,
    seed: u64,
}

impl CrystalDatasetWrapper {
    pub fn new(batch_size: usize, dataset: &DatasetConfig, task: Task, fold: usize) -> Self {
        Self {
            batch_size,
            data_dir: dataset.data_dir.clone(),
            task,
            fold,
            folds: dataset.folds,
            seed: dataset.seed,
        }
    }

    pub fn graphs_path(&self) -> PathBuf {
        self.data_dir.join(GRAPHS_FILE)
    }

    fn read_graphs(&self) -> Result<Vec<CrystalGraph>> {
        let path = self.graphs_path();
        let file = File::open(&path)
            .map_err(|e| EvalError::Dataset(format!("cannot open {}: {}", path.display(), e)))?;

        let mut graphs = Vec::new();
        for (number, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let graph: CrystalGraph = serde_json::from_str(&line)
                .map_err(|e| EvalError::Dataset(format!("{}:{}: {}", path.display(), number + 1, e)))?;
            graph.validate()?;
            graphs.push(graph);
        }
        log::debug!("Read {} graphs from {}", graphs.len(), path.display());
        Ok(graphs)
    }
}

impl DatasetWrapper for CrystalDatasetWrapper {
    fn get_data_loaders(&self) -> Result<TestLoader> {
        if self.batch_size == 0 {
            return Err(EvalError::Dataset("batch_size must be positive".to_string()));
        }
        if self.folds < 2 {
            return Err(EvalError::Dataset(format!("need at least 2 folds, got {}", self.folds)));
        }
        if self.fold >= self.folds {
            return Err(EvalError::Dataset(format!(
                "fold {} out of range for {} folds",
                self.fold, self.folds
            )));
        }

        let graphs = self.read_graphs()?;
        if graphs.len() < self.folds {
            return Err(EvalError::Dataset(format!(
                "{} graphs cannot fill {} folds",
                graphs.len(),
                self.folds
            )));
        }

        let mut splits = KFold::new(self.folds, self.seed).split(graphs.len());
        let (train, mut test) = splits.swap_remove(self.fold);
        test.sort_unstable();

        let scaler = match self.task {
            Task::Regression => {
                let targets: Vec<f32> = train.iter().map(|&i| graphs[i].target).collect();
                Some(StandardScaler::fit(&targets)?)
            }
            Task::Classification => None,
        };

        let test_graphs: Vec<&CrystalGraph> = test.iter().map(|&i| &graphs[i]).collect();
        let batches = test_graphs
            .chunks(self.batch_size)
            .map(|chunk| GraphBatch::collate(chunk, scaler.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        log::info!(
            "Fold {}/{}: {} train, {} test graphs in {} batches",
            self.fold,
            self.folds,
            train.len(),
            test.len(),
            batches.len()
        );
        Ok(TestLoader {
            fold: self.fold,
            batches,
            scaler,
        })
    }
}

/// Write graphs in the layout `CrystalDatasetWrapper` reads.
pub fn write_graphs(data_dir: &Path, graphs: &[CrystalGraph]) -> Result<PathBuf> {
    fs::create_dir_all(data_dir)?;
    let path = data_dir.join(GRAPHS_FILE);
    let mut file = File::create(&path)?;
    for graph in graphs {
        writeln!(file, "{}", serde_json::to_string(graph)?)?;
    }
    Ok(path)
}
