//! Run configuration.
//!
//! Loaded from `config_test.yaml` in the working directory or
//! `~/.config/crystaleval/crystaleval.yml`.

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::device::{Device, accelerator_available};
use crate::nn::Pool;
use crate::task::Task;

/// Config file looked up in the working directory.
pub const PROJECT_CONFIG_FILE: &str = "config_test.yaml";

/// Checkpoint location relative to a run directory.
pub const DEFAULT_CHECKPOINT_FILE: &str = "checkpoints/model.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Architecture name: `gin` or `dimenet`
    pub model_type: String,
    /// `cpu`, `cuda` or `cuda:N`
    pub gpu: String,
    pub batch_size: usize,
    /// Run directory holding the checkpoint under evaluation
    pub fine_tune_from: Option<PathBuf>,
    /// Checkpoint file relative to `fine_tune_from`
    pub checkpoint_file: PathBuf,
    /// Directory receiving the CSV ledgers
    pub experiments_dir: PathBuf,
    /// Run directories (or glob patterns) per task name, one per fold
    pub checkpoints: BTreeMap<String, Vec<String>>,
    pub dataset: DatasetConfig,
    pub model: ModelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub data_dir: PathBuf,
    /// Only consulted when the path matches no known dataset
    pub task: Option<Task>,
    pub task_name: Option<String>,
    pub folds: usize,
    pub seed: u64,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::new(),
            task: None,
            task_name: None,
            folds: 5,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub num_layer: usize,
    pub emb_dim: usize,
    pub feat_dim: usize,
    /// Width of the per-atom input features
    pub node_dim: usize,
    /// Width of the per-bond input features
    pub edge_dim: usize,
    pub pool: Pool,
    /// Gaussian basis size for distance expansion (dimenet)
    pub num_radial: usize,
    /// Distance cutoff in angstrom (dimenet)
    pub cutoff: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            num_layer: 5,
            emb_dim: 300,
            feat_dim: 512,
            node_dim: 92,
            edge_dim: 1,
            pool: Pool::Mean,
            num_radial: 6,
            cutoff: 8.0,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_type: "gin".to_string(),
            gpu: "cuda:0".to_string(),
            batch_size: 32,
            fine_tune_from: None,
            checkpoint_file: PathBuf::from(DEFAULT_CHECKPOINT_FILE),
            experiments_dir: PathBuf::from("experiments"),
            checkpoints: BTreeMap::new(),
            dataset: DatasetConfig::default(),
            model: ModelConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project location: ./config_test.yaml
        let project_config = PathBuf::from(PROJECT_CONFIG_FILE);
        if project_config.exists() {
            match Self::load_from_file(&project_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", project_config.display(), e);
                }
            }
        }

        // Try user location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let project_name = env!("CARGO_PKG_NAME");
            let user_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Device named by `gpu`, or the host when no accelerator is available.
    pub fn device(&self) -> Device {
        Device::select(&self.gpu, accelerator_available())
    }

    /// Full path of the checkpoint selected by `fine_tune_from`.
    pub fn checkpoint_path(&self) -> Option<PathBuf> {
        self.fine_tune_from.as_ref().map(|dir| dir.join(&self.checkpoint_file))
    }
}
