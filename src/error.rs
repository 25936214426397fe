//! Error types for crystaleval
//!
//! Centralized error handling using thiserror.

use std::path::PathBuf;

use thiserror::Error;

/// All error types that can occur while evaluating a checkpoint
#[derive(Debug, Error)]
pub enum EvalError {
    /// `model_type` names an architecture we cannot build
    #[error("Undefined GNN model: {0}")]
    UndefinedModel(String),

    /// Dataset path matched no known task and no explicit task was given
    #[error("Undefined dataset: {0}")]
    UndefinedDataset(String),

    /// Task string is neither regression nor classification
    #[error("Undefined task: {0}")]
    UndefinedTask(String),

    /// Checkpoint file is missing
    #[error("Checkpoint not found: {}", .0.display())]
    CheckpointNotFound(PathBuf),

    /// Checkpoint exists but does not fit the model
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// Dataset could not be read or split
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Test split produced no samples
    #[error("Empty test set for fold {0}")]
    EmptyTestSet(usize),

    /// Tensor or vector lengths disagree
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Metric is undefined for the given inputs
    #[error("Metric error: {0}")]
    Metric(String),

    /// Results ledger is malformed
    #[error("Ledger error: {0}")]
    Ledger(String),

    /// Checkpoint plan cannot be built from the configuration
    #[error("Plan error: {0}")]
    Plan(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for crystaleval operations
pub type Result<T> = std::result::Result<T, EvalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_model_error() {
        let err = EvalError::UndefinedModel("schnet".to_string());
        assert_eq!(err.to_string(), "Undefined GNN model: schnet");
    }

    #[test]
    fn test_undefined_dataset_error() {
        let err = EvalError::UndefinedDataset("data/qm9".to_string());
        assert_eq!(err.to_string(), "Undefined dataset: data/qm9");
    }

    #[test]
    fn test_checkpoint_not_found_error() {
        let err = EvalError::CheckpointNotFound(PathBuf::from("runs/FE/checkpoints/model.json"));
        assert_eq!(err.to_string(), "Checkpoint not found: runs/FE/checkpoints/model.json");
    }

    #[test]
    fn test_empty_test_set_error() {
        let err = EvalError::EmptyTestSet(3);
        assert_eq!(err.to_string(), "Empty test set for fold 3");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: EvalError = io_err.into();
        assert!(matches!(err, EvalError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: EvalError = json_err.into();
        assert!(matches!(err, EvalError::Json(_)));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_err = serde_yaml::from_str::<Vec<u32>>("{not: a list}").unwrap_err();
        let err: EvalError = yaml_err.into();
        assert!(matches!(err, EvalError::Yaml(_)));
    }
}
