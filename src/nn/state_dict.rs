//! Named parameter tensors persisted as JSON checkpoints.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{EvalError, Result};

/// A single tensor: row-major data plus its shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorRecord {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl TensorRecord {
    pub fn from_array1(array: &Array1<f32>) -> Self {
        Self {
            shape: vec![array.len()],
            data: array.to_vec(),
        }
    }

    pub fn from_array2(array: &Array2<f32>) -> Self {
        let (rows, cols) = array.dim();
        Self {
            shape: vec![rows, cols],
            data: array.iter().copied().collect(),
        }
    }
}

/// Ordered map of parameter name to tensor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateDict {
    tensors: BTreeMap<String, TensorRecord>,
}

impl StateDict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a checkpoint. A missing file is reported as `CheckpointNotFound`.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(EvalError::CheckpointNotFound(path.to_path_buf()));
        }
        let bytes = fs::read(path)?;
        let state: Self = serde_json::from_slice(&bytes)?;
        log::debug!("Read {} tensors from {}", state.len(), path.display());
        Ok(state)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_vec(self)?)?;
        Ok(())
    }

    pub fn insert(&mut self, name: impl Into<String>, tensor: TensorRecord) {
        self.tensors.insert(name.into(), tensor);
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.tensors.keys().map(String::as_str)
    }

    fn take(&mut self, name: &str, expected: &[usize]) -> Result<TensorRecord> {
        let record = self
            .tensors
            .remove(name)
            .ok_or_else(|| EvalError::Checkpoint(format!("missing key: {}", name)))?;

        if record.shape != expected {
            return Err(EvalError::Checkpoint(format!(
                "size mismatch for {}: checkpoint has {:?}, model expects {:?}",
                name, record.shape, expected
            )));
        }
        let numel: usize = record.shape.iter().product();
        if record.data.len() != numel {
            return Err(EvalError::Checkpoint(format!(
                "{} declares shape {:?} but holds {} values",
                name,
                record.shape,
                record.data.len()
            )));
        }
        Ok(record)
    }

    /// Remove a 1-d parameter, checking its length.
    pub fn take_array1(&mut self, name: &str, len: usize) -> Result<Array1<f32>> {
        let record = self.take(name, &[len])?;
        Ok(Array1::from_vec(record.data))
    }

    /// Remove a 2-d parameter, checking its shape.
    pub fn take_array2(&mut self, name: &str, dim: (usize, usize)) -> Result<Array2<f32>> {
        let record = self.take(name, &[dim.0, dim.1])?;
        Array2::from_shape_vec(dim, record.data).map_err(|e| EvalError::Checkpoint(format!("{}: {}", name, e)))
    }

    /// Fail if any parameter was left unconsumed.
    pub fn finish(self) -> Result<()> {
        if self.tensors.is_empty() {
            return Ok(());
        }
        let unexpected: Vec<_> = self.tensors.into_keys().collect();
        Err(EvalError::Checkpoint(format!("unexpected keys: {}", unexpected.join(", "))))
    }
}

/// Short content hash of a checkpoint file.
///
/// SHA-256, first 8 bytes, hex encoded.
pub fn fingerprint(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let result = hasher.finalize();
    Ok(hex::encode(&result[..8]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use tempfile::TempDir;

    fn sample() -> StateDict {
        let mut sd = StateDict::new();
        sd.insert("lin.weight", TensorRecord::from_array2(&array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]));
        sd.insert("lin.bias", TensorRecord::from_array1(&array![0.5, -0.5]));
        sd
    }

    #[test]
    fn test_take_array2_row_major() {
        let mut sd = sample();
        let w = sd.take_array2("lin.weight", (3, 2)).unwrap();
        assert_eq!(w[[1, 0]], 3.0);
        assert_eq!(w[[2, 1]], 6.0);
    }

    #[test]
    fn test_missing_key() {
        let mut sd = sample();
        let err = sd.take_array1("lin.eps", 1).unwrap_err();
        assert!(err.to_string().contains("missing key: lin.eps"));
    }

    #[test]
    fn test_shape_mismatch() {
        let mut sd = sample();
        let err = sd.take_array2("lin.weight", (2, 3)).unwrap_err();
        assert!(err.to_string().contains("size mismatch for lin.weight"));
    }

    #[test]
    fn test_finish_reports_unexpected() {
        let mut sd = sample();
        sd.take_array2("lin.weight", (3, 2)).unwrap();
        let err = sd.finish().unwrap_err();
        assert!(err.to_string().contains("unexpected keys: lin.bias"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("checkpoints").join("model.json");
        let sd = sample();
        sd.save(&path).unwrap();

        let loaded = StateDict::load(&path).unwrap();
        assert_eq!(loaded, sd);
        assert_eq!(fingerprint(&path).unwrap().len(), 16);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.json");
        assert!(matches!(StateDict::load(&path), Err(EvalError::CheckpointNotFound(_))));
    }

    #[test]
    fn test_inconsistent_record_rejected() {
        let mut sd = StateDict::new();
        sd.insert(
            "w",
            TensorRecord {
                shape: vec![2, 2],
                data: vec![1.0, 2.0, 3.0],
            },
        );
        assert!(sd.take_array2("w", (2, 2)).is_err());
    }
}
