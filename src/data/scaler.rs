//! Target normalization.

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};

/// Zero-mean, unit-variance scaling of regression targets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: f32,
    pub std: f32,
}

impl StandardScaler {
    /// Fit on training targets. Uses the population standard deviation; a
    /// constant target scales by 1.
    pub fn fit(values: &[f32]) -> Result<Self> {
        if values.is_empty() {
            return Err(EvalError::Dataset("cannot fit scaler on no targets".to_string()));
        }
        let n = values.len() as f64;
        let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
        let var = values.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n;
        let std = var.sqrt();

        Ok(Self {
            mean: mean as f32,
            std: if std > 0.0 { std as f32 } else { 1.0 },
        })
    }

    pub fn transform(&self, value: f32) -> f32 {
        (value - self.mean) / self.std
    }

    pub fn inverse_transform(&self, values: &[f32]) -> Vec<f32> {
        values.iter().map(|&v| v * self.std + self.mean).collect()
    }
}
