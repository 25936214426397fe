//! Test-time loss criteria.

use crate::error::{EvalError, Result};
use crate::task::Task;

/// Mean-reduced loss between raw model outputs and (normalized) targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criterion {
    /// `mean((p - t)^2)`
    Mse,
    /// `mean(max(x, 0) - x t + log(1 + exp(-|x|)))`
    BceWithLogits,
}

impl Criterion {
    pub fn for_task(task: Task) -> Self {
        match task {
            Task::Regression => Criterion::Mse,
            Task::Classification => Criterion::BceWithLogits,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Criterion::Mse => "MSELoss",
            Criterion::BceWithLogits => "BCEWithLogitsLoss",
        }
    }

    pub fn forward(self, predictions: &[f32], targets: &[f32]) -> Result<f32> {
        if predictions.len() != targets.len() {
            return Err(EvalError::ShapeMismatch(format!(
                "{} predictions for {} targets",
                predictions.len(),
                targets.len()
            )));
        }
        if predictions.is_empty() {
            return Ok(0.0);
        }

        let pairs = predictions.iter().zip(targets).map(|(&p, &t)| (p as f64, t as f64));
        let total: f64 = match self {
            Criterion::Mse => pairs.map(|(p, t)| (p - t).powi(2)).sum(),
            Criterion::BceWithLogits => pairs
                .map(|(x, t)| x.max(0.0) - x * t + (1.0 + (-x.abs()).exp()).ln())
                .sum(),
        };
        Ok((total / predictions.len() as f64) as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_task() {
        assert_eq!(Criterion::for_task(Task::Regression), Criterion::Mse);
        assert_eq!(Criterion::for_task(Task::Classification), Criterion::BceWithLogits);
    }

    #[test]
    fn test_mse() {
        let loss = Criterion::Mse.forward(&[1.0, 2.0, 3.0], &[1.5, 2.5, 3.5]).unwrap();
        assert!((loss - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_bce_at_zero_logit() {
        let loss = Criterion::BceWithLogits.forward(&[0.0], &[1.0]).unwrap();
        assert!((loss - std::f32::consts::LN_2).abs() < 1e-6);
    }

    #[test]
    fn test_bce_large_logits_stable() {
        let loss = Criterion::BceWithLogits
            .forward(&[100.0, -100.0], &[1.0, 0.0])
            .unwrap();
        assert!(loss.is_finite());
        assert!(loss < 1e-6);

        let wrong = Criterion::BceWithLogits.forward(&[100.0], &[0.0]).unwrap();
        assert!((wrong - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_length_mismatch() {
        assert!(matches!(
            Criterion::Mse.forward(&[1.0], &[1.0, 2.0]),
            Err(EvalError::ShapeMismatch(_))
        ));
    }
}
