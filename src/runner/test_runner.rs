//! Test-time evaluation of a restored checkpoint.
//!
//! The Runner loads `{fine_tune_from}/checkpoints/model.json` into a model,
//! switches it to inference mode and scores one fold's test loader:
//! 1. Accumulates the batch-size weighted criterion loss
//! 2. Collects predictions and labels
//! 3. Regression: undoes target normalization, reports MAE
//! 4. Classification: applies a sigmoid, reports ROC-AUC

use std::path::PathBuf;

use serde::Serialize;

use crate::config::Config;
use crate::data::TestLoader;
use crate::device::Device;
use crate::error::{EvalError, Result};
use crate::eval::{Criterion, mean_absolute_error, roc_auc_score, root_mean_squared_error, sigmoid};
use crate::model::GraphModel;
use crate::nn::{StateDict, fingerprint};
use crate::task::Task;

/// Result of scoring one checkpoint on one fold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestOutcome {
    pub fold: usize,
    pub task: Task,
    /// Mean criterion loss over all test samples, in normalized units
    pub loss: f64,
    /// MAE for regression, ROC-AUC for classification
    pub metric: f64,
    /// Regression only, in target units
    pub rmse: Option<f64>,
    pub num_samples: usize,
    /// Short hash of the checkpoint file, when one was loaded
    pub checkpoint: Option<String>,
}

pub struct Runner {
    task: Task,
    criterion: Criterion,
    checkpoint_path: Option<PathBuf>,
}

impl Runner {
    pub fn new(config: &Config, task: Task, device: Device) -> Self {
        log::info!("Running on: {}", device);
        Self {
            task,
            criterion: Criterion::for_task(task),
            checkpoint_path: config.checkpoint_path(),
        }
    }

    /// Restore the checkpoint, then score the loader.
    pub fn test(&self, model: &mut dyn GraphModel, loader: &TestLoader) -> Result<TestOutcome> {
        let path = self
            .checkpoint_path
            .as_ref()
            .ok_or_else(|| EvalError::Plan("fine_tune_from is not set".to_string()))?;

        let state = StateDict::load(path)?;
        let digest = fingerprint(path)?;
        model.load_state_dict(state)?;
        log::info!("Loaded trained model from {} ({})", path.display(), digest);

        model.eval();
        let mut outcome = self.evaluate(&*model, loader)?;
        outcome.checkpoint = Some(digest);
        Ok(outcome)
    }

    /// Score a model whose parameters are already in place.
    pub fn evaluate(&self, model: &dyn GraphModel, loader: &TestLoader) -> Result<TestOutcome> {
        let mut predictions = Vec::with_capacity(loader.num_samples());
        let mut labels = Vec::with_capacity(loader.num_samples());
        let mut test_loss = 0.0f64;
        let mut num_data = 0usize;

        for (bn, batch) in loader.iter().enumerate() {
            let (_, pred) = model.forward(batch)?;
            let pred = pred.to_vec();
            let y = batch.y.to_vec();

            let loss = self.criterion.forward(&pred, &y)?;
            log::trace!("batch {}: {} = {}", bn, self.criterion.name(), loss);

            test_loss += loss as f64 * y.len() as f64;
            num_data += y.len();
            predictions.extend(pred);
            labels.extend(y);
        }

        if num_data == 0 {
            return Err(EvalError::EmptyTestSet(loader.fold));
        }
        test_loss /= num_data as f64;

        let (metric, rmse) = match self.task {
            Task::Regression => {
                let (predictions, labels) = match &loader.scaler {
                    Some(scaler) => (scaler.inverse_transform(&predictions), scaler.inverse_transform(&labels)),
                    None => {
                        log::warn!("Test loader has no scaler; reporting MAE in normalized units");
                        (predictions, labels)
                    }
                };
                let mae = mean_absolute_error(&labels, &predictions)?;
                let rmse = root_mean_squared_error(&labels, &predictions)?;
                log::debug!("Test RMSE: {}", rmse);
                (mae, Some(rmse))
            }
            Task::Classification => {
                let probabilities: Vec<f32> = predictions.iter().map(|&p| sigmoid(p)).collect();
                (roc_auc_score(&labels, &probabilities)?, None)
            }
        };

        log::info!("Test loss: {}", test_loss);
        log::info!("Test {}: {}", self.task.metric_name(), metric);

        Ok(TestOutcome {
            fold: loader.fold,
            task: self.task,
            loss: test_loss,
            metric,
            rmse,
            num_samples: num_data,
            checkpoint: None,
        })
    }
}
