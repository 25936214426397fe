//! Loss criteria and summary metrics.

mod loss;
mod metrics;

pub use loss::Criterion;
pub use metrics::{mean_absolute_error, roc_auc_score, root_mean_squared_error, sigmoid};
