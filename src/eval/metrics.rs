//! Summary metrics over a whole test split.
//!
//! Argument order follows sklearn: `(y_true, y_pred)`.

use std::cmp::Ordering;

use crate::error::{EvalError, Result};

fn check_lengths(y_true: &[f32], y_pred: &[f32]) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(EvalError::ShapeMismatch(format!(
            "{} labels for {} predictions",
            y_true.len(),
            y_pred.len()
        )));
    }
    if y_true.is_empty() {
        return Err(EvalError::Metric("no samples".to_string()));
    }
    Ok(())
}

/// MAE = mean(|y - y_pred|)
pub fn mean_absolute_error(y_true: &[f32], y_pred: &[f32]) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let total: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(&t, &p)| (t as f64 - p as f64).abs())
        .sum();
    Ok(total / y_true.len() as f64)
}

/// RMSE = sqrt(mean((y - y_pred)^2))
pub fn root_mean_squared_error(y_true: &[f32], y_pred: &[f32]) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let total: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(&t, &p)| (t as f64 - p as f64).powi(2))
        .sum();
    Ok((total / y_true.len() as f64).sqrt())
}

/// Area under the ROC curve for binary labels; `y_true` must hold only 0 and 1.
///
/// Computed from the Mann-Whitney U statistic; tied scores receive their
/// average rank.
pub fn roc_auc_score(y_true: &[f32], y_score: &[f32]) -> Result<f64> {
    check_lengths(y_true, y_score)?;
    if y_score.iter().any(|s| s.is_nan()) {
        return Err(EvalError::Metric("scores contain NaN".to_string()));
    }

    if let Some(label) = y_true.iter().find(|&&t| t != 0.0 && t != 1.0) {
        return Err(EvalError::Metric(format!(
            "y_true must be binary (0 or 1), found label {}",
            label
        )));
    }

    let n_pos = y_true.iter().filter(|&&t| t == 1.0).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Err(EvalError::Metric(
            "Only one class present in y_true. ROC AUC score is not defined in that case.".to_string(),
        ));
    }

    let mut order: Vec<usize> = (0..y_score.len()).collect();
    order.sort_by(|&a, &b| y_score[a].partial_cmp(&y_score[b]).unwrap_or(Ordering::Equal));

    let mut positive_rank_sum = 0.0f64;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && y_score[order[end]] == y_score[order[start]] {
            end += 1;
        }
        // ranks start..end (0-based) share the 1-based average rank
        let average_rank = (start + end + 1) as f64 / 2.0;
        let positives = order[start..end].iter().filter(|&&i| y_true[i] == 1.0).count();
        positive_rank_sum += average_rank * positives as f64;
        start = end;
    }

    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Ok((positive_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

/// Numerically stable logistic function.
pub fn sigmoid(x: f32) -> f32 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}
