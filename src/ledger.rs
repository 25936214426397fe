//! Append-only CSV ledger of per-fold results.
//!
//! One file per `(model_type, task_name, folds)` combination, rows
//! `test_loss,metric`, no header.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{EvalError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LedgerRow {
    pub loss: f64,
    pub metric: f64,
}

/// Mean and population standard deviation of both ledger columns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LedgerSummary {
    pub runs: usize,
    pub loss_mean: f64,
    pub loss_std: f64,
    pub metric_mean: f64,
    pub metric_std: f64,
}

#[derive(Debug, Clone)]
pub struct ResultLedger {
    path: PathBuf,
}

impl ResultLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `{experiments_dir}/{model_type}_{task_name}_{folds}.csv`
    pub fn for_run(experiments_dir: &Path, model_type: &str, task_name: &str, folds: usize) -> Self {
        Self::new(experiments_dir.join(format!("{}_{}_{}.csv", model_type, task_name, folds)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row, creating the directory and file as needed.
    pub fn append(&self, row: LedgerRow) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{:?},{:?}", row.loss, row.metric)?;
        log::debug!("Appended {:?} to {}", row, self.path.display());
        Ok(())
    }

    /// All rows so far; a missing file is an empty ledger.
    pub fn rows(&self) -> Result<Vec<LedgerRow>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;

        let mut rows = Vec::new();
        for (number, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let parse = |field: &str| {
                field.trim().parse::<f64>().map_err(|e| {
                    EvalError::Ledger(format!("{}:{}: {}", self.path.display(), number + 1, e))
                })
            };
            match line.split(',').collect::<Vec<_>>().as_slice() {
                [loss, metric] => rows.push(LedgerRow {
                    loss: parse(*loss)?,
                    metric: parse(*metric)?,
                }),
                fields => {
                    return Err(EvalError::Ledger(format!(
                        "{}:{}: expected 2 columns, found {}",
                        self.path.display(),
                        number + 1,
                        fields.len()
                    )));
                }
            }
        }
        Ok(rows)
    }

    pub fn summary(&self) -> Result<Option<LedgerSummary>> {
        let rows = self.rows()?;
        if rows.is_empty() {
            return Ok(None);
        }
        let losses: Vec<f64> = rows.iter().map(|r| r.loss).collect();
        let metrics: Vec<f64> = rows.iter().map(|r| r.metric).collect();
        let (loss_mean, loss_std) = mean_std(&losses);
        let (metric_mean, metric_std) = mean_std(&metrics);

        Ok(Some(LedgerSummary {
            runs: rows.len(),
            loss_mean,
            loss_std,
            metric_mean,
            metric_std,
        }))
    }
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_name() {
        let ledger = ResultLedger::for_run(Path::new("experiments"), "gin", "lanths", 5);
        assert_eq!(ledger.path(), Path::new("experiments/gin_lanths_5.csv"));
    }

    #[test]
    fn test_append_creates_dir_and_has_no_header() {
        let dir = TempDir::new().unwrap();
        let ledger = ResultLedger::for_run(&dir.path().join("experiments"), "dimenet", "FE", 5);

        ledger.append(LedgerRow { loss: 0.25, metric: 1.0 }).unwrap();
        ledger.append(LedgerRow { loss: 0.5, metric: 0.125 }).unwrap();

        let content = fs::read_to_string(ledger.path()).unwrap();
        assert_eq!(content, "0.25,1.0\n0.5,0.125\n");
    }

    #[test]
    fn test_rows_and_summary() {
        let dir = TempDir::new().unwrap();
        let ledger = ResultLedger::new(dir.path().join("gin_band_5.csv"));
        assert!(ledger.summary().unwrap().is_none());

        for (loss, metric) in [(1.0, 2.0), (3.0, 4.0)] {
            ledger.append(LedgerRow { loss, metric }).unwrap();
        }

        let rows = ledger.rows().unwrap();
        assert_eq!(rows.len(), 2);

        let summary = ledger.summary().unwrap().unwrap();
        assert_eq!(summary.runs, 2);
        assert_eq!(summary.loss_mean, 2.0);
        assert_eq!(summary.loss_std, 1.0);
        assert_eq!(summary.metric_mean, 3.0);
    }

    #[test]
    fn test_rows_accepts_pandas_formatting() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gin_fermi_5.csv");
        fs::write(&path, "0.0123,0.4567\n1e-07,2.0\n").unwrap();

        let rows = ResultLedger::new(path).rows().unwrap();
        assert_eq!(rows[1].loss, 1e-7);
    }

    #[test]
    fn test_malformed_row() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gin_fermi_5.csv");
        fs::write(&path, "0.1,0.2,0.3\n").unwrap();

        let err = ResultLedger::new(path).rows().unwrap_err();
        assert!(err.to_string().contains("expected 2 columns"));
    }
}
