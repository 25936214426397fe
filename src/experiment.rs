//! Cross-validation driver: one checkpoint per fold, one ledger row per run.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime};
use serde::Serialize;

use crate::config::Config;
use crate::data::{CrystalDatasetWrapper, DatasetWrapper};
use crate::error::{EvalError, Result};
use crate::ledger::{LedgerRow, ResultLedger};
use crate::model::{ModelType, build_model};
use crate::runner::{Runner, TestOutcome};
use crate::task::{Task, TaskSpec};

/// Stamp used for training run directories and run labels, e.g. `Jul31_19-18-54`.
pub const RUN_STAMP_FORMAT: &str = "%b%d_%H-%M-%S";

/// What will be evaluated and where results go.
#[derive(Debug, Clone)]
pub struct ExperimentPlan {
    pub model_type: ModelType,
    pub task: TaskSpec,
    /// Run directory for fold `i` at index `i`
    pub checkpoints: Vec<PathBuf>,
    pub folds: usize,
    pub ledger: ResultLedger,
}

impl ExperimentPlan {
    pub fn from_config(config: &Config) -> Result<Self> {
        let model_type: ModelType = config.model_type.parse()?;
        let task = TaskSpec::resolve(&config.dataset)?;
        let folds = config.dataset.folds;

        let checkpoints = match config.checkpoints.get(&task.name) {
            Some(entries) if !entries.is_empty() => expand_checkpoints(entries)?,
            _ => match &config.fine_tune_from {
                Some(dir) => vec![dir.clone()],
                None => {
                    return Err(EvalError::Plan(format!(
                        "no checkpoints configured for task '{}' and fine_tune_from is not set",
                        task.name
                    )));
                }
            },
        };

        if checkpoints.len() > folds {
            return Err(EvalError::Plan(format!(
                "{} checkpoints for task '{}' but only {} folds",
                checkpoints.len(),
                task.name,
                folds
            )));
        }

        let ledger = ResultLedger::for_run(&config.experiments_dir, &model_type.to_string(), &task.name, folds);
        Ok(Self {
            model_type,
            task,
            checkpoints,
            folds,
            ledger,
        })
    }
}

/// Literal directories are kept as-is; glob patterns expand to their
/// directory matches in run order and must match at least one.
fn expand_checkpoints(entries: &[String]) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in entries {
        if !entry.contains(['*', '?', '[']) {
            dirs.push(PathBuf::from(entry));
            continue;
        }

        let mut matches: Vec<PathBuf> = glob::glob(entry)
            .map_err(|e| EvalError::Plan(format!("bad checkpoint pattern '{}': {}", entry, e)))?
            .filter_map(|r| r.ok())
            .filter(|p| p.is_dir())
            .collect();
        if matches.is_empty() {
            return Err(EvalError::Plan(format!("checkpoint pattern '{}' matched nothing", entry)));
        }
        matches.sort_by_key(|path| (run_stamp(path), path.clone()));
        dirs.extend(matches);
    }
    Ok(dirs)
}

/// Start time encoded in a run directory name. Stamps carry no year, so runs
/// are ordered within one calendar year; names that do not parse sort first,
/// by path.
fn run_stamp(path: &Path) -> Option<NaiveDateTime> {
    let name = path.file_name()?.to_str()?;
    // leap year so that Feb29 runs parse
    NaiveDateTime::parse_from_str(&format!("2000{}", name), &format!("%Y{}", RUN_STAMP_FORMAT)).ok()
}

/// Everything produced by one `evaluate` invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentReport {
    /// Start time as `MonDD_HH-MM-SS`
    pub run_label: String,
    pub started_at: DateTime<Local>,
    pub model_type: String,
    pub task: TaskSpec,
    pub ledger: PathBuf,
    pub outcomes: Vec<TestOutcome>,
}

/// Evaluate every planned checkpoint on its fold with `CrystalDatasetWrapper`.
pub fn run_experiment(config: &Config) -> Result<ExperimentReport> {
    run_experiment_with(config, |fold_config, task, fold| {
        Box::new(CrystalDatasetWrapper::new(
            fold_config.batch_size,
            &fold_config.dataset,
            task,
            fold,
        ))
    })
}

/// Like `run_experiment`, with the dataset for each fold supplied by `make_dataset`.
pub fn run_experiment_with<F>(config: &Config, mut make_dataset: F) -> Result<ExperimentReport>
where
    F: FnMut(&Config, Task, usize) -> Box<dyn DatasetWrapper>,
{
    let started_at = Local::now();
    let run_label = started_at.format(RUN_STAMP_FORMAT).to_string();
    let plan = ExperimentPlan::from_config(config)?;
    let device = config.device();

    log::info!(
        "Run {}: {} on {} ({}), {} checkpoint(s), ledger {}",
        run_label,
        plan.model_type,
        plan.task.name,
        plan.task.task,
        plan.checkpoints.len(),
        plan.ledger.path().display()
    );

    let mut outcomes = Vec::with_capacity(plan.checkpoints.len());
    for (fold, run_dir) in plan.checkpoints.iter().enumerate() {
        let fold_config = Config {
            fine_tune_from: Some(run_dir.clone()),
            ..config.clone()
        };
        log::info!("Fold {}: evaluating {}", fold, run_dir.display());

        let dataset = make_dataset(&fold_config, plan.task.task, fold);
        let loader = dataset.get_data_loaders()?;

        let runner = Runner::new(&fold_config, plan.task.task, device);
        let mut model = build_model(plan.model_type, &fold_config.model);
        let outcome = runner.test(model.as_mut(), &loader)?;

        plan.ledger.append(LedgerRow {
            loss: outcome.loss,
            metric: outcome.metric,
        })?;
        outcomes.push(outcome);
    }

    Ok(ExperimentReport {
        run_label,
        started_at,
        model_type: plan.model_type.to_string(),
        task: plan.task,
        ledger: plan.ledger.path().to_path_buf(),
        outcomes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn config_for(data_dir: &str) -> Config {
        let mut config = Config::default();
        config.dataset.data_dir = PathBuf::from(data_dir);
        config
    }

    #[test]
    fn test_plan_undefined_model() {
        let config = Config {
            model_type: "schnet".to_string(),
            ..config_for("data/lanths")
        };
        assert!(matches!(
            ExperimentPlan::from_config(&config),
            Err(EvalError::UndefinedModel(_))
        ));
    }

    #[test]
    fn test_plan_undefined_dataset() {
        assert!(matches!(
            ExperimentPlan::from_config(&config_for("data/qm9")),
            Err(EvalError::UndefinedDataset(_))
        ));
    }

    #[test]
    fn test_plan_uses_task_checkpoints() {
        let mut config = config_for("data/Augmented_fermi");
        config.checkpoints.insert(
            "fermi".to_string(),
            vec!["runs/Fermi/a".to_string(), "runs/Fermi/b".to_string()],
        );
        config.checkpoints.insert("FE".to_string(), vec!["runs/FE/x".to_string()]);

        let plan = ExperimentPlan::from_config(&config).unwrap();
        assert_eq!(plan.checkpoints, vec![PathBuf::from("runs/Fermi/a"), PathBuf::from("runs/Fermi/b")]);
        assert_eq!(plan.ledger.path(), PathBuf::from("experiments/gin_fermi_5.csv"));
    }

    #[test]
    fn test_plan_falls_back_to_fine_tune_from() {
        let config = Config {
            fine_tune_from: Some(PathBuf::from("runs/band/Sep13_13-44-04")),
            ..config_for("data/band")
        };
        let plan = ExperimentPlan::from_config(&config).unwrap();
        assert_eq!(plan.checkpoints.len(), 1);
    }

    #[test]
    fn test_plan_without_checkpoints() {
        assert!(matches!(
            ExperimentPlan::from_config(&config_for("data/band")),
            Err(EvalError::Plan(_))
        ));
    }

    #[test]
    fn test_plan_too_many_checkpoints() {
        let mut config = config_for("data/FE");
        config.dataset.folds = 2;
        config
            .checkpoints
            .insert("FE".to_string(), vec!["a".to_string(), "b".to_string(), "c".to_string()]);
        assert!(matches!(ExperimentPlan::from_config(&config), Err(EvalError::Plan(_))));
    }

    #[test]
    fn test_glob_expansion_sorted() {
        let dir = TempDir::new().unwrap();
        for name in ["Aug02_10-45-47", "Aug01_08-24-44", "notes.txt"] {
            let path = dir.path().join(name);
            if name.ends_with(".txt") {
                fs::write(&path, "x").unwrap();
            } else {
                fs::create_dir(&path).unwrap();
            }
        }

        let pattern = format!("{}/*", dir.path().display());
        let dirs = expand_checkpoints(&[pattern]).unwrap();
        assert_eq!(
            dirs,
            vec![dir.path().join("Aug01_08-24-44"), dir.path().join("Aug02_10-45-47")]
        );
    }

    #[test]
    fn test_glob_expansion_orders_runs_across_months() {
        let dir = TempDir::new().unwrap();
        let runs = [
            "Jul31_19-18-54",
            "Aug01_08-24-44",
            "Aug01_21-34-14",
            "Aug02_10-45-47",
            "Aug02_23-58-02",
        ];
        for name in runs {
            fs::create_dir(dir.path().join(name)).unwrap();
        }

        let pattern = format!("{}/*", dir.path().display());
        let dirs = expand_checkpoints(&[pattern]).unwrap();
        let names: Vec<_> = dirs
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, runs);
    }

    #[test]
    fn test_run_stamp() {
        assert!(run_stamp(Path::new("runs/FE/Feb29_00-00-01")).is_some());
        assert!(run_stamp(Path::new("runs/FE/latest")).is_none());
        assert!(run_stamp(Path::new("Dec31_23-59-59")) > run_stamp(Path::new("Jan01_00-00-00")));
    }

    #[test]
    fn test_glob_matching_nothing() {
        let dir = TempDir::new().unwrap();
        let pattern = format!("{}/runs-*", dir.path().display());
        assert!(expand_checkpoints(&[pattern]).is_err());
    }
}
