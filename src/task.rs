//! Task inference from dataset paths.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::DatasetConfig;
use crate::error::{EvalError, Result};

/// Learning task the checkpoint was trained for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    Regression,
    Classification,
}

impl Task {
    /// Name of the summary metric written to the ledger.
    pub fn metric_name(self) -> &'static str {
        match self {
            Task::Regression => "MAE",
            Task::Classification => "ROC AUC",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Regression => write!(f, "regression"),
            Task::Classification => write!(f, "classification"),
        }
    }
}

impl FromStr for Task {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "regression" => Ok(Task::Regression),
            "classification" => Ok(Task::Classification),
            other => Err(EvalError::UndefinedTask(other.to_string())),
        }
    }
}

/// Task type plus the short name used in ledger file names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskSpec {
    pub task: Task,
    pub name: String,
}

/// Substring rules checked in order. `Augmented_*` datasets must be matched
/// before their plain counterparts.
const DATASET_RULES: &[(&str, Task, &str)] = &[
    ("Augmented_lanths", Task::Regression, "lanths"),
    ("Augmented_abx3_cifs", Task::Regression, "perovskites"),
    ("Augmented_band", Task::Regression, "band"),
    ("Augmented_FE", Task::Regression, "FE"),
    ("Augmented_fermi", Task::Regression, "fermi"),
    ("abx3_cifs", Task::Regression, "perovskites"),
    ("band", Task::Regression, "band"),
    ("FE", Task::Regression, "FE"),
    ("fermi", Task::Regression, "fermi"),
    ("lanths", Task::Regression, "lanths"),
];

impl TaskSpec {
    /// Infer the task from a known dataset directory name.
    pub fn infer(data_dir: &Path) -> Option<Self> {
        let path = data_dir.to_string_lossy();
        DATASET_RULES
            .iter()
            .find(|(needle, _, _)| path.contains(needle))
            .map(|(_, task, name)| Self {
                task: *task,
                name: (*name).to_string(),
            })
    }

    /// Infer from the path, falling back to an explicit `task` + `task_name`.
    pub fn resolve(dataset: &DatasetConfig) -> Result<Self> {
        if let Some(spec) = Self::infer(&dataset.data_dir) {
            if let Some(task) = dataset.task
                && task != spec.task
            {
                log::warn!(
                    "Configured task '{}' overridden by dataset '{}' ({})",
                    task,
                    spec.name,
                    spec.task
                );
            }
            return Ok(spec);
        }

        match (dataset.task, dataset.task_name.as_deref()) {
            (Some(task), Some(name)) if !name.is_empty() => Ok(Self {
                task,
                name: name.to_string(),
            }),
            _ => Err(EvalError::UndefinedDataset(dataset.data_dir.display().to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn name_of(dir: &str) -> Option<String> {
        TaskSpec::infer(Path::new(dir)).map(|s| s.name)
    }

    #[test]
    fn test_task_from_str() {
        assert_eq!("regression".parse::<Task>().unwrap(), Task::Regression);
        assert_eq!("classification".parse::<Task>().unwrap(), Task::Classification);
        assert!(matches!("ranking".parse::<Task>(), Err(EvalError::UndefinedTask(_))));
    }

    #[test]
    fn test_infer_plain_datasets() {
        assert_eq!(name_of("data/band").as_deref(), Some("band"));
        assert_eq!(name_of("data/FE").as_deref(), Some("FE"));
        assert_eq!(name_of("data/fermi").as_deref(), Some("fermi"));
        assert_eq!(name_of("data/lanths").as_deref(), Some("lanths"));
        assert_eq!(name_of("data/abx3_cifs").as_deref(), Some("perovskites"));
    }

    #[test]
    fn test_infer_augmented_datasets() {
        assert_eq!(name_of("data/Augmented_lanths").as_deref(), Some("lanths"));
        assert_eq!(name_of("data/Augmented_abx3_cifs").as_deref(), Some("perovskites"));
        assert_eq!(name_of("data/Augmented_FE").as_deref(), Some("FE"));
    }

    #[test]
    fn test_rule_order_wins() {
        // contains both "band" and "FE"; band is checked first
        assert_eq!(name_of("data/band_FE_mix").as_deref(), Some("band"));
    }

    #[test]
    fn test_inferred_tasks_are_regression() {
        let spec = TaskSpec::infer(Path::new("data/Augmented_fermi")).unwrap();
        assert_eq!(spec.task, Task::Regression);
        assert_eq!(spec.task.metric_name(), "MAE");
    }

    #[test]
    fn test_resolve_unknown_dataset_errors() {
        let dataset = DatasetConfig {
            data_dir: PathBuf::from("data/qm9"),
            ..DatasetConfig::default()
        };
        assert!(matches!(TaskSpec::resolve(&dataset), Err(EvalError::UndefinedDataset(_))));
    }

    #[test]
    fn test_resolve_explicit_classification() {
        let dataset = DatasetConfig {
            data_dir: PathBuf::from("data/metallicity"),
            task: Some(Task::Classification),
            task_name: Some("metal".to_string()),
            ..DatasetConfig::default()
        };
        let spec = TaskSpec::resolve(&dataset).unwrap();
        assert_eq!(spec.task, Task::Classification);
        assert_eq!(spec.name, "metal");
    }

    #[test]
    fn test_resolve_rules_override_configured_task() {
        let dataset = DatasetConfig {
            data_dir: PathBuf::from("data/lanths"),
            task: Some(Task::Classification),
            ..DatasetConfig::default()
        };
        let spec = TaskSpec::resolve(&dataset).unwrap();
        assert_eq!(spec.task, Task::Regression);
    }
}
