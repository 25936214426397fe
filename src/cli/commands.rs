//! CLI command definitions using clap.
//!
//! - evaluate: score every configured checkpoint and append to the ledger
//! - summarize: mean and std of the ledger for the configured run
//! - infer-task: show which task a dataset directory maps to

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// crystaleval - evaluate trained GNN checkpoints across cross-validation folds
#[derive(Parser, Debug)]
#[command(name = "crystaleval")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Evaluate all checkpoints for the configured task (default)
    Evaluate {
        /// Also write the run report as JSON to this file
        #[arg(short, long)]
        report: Option<PathBuf>,
    },

    /// Summarize the results ledger for the configured model and task
    Summarize,

    /// Print the task inferred from a dataset directory
    InferTask {
        /// Dataset directory, e.g. data/Augmented_fermi
        data_dir: PathBuf,
    },
}
