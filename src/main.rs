use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

use crystaleval::config::Config;
use crystaleval::experiment::run_experiment;
use crystaleval::ledger::ResultLedger;
use crystaleval::model::ModelType;
use crystaleval::task::TaskSpec;

mod cli;

use cli::Cli;
use cli::commands::Commands;

fn setup_logging() -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("crystaleval")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("crystaleval.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        None => handle_evaluate_command(None, cli.is_verbose(), config),
        Some(Commands::Evaluate { report }) => handle_evaluate_command(report.as_deref(), cli.is_verbose(), config),
        Some(Commands::Summarize) => handle_summarize_command(config),
        Some(Commands::InferTask { data_dir }) => handle_infer_task_command(data_dir),
    }
}

fn handle_evaluate_command(report_path: Option<&Path>, verbose: bool, config: &Config) -> Result<()> {
    info!("Evaluating {} checkpoints from {}", config.model_type, config.dataset.data_dir.display());
    println!(
        "{} {} on {}",
        "Evaluating:".cyan(),
        config.model_type,
        config.dataset.data_dir.display()
    );

    println!("{} {}", "Running on:".cyan(), config.device());

    let report = run_experiment(config).context("Evaluation failed")?;

    for outcome in &report.outcomes {
        println!(
            "{} fold {} ({} samples, checkpoint {})",
            "Tested:".cyan(),
            outcome.fold,
            outcome.num_samples,
            outcome.checkpoint.as_deref().unwrap_or("-")
        );
        println!("  {} {}", "Test loss:".green(), outcome.loss);
        println!("  {} {}", format!("Test {}:", outcome.task.metric_name()).green(), outcome.metric);
        if verbose && let Some(rmse) = outcome.rmse {
            println!("  {} {}", "Test RMSE:".yellow(), rmse);
        }
    }
    println!(
        "{} {} row(s) to {}",
        "Appended:".green(),
        report.outcomes.len(),
        report.ledger.display()
    );

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        fs::write(path, json).context(format!("Failed to write report to {}", path.display()))?;
        println!("{} {}", "Report:".green(), path.display());
    }
    Ok(())
}

fn handle_summarize_command(config: &Config) -> Result<()> {
    let model_type: ModelType = config.model_type.parse()?;
    let task = TaskSpec::resolve(&config.dataset)?;
    let ledger = ResultLedger::for_run(
        &config.experiments_dir,
        &model_type.to_string(),
        &task.name,
        config.dataset.folds,
    );
    info!("Summarizing {}", ledger.path().display());

    match ledger.summary()? {
        Some(summary) => {
            println!("{} {} ({} runs)", "Ledger:".cyan(), ledger.path().display(), summary.runs);
            println!("  {} {:.6} ± {:.6}", "Test loss:".green(), summary.loss_mean, summary.loss_std);
            println!(
                "  {} {:.6} ± {:.6}",
                format!("Test {}:", task.task.metric_name()).green(),
                summary.metric_mean,
                summary.metric_std
            );
        }
        None => println!("{} {} has no results yet", "Ledger:".yellow(), ledger.path().display()),
    }
    Ok(())
}

fn handle_infer_task_command(data_dir: &Path) -> Result<()> {
    info!("Inferring task for {}", data_dir.display());
    let spec = TaskSpec::infer(data_dir).ok_or_else(|| eyre!("Undefined dataset: {}", data_dir.display()))?;
    println!("{} {} ({})", "Task:".green(), spec.name, spec.task);
    Ok(())
}

fn main() -> Result<()> {
    // Setup logging first
    setup_logging().context("Failed to setup logging")?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).context("Application failed")?;

    Ok(())
}
