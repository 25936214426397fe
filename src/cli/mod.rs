//! CLI module for crystaleval - command-line interface and subcommands.
//!
//! Evaluation is the default action; the other subcommands inspect results
//! and task inference without loading any checkpoint.

pub mod commands;

pub use commands::Cli;
