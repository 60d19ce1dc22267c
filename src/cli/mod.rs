//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Ferry using clap.
//! The `extract`, `transform`, and `load` subcommands invoke one stage
//! each over JSON envelopes on stdin/stdout, so an external orchestrator
//! can drive the stages as separate processes; `run` performs a full
//! in-process sweep.

pub mod commands;

use clap::{Parser, Subcommand};

/// Ferry - MongoDB to PostgreSQL batch ETL
#[derive(Parser, Debug)]
#[command(name = "ferry")]
#[command(version, about, long_about = None)]
#[command(author = "Ferry Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "ferry.toml", env = "FERRY_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "FERRY_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a full sweep: extract, transform, and load until exhaustion
    Run(commands::run::RunArgs),

    /// Extract one batch and print its envelope to stdout
    Extract(commands::stages::ExtractArgs),

    /// Transform an extract envelope from stdin to stdout
    Transform(commands::stages::TransformArgs),

    /// Load a transform envelope from stdin, print the result to stdout
    Load(commands::stages::LoadArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
