//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{HistoryCommand, RunCommand, SummaryCommand, ValidateCommand, VerifyCommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// Driver for the LLM benchmark comparison pipeline
#[derive(Debug, Parser, Clone)]
#[command(name = "analysis-pipeline")]
#[command(version = "0.1.0")]
#[command(about = "Run setup check, data download, data verification and analysis in order", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to pipeline configuration file (built-in defaults when omitted)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the full pipeline
    Run(RunCommand),

    /// Validate the pipeline configuration
    Validate(ValidateCommand),

    /// Check the downloaded data files only
    Verify(VerifyCommand),

    /// List generated artifacts only
    Summary(SummaryCommand),

    /// Show run history
    History(HistoryCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
