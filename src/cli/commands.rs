//! CLI command definitions

use crate::core::config::{DirectoryLayout, FailurePolicy, PipelineConfig};
use clap::Args;
use std::path::PathBuf;

/// Directory overrides shared by several commands
#[derive(Debug, Args, Clone, Default)]
pub struct DirectoryArgs {
    /// Directory containing raw result files
    #[arg(long)]
    pub raw_results_dir: Option<PathBuf>,

    /// Directory for organized results
    #[arg(long)]
    pub organized_results_dir: Option<PathBuf>,

    /// Directory for analysis results
    #[arg(long)]
    pub analysis_dir: Option<PathBuf>,

    /// Directory for downloaded data
    #[arg(long)]
    pub raw_data_dir: Option<PathBuf>,
}

impl DirectoryArgs {
    /// Replace configured directories with the ones given on the command line
    pub fn apply(&self, layout: &mut DirectoryLayout) {
        if let Some(dir) = &self.raw_results_dir {
            layout.raw_results_dir = dir.clone();
        }
        if let Some(dir) = &self.organized_results_dir {
            layout.organized_results_dir = dir.clone();
        }
        if let Some(dir) = &self.analysis_dir {
            layout.analysis_dir = dir.clone();
        }
        if let Some(dir) = &self.raw_data_dir {
            layout.raw_data_dir = dir.clone();
        }
    }
}

/// Run the full pipeline
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    #[command(flatten)]
    pub directories: DirectoryArgs,

    /// Models to analyze, comma separated (order is kept)
    #[arg(long, value_delimiter = ',')]
    pub models: Vec<String>,

    /// Extra environment for every step (KEY=VALUE)
    #[arg(long, value_parser = parse_key_value)]
    pub env: Vec<(String, String)>,

    /// Treat a failing analysis step as fatal
    #[arg(long)]
    pub strict: bool,

    /// Seconds to wait for downloaded files (0 disables the wait)
    #[arg(long)]
    pub flush_timeout: Option<u64>,

    /// Don't load .env from the working directory
    #[arg(long)]
    pub no_dotenv: bool,

    /// Don't save the run to history
    #[arg(long)]
    pub no_history: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

impl RunCommand {
    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply_to(&self, config: &mut PipelineConfig) {
        self.directories.apply(&mut config.directories);
        if !self.models.is_empty() {
            config.models = self.models.clone();
        }
        if self.strict {
            config.analysis_failure = FailurePolicy::Abort;
        }
        if let Some(secs) = self.flush_timeout {
            config.flush.timeout_secs = secs;
        }
        if self.no_dotenv {
            config.environment.load_dotenv = false;
        }
    }
}

/// Validate a pipeline configuration
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Check the downloaded data files
#[derive(Debug, Args, Clone)]
pub struct VerifyCommand {
    #[command(flatten)]
    pub directories: DirectoryArgs,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// List generated artifacts
#[derive(Debug, Args, Clone)]
pub struct SummaryCommand {
    #[command(flatten)]
    pub directories: DirectoryArgs,

    /// Include subdirectories of the analysis directory
    #[arg(long)]
    pub recursive: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Show run history
#[derive(Debug, Args, Clone)]
pub struct HistoryCommand {
    /// Pipeline name to filter by
    #[arg(short, long)]
    pub pipeline: Option<String>,

    /// Number of recent runs to show
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Show a specific run
    #[arg(long)]
    pub execution_id: Option<String>,
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let parts: Vec<&str> = s.splitn(2, '=').collect();
    if parts.len() != 2 || parts[0].is_empty() {
        return Err(format!("Invalid key=value pair: {}", s));
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}
